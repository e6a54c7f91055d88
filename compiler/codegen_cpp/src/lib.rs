//! The C++ code generator.
//!
//! Every module is translated into three files:
//!
//! * the *early header* containing enums, forward declarations of classes, prototypes of
//!   functions and declarations of global variables
//! * the *header* containing the bodies of traits and classes
//! * the *source* containing every executable definition and the module initializer
//!
//! Since nothing in the early header depends on the bodies of classes, modules can include each
//! other's early headers in any order.
//!
//! The bodies of a module are compiled before anything else is emitted because compiling them
//! discovers the specializations of generic functions and classes the module uses. Every module
//! emits the specializations it uses itself, functions as `inline` definitions and classes
//! behind an include guard.

use diagnostics::{Diag, Result};
use hir::Definitions;
use session::{Context, Registry, Specializations};
use utility::{HashSet, QuoteExt};

pub use types::include_path;

mod convert;
mod expression;
mod source;
mod statement;
#[cfg(test)]
mod test;
mod types;

#[derive(Clone, Copy, Default, Debug)]
pub struct Options {
    /// Whether the module defines the entry point of the application.
    pub has_main: bool,
}

/// The translation of a module.
#[derive(Clone, Default, Debug)]
pub struct Output {
    pub early_header: String,
    pub header: String,
    pub source: String,
}

/// Translate the module with the given name.
///
/// The module has to be registered with the registry. Specializations created along the way are
/// added to the given cache and shared with the modules compiled later.
pub fn compile_module(
    registry: &Registry,
    specializations: &mut Specializations,
    module: &str,
    options: Options,
) -> Result<Output> {
    let Some(definitions) = registry.module(module) else {
        return Err(Diag::bug().message(format!("module {} is not registered", module.quote())));
    };

    tracing::debug!(module, "emitting module");

    let mut context = Context::new(registry, specializations, module);
    let mut generator = Generator::new(&mut context);
    let parts = generator.module(definitions, options)?;
    let specialized = generator.specializations()?;

    tracing::debug!(
        module,
        specializations = context.used_specializations().len(),
        "emitted module"
    );

    Ok(assemble(definitions, parts, specialized))
}

fn assemble(definitions: &Definitions, module: Parts, specialized: Parts) -> Output {
    let name = &definitions.module;
    let path = include_path(name);

    let mut imported: Vec<&str> = Vec::new();
    for import in definitions.imports.values() {
        if !imported.contains(&import.module.bare.as_str()) {
            imported.push(&import.module.bare);
        }
    }
    let includes = |extension: &str| -> String {
        imported
            .iter()
            .map(|module| format!("#include \"{}.{extension}\"\n", include_path(module)))
            .collect()
    };

    let early_header = format!(
        "#pragma once\n\n#include \"mys.hpp\"\n{}\n{}{}{}{}",
        includes("mys.early.hpp"),
        in_namespace(name, &module.declarations),
        specialized.declarations,
        in_namespace(name, &module.prototypes),
        specialized.prototypes,
    );
    let header = format!(
        "#pragma once\n\n#include \"{path}.mys.early.hpp\"\n{}\n{}{}{}",
        includes("mys.hpp"),
        in_namespace(name, &module.traits),
        specialized.classes,
        in_namespace(name, &module.classes),
    );
    let source = format!(
        "#include \"{path}.mys.hpp\"\n\n{}{}",
        specialized.definitions,
        in_namespace(name, &module.definitions),
    );

    Output {
        early_header,
        header,
        source,
    }
}

/// The pieces of text a module or a specialization contributes to the emitted files.
#[derive(Default)]
struct Parts {
    /// Enums and forward declarations of classes.
    declarations: String,
    /// Global variables and the prototypes of functions.
    prototypes: String,
    traits: String,
    classes: String,
    definitions: String,
}

impl Parts {
    fn append_in_namespace(&mut self, module: &str, other: Self) {
        self.declarations += &in_namespace(module, &other.declarations);
        self.prototypes += &in_namespace(module, &other.prototypes);
        self.traits += &in_namespace(module, &other.traits);
        self.classes += &in_namespace(module, &other.classes);
        self.definitions += &in_namespace(module, &other.definitions);
    }
}

fn in_namespace(module: &str, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!("namespace {} {{\n\n{text}\n}}\n\n", types::namespace(module))
}

/// Indent every line of the text by one level.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                "\n".to_owned()
            } else {
                format!("    {line}\n")
            }
        })
        .collect()
}

/// Wrap the statements in braces.
fn block(statements: &str) -> String {
    format!("{{\n{}}}", indent(statements))
}

/// How the receiver of a method is referred to in its body.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Receiver {
    /// Through `this`, in methods of classes.
    This,
    /// Through the parameter `self`, in specialized generic methods and lifted comprehensions.
    Parameter,
}

struct Generator<'c, 'a> {
    context: &'c mut Context<'a>,
    /// Functions lifted out of the definition being compiled, emitted right before it.
    lifted: Vec<String>,
    receiver: Receiver,
}

impl<'c, 'a> Generator<'c, 'a> {
    fn new(context: &'c mut Context<'a>) -> Self {
        Self {
            context,
            lifted: Vec::new(),
            receiver: Receiver::This,
        }
    }

    fn take_lifted(&mut self) -> String {
        std::mem::take(&mut self.lifted).concat()
    }

    /// The definitions of the constants created so far.
    fn constants(&self) -> String {
        self.context
            .constants()
            .iter()
            .map(|constant| {
                format!(
                    "static const {} {} = {};\n",
                    self.cpp_type(&constant.type_),
                    constant.name,
                    constant.value
                )
            })
            .collect()
    }

    /// Emit every specialization the module uses, including those only used by specializations.
    fn specializations(&mut self) -> Result<Parts> {
        let mut parts = Parts::default();
        let mut emitted = HashSet::default();
        let mut pending = self.context.used_specializations().to_vec();
        let mut index = 0;

        while let Some(name) = pending.get(index).cloned() {
            index += 1;
            if !emitted.insert(name.clone()) {
                continue;
            }
            pending.extend(self.specialization(&name, &mut parts)?);
        }

        Ok(parts)
    }

    /// Emit a single specialization, returning the specializations it uses in turn.
    fn specialization(&mut self, name: &str, parts: &mut Parts) -> Result<Vec<String>> {
        let registry = self.context.registry;
        let specializations = &mut *self.context.specializations;
        let function = specializations
            .function(name)
            .map(|specialized| specialized.entity.clone());
        let class = specializations
            .class(name)
            .map(|specialized| specialized.entity.clone());

        let module = match (&function, &class) {
            (Some(function), _) => function.module.clone(),
            (None, Some(class)) => class.module.clone(),
            (None, None) => {
                return Err(Diag::bug()
                    .message(format!("specialization {} is not registered", name.quote())))
            }
        };

        tracing::trace!(specialization = name, module = %module, "emitting specialization");

        let mut context = Context::new(registry, specializations, &module).tagged(&name.replace('.', "_"));
        let mut generator = Generator::new(&mut context);
        let mut own = Parts::default();

        match (function, class) {
            (Some(function), _) => generator.specialized_function(name, &function, &mut own)?,
            (None, Some(class)) => generator.specialized_class(&class, &mut own)?,
            (None, None) => {}
        }

        own.definitions.insert_str(0, &generator.constants());
        parts.append_in_namespace(&module, own);
        Ok(context.used_specializations().to_vec())
    }
}
