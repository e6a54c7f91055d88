//! The compilation session.
//!
//! * The [`Registry`] owns the resolved definitions of every module of the compilation unit and
//!   looks entities up by fully-qualified name.
//! * The [`Specializations`] cache holds the monomorphized functions and classes. It outlives
//!   the compilation of individual modules so that no instantiation is specialized twice.
//! * A [`Context`] is the state of compiling one module: scopes of local variables, a counter
//!   for unique names and the table of deduplicated constants.

use hir::{last_segment, module_of, Class, Definitions, Enum, Function, Kind, Trait, Type, Variable};
use span::Span;
use std::rc::Rc;
use utility::{Atom, HashMap};

#[cfg(test)]
mod test;

/// The definitions of all modules of a compilation unit.
pub struct Registry {
    modules: Vec<Definitions>,
    indices: HashMap<String, usize>,
}

impl Registry {
    pub fn new(modules: Vec<Definitions>) -> Self {
        let indices = modules
            .iter()
            .enumerate()
            .map(|(index, definitions)| (definitions.module.clone(), index))
            .collect();

        Self { modules, indices }
    }

    pub fn modules(&self) -> &[Definitions] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&Definitions> {
        self.indices.get(name).map(|&index| &self.modules[index])
    }

    /// Split a fully-qualified name into the definitions of its module and its last segment.
    fn split(&self, name: &str) -> Option<(&Definitions, Atom)> {
        let definitions = self.module(module_of(name)?)?;
        Some((definitions, Atom::from(last_segment(name))))
    }

    pub fn class(&self, name: &str) -> Option<&Rc<Class>> {
        let (definitions, name) = self.split(name)?;
        definitions.classes.get(name)
    }

    pub fn trait_(&self, name: &str) -> Option<&Rc<Trait>> {
        let (definitions, name) = self.split(name)?;
        definitions.traits.get(name)
    }

    pub fn enum_(&self, name: &str) -> Option<&Rc<Enum>> {
        let (definitions, name) = self.split(name)?;
        definitions.enums.get(name)
    }

    pub fn functions(&self, name: &str) -> Option<&[Rc<Function>]> {
        let (definitions, name) = self.split(name)?;
        definitions.functions.get(name).map(Vec::as_slice)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        let (definitions, name) = self.split(name)?;
        definitions.variables.get(name)
    }

    /// The kind of the entity with the given fully-qualified name.
    pub fn kind(&self, name: &str) -> Option<Kind> {
        let (definitions, name) = self.split(name)?;
        definitions.kind_of(name).filter(|&kind| kind != Kind::Import)
    }
}

/// A specialized function or class together with the place it was first requested from.
#[derive(Debug)]
pub struct Specialized<T> {
    pub entity: Rc<T>,
    /// The first call site, for diagnostics.
    pub call_site: Span,
}

/// The cache of specialized functions and classes keyed by their mangled fully-qualified name.
#[derive(Default)]
pub struct Specializations {
    functions: HashMap<String, Specialized<Function>>,
    classes: HashMap<String, Specialized<Class>>,
}

impl Specializations {
    pub fn function(&self, name: &str) -> Option<&Specialized<Function>> {
        self.functions.get(name)
    }

    pub fn class(&self, name: &str) -> Option<&Specialized<Class>> {
        self.classes.get(name)
    }

    pub fn insert_function(&mut self, name: String, function: Rc<Function>, call_site: Span) {
        self.functions.insert(
            name,
            Specialized {
                entity: function,
                call_site,
            },
        );
    }

    pub fn insert_class(&mut self, name: String, class: Rc<Class>, call_site: Span) {
        self.classes.insert(
            name,
            Specialized {
                entity: class,
                call_site,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a name refers to at a given point of a module.
#[derive(Clone, Debug)]
pub enum Binding {
    Local(Type),
    /// A global variable by fully-qualified name.
    Variable(String),
    /// An overload set of free functions by fully-qualified name.
    Functions(String),
    Class(String),
    Trait(String),
    Enum(String),
}

/// The state of compiling a single module.
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub specializations: &'a mut Specializations,
    /// The dotted name of the module being compiled.
    pub module: String,
    /// The fully-qualified names of the definitions visible in the module by their short name.
    names: HashMap<Atom, (Kind, String)>,
    scopes: Vec<HashMap<Atom, Type>>,
    unique: u32,
    /// Distinguishes the synthesized names of contexts emitting into the same namespace.
    tag: String,
    /// Constants by their rendered text, in order of creation.
    constants: Vec<Constant>,
    /// The specializations referenced by the module, in order of first use.
    used_specializations: Vec<String>,
    /// The class whose method is being compiled.
    pub class: Option<Rc<Class>>,
    /// The return type of the function being compiled.
    pub returns: Option<Type>,
}

/// A literal shared by all of its uses in a module.
#[derive(Clone, Debug)]
pub struct Constant {
    pub name: String,
    pub type_: Type,
    /// The rendered value.
    pub value: String,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, specializations: &'a mut Specializations, module: &str) -> Self {
        let mut names = HashMap::default();

        if let Some(definitions) = registry.module(module) {
            for name in definitions.declared_names() {
                if let Some(kind) = definitions.kind_of(name) {
                    names.insert(name, (kind, hir::qualify(module, name)));
                }
            }
            for (alias, import) in definitions.imports.iter() {
                if let Some(kind) = import.kind {
                    names.insert(alias, (kind, import.qualified_name()));
                }
            }
        }

        Self {
            registry,
            specializations,
            module: module.to_owned(),
            names,
            scopes: Vec::new(),
            unique: 0,
            tag: String::new(),
            constants: Vec::new(),
            used_specializations: Vec::new(),
            class: None,
            returns: None,
        }
    }

    /// Make the synthesized names of this context distinct from those of other contexts.
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = format!("_{tag}");
        self
    }

    pub fn definitions(&self) -> Option<&'a Definitions> {
        self.registry.module(&self.module)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Run the given function in a fresh scope.
    pub fn scoped<T>(&mut self, run: impl FnOnce(&mut Self) -> T) -> T {
        self.push_scope();
        let result = run(self);
        self.pop_scope();
        result
    }

    /// Define a local variable in the innermost scope.
    pub fn define_local(&mut self, name: Atom, type_: Type) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, type_);
        }
    }

    pub fn local(&self, name: Atom) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    pub fn is_local(&self, name: Atom) -> bool {
        self.local(name).is_some()
    }

    /// The names of the local variables of all scopes, innermost definitions taking precedence.
    pub fn locals(&self) -> Vec<(Atom, Type)> {
        let mut locals: Vec<(Atom, Type)> = Vec::new();
        for scope in self.scopes.iter().rev() {
            for (name, type_) in scope {
                if !locals.iter().any(|(local, _)| local == name) {
                    locals.push((*name, type_.clone()));
                }
            }
        }
        locals.sort_by(|(left, _), (right, _)| left.to_str().cmp(right.to_str()));
        locals
    }

    /// Look up what a short name refers to, local variables first.
    pub fn lookup(&self, name: Atom) -> Option<Binding> {
        if let Some(type_) = self.local(name) {
            return Some(Binding::Local(type_.clone()));
        }

        let (kind, qualified) = self.names.get(&name)?;
        let qualified = qualified.clone();

        Some(match kind {
            Kind::Variable => Binding::Variable(qualified),
            Kind::Function => Binding::Functions(qualified),
            Kind::Class => Binding::Class(qualified),
            Kind::Trait => Binding::Trait(qualified),
            Kind::Enum => Binding::Enum(qualified),
            Kind::Import => return None,
        })
    }

    /// A fresh name for a synthesized temporary.
    pub fn unique(&mut self, prefix: &str) -> String {
        self.unique += 1;
        format!("__{prefix}{}_{}", self.tag, self.unique)
    }

    /// The name of the constant with the given rendered value, created on first use.
    pub fn constant(&mut self, type_: &Type, value: String) -> String {
        if let Some(constant) = self
            .constants
            .iter()
            .find(|constant| constant.value == value && constant.type_ == *type_)
        {
            return constant.name.clone();
        }

        let name = format!("__constant{}_{}", self.tag, self.constants.len() + 1);
        self.constants.push(Constant {
            name: name.clone(),
            type_: type_.clone(),
            value,
        });
        name
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Record that the module refers to the specialization with the given mangled name.
    pub fn use_specialization(&mut self, name: &str) {
        if !self.used_specializations.iter().any(|used| used == name) {
            self.used_specializations.push(name.to_owned());
        }
    }

    pub fn used_specializations(&self) -> &[String] {
        &self.used_specializations
    }

    /// Look up a class by fully-qualified name, specializations included.
    pub fn class(&self, name: &str) -> Option<Rc<Class>> {
        self.registry
            .class(name)
            .cloned()
            .or_else(|| self.specializations.class(name).map(|specialized| specialized.entity.clone()))
    }

    /// Whether the class with the given name implements the trait with the given name.
    pub fn implements(&self, class: &str, trait_: &str) -> bool {
        self.class(class)
            .is_some_and(|class| class.implements(trait_))
    }
}
