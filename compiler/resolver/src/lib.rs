//! The name resolver.
//!
//! Runs once all modules of a compilation unit have been collected:
//!
//! * resolves `from module import name [as alias]` by looking up the kind of the imported
//!   definition in the definitions of the target module
//! * rewrites every type of a global variable, class member, function or method signature and
//!   trait base to its fully-qualified form `module.Name` in place, recursing into the structure
//!   of containers and generic instantiations
//!
//! Unknown modules, imported names, types and traits are reported here. Afterwards the trait
//! conformance of classes is checked and default trait methods are inherited.

use diagnostics::{Diag, Result};
use hir::{is_builtin_type, Definitions, Identifier, Kind, Type};
use span::{Span, Spanned};
use std::rc::Rc;
use utility::{Atom, HashMap, QuoteExt};

use conformance::check_conformance;

mod conformance;
#[cfg(test)]
mod test;

/// Resolve the imports and the types of all modules of the compilation unit.
pub fn resolve(modules: &mut [Definitions]) -> Result {
    resolve_imports(modules)?;

    let global = global_types(modules);

    for definitions in modules.iter_mut() {
        let scope = ModuleScope {
            global: &global,
            local: local_types(definitions),
        };
        scope.resolve_definitions(definitions)?;
        tracing::debug!(module = %definitions.module, "resolved names");
    }

    check_conformance(modules)
}

fn resolve_imports(modules: &mut [Definitions]) -> Result {
    let mut resolved = Vec::new();

    for (index, definitions) in modules.iter().enumerate() {
        for import in definitions.imports.values() {
            let Some(target) = modules
                .iter()
                .find(|target| target.module == import.module.bare)
            else {
                return Err(Diag::error()
                    .message(format!("cannot resolve module {}", import.module.quote()))
                    .unlabeled_span(&import.module));
            };

            // re-exports are not supported
            let kind = if target.imports.contains(import.name.bare) {
                None
            } else {
                target.kind_of(import.name.bare)
            };

            let Some(kind) = kind else {
                return Err(Diag::error()
                    .message(format!(
                        "cannot resolve {} in module {}",
                        import.name.quote(),
                        import.module.quote()
                    ))
                    .unlabeled_span(import.name)
                    .with(|error| {
                        match find_similar(target.declared_names(), import.name.bare.to_str()) {
                            Some(lookalike) => error.note(format!(
                                "a definition with a similar name exists: {}",
                                lookalike.quote()
                            )),
                            None => error,
                        }
                    }));
            };

            resolved.push((index, import.alias.bare, kind));
        }
    }

    for (index, alias, kind) in resolved {
        if let Some(import) = modules[index].imports.get_mut(alias) {
            import.kind = Some(kind);
        }
    }

    Ok(())
}

/// The kinds of all types of the compilation unit by fully-qualified name.
fn global_types(modules: &[Definitions]) -> HashMap<String, Kind> {
    let mut types = HashMap::default();

    for definitions in modules {
        let module = &definitions.module;
        types.extend(
            definitions
                .classes
                .names()
                .map(|name| (hir::qualify(module, name), Kind::Class)),
        );
        types.extend(
            definitions
                .traits
                .names()
                .map(|name| (hir::qualify(module, name), Kind::Trait)),
        );
        types.extend(
            definitions
                .enums
                .names()
                .map(|name| (hir::qualify(module, name), Kind::Enum)),
        );
    }

    types
}

/// The fully-qualified names of the types visible in the module by their short name.
fn local_types(definitions: &Definitions) -> HashMap<Atom, String> {
    definitions
        .classes
        .names()
        .chain(definitions.traits.names())
        .chain(definitions.enums.names())
        .chain(definitions.imports.names())
        .filter_map(|name| Some((name, definitions.qualify_type_name(name)?)))
        .collect()
}

struct ModuleScope<'a> {
    global: &'a HashMap<String, Kind>,
    local: HashMap<Atom, String>,
}

impl ModuleScope<'_> {
    fn resolve_definitions(&self, definitions: &mut Definitions) -> Result {
        for variable in definitions.variables.values_mut() {
            self.resolve_type(&mut variable.type_, &[], variable.name.span)?;
        }

        for function in definitions.functions.values_mut().flatten() {
            self.resolve_function(Rc::make_mut(function), &[])?;
        }

        for trait_ in definitions.traits.values_mut() {
            let trait_ = Rc::make_mut(trait_);
            for method in trait_.methods.values_mut().flatten() {
                self.resolve_function(Rc::make_mut(method), &[])?;
            }
        }

        for class in definitions.classes.values_mut() {
            let class = Rc::make_mut(class);
            let generics = class.generic_types.clone();

            for implemented in &mut class.implements {
                self.resolve_trait(implemented)?;
            }

            for member in class.members.values_mut() {
                self.resolve_type(&mut member.type_, &generics, member.name.span)?;
            }

            for function in class
                .methods
                .values_mut()
                .chain(class.static_functions.values_mut())
                .flatten()
            {
                self.resolve_function(Rc::make_mut(function), &generics)?;
            }
        }

        Ok(())
    }

    fn resolve_function(&self, function: &mut hir::Function, outer_generics: &[Identifier]) -> Result {
        let generics: Vec<_> = outer_generics
            .iter()
            .chain(&function.generic_types)
            .copied()
            .collect();

        for parameter in &mut function.parameters {
            self.resolve_type(&mut parameter.type_, &generics, parameter.name.span)?;
        }

        let span = function.node.returns.as_ref().map_or(function.name.span, |returns| returns.span);
        if let Some(returns) = &mut function.returns {
            self.resolve_type(returns, &generics, span)?;
        }

        for raised in &mut function.raises {
            self.resolve_type(raised, &generics, function.name.span)?;
        }

        Ok(())
    }

    fn resolve_trait(&self, implemented: &mut Spanned<String>) -> Result {
        if is_builtin_type(&implemented.bare) {
            return Ok(());
        }

        let qualified = match self.qualify(&implemented.bare, &[]) {
            Ok(Some(qualified)) => qualified,
            Ok(None) => implemented.bare.clone(),
            Err(()) => {
                return Err(self.unresolved("trait", &implemented.bare, implemented.span));
            }
        };

        if self.global.get(&qualified) != Some(&Kind::Trait) {
            return Err(Diag::error()
                .message(format!("{} is not a trait", implemented.bare.quote()))
                .unlabeled_span(&*implemented));
        }

        implemented.bare = qualified;
        Ok(())
    }

    /// Rewrite the names of the type to fully-qualified ones.
    fn resolve_type(&self, type_: &mut Type, generics: &[Identifier], span: Span) -> Result {
        let mut unresolved = None;

        type_.map_names(&mut |name| {
            if unresolved.is_some() {
                return None;
            }
            match self.qualify(name, generics) {
                Ok(qualified) => qualified,
                Err(()) => {
                    unresolved = Some(name.to_owned());
                    None
                }
            }
        });

        match unresolved {
            Some(name) => Err(self.unresolved("type", &name, span)),
            None => Ok(()),
        }
    }

    /// The fully-qualified form of a name if it differs.
    fn qualify(&self, name: &str, generics: &[Identifier]) -> Result<Option<String>, ()> {
        if generics.iter().any(|generic| generic.bare == name) || is_builtin_type(name) {
            return Ok(None);
        }

        if name.contains('.') {
            return if self.global.contains_key(name) {
                Ok(None)
            } else {
                Err(())
            };
        }

        match self.local.get(&Atom::from(name)) {
            Some(qualified) => Ok(Some(qualified.clone())),
            None => Err(()),
        }
    }

    fn unresolved(&self, kind: &str, name: &str, span: Span) -> Diag {
        Diag::error()
            .message(format!("cannot resolve {kind} {}", name.quote()))
            .unlabeled_span(span)
            .with(|error| match find_similar(self.local.keys().copied(), name) {
                Some(lookalike) => error.note(format!(
                    "a {kind} with a similar name exists: {}",
                    lookalike.quote()
                )),
                None => error,
            })
    }
}

fn find_similar(mut candidates: impl Iterator<Item = Atom>, name: &str) -> Option<Atom> {
    candidates.find(|candidate| is_similar(name, candidate.to_str()))
}

fn is_similar(identifier: &str, other_identifier: &str) -> bool {
    strsim::levenshtein(other_identifier, identifier) <= std::cmp::max(identifier.len(), 3) / 3
}
