//! The trait conformance checker.
//!
//! For every trait a class implements, every trait method the class does not define itself must
//! have a default body, which is then inherited by the class. Pure trait methods, i.e. ones whose
//! body consists of a docstring and `pass` at most, have to be implemented.

use diagnostics::{Diag, Result};
use hir::{is_builtin_type, last_segment, module_of, Definitions, Function, FunctionFlags, Trait};
use std::rc::Rc;
use utility::{Atom, QuoteExt};

/// Check that all classes implement the traits they claim to and inherit default methods.
///
/// Runs after name resolution so that the implemented traits are fully-qualified.
pub(crate) fn check_conformance(modules: &mut [Definitions]) -> Result {
    let mut inherited = Vec::new();

    for (index, definitions) in modules.iter().enumerate() {
        for class in definitions.classes.values() {
            let mut defaults: Vec<(Atom, Vec<Rc<Function>>)> = Vec::new();

            for implemented in &class.implements {
                if is_builtin_type(&implemented.bare) {
                    continue;
                }

                let Some(trait_) = find_trait(modules, &implemented.bare) else {
                    return Err(Diag::bug()
                        .message(format!("unresolved trait {}", implemented.bare.quote()))
                        .unlabeled_span(implemented));
                };

                for (name, methods) in trait_.methods.iter() {
                    if class.methods.contains(name) || defaults.iter().any(|(other, _)| *other == name) {
                        continue;
                    }

                    let methods: Vec<_> = methods
                        .iter()
                        .filter(|method| !method.flags.contains(FunctionFlags::PURE))
                        .cloned()
                        .collect();

                    if methods.is_empty() {
                        return Err(Diag::error()
                            .message(format!(
                                "pure trait method {} is not implemented",
                                name.quote()
                            ))
                            .note(format!(
                                "required by trait {} implemented by class {}",
                                implemented.bare.quote(),
                                class.name.quote()
                            ))
                            .unlabeled_span(implemented));
                    }

                    defaults.push((name, methods));
                }
            }

            if !defaults.is_empty() {
                inherited.push((index, class.name.bare, defaults));
            }
        }
    }

    for (index, class, defaults) in inherited {
        let Some(class) = modules[index].classes.get_mut(class) else {
            continue;
        };
        let class = Rc::make_mut(class);

        for (name, methods) in defaults {
            tracing::trace!(class = %class.name.bare, method = %name, "inherited default trait method");
            class.methods.insert(name, methods);
        }
    }

    Ok(())
}

/// Look up a trait by its fully-qualified name.
fn find_trait<'a>(modules: &'a [Definitions], name: &str) -> Option<&'a Rc<Trait>> {
    let module = module_of(name)?;
    modules
        .iter()
        .find(|definitions| definitions.module == module)?
        .traits
        .get(Atom::from(last_segment(name)))
}
