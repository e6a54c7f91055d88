//! Decorators of definitions.

use ast::{BareExpression, Decorator};
use diagnostics::{Diag, Result};
use hir::{Identifier, Primitive, Type};
use std::fmt;
use utility::{is_pascal_case, Atom, QuoteExt};

/// The kind of definition a decorator is attached to.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Function,
    Method,
    Class,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Function => "functions",
            Self::Method => "methods",
            Self::Class => "classes",
        })
    }
}

#[derive(Default)]
pub(crate) struct Decorators {
    pub(crate) generic: Vec<Identifier>,
    pub(crate) raises: Vec<Type>,
    pub(crate) test: bool,
    pub(crate) trait_: bool,
    /// The underlying type of an enumeration.
    pub(crate) enum_: Option<Primitive>,
}

impl Decorators {
    pub(crate) fn parse(decorators: &[Decorator], target: Target) -> Result<Self> {
        let mut this = Self::default();
        let mut seen: Vec<Atom> = Vec::new();

        for decorator in decorators {
            let name = decorator.name.bare;

            if seen.contains(&name) {
                return Err(Diag::error()
                    .message(format!("duplicate decorator {}", format!("@{name}").quote()))
                    .unlabeled_span(decorator));
            }
            seen.push(name);

            let allowed: &[Target] = match name.to_str() {
                "generic" => &[Target::Function, Target::Method, Target::Class],
                "raises" => &[Target::Function, Target::Method],
                "test" => &[Target::Function],
                "trait" | "enum" => &[Target::Class],
                _ => {
                    return Err(Diag::error()
                        .message(format!("unknown decorator {}", format!("@{name}").quote()))
                        .unlabeled_span(decorator))
                }
            };

            if !allowed.contains(&target) {
                return Err(Diag::error()
                    .message(format!(
                        "decorator {} is not allowed on {target}",
                        format!("@{name}").quote()
                    ))
                    .unlabeled_span(decorator));
            }

            let arguments = decorator.arguments.as_deref();

            match name.to_str() {
                "generic" => {
                    let arguments = required_arguments(decorator, arguments)?;
                    for argument in arguments {
                        let Some(parameter) = argument.as_name() else {
                            return Err(Diag::error()
                                .message(format!("invalid generic type parameter {}", argument.quote()))
                                .unlabeled_span(argument));
                        };
                        if !is_pascal_case(parameter.to_str()) {
                            return Err(Diag::error()
                                .message(format!(
                                    "generic type parameter {} is not pascal case",
                                    parameter.quote()
                                ))
                                .unlabeled_span(argument));
                        }
                        this.generic.push(span::Spanned::new(argument.span, parameter));
                    }
                }
                "raises" => {
                    for argument in required_arguments(decorator, arguments)? {
                        this.raises.push(Type::from_annotation(argument)?);
                    }
                }
                "test" | "trait" => {
                    if arguments.is_some() {
                        return Err(Diag::error()
                            .message(format!(
                                "decorator {} does not take any arguments",
                                format!("@{name}").quote()
                            ))
                            .unlabeled_span(decorator));
                    }
                    if name == "test" {
                        this.test = true;
                    } else {
                        this.trait_ = true;
                    }
                }
                _ => {
                    this.enum_ = Some(match arguments {
                        None | Some([]) => Primitive::I64,
                        Some([argument]) => match &argument.bare {
                            BareExpression::Name(type_) => Primitive::from_name(type_.to_str())
                                .filter(|primitive| primitive.is_integer())
                                .ok_or_else(|| invalid_enum_type(argument))?,
                            _ => return Err(invalid_enum_type(argument)),
                        },
                        Some(_) => {
                            return Err(Diag::error()
                                .message("decorator '@enum' takes at most one argument")
                                .unlabeled_span(decorator))
                        }
                    });
                }
            }
        }

        if this.trait_ && (this.enum_.is_some() || !this.generic.is_empty()) {
            return Err(Diag::error()
                .message("traits cannot be enums or generic")
                .unlabeled_span(&decorators[0]));
        }

        Ok(this)
    }
}

fn required_arguments<'a>(
    decorator: &Decorator,
    arguments: Option<&'a [ast::Expression]>,
) -> Result<&'a [ast::Expression]> {
    match arguments {
        Some(arguments) if !arguments.is_empty() => Ok(arguments),
        _ => Err(Diag::error()
            .message(format!(
                "decorator {} requires at least one argument",
                format!("@{}", decorator.name.bare).quote()
            ))
            .unlabeled_span(decorator)),
    }
}

fn invalid_enum_type(argument: &ast::Expression) -> Diag {
    Diag::error()
        .message(format!("invalid enum type {}", argument.quote()))
        .note("the type of an enum has to be an integer type")
        .unlabeled_span(argument)
}
