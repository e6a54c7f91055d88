//! The resolution of calls and overloads.

use crate::{
    builtins::{self, Builtin, MethodSignature},
    default_type, intersect, is_assignable, resolve_annotation, resolve_entity, unwrap_reference,
    value_type, Entity,
};
use ast::{Attribute, BareExpression, Call, Expression};
use diagnostics::{Diag, Result};
use hir::{Class, Function, Identifier, Trait, Type};
use session::Context;
use span::Span;
use std::rc::Rc;
use utility::{pluralize, Atom, QuoteExt};

/// What a call invokes.
#[derive(Clone, Debug)]
pub enum Callee {
    /// A free function, `path` being its fully-qualified (and possibly mangled) name.
    Function { path: String, function: Rc<Function> },
    /// A method called on the receiver of the callee attribute.
    Method { class: Rc<Class>, function: Rc<Function> },
    /// A specialized generic method, called as a free function taking the receiver first.
    SpecializedMethod { path: String, class: Rc<Class>, function: Rc<Function> },
    TraitMethod { trait_: Rc<Trait>, function: Rc<Function> },
    StaticFunction { class: Rc<Class>, function: Rc<Function> },
    /// The instantiation of a class, through its `__init__` method if it declares one.
    Constructor { class: Rc<Class>, init: Option<Rc<Function>> },
    /// The instantiation of an error class of the runtime.
    BuiltinClass(Atom),
    Builtin(Builtin),
    BuiltinMethod { name: Atom, signature: MethodSignature },
    /// A numeric, `char` or `bool` conversion like `u8(x)`.
    Conversion(Type),
}

impl Callee {
    /// The function whose parameters the arguments are matched against, if any.
    pub fn function(&self) -> Option<&Rc<Function>> {
        match self {
            Self::Function { function, .. }
            | Self::Method { function, .. }
            | Self::SpecializedMethod { function, .. }
            | Self::TraitMethod { function, .. }
            | Self::StaticFunction { function, .. } => Some(function),
            Self::Constructor { init, .. } => init.as_ref(),
            Self::BuiltinClass(_) | Self::Builtin(_) | Self::BuiltinMethod { .. } | Self::Conversion(_) => None,
        }
    }

    /// The type of the value the call evaluates to, `None` for calls without a result.
    pub fn returns(&self, context: &mut Context<'_>, call: &Call, span: Span) -> Result<Type> {
        match self {
            Self::Constructor { class, .. } => Ok(Type::Named(class.qualified_name())),
            Self::BuiltinClass(name) => Ok(Type::named(name.to_str())),
            Self::Builtin(builtin) => builtin_returns(context, *builtin, call, span),
            Self::BuiltinMethod { signature, .. } => Ok(signature.returns.clone()),
            Self::Conversion(type_) => {
                let [argument] = call.arguments.as_slice() else {
                    return Err(Diag::error()
                        .message(format!("conversion to {} takes exactly one argument", type_.quote()))
                        .unlabeled_span(span));
                };
                value_type(context, argument)?;
                Ok(type_.clone())
            }
            callee => {
                let returns = callee
                    .function()
                    .and_then(|function| function.returns.clone())
                    .unwrap_or(Type::None);
                specializer::concretize(context, &returns, span)
            }
        }
    }
}

fn builtin_returns(context: &mut Context<'_>, builtin: Builtin, call: &Call, span: Span) -> Result<Type> {
    let arguments = &call.arguments;
    let arity_error = |expected: &str| {
        Diag::error()
            .message(format!("{} takes {expected}", builtin.name().quote()))
            .unlabeled_span(span)
    };

    if builtin != Builtin::Print && !call.keywords.is_empty() {
        return Err(Diag::error()
            .message(format!("{} takes no keyword arguments", builtin.name().quote()))
            .unlabeled_span(span));
    }

    Ok(match builtin {
        Builtin::Print => {
            for argument in arguments {
                value_type(context, argument)?;
            }
            for keyword in &call.keywords {
                if !matches!(keyword.name.bare.to_str(), "end" | "flush") {
                    return Err(Diag::error()
                        .message(format!("unexpected keyword argument {}", keyword.name.quote()))
                        .unlabeled_span(keyword.name));
                }
            }
            Type::None
        }
        Builtin::Len | Builtin::Str | Builtin::Abs => {
            let [argument] = arguments.as_slice() else {
                return Err(arity_error("exactly one argument"));
            };
            let type_ = value_type(context, argument)?;
            match builtin {
                Builtin::Len => {
                    if !matches!(
                        type_,
                        Type::String | Type::Bytes | Type::List(_) | Type::Dict(..) | Type::Set(_)
                    ) {
                        return Err(Diag::error()
                            .message(format!("{} has no length", default_type(&type_).quote()))
                            .unlabeled_span(argument));
                    }
                    Type::I64
                }
                Builtin::Str => Type::String,
                _ => {
                    if !(type_.is_number() || type_.is_candidates()) {
                        return Err(Diag::error()
                            .message(format!("{} is not a number", default_type(&type_).quote()))
                            .unlabeled_span(argument));
                    }
                    type_
                }
            }
        }
        Builtin::Min | Builtin::Max => match arguments.as_slice() {
            [] => return Err(arity_error("at least one argument")),
            [argument] => match value_type(context, argument)? {
                Type::List(element) | Type::Set(element) => *element,
                type_ => {
                    return Err(Diag::error()
                        .message(format!("{} is not a list or a set", type_.quote()))
                        .unlabeled_span(argument))
                }
            },
            [first, rest @ ..] => {
                let mut type_ = value_type(context, first)?;
                for argument in rest {
                    let argument_type = value_type(context, argument)?;
                    type_ = intersect(&type_, &argument_type, argument.span)?;
                }
                type_
            }
        },
    })
}

/// Resolve what the call invokes.
///
/// Generic functions and classes are specialized on the way, with explicit type arguments like
/// in `identity[i64](1)` or with the type arguments inferred from the arguments.
pub fn resolve_call(context: &mut Context<'_>, call: &Call, span: Span) -> Result<Callee> {
    match &call.function.bare {
        BareExpression::Subscript(subscript) => {
            let arguments = type_arguments(context, &subscript.index)?;
            resolve_callee(context, &subscript.value, call, Some(arguments), span)
        }
        _ => resolve_callee(context, &call.function, call, None, span),
    }
}

fn type_arguments(context: &mut Context<'_>, index: &Expression) -> Result<Vec<Type>> {
    match &index.bare {
        BareExpression::Tuple(elements) => elements
            .iter()
            .map(|element| resolve_annotation(context, element))
            .collect(),
        _ => Ok(vec![resolve_annotation(context, index)?]),
    }
}

fn resolve_callee(
    context: &mut Context<'_>,
    function: &Expression,
    call: &Call,
    explicit: Option<Vec<Type>>,
    span: Span,
) -> Result<Callee> {
    if let Some(entity) = resolve_entity(context, function) {
        return entity_callee(context, entity, function, call, explicit, span);
    }

    match &function.bare {
        BareExpression::Name(name) => {
            if explicit.is_some() {
                return Err(Diag::error()
                    .message(format!("{} is not generic", name.quote()))
                    .unlabeled_span(function));
            }
            if let Some(builtin) = Builtin::from_name(name.to_str()) {
                return Ok(Callee::Builtin(builtin));
            }
            if let Some(type_) = builtins::conversion(name.to_str()) {
                return Ok(Callee::Conversion(type_));
            }
            if builtins::ADAPTORS.contains(&name.to_str()) {
                return Err(Diag::error()
                    .message(format!(
                        "{} can only be iterated over in 'for' loops and comprehensions",
                        name.quote()
                    ))
                    .unlabeled_span(function));
            }

            Err(Diag::error()
                .message(format!("cannot resolve function {}", name.quote()))
                .unlabeled_span(function))
        }
        BareExpression::Attribute(attribute) => {
            if let Some(Entity::Class(class)) = resolve_entity(context, &attribute.value) {
                return static_function(context, &class, attribute.name, call, span);
            }

            let receiver = value_type(context, &attribute.value)?;
            method_callee(context, &receiver, attribute, call, explicit, span)
        }
        _ => Err(Diag::error()
            .message(format!("{} is not callable", function.quote()))
            .unlabeled_span(function)),
    }
}

fn entity_callee(
    context: &mut Context<'_>,
    entity: Entity,
    function: &Expression,
    call: &Call,
    explicit: Option<Vec<Type>>,
    span: Span,
) -> Result<Callee> {
    match entity {
        Entity::Functions { qualified, overloads } => {
            let name = Atom::from(hir::last_segment(&qualified));
            let overloads: Vec<_> = match &explicit {
                Some(arguments) => overloads
                    .into_iter()
                    .filter(|overload| overload.generic_types.len() == arguments.len())
                    .collect(),
                None => overloads,
            };
            if overloads.is_empty() {
                return Err(Diag::error()
                    .message(format!("{} is not generic", name.quote()))
                    .unlabeled_span(function));
            }

            let selected = resolve_overload(context, name, &overloads, call, span)?;
            if !selected.is_generic() {
                if explicit.is_some() {
                    return Err(Diag::error()
                        .message(format!("{} is not generic", name.quote()))
                        .unlabeled_span(function));
                }
                return Ok(Callee::Function {
                    path: qualified,
                    function: selected,
                });
            }

            let arguments = match explicit {
                Some(arguments) => arguments,
                None => infer_type_arguments(context, &selected, call, span)?,
            };
            let (path, function) =
                specializer::specialize_function(context, &selected, &qualified, &arguments, span)?;
            Ok(Callee::Function { path, function })
        }
        Entity::Class(class) => {
            let class = match explicit {
                Some(arguments) => {
                    specializer::specialize_class(context, &class.qualified_name(), &arguments, span)?.1
                }
                None if class.is_generic() => {
                    return Err(Diag::error()
                        .message(format!(
                            "generic class {} requires type arguments",
                            class.name.quote()
                        ))
                        .unlabeled_span(function));
                }
                None => class,
            };

            let init = match class.method(Atom::INIT) {
                Some(overloads) => Some(resolve_overload(context, Atom::INIT, overloads, call, span)?),
                None => None,
            };
            Ok(Callee::Constructor { class, init })
        }
        Entity::BuiltinClass(name) if name != Atom::ERROR => Ok(Callee::BuiltinClass(name)),
        Entity::Enum(enum_) => Ok(Callee::Conversion(Type::Named(enum_.qualified_name()))),
        Entity::Local(_) | Entity::Variable { .. } => Err(Diag::error()
            .message(format!("variable {} is not callable", function.quote()))
            .unlabeled_span(function)),
        Entity::Trait(_) | Entity::BuiltinClass(_) => Err(Diag::error()
            .message(format!("trait {} cannot be instantiated", function.quote()))
            .unlabeled_span(function)),
    }
}

fn static_function(
    context: &mut Context<'_>,
    class: &Rc<Class>,
    name: Identifier,
    call: &Call,
    span: Span,
) -> Result<Callee> {
    let Some(overloads) = class.static_functions.get(name.bare) else {
        return Err(Diag::error()
            .message(format!(
                "class {} has no static function {}",
                class.name.quote(),
                name.quote()
            ))
            .unlabeled_span(name));
    };

    crate::check_private(context, class, name)?;
    let function = resolve_overload(context, name.bare, overloads, call, span)?;
    Ok(Callee::StaticFunction {
        class: class.clone(),
        function,
    })
}

fn method_callee(
    context: &mut Context<'_>,
    receiver: &Type,
    attribute: &Attribute,
    call: &Call,
    explicit: Option<Vec<Type>>,
    span: Span,
) -> Result<Callee> {
    let name = attribute.name;
    let receiver = unwrap_reference(receiver);

    if let Type::Named(type_name) = receiver {
        if let Some(class) = context.class(type_name) {
            let Some(overloads) = class.method(name.bare) else {
                return Err(Diag::error()
                    .message(format!(
                        "class {} has no method {}",
                        class.name.quote(),
                        name.quote()
                    ))
                    .unlabeled_span(name));
            };

            crate::check_private(context, &class, name)?;
            let overloads = overloads.to_vec();
            let function = resolve_overload(context, name.bare, &overloads, call, span)?;

            if !function.is_generic() {
                return Ok(Callee::Method { class, function });
            }

            let arguments = match explicit {
                Some(arguments) => arguments,
                None => infer_type_arguments(context, &function, call, span)?,
            };
            let qualified = format!("{}.{}", class.qualified_name(), name.bare);
            let (path, function) =
                specializer::specialize_function(context, &function, &qualified, &arguments, span)?;
            return Ok(Callee::SpecializedMethod {
                path,
                class,
                function,
            });
        }

        if let Some(trait_) = context.registry.trait_(type_name).cloned() {
            let Some(overloads) = trait_.methods.get(name.bare) else {
                return Err(Diag::error()
                    .message(format!(
                        "trait {} has no method {}",
                        trait_.name.quote(),
                        name.quote()
                    ))
                    .unlabeled_span(name));
            };
            let overloads = overloads.clone();
            let function = resolve_overload(context, name.bare, &overloads, call, span)?;
            return Ok(Callee::TraitMethod { trait_, function });
        }
    }

    if explicit.is_some() {
        return Err(Diag::error()
            .message(format!("{} is not generic", name.quote()))
            .unlabeled_span(name));
    }

    match builtins::method(receiver, name.bare.to_str()) {
        Some(signature) => Ok(Callee::BuiltinMethod {
            name: name.bare,
            signature,
        }),
        None => Err(Diag::error()
            .message(format!(
                "{} has no method {}",
                default_type(receiver).quote(),
                name.quote()
            ))
            .unlabeled_span(name)),
    }
}

/// An argument matched to a parameter.
#[derive(Clone, Copy, Debug)]
pub enum Argument<'a> {
    Given(&'a Expression),
    /// The parameter takes its default value.
    Default,
}

/// Match the positional and keyword arguments of a call to the parameters of the function.
pub fn arrange_arguments<'a>(function: &Function, call: &'a Call, span: Span) -> Result<Vec<Argument<'a>>> {
    let parameters = &function.parameters;

    if call.arguments.len() > parameters.len() {
        return Err(Diag::error()
            .message(format!(
                "{} takes {} {} but {} were given",
                function.name.quote(),
                parameters.len(),
                pluralize!(parameters.len(), "argument"),
                call.arguments.len()
            ))
            .unlabeled_span(span));
    }

    let mut arguments: Vec<Option<Argument<'a>>> = call
        .arguments
        .iter()
        .map(|argument| Some(Argument::Given(argument)))
        .chain(std::iter::repeat(None))
        .take(parameters.len())
        .collect();

    for keyword in &call.keywords {
        let Some(position) = parameters
            .iter()
            .position(|parameter| parameter.name.bare == keyword.name.bare)
        else {
            return Err(Diag::error()
                .message(format!(
                    "{} has no parameter {}",
                    function.name.quote(),
                    keyword.name.quote()
                ))
                .unlabeled_span(keyword.name));
        };

        if arguments[position].is_some() {
            return Err(Diag::error()
                .message(format!(
                    "parameter {} is given more than once",
                    keyword.name.quote()
                ))
                .unlabeled_span(keyword.name));
        }
        arguments[position] = Some(Argument::Given(&keyword.value));
    }

    parameters
        .iter()
        .zip(arguments)
        .map(|(parameter, argument)| match argument {
            Some(argument) => Ok(argument),
            None if parameter.default.is_some() => Ok(Argument::Default),
            None => Err(Diag::error()
                .message(format!(
                    "missing argument for parameter {}",
                    parameter.name.quote()
                ))
                .unlabeled_span(span)),
        })
        .collect()
}

/// Select the overload the arguments of the call match.
///
/// A single overload is selected without looking at the arguments. Otherwise exactly one
/// candidate has to accept the number, the keywords and the types of the arguments.
pub fn resolve_overload(
    context: &mut Context<'_>,
    name: Atom,
    overloads: &[Rc<Function>],
    call: &Call,
    span: Span,
) -> Result<Rc<Function>> {
    if let [function] = overloads {
        return Ok(function.clone());
    }

    let mut matching = Vec::new();
    for function in overloads {
        if accepts(context, function, call, span) {
            matching.push(function.clone());
        }
    }

    match matching.len() {
        1 => {
            tracing::trace!(function = %name, candidates = overloads.len(), "resolved overload");
            Ok(matching.remove(0))
        }
        0 => Err(Diag::error()
            .message(format!(
                "ambiguous call to {}: no overload matches the arguments",
                name.quote()
            ))
            .unlabeled_span(span)),
        count => Err(Diag::error()
            .message(format!(
                "ambiguous call to {}: {count} overloads match the arguments",
                name.quote()
            ))
            .unlabeled_span(span)),
    }
}

fn accepts(context: &mut Context<'_>, function: &Function, call: &Call, span: Span) -> bool {
    let Ok(arguments) = arrange_arguments(function, call, span) else {
        return false;
    };

    function
        .parameters
        .iter()
        .zip(arguments)
        .all(|(parameter, argument)| match argument {
            Argument::Given(argument) => {
                is_generic_type(&parameter.type_, function)
                    || argument_matches(context, argument, &parameter.type_)
            }
            Argument::Default => true,
        })
}

fn is_generic_type(type_: &Type, function: &Function) -> bool {
    let mut generic = false;
    type_.clone().map_names(&mut |name| {
        generic |= function
            .generic_types
            .iter()
            .any(|parameter| parameter.bare == name);
        None
    });
    generic
}

/// Whether the argument can be converted to the parameter type.
fn argument_matches(context: &mut Context<'_>, argument: &Expression, expected: &Type) -> bool {
    let expected = match specializer::concretize(context, expected, argument.span) {
        Ok(expected) => expected,
        Err(_) => return false,
    };

    match (&argument.bare, &expected) {
        (BareExpression::List(elements), Type::List(_)) if elements.is_empty() => return true,
        (BareExpression::Set(elements), Type::Set(_)) if elements.is_empty() => return true,
        (BareExpression::Dict(items), Type::Dict(..) | Type::Set(_)) if items.is_empty() => {
            return true
        }
        _ => {}
    }

    match value_type(context, argument) {
        Ok(actual) => is_assignable(context, &actual, &expected),
        Err(_) => false,
    }
}

/// Infer the type arguments of a call to a generic function from the types of the arguments.
fn infer_type_arguments(
    context: &mut Context<'_>,
    function: &Function,
    call: &Call,
    span: Span,
) -> Result<Vec<Type>> {
    let arguments = arrange_arguments(function, call, span)?;
    let mut bindings: Vec<Option<Type>> = vec![None; function.generic_types.len()];

    for (parameter, argument) in function.parameters.iter().zip(arguments) {
        if let Argument::Given(argument) = argument {
            let actual = default_type(&value_type(context, argument)?);
            unify(&parameter.type_, &actual, &function.generic_types, &mut bindings);
        }
    }

    function
        .generic_types
        .iter()
        .zip(bindings)
        .map(|(parameter, binding)| {
            binding.ok_or_else(|| {
                Diag::error()
                    .message(format!(
                        "cannot infer the generic type {} of {}",
                        parameter.quote(),
                        function.name.quote()
                    ))
                    .unlabeled_span(span)
            })
        })
        .collect()
}

/// Bind generic parameters occurring in the pattern to the corresponding parts of the actual type.
fn unify(pattern: &Type, actual: &Type, parameters: &[Identifier], bindings: &mut [Option<Type>]) {
    match (pattern, actual) {
        (Type::Named(name), actual) => {
            if let Some(position) = parameters.iter().position(|parameter| parameter.bare == name.as_str()) {
                if bindings[position].is_none() {
                    bindings[position] = Some(actual.clone());
                }
            }
        }
        (Type::List(pattern), Type::List(actual))
        | (Type::Set(pattern), Type::Set(actual))
        | (Type::Optional(pattern), Type::Optional(actual))
        | (Type::Weak(pattern), Type::Weak(actual)) => unify(pattern, actual, parameters, bindings),
        (Type::Optional(pattern), actual) => unify(pattern, actual, parameters, bindings),
        (Type::Dict(pattern_key, pattern_value), Type::Dict(key, value)) => {
            unify(pattern_key, key, parameters, bindings);
            unify(pattern_value, value, parameters, bindings);
        }
        (Type::Tuple(patterns), Type::Tuple(actuals)) if patterns.len() == actuals.len() => {
            for (pattern, actual) in patterns.iter().zip(actuals) {
                unify(pattern, actual, parameters, bindings);
            }
        }
        _ => {}
    }
}
