//! The generics specializer.
//!
//! Generic functions and classes are monomorphized on demand: the first reference to an
//! instantiation with concrete type arguments clones the generic definition, substitutes the
//! type arguments for the generic parameters in its signature and in every type position of its
//! body and registers the result in the [specialization cache](session::Specializations) under a
//! mangled fully-qualified name. Later references to the same instantiation reuse the cached
//! entity.

use ast::Expression;
use diagnostics::{Diag, Result};
use hir::{last_segment, Class, Function, Identifier, Type};
use joinery::JoinableIterator;
use session::Context;
use span::Span;
use std::rc::Rc;
use utility::{pluralize, Atom, HashMap, QuoteExt};

#[cfg(test)]
mod test;

/// The mangled fully-qualified name of an instantiation.
///
/// # Examples
///
/// `lib.Box` instantiated with `[string]` and `i64` is mangled to `lib.Box_list_string_i64`.
pub fn mangle(qualified_name: &str, arguments: &[Type]) -> String {
    format!(
        "{qualified_name}_{}",
        arguments.iter().map(Type::mangled).join_with("_")
    )
}

/// Specialize a generic function (or method) with the given type arguments.
///
/// The `qualified_name` is the fully-qualified name of the generic, i.e. `module.function` for
/// free functions and `module.Class.method` for methods. Returns the mangled name together with
/// the specialized function.
pub fn specialize_function(
    context: &mut Context<'_>,
    generic: &Rc<Function>,
    qualified_name: &str,
    arguments: &[Type],
    call_site: Span,
) -> Result<(String, Rc<Function>)> {
    check_arity(&generic.name, &generic.generic_types, arguments, call_site)?;

    // overloads share their qualified name
    let mangled = if generic.is_overloaded() {
        let signature = overload_signature(generic);
        mangle(&format!("{qualified_name}_{signature}"), arguments)
    } else {
        mangle(qualified_name, arguments)
    };

    if let Some(specialized) = context.specializations.function(&mangled) {
        tracing::trace!(function = %mangled, "reused specialization");
        let function = specialized.entity.clone();
        context.use_specialization(&mangled);
        return Ok((mangled, function));
    }

    let substitutions = substitutions(&generic.generic_types, arguments);
    let mut function = (**generic).clone();
    function.name.bare = Atom::from(last_segment(&mangled));
    function.generic_types.clear();
    substitute_function(&mut function, &substitutions);

    let function = Rc::new(function);
    context
        .specializations
        .insert_function(mangled.clone(), function.clone(), call_site);
    context.use_specialization(&mangled);
    tracing::trace!(function = %mangled, "specialized function");

    Ok((mangled, function))
}

/// The part of a mangled name telling apart the members of an overload set.
fn overload_signature(function: &Function) -> String {
    let returns = function
        .returns
        .as_ref()
        .map_or_else(|| "void".to_owned(), Type::mangled);

    format!(
        "{}_{}{returns}",
        function.parameters.len(),
        function
            .parameters
            .iter()
            .map(|parameter| format!("{}_", parameter.type_.mangled()))
            .collect::<String>()
    )
}

/// Specialize the generic class with the given fully-qualified name.
///
/// Returns the mangled name together with the specialized class.
pub fn specialize_class(
    context: &mut Context<'_>,
    qualified_name: &str,
    arguments: &[Type],
    call_site: Span,
) -> Result<(String, Rc<Class>)> {
    let Some(generic) = context.registry.class(qualified_name).cloned() else {
        return Err(Diag::error()
            .message(format!("cannot resolve class {}", qualified_name.quote()))
            .unlabeled_span(call_site));
    };

    if !generic.is_generic() {
        return Err(Diag::error()
            .message(format!("class {} is not generic", generic.name.quote()))
            .unlabeled_span(call_site));
    }

    check_arity(&generic.name, &generic.generic_types, arguments, call_site)?;

    let mangled = mangle(qualified_name, arguments);

    if let Some(specialized) = context.specializations.class(&mangled) {
        tracing::trace!(class = %mangled, "reused specialization");
        let class = specialized.entity.clone();
        context.use_specialization(&mangled);
        return Ok((mangled, class));
    }

    let substitutions = substitutions(&generic.generic_types, arguments);
    let mut class = (*generic).clone();
    let name = Atom::from(last_segment(&mangled));
    class.name.bare = name;
    class.node.name.bare = name;
    class.generic_types.clear();
    class
        .node
        .decorators
        .retain(|decorator| decorator.name.bare != Atom::GENERIC);

    for member in class.members.values_mut() {
        member.type_.substitute(&substitutions);
    }

    for function in class
        .methods
        .values_mut()
        .chain(class.static_functions.values_mut())
        .flatten()
    {
        substitute_function(Rc::make_mut(function), &substitutions);
    }

    let class = Rc::new(class);
    // registered before its member types are made concrete so that self-references terminate
    context
        .specializations
        .insert_class(mangled.clone(), class.clone(), call_site);
    context.use_specialization(&mangled);
    tracing::trace!(class = %mangled, "specialized class");

    Ok((mangled, class))
}

/// Replace every instantiation of a generic class occurring in the type by its specialization.
pub fn concretize(context: &mut Context<'_>, type_: &Type, span: Span) -> Result<Type> {
    Ok(match type_ {
        Type::Generic(name, arguments) => {
            let arguments = arguments
                .iter()
                .map(|argument| concretize(context, argument, span))
                .collect::<Result<Vec<_>>>()?;
            let (mangled, _) = specialize_class(context, name, &arguments, span)?;
            Type::Named(mangled)
        }
        Type::List(element) => Type::list(concretize(context, element, span)?),
        Type::Set(element) => Type::set(concretize(context, element, span)?),
        Type::Optional(element) => Type::optional(concretize(context, element, span)?),
        Type::Weak(element) => Type::Weak(Box::new(concretize(context, element, span)?)),
        Type::Dict(key, value) => Type::dict(
            concretize(context, key, span)?,
            concretize(context, value, span)?,
        ),
        Type::Tuple(elements) => Type::Tuple(
            elements
                .iter()
                .map(|element| concretize(context, element, span))
                .collect::<Result<_>>()?,
        ),
        type_ => type_.clone(),
    })
}

fn check_arity(
    name: &Identifier,
    parameters: &[Identifier],
    arguments: &[Type],
    call_site: Span,
) -> Result {
    if parameters.is_empty() {
        return Err(Diag::error()
            .message(format!("{} is not generic", name.quote()))
            .unlabeled_span(call_site));
    }

    if parameters.len() != arguments.len() {
        return Err(Diag::error()
            .message(format!(
                "expected {} type {} but got {}",
                parameters.len(),
                pluralize!(parameters.len(), "argument"),
                arguments.len()
            ))
            .unlabeled_span(call_site)
            .note(format!(
                "{} is declared with the generic {} {}",
                name.quote(),
                pluralize!(parameters.len(), "parameter"),
                parameters.iter().map(|parameter| parameter.bare).join_with(", ")
            )));
    }

    Ok(())
}

fn substitutions(parameters: &[Identifier], arguments: &[Type]) -> Vec<(Atom, Type)> {
    parameters
        .iter()
        .map(|parameter| parameter.bare)
        .zip(arguments.iter().cloned())
        .collect()
}

/// Substitute the type arguments in the signature and in the syntax tree of a function.
fn substitute_function(function: &mut Function, substitutions: &[(Atom, Type)]) {
    for type_ in function.types_mut() {
        type_.substitute(substitutions);
    }

    let expressions: HashMap<Atom, Expression> = substitutions
        .iter()
        .map(|(parameter, type_)| (*parameter, type_.to_expression()))
        .collect();

    let node = &mut function.node;
    node.name.bare = function.name.bare;
    node.decorators
        .retain(|decorator| decorator.name.bare != Atom::GENERIC);

    for parameter in &mut node.parameters {
        if let Some(annotation) = &mut parameter.annotation {
            ast::substitute(annotation, &expressions);
        }
        if let Some(default) = &mut parameter.default {
            ast::substitute(default, &expressions);
        }
    }
    if let Some(returns) = &mut node.returns {
        ast::substitute(returns, &expressions);
    }
    ast::substitute_in_body(&mut node.body, &expressions);
}
