//! The type inference engine.
//!
//! [`value_type`] computes the type of an expression without committing to any code. Number
//! literals are typed as the [candidates](Type::Candidates) they could stand for, which are
//! narrowed by the context consuming them through [`intersection_of`] or committed to their
//! preferred type by [`default_type`].
//!
//! Calls are resolved to a [`Callee`] by [`resolve_call`] which performs overload resolution and
//! triggers the specialization of generic functions and classes as a side effect.

use ast::{BareExpression, Constant, Expression, UnaryOperator};
use diagnostics::{Diag, Result};
use hir::{is_builtin_type, Class, Enum, Function, Primitive, Trait, Type};
use session::{Binding, Context};
use span::Span;
use std::rc::Rc;
use utility::{Atom, Int, QuoteExt};

pub use builtins::{Builtin, MethodSignature};
pub use call::{arrange_arguments, resolve_call, resolve_overload, Argument, Callee};
pub use intersection::{default_type, intersect, intersection_of};

pub mod builtins;
mod call;
mod intersection;
#[cfg(test)]
mod test;

/// What a name or a dotted path refers to.
#[derive(Clone, Debug)]
pub enum Entity {
    Local(Type),
    Variable { qualified: String, type_: Type },
    Functions { qualified: String, overloads: Vec<Rc<Function>> },
    Class(Rc<Class>),
    Trait(Rc<Trait>),
    Enum(Rc<Enum>),
    /// A class or trait provided by the runtime like `ValueError`.
    BuiltinClass(Atom),
}

impl Entity {
    fn description(&self) -> &'static str {
        match self {
            Self::Local(_) | Self::Variable { .. } => "variable",
            Self::Functions { .. } => "function",
            Self::Class(_) | Self::BuiltinClass(_) => "class",
            Self::Trait(_) => "trait",
            Self::Enum(_) => "enum",
        }
    }
}

/// Look up what a name or a fully-qualified dotted path refers to.
///
/// Attribute accesses on values yield `None`.
pub fn resolve_entity(context: &Context<'_>, expression: &Expression) -> Option<Entity> {
    match &expression.bare {
        BareExpression::Name(name) => match context.lookup(*name) {
            Some(binding) => entity_of_binding(context, binding),
            None if is_builtin_type(name.to_str()) => Some(Entity::BuiltinClass(*name)),
            None => None,
        },
        BareExpression::Attribute(_) => {
            let path = expression.dotted_name()?;
            let root = path.split('.').next()?;
            if context.lookup(Atom::from(root)).is_some() {
                return None;
            }

            if let Some(class) = context.class(&path) {
                return Some(Entity::Class(class));
            }

            let binding = match context.registry.kind(&path)? {
                hir::Kind::Variable => Binding::Variable(path),
                hir::Kind::Function => Binding::Functions(path),
                hir::Kind::Class => Binding::Class(path),
                hir::Kind::Trait => Binding::Trait(path),
                hir::Kind::Enum => Binding::Enum(path),
                hir::Kind::Import => return None,
            };
            entity_of_binding(context, binding)
        }
        _ => None,
    }
}

fn entity_of_binding(context: &Context<'_>, binding: Binding) -> Option<Entity> {
    let registry = context.registry;

    Some(match binding {
        Binding::Local(type_) => Entity::Local(type_),
        Binding::Variable(qualified) => Entity::Variable {
            type_: registry.variable(&qualified)?.type_.clone(),
            qualified,
        },
        Binding::Functions(qualified) => Entity::Functions {
            overloads: registry.functions(&qualified)?.to_vec(),
            qualified,
        },
        Binding::Class(qualified) => Entity::Class(context.class(&qualified)?),
        Binding::Trait(qualified) => Entity::Trait(registry.trait_(&qualified)?.clone()),
        Binding::Enum(qualified) => Entity::Enum(registry.enum_(&qualified)?.clone()),
    })
}

/// The type of the given expression.
///
/// Number literals are typed as candidates. Empty container displays have no type on their own
/// and are rejected here. They are typed by the context they are converted in instead.
pub fn value_type(context: &mut Context<'_>, expression: &Expression) -> Result<Type> {
    let span = expression.span;

    Ok(match &expression.bare {
        BareExpression::Name(name) => match resolve_entity(context, expression) {
            Some(entity) => entity_value_type(context, entity, expression)?,
            None => {
                return Err(Diag::error()
                    .message(format!("cannot resolve variable {}", name.quote()))
                    .unlabeled_span(expression))
            }
        },
        BareExpression::Constant(constant) => constant_type(constant),
        BareExpression::Attribute(attribute) => {
            if let Some(entity) = resolve_entity(context, expression) {
                return entity_value_type(context, entity, expression);
            }

            match resolve_entity(context, &attribute.value) {
                Some(Entity::Enum(enum_)) => {
                    if enum_.member(attribute.name.bare).is_none() {
                        return Err(Diag::error()
                            .message(format!(
                                "enum {} has no member {}",
                                enum_.name.quote(),
                                attribute.name.quote()
                            ))
                            .unlabeled_span(attribute.name));
                    }
                    Type::Named(enum_.qualified_name())
                }
                Some(Entity::Class(class)) => {
                    return Err(Diag::error()
                        .message(format!(
                            "class {} has no static member {}",
                            class.name.quote(),
                            attribute.name.quote()
                        ))
                        .unlabeled_span(attribute.name))
                }
                _ => {
                    let receiver = value_type(context, &attribute.value)?;
                    member_type(context, &receiver, attribute.name)?
                }
            }
        }
        BareExpression::Call(call) => {
            let callee = resolve_call(context, call, span)?;
            callee.returns(context, call, span)?
        }
        BareExpression::Subscript(subscript) => {
            let container = value_type(context, &subscript.value)?;
            subscript_type(&container, &subscript.index)?
        }
        BareExpression::Slice(_) => {
            return Err(Diag::error()
                .message("slices are only allowed in subscripts")
                .unlabeled_span(expression))
        }
        BareExpression::Binary(binary) => {
            let left = value_type(context, &binary.left)?;
            let right = value_type(context, &binary.right)?;
            binary_type(context, &left, binary, &right, span)?
        }
        BareExpression::Unary(unary) => match unary.operator {
            UnaryOperator::Not => Type::BOOL,
            UnaryOperator::Minus | UnaryOperator::Plus => {
                let operand = value_type(context, &unary.operand)?;
                check_operator(&operand, "-", span)?;
                operand
            }
            UnaryOperator::Invert => {
                let operand = value_type(context, &unary.operand)?;
                check_operator(&operand, "~", span)?;
                operand
            }
        },
        BareExpression::Boolean(_) | BareExpression::Compare(_) => Type::BOOL,
        BareExpression::Conditional(conditional) => {
            let body = value_type(context, &conditional.body)?;
            let orelse = value_type(context, &conditional.orelse)?;
            intersect(&body, &orelse, span)?
        }
        BareExpression::List(elements) => {
            Type::list(elements_type(context, elements, "list", span)?)
        }
        BareExpression::Set(elements) => Type::set(elements_type(context, elements, "set", span)?),
        BareExpression::Tuple(elements) => Type::Tuple(
            elements
                .iter()
                .map(|element| value_type(context, element))
                .collect::<Result<_>>()?,
        ),
        BareExpression::Dict(items) => {
            let keys: Vec<_> = items.iter().map(|(key, _)| key.clone()).collect();
            let values: Vec<_> = items.iter().map(|(_, value)| value.clone()).collect();
            Type::dict(
                elements_type(context, &keys, "dict", span)?,
                elements_type(context, &values, "dict", span)?,
            )
        }
        BareExpression::ListComprehension(comprehension) => {
            let element = context.scoped(|context| {
                bind_generator(context, &comprehension.generator)?;
                value_type(context, &comprehension.element)
            })?;
            Type::list(default_type(&element))
        }
        BareExpression::SetComprehension(comprehension) => {
            let element = context.scoped(|context| {
                bind_generator(context, &comprehension.generator)?;
                value_type(context, &comprehension.element)
            })?;
            Type::set(default_type(&element))
        }
        BareExpression::DictComprehension(comprehension) => {
            let (key, value) = context.scoped(|context| {
                bind_generator(context, &comprehension.generator)?;
                Ok::<_, Diag>((
                    value_type(context, &comprehension.key)?,
                    value_type(context, &comprehension.value)?,
                ))
            })?;
            Type::dict(default_type(&key), default_type(&value))
        }
    })
}

fn entity_value_type(context: &mut Context<'_>, entity: Entity, expression: &Expression) -> Result<Type> {
    match entity {
        Entity::Local(type_) => Ok(type_),
        Entity::Variable { type_, .. } => specializer::concretize(context, &type_, expression.span),
        entity => Err(Diag::error()
            .message(format!(
                "{} {} cannot be used as a value",
                entity.description(),
                expression.quote()
            ))
            .unlabeled_span(expression)),
    }
}

fn constant_type(constant: &Constant) -> Type {
    match constant {
        Constant::Integer(_) => Type::integer_candidates(),
        Constant::Float(_) => Type::float_candidates(),
        Constant::String(_) => Type::String,
        Constant::Char(_) => Type::CHAR,
        Constant::Bytes(_) => Type::Bytes,
        Constant::Bool(_) => Type::BOOL,
        Constant::None => Type::None,
    }
}

fn elements_type(
    context: &mut Context<'_>,
    elements: &[Expression],
    container: &str,
    span: Span,
) -> Result<Type> {
    let Some((first, rest)) = elements.split_first() else {
        return Err(Diag::error()
            .message(format!("cannot infer the type of an empty {container}"))
            .unlabeled_span(span));
    };

    let mut type_ = value_type(context, first)?;
    for element in rest {
        let element_type = value_type(context, element)?;
        type_ = intersect(&type_, &element_type, element.span)?;
    }
    Ok(type_)
}

/// The type of the member of a value of the given type.
pub fn member_type(context: &mut Context<'_>, receiver: &Type, member: hir::Identifier) -> Result<Type> {
    let receiver = unwrap_reference(receiver);

    if let Type::Named(name) = receiver {
        if let Some(class) = context.class(name) {
            let Some(found) = class.members.get(member.bare) else {
                let message = if class.methods.contains(member.bare) {
                    format!("method {} cannot be used as a value", member.quote())
                } else {
                    format!("class {} has no member {}", class.name.quote(), member.quote())
                };
                return Err(Diag::error().message(message).unlabeled_span(member));
            };

            check_private(context, &class, member)?;
            return specializer::concretize(context, &found.type_, member.span);
        }
    }

    Err(Diag::error()
        .message(format!(
            "{} has no member {}",
            receiver.quote(),
            member.quote()
        ))
        .unlabeled_span(member))
}

/// Reject accesses to private members and methods from outside of the class.
pub fn check_private(context: &Context<'_>, class: &Class, member: hir::Identifier) -> Result {
    let inside = context
        .class
        .as_ref()
        .is_some_and(|current| current.qualified_name() == class.qualified_name());

    if member.bare.to_str().starts_with('_') && !inside && !member.bare.to_str().starts_with("__") {
        return Err(Diag::error()
            .message(format!(
                "{} of class {} is private",
                member.quote(),
                class.name.quote()
            ))
            .unlabeled_span(member));
    }

    Ok(())
}

/// Look through optional and weak references.
pub fn unwrap_reference(type_: &Type) -> &Type {
    match type_ {
        Type::Optional(inner) | Type::Weak(inner) => unwrap_reference(inner),
        type_ => type_,
    }
}

fn subscript_type(container: &Type, index: &Expression) -> Result<Type> {
    let is_slice = matches!(index.bare, BareExpression::Slice(_));

    Ok(match container {
        Type::List(element) => {
            if is_slice {
                container.clone()
            } else {
                (**element).clone()
            }
        }
        Type::Dict(_, value) if !is_slice => (**value).clone(),
        Type::String => {
            if is_slice {
                Type::String
            } else {
                Type::CHAR
            }
        }
        Type::Bytes => {
            if is_slice {
                Type::Bytes
            } else {
                Type::U8
            }
        }
        Type::Tuple(elements) => {
            let position = tuple_index(index, elements.len())?;
            elements[position].clone()
        }
        _ => {
            return Err(Diag::error()
                .message(format!("{} cannot be subscripted", container.quote()))
                .unlabeled_span(index))
        }
    })
}

/// The position a tuple is indexed at, which has to be given as an integer literal.
pub fn tuple_index(index: &Expression, length: usize) -> Result<usize> {
    let Some(value) = integer_literal(index) else {
        return Err(Diag::error()
            .message("tuple index must be an integer literal")
            .unlabeled_span(index));
    };

    let position = if value.sign() == utility::Sign::Minus {
        value + Int::from(length)
    } else {
        value
    };

    match usize::try_from(&position) {
        Ok(position) if position < length => Ok(position),
        _ => Err(Diag::error()
            .message(format!("tuple index {} is out of range", index.quote()))
            .unlabeled_span(index)),
    }
}

/// The value of an integer literal, possibly negated.
pub fn integer_literal(expression: &Expression) -> Option<Int> {
    match &expression.bare {
        BareExpression::Constant(Constant::Integer(value)) => Some(value.clone()),
        BareExpression::Unary(unary) if unary.operator == UnaryOperator::Minus => {
            integer_literal(&unary.operand).map(|value| -value)
        }
        BareExpression::Unary(unary) if unary.operator == UnaryOperator::Plus => {
            integer_literal(&unary.operand)
        }
        _ => None,
    }
}

/// Check that an integer literal is representable by the given integer type.
pub fn check_integer_range(value: &Int, primitive: Primitive, span: Span) -> Result {
    let Some((minimum, maximum)) = primitive.integer_range() else {
        return Err(Diag::error()
            .message(format!("integer literal cannot be converted to {}", primitive.quote()))
            .unlabeled_span(span));
    };

    if *value < minimum || *value > maximum {
        return Err(Diag::error()
            .message(format!("integer literal out of range for {}", primitive.quote()))
            .unlabeled_span(span)
            .note(format!(
                "the range of {} is {minimum} to {maximum}",
                primitive.quote()
            )));
    }

    Ok(())
}

fn binary_type(
    context: &mut Context<'_>,
    left: &Type,
    binary: &ast::Binary,
    right: &Type,
    span: Span,
) -> Result<Type> {
    use ast::BinaryOperator::*;

    let operator = binary.operator;

    if let Type::Named(name) = left {
        let Some(class) = context.class(name) else {
            return Err(Diag::error()
                .message(format!(
                    "operator {} is not supported by type {}",
                    operator.symbol().quote(),
                    left.quote()
                ))
                .unlabeled_span(span));
        };
        let function = operator_method(context, &class, binary, span)?;
        let returns = function.returns.clone().unwrap_or(Type::None);
        return specializer::concretize(context, &returns, span);
    }

    match (left, operator, right) {
        (Type::String | Type::List(_), Multiply, count) if is_integral(count) => {
            return Ok(left.clone());
        }
        (_, LeftShift | RightShift, _) => {
            check_operator(left, operator.symbol(), span)?;
            check_operator(right, operator.symbol(), span)?;
            return Ok(left.clone());
        }
        _ => {}
    }

    let type_ = intersect(left, right, span)?;
    check_operator(&type_, operator.symbol(), span)?;
    Ok(type_)
}

/// The method of the class implementing the binary operator, chosen among its overloads by the
/// right operand.
pub fn operator_method(
    context: &mut Context<'_>,
    class: &Class,
    binary: &ast::Binary,
    span: Span,
) -> Result<Rc<Function>> {
    let method = Atom::from(binary.operator.method_name());
    let Some(overloads) = class.method(method) else {
        return Err(Diag::error()
            .message(format!(
                "class {} does not implement {}",
                class.name.quote(),
                method.quote()
            ))
            .unlabeled_span(span));
    };

    let call = ast::Call {
        function: binary.left.clone(),
        arguments: vec![binary.right.clone()],
        keywords: Vec::new(),
    };
    resolve_overload(context, method, overloads, &call, span)
}

/// Check that the operator can be applied to values of the type.
fn check_operator(type_: &Type, symbol: &str, span: Span) -> Result {
    let is_numeric = |type_: &Type| type_.is_number() || type_.is_candidates();

    let supported = match symbol {
        "+" => is_numeric(type_) || matches!(type_, Type::String | Type::Bytes | Type::List(_)),
        "-" | "*" | "/" | "//" | "%" | "**" => is_numeric(type_),
        "&" | "|" | "^" => is_integral(type_) || matches!(type_, Type::Set(_)) || *type_ == Type::BOOL,
        "<<" | ">>" | "~" => is_integral(type_),
        _ => false,
    };

    if supported {
        Ok(())
    } else {
        Err(Diag::error()
            .message(format!(
                "operator {} is not supported by type {}",
                symbol.quote(),
                default_type(type_).quote()
            ))
            .unlabeled_span(span))
    }
}

/// Whether the type is an integer type or the candidates of an integer literal.
fn is_integral(type_: &Type) -> bool {
    match type_ {
        Type::Candidates(candidates) => candidates.iter().all(Type::is_integer),
        type_ => type_.is_integer(),
    }
}

/// Bind the target of a comprehension in the current scope.
pub fn bind_generator(context: &mut Context<'_>, generator: &ast::Generator) -> Result {
    let element = iteration_type(context, &generator.iterable)?;
    bind_target(context, &generator.target, default_type(&element))
}

/// Define the variables of a loop target, unpacking tuples.
pub fn bind_target(context: &mut Context<'_>, target: &Expression, type_: Type) -> Result {
    match (&target.bare, type_) {
        (BareExpression::Name(name), type_) => {
            context.define_local(*name, type_);
            Ok(())
        }
        (BareExpression::Tuple(targets), Type::Tuple(types)) if targets.len() == types.len() => {
            for (target, type_) in targets.iter().zip(types) {
                bind_target(context, target, type_)?;
            }
            Ok(())
        }
        (BareExpression::Tuple(targets), type_) => Err(Diag::error()
            .message(format!(
                "cannot unpack {} into {} variables",
                type_.quote(),
                targets.len()
            ))
            .unlabeled_span(target)),
        _ => Err(Diag::error()
            .message(format!("invalid loop target {}", target.quote()))
            .unlabeled_span(target)),
    }
}

/// The name of the iteration adaptor the expression calls, if any.
pub fn adaptor<'e>(context: &Context<'_>, expression: &'e Expression) -> Option<(Atom, &'e ast::Call)> {
    let BareExpression::Call(call) = &expression.bare else {
        return None;
    };
    let name = call.function.as_name()?;

    (builtins::ADAPTORS.contains(&name.to_str()) && context.lookup(name).is_none())
        .then_some((name, &**call))
}

/// The type of the elements produced by iterating over the expression.
pub fn iteration_type(context: &mut Context<'_>, iterable: &Expression) -> Result<Type> {
    if let Some((name, call)) = adaptor(context, iterable) {
        let arguments = &call.arguments;
        let arity_error = |expected: &str| {
            Diag::error()
                .message(format!("{} takes {expected}", name.quote()))
                .unlabeled_span(iterable)
        };

        return match name.to_str() {
            "range" => {
                if !(1..=3).contains(&arguments.len()) {
                    return Err(arity_error("one to three arguments"));
                }
                let mut type_ = Type::integer_candidates();
                for argument in arguments {
                    let argument_type = value_type(context, argument)?;
                    type_ = intersect(&type_, &argument_type, argument.span)?;
                }
                Ok(default_type(&type_))
            }
            "enumerate" => {
                let [inner, rest @ ..] = arguments.as_slice() else {
                    return Err(arity_error("one or two arguments"));
                };
                if rest.len() > 1 {
                    return Err(arity_error("one or two arguments"));
                }
                Ok(Type::Tuple(vec![Type::I64, iteration_type(context, inner)?]))
            }
            "zip" => {
                if arguments.len() < 2 {
                    return Err(arity_error("at least two arguments"));
                }
                Ok(Type::Tuple(
                    arguments
                        .iter()
                        .map(|argument| iteration_type(context, argument))
                        .collect::<Result<_>>()?,
                ))
            }
            "slice" => {
                let [inner, bounds @ ..] = arguments.as_slice() else {
                    return Err(arity_error("two to four arguments"));
                };
                if !(1..=3).contains(&bounds.len()) {
                    return Err(arity_error("two to four arguments"));
                }
                iteration_type(context, inner)
            }
            _ => {
                let [inner] = arguments.as_slice() else {
                    return Err(arity_error("exactly one argument"));
                };
                iteration_type(context, inner)
            }
        };
    }

    let type_ = value_type(context, iterable)?;
    element_type(context, &type_, iterable.span)
}

/// The type of the elements of a value of the given iterable type.
pub fn element_type(context: &mut Context<'_>, type_: &Type, span: Span) -> Result<Type> {
    Ok(match type_ {
        Type::List(element) | Type::Set(element) => (**element).clone(),
        Type::Dict(key, value) => Type::Tuple(vec![(**key).clone(), (**value).clone()]),
        Type::String => Type::CHAR,
        Type::Bytes => Type::U8,
        Type::Named(name) => match iterator_item(context, name) {
            Some(item) => specializer::concretize(context, &item, span)?,
            None => return Err(not_iterable(type_, span)),
        },
        _ => return Err(not_iterable(type_, span)),
    })
}

/// The item type of a class with a `next()` method returning `optional[T]`.
pub fn iterator_item(context: &Context<'_>, class: &str) -> Option<Type> {
    let class = context.class(class)?;
    let next = class.method(Atom::NEXT)?.first()?;

    match &next.returns {
        Some(Type::Optional(item)) if next.parameters.is_empty() => Some((**item).clone()),
        _ => None,
    }
}

fn not_iterable(type_: &Type, span: Span) -> Diag {
    Diag::error()
        .message(format!("{} is not iterable", default_type(type_).quote()))
        .unlabeled_span(span)
}

/// Interpret a type annotation in the body of a function.
///
/// Short names are made fully-qualified and instantiations of generic classes are specialized.
pub fn resolve_annotation(context: &mut Context<'_>, annotation: &Expression) -> Result<Type> {
    let mut type_ = Type::from_annotation(annotation)?;
    let mut unresolved = None;

    type_.map_names(&mut |name| {
        if unresolved.is_some() || is_builtin_type(name) {
            return None;
        }

        if name.contains('.') {
            let known = context.class(name).is_some() || context.registry.kind(name).is_some();
            if !known {
                unresolved = Some(name.to_owned());
            }
            return None;
        }

        match context.lookup(Atom::from(name)) {
            Some(Binding::Class(qualified) | Binding::Trait(qualified) | Binding::Enum(qualified)) => {
                Some(qualified)
            }
            _ => {
                unresolved = Some(name.to_owned());
                None
            }
        }
    });

    if let Some(name) = unresolved {
        return Err(Diag::error()
            .message(format!("cannot resolve type {}", name.quote()))
            .unlabeled_span(annotation));
    }

    specializer::concretize(context, &type_, annotation.span)
}

/// Whether a class is compatible with a trait it implements, or a value of the actual type can
/// otherwise be used where the expected type is required.
pub fn is_assignable(context: &Context<'_>, actual: &Type, expected: &Type) -> bool {
    if intersection_of(actual, expected).is_some() {
        return true;
    }

    match (actual, expected) {
        (Type::Named(class), Type::Named(trait_)) => {
            context.implements(class, trait_)
                || is_builtin_type(class) && trait_ == Atom::ERROR.to_str()
        }
        (actual, Type::Optional(inner)) => is_assignable(context, actual, inner),
        _ => false,
    }
}
