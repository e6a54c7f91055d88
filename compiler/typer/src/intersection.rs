//! The intersection of types and the defaulting of literal candidates.

use diagnostics::{Diag, Result};
use hir::Type;
use span::Span;
use utility::QuoteExt;

/// The most specific type both types can be converted to, if any.
///
/// * `None` is compatible with every type that is not a primitive
/// * structured types intersect element-wise, tuples only if their arities agree
/// * the candidates of a literal narrow to a concrete type they contain
pub fn intersection_of(left: &Type, right: &Type) -> Option<Type> {
    use Type::*;

    if left == right {
        return Some(left.clone());
    }

    match (left, right) {
        (None, other) | (other, None) if !other.is_primitive() && !other.is_candidates() => {
            Some(other.clone())
        }
        (Optional(left), Optional(right)) => intersection_of(left, right).map(Type::optional),
        (Optional(inner), other) | (other, Optional(inner)) => {
            intersection_of(inner, other).map(Type::optional)
        }
        (Candidates(left), Candidates(right)) => {
            let common: Vec<_> = left
                .iter()
                .filter(|candidate| right.contains(candidate))
                .cloned()
                .collect();
            match common.len() {
                0 => Option::None,
                1 => common.into_iter().next(),
                _ => Some(Candidates(common)),
            }
        }
        (Candidates(candidates), concrete) | (concrete, Candidates(candidates)) => {
            candidates.contains(concrete).then(|| concrete.clone())
        }
        (List(left), List(right)) => intersection_of(left, right).map(Type::list),
        (Set(left), Set(right)) => intersection_of(left, right).map(Type::set),
        (Dict(left_key, left_value), Dict(right_key, right_value)) => Some(Type::dict(
            intersection_of(left_key, right_key)?,
            intersection_of(left_value, right_value)?,
        )),
        (Tuple(left), Tuple(right)) if left.len() == right.len() => Some(Tuple(
            left.iter()
                .zip(right)
                .map(|(left, right)| intersection_of(left, right))
                .collect::<Option<_>>()?,
        )),
        _ => Option::None,
    }
}

/// Like [`intersection_of`] but fails with an error if the types have nothing in common.
pub fn intersect(left: &Type, right: &Type, span: Span) -> Result<Type> {
    intersection_of(left, right).ok_or_else(|| {
        Diag::error()
            .message(format!(
                "types {} and {} differ",
                default_type(left).quote(),
                default_type(right).quote()
            ))
            .unlabeled_span(span)
    })
}

/// Commit the candidates of literals not narrowed by their context to their preferred type.
///
/// Integer literals default to `i64`, float literals to `f64`.
pub fn default_type(type_: &Type) -> Type {
    match type_ {
        Type::Candidates(candidates) => {
            if candidates.contains(&Type::I64) {
                Type::I64
            } else if candidates.contains(&Type::F64) {
                Type::F64
            } else {
                candidates.first().cloned().unwrap_or(Type::I64)
            }
        }
        Type::List(element) => Type::list(default_type(element)),
        Type::Set(element) => Type::set(default_type(element)),
        Type::Optional(element) => Type::optional(default_type(element)),
        Type::Dict(key, value) => Type::dict(default_type(key), default_type(value)),
        Type::Tuple(elements) => Type::Tuple(elements.iter().map(default_type).collect()),
        type_ => type_.clone(),
    }
}
