//! The textual representation of expressions as written in source code.

use super::*;
use joinery::JoinableIterator;
use std::fmt;

impl fmt::Display for BareExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Constant(constant) => write!(f, "{constant}"),
            Self::Attribute(attribute) => write!(f, "{}.{}", attribute.value, attribute.name),
            Self::Call(call) => {
                let keywords = call
                    .keywords
                    .iter()
                    .map(|keyword| format!("{}={}", keyword.name, keyword.value));
                let arguments = call.arguments.iter().map(ToString::to_string).chain(keywords);
                write!(f, "{}({})", call.function, arguments.join_with(", "))
            }
            Self::Subscript(subscript) => {
                write!(f, "{}[{}]", subscript.value, subscript.index)
            }
            Self::Slice(slice) => {
                if let Some(lower) = &slice.lower {
                    write!(f, "{lower}")?;
                }
                f.write_str(":")?;
                if let Some(upper) = &slice.upper {
                    write!(f, "{upper}")?;
                }
                if let Some(step) = &slice.step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
            Self::Binary(binary) => write!(
                f,
                "({} {} {})",
                binary.left,
                binary.operator.symbol(),
                binary.right
            ),
            Self::Unary(unary) => match unary.operator {
                UnaryOperator::Not => write!(f, "not {}", unary.operand),
                UnaryOperator::Minus => write!(f, "-{}", unary.operand),
                UnaryOperator::Plus => write!(f, "+{}", unary.operand),
                UnaryOperator::Invert => write!(f, "~{}", unary.operand),
            },
            Self::Boolean(boolean) => {
                let operator = match boolean.operator {
                    BooleanOperator::And => "and",
                    BooleanOperator::Or => "or",
                };
                write!(f, "({} {operator} {})", boolean.left, boolean.right)
            }
            Self::Compare(compare) => {
                write!(f, "{}", compare.left)?;
                for (operator, right) in &compare.comparisons {
                    write!(f, " {} {right}", operator.symbol())?;
                }
                Ok(())
            }
            Self::Conditional(conditional) => write!(
                f,
                "{} if {} else {}",
                conditional.body, conditional.condition, conditional.orelse
            ),
            Self::List(elements) => write!(f, "[{}]", elements.iter().join_with(", ")),
            Self::Tuple(elements) if elements.len() == 1 => write!(f, "({},)", elements[0]),
            Self::Tuple(elements) => write!(f, "({})", elements.iter().join_with(", ")),
            Self::Set(elements) => write!(f, "{{{}}}", elements.iter().join_with(", ")),
            Self::Dict(items) => write!(
                f,
                "{{{}}}",
                items
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .join_with(", ")
            ),
            Self::ListComprehension(comprehension) => {
                write!(f, "[{} {}]", comprehension.element, comprehension.generator)
            }
            Self::SetComprehension(comprehension) => {
                write!(f, "{{{} {}}}", comprehension.element, comprehension.generator)
            }
            Self::DictComprehension(comprehension) => write!(
                f,
                "{{{}: {} {}}}",
                comprehension.key, comprehension.value, comprehension.generator
            ),
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "for {} in {}", self.target, self.iterable)?;
        for condition in &self.conditions {
            write!(f, " if {condition}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Char(value) => write!(f, "{value:?}"),
            Self::Bytes(value) => {
                f.write_str("b\"")?;
                for byte in value {
                    write!(f, "{}", std::ascii::escape_default(*byte))?;
                }
                f.write_str("\"")
            }
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::None => f.write_str("None"),
        }
    }
}
