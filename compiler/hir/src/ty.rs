//! The semantic representation of types.

use ast::{BareExpression, Expression};
use diagnostics::{Diag, Result};
use joinery::JoinableIterator;
use span::Spanned;
use std::fmt;
use utility::{Atom, Int, QuoteExt};

/// A Mys type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    Primitive(Primitive),
    String,
    Bytes,
    Regex,
    RegexMatch,
    None,
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Tuple(Vec<Type>),
    Optional(Box<Type>),
    /// A non-owning reference to an object.
    Weak(Box<Type>),
    /// A not yet specialized instantiation of a generic class.
    Generic(String, Vec<Type>),
    /// The name of a class, trait or enum, fully-qualified after name resolution.
    Named(String),
    /// The possible types of a number literal not yet narrowed by its context.
    ///
    /// Ordered from the preferred to the least preferred candidate. Only produced during type
    /// inference, never written by the user.
    Candidates(Vec<Type>),
}

impl Type {
    pub const I64: Self = Self::Primitive(Primitive::I64);
    pub const F64: Self = Self::Primitive(Primitive::F64);
    pub const BOOL: Self = Self::Primitive(Primitive::Bool);
    pub const CHAR: Self = Self::Primitive(Primitive::Char);
    pub const U8: Self = Self::Primitive(Primitive::U8);

    pub fn list(element: Type) -> Self {
        Self::List(Box::new(element))
    }

    pub fn dict(key: Type, value: Type) -> Self {
        Self::Dict(Box::new(key), Box::new(value))
    }

    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn optional(type_: Type) -> Self {
        Self::Optional(Box::new(type_))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The candidates of an integer literal, the preferred `i64` first and then the remaining
    /// integer types from signed to unsigned and narrowest to widest.
    pub fn integer_candidates() -> Self {
        use Primitive::*;

        Self::Candidates(
            [I64, I8, I16, I32, U8, U16, U32, U64]
                .into_iter()
                .map(Self::Primitive)
                .collect(),
        )
    }

    pub fn float_candidates() -> Self {
        Self::Candidates(vec![Self::F64, Self::Primitive(Primitive::F32)])
    }

    pub fn primitive(&self) -> Option<Primitive> {
        utility::obtain!(*self, Self::Primitive(primitive) => primitive)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn is_integer(&self) -> bool {
        self.primitive().is_some_and(Primitive::is_integer)
    }

    pub fn is_float(&self) -> bool {
        self.primitive().is_some_and(Primitive::is_float)
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_candidates(&self) -> bool {
        matches!(self, Self::Candidates(_))
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }

    /// The name of this type as a component of a mangled name.
    ///
    /// Named types contribute their whole path so that classes of the same name declared in
    /// different modules do not collide.
    pub fn mangled(&self) -> String {
        match self {
            Self::Primitive(primitive) => primitive.name().to_owned(),
            Self::String => "string".to_owned(),
            Self::Bytes => "bytes".to_owned(),
            Self::Regex => "regex".to_owned(),
            Self::RegexMatch => "regexmatch".to_owned(),
            Self::None => "none".to_owned(),
            Self::List(element) => format!("list_{}", element.mangled()),
            Self::Dict(key, value) => format!("dict_{}_{}", key.mangled(), value.mangled()),
            Self::Set(element) => format!("set_{}", element.mangled()),
            Self::Tuple(elements) => format!(
                "tuple_{}",
                elements.iter().map(Self::mangled).join_with("_")
            ),
            Self::Optional(type_) => format!("optional_{}", type_.mangled()),
            Self::Weak(type_) => format!("weak_{}", type_.mangled()),
            Self::Generic(name, arguments) => format!(
                "{}_{}",
                name.replace('.', "_"),
                arguments.iter().map(Self::mangled).join_with("_")
            ),
            Self::Named(name) => name.replace('.', "_"),
            Self::Candidates(candidates) => candidates
                .first()
                .map(Self::mangled)
                .unwrap_or_default(),
        }
    }

    /// Interpret a type annotation.
    ///
    /// Names that are not built-in types are taken verbatim. They are made fully-qualified by
    /// the name resolver.
    pub fn from_annotation(annotation: &Expression) -> Result<Self> {
        Ok(match &annotation.bare {
            BareExpression::Name(name) => Self::from_name(*name),
            BareExpression::Attribute(_) => match annotation.dotted_name() {
                Some(name) => Self::Named(name),
                None => return Err(invalid_type(annotation)),
            },
            BareExpression::Constant(ast::Constant::None) => Self::None,
            BareExpression::List(elements) => match elements.as_slice() {
                [element] => Self::list(Self::from_annotation(element)?),
                _ => {
                    return Err(Diag::error()
                        .message("expected exactly one item type in list type")
                        .unlabeled_span(annotation))
                }
            },
            BareExpression::Dict(items) => match items.as_slice() {
                [(key, value)] => {
                    Self::dict(Self::from_annotation(key)?, Self::from_annotation(value)?)
                }
                _ => {
                    return Err(Diag::error()
                        .message("expected exactly one key-value pair in dict type")
                        .unlabeled_span(annotation))
                }
            },
            BareExpression::Set(elements) => match elements.as_slice() {
                [element] => Self::set(Self::from_annotation(element)?),
                _ => {
                    return Err(Diag::error()
                        .message("expected exactly one item type in set type")
                        .unlabeled_span(annotation))
                }
            },
            BareExpression::Tuple(elements) => Self::Tuple(
                elements
                    .iter()
                    .map(Self::from_annotation)
                    .collect::<Result<_>>()?,
            ),
            BareExpression::Subscript(subscript) => {
                let arguments = match &subscript.index.bare {
                    BareExpression::Tuple(elements) => elements
                        .iter()
                        .map(Self::from_annotation)
                        .collect::<Result<Vec<_>>>()?,
                    _ => vec![Self::from_annotation(&subscript.index)?],
                };

                let Some(name) = subscript.value.dotted_name() else {
                    return Err(invalid_type(annotation));
                };

                match (name.as_str(), <[_; 1]>::try_from(arguments)) {
                    ("optional", Ok([type_])) => Self::optional(type_),
                    ("weak", Ok([type_])) => Self::Weak(Box::new(type_)),
                    ("iterator", _) => {
                        return Err(Diag::error()
                            .message("'iterator' is only allowed as the return type of functions containing 'yield'")
                            .unlabeled_span(annotation))
                    }
                    ("optional" | "weak", Err(_)) => {
                        return Err(Diag::error()
                            .message(format!("{} takes exactly one type argument", name.quote()))
                            .unlabeled_span(annotation))
                    }
                    (_, Ok([type_])) => Self::Generic(name, vec![type_]),
                    (_, Err(arguments)) => Self::Generic(name, arguments),
                }
            }
            _ => return Err(invalid_type(annotation)),
        })
    }

    fn from_name(name: Atom) -> Self {
        match name.to_str() {
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "regex" => Self::Regex,
            "regexmatch" => Self::RegexMatch,
            name => match Primitive::from_name(name) {
                Some(primitive) => Self::Primitive(primitive),
                None => Self::Named(name.to_owned()),
            },
        }
    }

    /// The annotation denoting this type.
    pub fn to_expression(&self) -> Expression {
        fn name(name: &str) -> Expression {
            let mut segments = name.split('.');
            let first = segments.next().unwrap_or_default();
            segments.fold(
                Spanned::bare(BareExpression::name(first)),
                |value, segment| Spanned::bare(BareExpression::attribute(value, segment)),
            )
        }

        fn subscript(value: &str, arguments: &[Type]) -> Expression {
            let index = match arguments {
                [argument] => argument.to_expression(),
                arguments => Spanned::bare(BareExpression::Tuple(
                    arguments.iter().map(Type::to_expression).collect(),
                )),
            };
            Spanned::bare(BareExpression::Subscript(Box::new(ast::Subscript {
                value: name(value),
                index,
            })))
        }

        match self {
            Self::Primitive(primitive) => name(primitive.name()),
            Self::String => name("string"),
            Self::Bytes => name("bytes"),
            Self::Regex => name("regex"),
            Self::RegexMatch => name("regexmatch"),
            Self::None => Spanned::bare(BareExpression::Constant(ast::Constant::None)),
            Self::List(element) => Spanned::bare(BareExpression::List(vec![element.to_expression()])),
            Self::Dict(key, value) => Spanned::bare(BareExpression::Dict(vec![(
                key.to_expression(),
                value.to_expression(),
            )])),
            Self::Set(element) => Spanned::bare(BareExpression::Set(vec![element.to_expression()])),
            Self::Tuple(elements) => Spanned::bare(BareExpression::Tuple(
                elements.iter().map(Self::to_expression).collect(),
            )),
            Self::Optional(type_) => subscript("optional", std::slice::from_ref(type_)),
            Self::Weak(type_) => subscript("weak", std::slice::from_ref(type_)),
            Self::Generic(generic, arguments) => subscript(generic, arguments),
            Self::Named(named) => name(named),
            Self::Candidates(candidates) => candidates
                .first()
                .map_or_else(|| name("i64"), Self::to_expression),
        }
    }

    /// Rewrite every name in this type with the given function, recursively.
    pub fn map_names(&mut self, mapper: &mut impl FnMut(&str) -> Option<String>) {
        match self {
            Self::Primitive(_)
            | Self::String
            | Self::Bytes
            | Self::Regex
            | Self::RegexMatch
            | Self::None => {}
            Self::List(element) | Self::Set(element) | Self::Optional(element) | Self::Weak(element) => {
                element.map_names(mapper);
            }
            Self::Dict(key, value) => {
                key.map_names(mapper);
                value.map_names(mapper);
            }
            Self::Tuple(elements) | Self::Candidates(elements) => {
                for element in elements {
                    element.map_names(mapper);
                }
            }
            Self::Generic(name, arguments) => {
                if let Some(mapped) = mapper(name) {
                    *name = mapped;
                }
                for argument in arguments {
                    argument.map_names(mapper);
                }
            }
            Self::Named(name) => {
                if let Some(mapped) = mapper(name) {
                    *name = mapped;
                }
            }
        }
    }

    /// Replace generic parameters by concrete types.
    pub fn substitute(&mut self, substitutions: &[(Atom, Type)]) {
        match self {
            Self::Named(name) => {
                if let Some((_, type_)) = substitutions
                    .iter()
                    .find(|(parameter, _)| *parameter == name.as_str())
                {
                    *self = type_.clone();
                }
            }
            Self::Primitive(_)
            | Self::String
            | Self::Bytes
            | Self::Regex
            | Self::RegexMatch
            | Self::None => {}
            Self::List(element) | Self::Set(element) | Self::Optional(element) | Self::Weak(element) => {
                element.substitute(substitutions);
            }
            Self::Dict(key, value) => {
                key.substitute(substitutions);
                value.substitute(substitutions);
            }
            Self::Tuple(elements) | Self::Candidates(elements) | Self::Generic(_, elements) => {
                for element in elements {
                    element.substitute(substitutions);
                }
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.name()),
            Self::String => f.write_str("string"),
            Self::Bytes => f.write_str("bytes"),
            Self::Regex => f.write_str("regex"),
            Self::RegexMatch => f.write_str("regexmatch"),
            Self::None => f.write_str("None"),
            Self::List(element) => write!(f, "[{element}]"),
            Self::Dict(key, value) => write!(f, "{{{key}: {value}}}"),
            Self::Set(element) => write!(f, "{{{element}}}"),
            Self::Tuple(elements) if elements.len() == 1 => write!(f, "({},)", elements[0]),
            Self::Tuple(elements) => write!(f, "({})", elements.iter().join_with(", ")),
            Self::Optional(type_) => write!(f, "optional[{type_}]"),
            Self::Weak(type_) => write!(f, "weak[{type_}]"),
            Self::Generic(name, arguments) => {
                write!(f, "{name}[{}]", arguments.iter().join_with(", "))
            }
            Self::Named(name) => f.write_str(name),
            Self::Candidates(candidates) => write!(f, "{}", candidates.iter().join_with(" | ")),
        }
    }
}

fn invalid_type(annotation: &Expression) -> Diag {
    Diag::error()
        .message(format!("invalid type {}", annotation.quote()))
        .unlabeled_span(annotation)
}

/// The last segment of a dotted name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// The module part of a fully-qualified name.
pub fn module_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(module, _)| module)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Primitive {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
}

impl Primitive {
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Char => "char",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "bool" => Self::Bool,
            "char" => Self::Char,
            _ => return None,
        })
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// The inclusive range of values representable by an integer type.
    pub fn integer_range(self) -> Option<(Int, Int)> {
        Some(match self {
            Self::I8 => (i8::MIN.into(), i8::MAX.into()),
            Self::I16 => (i16::MIN.into(), i16::MAX.into()),
            Self::I32 => (i32::MIN.into(), i32::MAX.into()),
            Self::I64 => (i64::MIN.into(), i64::MAX.into()),
            Self::U8 => (0.into(), u8::MAX.into()),
            Self::U16 => (0.into(), u16::MAX.into()),
            Self::U32 => (0.into(), u32::MAX.into()),
            Self::U64 => (0.into(), u64::MAX.into()),
            _ => return None,
        })
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
