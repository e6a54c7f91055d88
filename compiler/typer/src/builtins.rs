//! The signatures of the functions and methods provided by the runtime.

use hir::{Primitive, Type};

/// A free function provided by the runtime.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Abs,
    Min,
    Max,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "print" => Self::Print,
            "len" => Self::Len,
            "str" => Self::Str,
            "abs" => Self::Abs,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Str => "str",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// The iteration adaptors only allowed as the iterable of a `for` loop or a comprehension.
pub const ADAPTORS: &[&str] = &["range", "enumerate", "zip", "slice", "reversed"];

/// The signature of a method of a built-in type.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    pub parameters: Vec<Type>,
    /// The number of leading parameters that have to be passed.
    pub required: usize,
    pub returns: Type,
}

impl MethodSignature {
    fn new(parameters: Vec<Type>, returns: Type) -> Self {
        Self {
            required: parameters.len(),
            parameters,
            returns,
        }
    }

    fn optional(mut self, optional: usize) -> Self {
        self.required -= optional;
        self
    }
}

/// The signature of a method of a built-in type, `None` if there is no such method.
pub fn method(receiver: &Type, name: &str) -> Option<MethodSignature> {
    use MethodSignature as Signature;

    let string = || Type::String;
    let none = || Type::None;

    Some(match receiver {
        Type::String => match name {
            "length" => Signature::new(vec![], Type::I64),
            "upper" | "lower" | "strip" | "capitalize" | "casefold" => {
                Signature::new(vec![], string())
            }
            "starts_with" | "ends_with" => Signature::new(vec![string()], Type::BOOL),
            "is_digit" | "is_numeric" | "is_alpha" | "is_space" | "is_upper" | "is_lower" => {
                Signature::new(vec![], Type::BOOL)
            }
            "find" | "count" => Signature::new(vec![string()], Type::I64),
            "split" => Signature::new(vec![string()], Type::list(string())),
            "join" => Signature::new(vec![Type::list(string())], string()),
            "replace" => Signature::new(vec![string(), string()], string()),
            "to_utf8" => Signature::new(vec![], Type::Bytes),
            _ => return None,
        },
        Type::Bytes => match name {
            "length" => Signature::new(vec![], Type::I64),
            "to_hex" => Signature::new(vec![], string()),
            "find" => Signature::new(vec![Type::Bytes], Type::I64),
            _ => return None,
        },
        Type::List(element) => {
            let element = || (**element).clone();
            match name {
                "length" => Signature::new(vec![], Type::I64),
                "append" | "remove" => Signature::new(vec![element()], none()),
                "extend" => Signature::new(vec![receiver.clone()], none()),
                "insert" => Signature::new(vec![Type::I64, element()], none()),
                "pop" => Signature::new(vec![Type::I64], element()).optional(1),
                "clear" | "sort" | "reverse" => Signature::new(vec![], none()),
                "count" | "find" => Signature::new(vec![element()], Type::I64),
                "copy" => Signature::new(vec![], receiver.clone()),
                _ => return None,
            }
        }
        Type::Dict(key, value) => {
            let key = || (**key).clone();
            let value = || (**value).clone();
            match name {
                "length" => Signature::new(vec![], Type::I64),
                "get" | "pop" => Signature::new(vec![key(), value()], value()),
                "keys" => Signature::new(vec![], Type::list(key())),
                "values" => Signature::new(vec![], Type::list(value())),
                "items" => Signature::new(vec![], Type::list(Type::Tuple(vec![key(), value()]))),
                "clear" => Signature::new(vec![], none()),
                "copy" => Signature::new(vec![], receiver.clone()),
                _ => return None,
            }
        }
        Type::Set(element) => {
            let element = || (**element).clone();
            match name {
                "length" => Signature::new(vec![], Type::I64),
                "add" | "remove" | "discard" => Signature::new(vec![element()], none()),
                "clear" => Signature::new(vec![], none()),
                "union" | "intersection" | "difference" => {
                    Signature::new(vec![receiver.clone()], receiver.clone())
                }
                "copy" => Signature::new(vec![], receiver.clone()),
                _ => return None,
            }
        }
        Type::Regex => match name {
            "match" => Signature::new(vec![string()], Type::optional(Type::RegexMatch)),
            "replace" => Signature::new(vec![string(), string()], string()),
            _ => return None,
        },
        Type::RegexMatch => match name {
            "group" => Signature::new(vec![Type::I64], string()),
            "start" | "end" => Signature::new(vec![Type::I64], Type::I64).optional(1),
            _ => return None,
        },
        Type::Primitive(Primitive::Char) => match name {
            "is_digit" | "is_alpha" | "is_space" | "is_upper" | "is_lower" => {
                Signature::new(vec![], Type::BOOL)
            }
            "upper" | "lower" => Signature::new(vec![], Type::CHAR),
            _ => return None,
        },
        _ => return None,
    })
}

/// The type of the target of a conversion function like `i64(x)` or `bool(x)`.
pub fn conversion(name: &str) -> Option<Type> {
    Primitive::from_name(name).map(Type::Primitive)
}
