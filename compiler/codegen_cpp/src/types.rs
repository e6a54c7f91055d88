//! The representation of Mys types in C++.

use crate::Generator;
use hir::{Function, Parameter, Primitive, Type};

/// The C++ path of a fully-qualified name, e.g. `mys::pkg::lib::Foo` for `pkg.lib.Foo`.
///
/// The classes of the runtime are referred to by their short name, e.g. `mys::ValueError`.
pub(crate) fn cpp_path(qualified: &str) -> String {
    format!("mys::{}", qualified.replace('.', "::"))
}

/// The namespace of a module.
pub(crate) fn namespace(module: &str) -> String {
    cpp_path(module)
}

/// The path of the files of a module relative to the output directory, without extension.
pub fn include_path(module: &str) -> String {
    module.replace('.', "/")
}

/// The name of an entity of a module inside of the namespace of that module.
///
/// Methods are flattened into free functions, e.g. `Box_get_i64` for `lib.Box.get_i64`.
pub(crate) fn flat_name(module: &str, qualified: &str) -> String {
    qualified
        .strip_prefix(module)
        .and_then(|name| name.strip_prefix('.'))
        .unwrap_or(qualified)
        .replace('.', "_")
}

/// The name of the function returning the default value of a parameter.
pub(crate) fn default_accessor(owner: &str, function: &Function, parameter: &Parameter) -> String {
    let mut name = format!("{owner}__{}", parameter.name.bare);
    if function.is_overloaded() {
        name.push('_');
        name.push_str(&parameter.type_.mangled());
    }
    name.push_str("_default");
    name
}

pub(crate) const fn primitive_type(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "Bool",
        Primitive::Char => "Char",
        primitive => primitive.name(),
    }
}

impl Generator<'_, '_> {
    pub(crate) fn is_enum(&self, name: &str) -> bool {
        self.context.registry.enum_(name).is_some()
    }

    /// The C++ type of values of the given type.
    pub(crate) fn cpp_type(&self, type_: &Type) -> String {
        match type_ {
            Type::Primitive(primitive) => primitive_type(*primitive).to_owned(),
            Type::String => "String".to_owned(),
            Type::Bytes => "Bytes".to_owned(),
            Type::Regex => "Regex".to_owned(),
            Type::RegexMatch => "RegexMatch".to_owned(),
            Type::None => "void".to_owned(),
            Type::List(element) => format!("SharedList<{}>", self.cpp_type(element)),
            Type::Dict(key, value) => {
                format!("SharedDict<{}, {}>", self.cpp_type(key), self.cpp_type(value))
            }
            Type::Set(element) => format!("SharedSet<{}>", self.cpp_type(element)),
            Type::Tuple(elements) => format!("SharedTuple<{}>", self.cpp_types(elements)),
            Type::Optional(inner) => {
                if self.is_nullable(inner) {
                    self.cpp_type(inner)
                } else {
                    format!("mys::optional<{}>", self.cpp_type(inner))
                }
            }
            Type::Weak(inner) => match &**inner {
                Type::Named(name) => format!("mys::weak_ptr<{}>", cpp_path(name)),
                inner => self.cpp_type(inner),
            },
            Type::Named(name) if self.is_enum(name) => cpp_path(name),
            Type::Named(name) => format!("mys::shared_ptr<{}>", cpp_path(name)),
            Type::Generic(name, arguments) => {
                self.cpp_type(&Type::Named(specializer::mangle(name, arguments)))
            }
            Type::Candidates(_) => self.cpp_type(&typer::default_type(type_)),
        }
    }

    /// The C++ types of the element of a tuple, separated by commas.
    pub(crate) fn cpp_types(&self, types: &[Type]) -> String {
        types
            .iter()
            .map(|type_| self.cpp_type(type_))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The C++ type of the object a shared pointer of the type points to.
    pub(crate) fn object_type(&self, type_: &Type) -> String {
        match type_ {
            Type::List(element) => format!("List<{}>", self.cpp_type(element)),
            Type::Dict(key, value) => {
                format!("Dict<{}, {}>", self.cpp_type(key), self.cpp_type(value))
            }
            Type::Set(element) => format!("Set<{}>", self.cpp_type(element)),
            Type::Tuple(elements) => format!("Tuple<{}>", self.cpp_types(elements)),
            Type::Named(name) => cpp_path(name),
            type_ => self.cpp_type(type_),
        }
    }

    /// Whether values of the type are references that can be null and represent `None` that way.
    pub(crate) fn is_nullable(&self, type_: &Type) -> bool {
        match type_ {
            Type::String
            | Type::Bytes
            | Type::Regex
            | Type::RegexMatch
            | Type::List(_)
            | Type::Dict(..)
            | Type::Set(_)
            | Type::Tuple(_)
            | Type::Weak(_) => true,
            Type::Named(name) => !self.is_enum(name),
            _ => false,
        }
    }

    /// Whether members of values of the type are accessed with `->` rather than `.`.
    pub(crate) fn is_pointer(&self, type_: &Type) -> bool {
        match type_ {
            Type::Optional(inner) => self.is_nullable(inner) && self.is_pointer(inner),
            Type::List(_) | Type::Dict(..) | Type::Set(_) | Type::Tuple(_) | Type::Weak(_) => true,
            Type::Named(name) => !self.is_enum(name),
            _ => false,
        }
    }

    /// The value members of the type are initialized with if nothing else is given.
    pub(crate) fn zero_value(&self, type_: &Type) -> String {
        match type_ {
            Type::Primitive(Primitive::Bool) => "false".to_owned(),
            Type::Primitive(Primitive::Char) => "Char(0)".to_owned(),
            Type::Primitive(primitive) if primitive.is_float() => format!("{}(0.0)", primitive.name()),
            Type::Primitive(primitive) => format!("{}(0)", primitive.name()),
            Type::String => "String(\"\")".to_owned(),
            Type::Bytes => "Bytes()".to_owned(),
            Type::Named(name) => match self.context.registry.enum_(name) {
                Some(enum_) => match enum_.members.first() {
                    Some((member, _)) => format!("{}::{}", cpp_path(name), member.bare),
                    None => format!("static_cast<{}>(0)", cpp_path(name)),
                },
                None => "nullptr".to_owned(),
            },
            Type::Optional(inner) if !self.is_nullable(inner) => {
                format!("mys::optional<{}>()", self.cpp_type(inner))
            }
            Type::Candidates(_) => self.zero_value(&typer::default_type(type_)),
            _ => "nullptr".to_owned(),
        }
    }
}
