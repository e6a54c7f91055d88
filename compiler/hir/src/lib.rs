//! The semantic data model.
//!
//! The [definitions](Definitions) of a module are built once by the definitions collector. The
//! name resolver then rewrites every [`Type`] they contain to its fully-qualified form in place.
//! Entities are reference-counted so that the registry of a compilation session and the cache of
//! specializations can share them without copying.

use span::{Span, Spanned};
use std::{fmt, rc::Rc};
use utility::{Atom, Int};

pub use table::Table;
pub use ty::{last_segment, module_of, Primitive, Type};

mod table;
#[cfg(test)]
mod test;
mod ty;

pub type Identifier = ast::Identifier;

/// The symbol table of a module.
#[derive(Clone, Debug, Default)]
pub struct Definitions {
    /// The dotted name of the module.
    pub module: String,
    pub imports: Table<Import>,
    pub variables: Table<Variable>,
    pub classes: Table<Rc<Class>>,
    pub traits: Table<Rc<Trait>>,
    pub enums: Table<Rc<Enum>>,
    /// Overload sets of free functions.
    pub functions: Table<Vec<Rc<Function>>>,
}

impl Definitions {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// The kind of entity the name is declared as in this module, if any.
    ///
    /// Imports count as the kind of the imported entity once resolved.
    pub fn kind_of(&self, name: Atom) -> Option<Kind> {
        if let Some(import) = self.imports.get(name) {
            return Some(import.kind.unwrap_or(Kind::Import));
        }

        if self.variables.contains(name) {
            Some(Kind::Variable)
        } else if self.classes.contains(name) {
            Some(Kind::Class)
        } else if self.traits.contains(name) {
            Some(Kind::Trait)
        } else if self.enums.contains(name) {
            Some(Kind::Enum)
        } else if self.functions.contains(name) {
            Some(Kind::Function)
        } else {
            None
        }
    }

    /// The names of all entities declared (not imported) in this module.
    pub fn declared_names(&self) -> impl Iterator<Item = Atom> + '_ {
        self.variables
            .names()
            .chain(self.classes.names())
            .chain(self.traits.names())
            .chain(self.enums.names())
            .chain(self.functions.names())
    }

    /// The fully-qualified name of the type the given local name refers to.
    ///
    /// Only classes, traits and enums, declared or imported, are considered.
    pub fn qualify_type_name(&self, name: Atom) -> Option<String> {
        if let Some(import) = self.imports.get(name) {
            return matches!(
                import.kind,
                Some(Kind::Class | Kind::Trait | Kind::Enum)
            )
            .then(|| import.qualified_name());
        }

        (self.classes.contains(name) || self.traits.contains(name) || self.enums.contains(name))
            .then(|| qualify(&self.module, name))
    }

    pub fn function_tests(&self) -> impl Iterator<Item = &Rc<Function>> {
        self.functions
            .values()
            .flatten()
            .filter(|function| function.is_test())
    }
}

/// The classes and traits provided by the runtime, referred to by their short name.
///
/// `Error` is the trait every raisable class implements, the others are classes implementing it.
pub const BUILTIN_TYPES: &[&str] = &[
    "Error",
    "AssertionError",
    "GeneralError",
    "IndexError",
    "KeyError",
    "NotImplementedError",
    "SystemExitError",
    "UnreachableError",
    "ValueError",
];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// Join a module name and a name into a fully-qualified name.
pub fn qualify(module: &str, name: Atom) -> String {
    format!("{module}.{name}")
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Kind {
    Variable,
    Class,
    Trait,
    Enum,
    Function,
    /// An import not yet resolved.
    Import,
}

impl Kind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Class => "class",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Function => "function",
            Self::Import => "import",
        }
    }
}

impl Kind {
    /// The name of the kind preceded by the indefinite article.
    pub const fn with_article(self) -> &'static str {
        match self {
            Self::Variable => "a variable",
            Self::Class => "a class",
            Self::Trait => "a trait",
            Self::Enum => "an enum",
            Self::Function => "a function",
            Self::Import => "an import",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `from module import name as alias` binding.
#[derive(Clone, Debug)]
pub struct Import {
    pub module: Spanned<String>,
    pub name: Identifier,
    pub alias: Identifier,
    /// The kind of the imported entity, set by the name resolver.
    pub kind: Option<Kind>,
}

impl Import {
    pub fn qualified_name(&self) -> String {
        qualify(&self.module.bare, self.name.bare)
    }
}

/// A module-level variable.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Identifier,
    pub type_: Type,
    pub annotation: ast::Expression,
    pub value: Option<ast::Expression>,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct FunctionFlags: u8 {
        /// Decorated with `@test`.
        const TEST = 1 << 0;
        /// Part of an overload set with more than one member.
        const OVERLOADED = 1 << 1;
        /// Takes `self` as its first parameter.
        const METHOD = 1 << 2;
        /// A trait method without a default body.
        const PURE = 1 << 3;
    }
}

/// A free function, a method or a static function of a class.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Identifier,
    /// The module the function is declared in.
    pub module: String,
    /// Declared with `@generic(T, ...)`.
    pub generic_types: Vec<Identifier>,
    /// Declared with `@raises(E, ...)`.
    pub raises: Vec<Type>,
    pub flags: FunctionFlags,
    /// The value parameters, `self` excluded.
    pub parameters: Vec<Parameter>,
    /// Absent if the function does not return anything.
    pub returns: Option<Type>,
    pub node: ast::Function,
}

impl Function {
    pub fn is_generic(&self) -> bool {
        !self.generic_types.is_empty()
    }

    pub fn is_test(&self) -> bool {
        self.flags.contains(FunctionFlags::TEST)
    }

    pub fn is_method(&self) -> bool {
        self.flags.contains(FunctionFlags::METHOD)
    }

    pub fn is_overloaded(&self) -> bool {
        self.flags.contains(FunctionFlags::OVERLOADED)
    }

    pub fn is_private(&self) -> bool {
        self.name.bare.to_str().starts_with('_')
    }

    /// The number of parameters without a default value.
    pub fn required_parameters(&self) -> usize {
        self.parameters
            .iter()
            .filter(|parameter| parameter.default.is_none())
            .count()
    }

    pub fn body(&self) -> &[ast::Statement] {
        &self.node.body
    }

    /// Visit every type of the signature.
    pub fn types_mut(&mut self) -> impl Iterator<Item = &mut Type> {
        self.parameters
            .iter_mut()
            .map(|parameter| &mut parameter.type_)
            .chain(self.returns.as_mut())
            .chain(self.raises.iter_mut())
    }

    pub fn span(&self) -> Span {
        self.name.span
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: Identifier,
    pub type_: Type,
    pub default: Option<ast::Expression>,
}

/// A class.
#[derive(Clone, Debug)]
pub struct Class {
    pub name: Identifier,
    pub module: String,
    pub generic_types: Vec<Identifier>,
    pub members: Table<Member>,
    pub methods: Table<Vec<Rc<Function>>>,
    pub static_functions: Table<Vec<Rc<Function>>>,
    /// The implemented traits together with the location of the base that names them.
    pub implements: Vec<Spanned<String>>,
    pub docstring: Option<String>,
    pub node: ast::Class,
}

impl Class {
    pub fn qualified_name(&self) -> String {
        qualify(&self.module, self.name.bare)
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_types.is_empty()
    }

    /// Whether the class implements the trait with the given fully-qualified name.
    pub fn implements(&self, trait_: &str) -> bool {
        self.implements
            .iter()
            .any(|implemented| implemented.bare == trait_)
    }

    /// Whether the class implements the built-in `Error` trait.
    pub fn is_error(&self) -> bool {
        self.implements
            .iter()
            .any(|implemented| last_segment(&implemented.bare) == Atom::ERROR.to_str())
    }

    pub fn method(&self, name: Atom) -> Option<&[Rc<Function>]> {
        self.methods.get(name).map(Vec::as_slice)
    }

    pub fn public_members(&self) -> impl Iterator<Item = &Member> {
        self.members.values().filter(|member| !member.is_private())
    }
}

#[derive(Clone, Debug)]
pub struct Member {
    pub name: Identifier,
    pub type_: Type,
}

impl Member {
    pub fn is_private(&self) -> bool {
        self.name.bare.to_str().starts_with('_')
    }
}

/// A trait, i.e. a class decorated with `@trait`.
#[derive(Clone, Debug)]
pub struct Trait {
    pub name: Identifier,
    pub module: String,
    pub methods: Table<Vec<Rc<Function>>>,
    pub docstring: Option<String>,
    pub node: ast::Class,
}

impl Trait {
    pub fn qualified_name(&self) -> String {
        qualify(&self.module, self.name.bare)
    }
}

/// An enumeration, i.e. a class decorated with `@enum`.
#[derive(Clone, Debug)]
pub struct Enum {
    pub name: Identifier,
    pub module: String,
    /// The underlying integer type.
    pub type_: Primitive,
    /// The members in declaration order with non-decreasing values.
    pub members: Vec<(Identifier, Int)>,
}

impl Enum {
    pub fn qualified_name(&self) -> String {
        qualify(&self.module, self.name.bare)
    }

    pub fn member(&self, name: Atom) -> Option<&Int> {
        self.members
            .iter()
            .find(|(member, _)| member.bare == name)
            .map(|(_, value)| value)
    }
}
