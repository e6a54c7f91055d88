//! The abstract syntax tree (AST).
//!
//! The most important definitions are [`Statement`] and [`Expression`]. Every syntactic category
//! is a closed set of variants. Later phases match on them exhaustively.
//!
//! Type annotations are ordinary expressions: `[i64]` is a list display containing a name, and
//! `Box[T]` is a subscript.

use span::{Span, Spanned};
use utility::{Atom, HashMap, Int};
use visit::VisitorMut as _;

mod format;
pub mod visit;

pub type Identifier = Spanned<Atom>;

/// A parsed source file.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Module {
    pub body: Vec<Statement>,
}

pub type Statement = Spanned<BareStatement>;

/// A statement without an enclosing [`Span`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BareStatement {
    Import(Box<Import>),
    Function(Box<Function>),
    Class(Box<Class>),
    Assign(Box<Assign>),
    AnnotatedAssign(Box<AnnotatedAssign>),
    AugmentedAssign(Box<AugmentedAssign>),
    Expression(Expression),
    Return(Option<Expression>),
    Yield(Expression),
    If(Box<If>),
    While(Box<While>),
    For(Box<For>),
    Break,
    Continue,
    Pass,
    Raise(Option<Expression>),
    Try(Box<Try>),
    Assert(Expression),
}

/// An import statement.
///
/// # Examples
///
/// ```text
/// from fibs.lib import fib as fibonacci, Memo
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Import {
    /// The dotted name of the imported module.
    pub module: Spanned<String>,
    pub names: Vec<ImportedName>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ImportedName {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl ImportedName {
    /// The name the import is bound to locally.
    pub fn binder(&self) -> Identifier {
        self.alias.unwrap_or(self.name)
    }
}

pub type Decorator = Spanned<BareDecorator>;

/// A decorator like `@test` or `@generic(T1, T2)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BareDecorator {
    pub name: Identifier,
    pub arguments: Option<Vec<Expression>>,
}

/// A function or method definition.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Function {
    pub name: Identifier,
    pub decorators: Vec<Decorator>,
    pub parameters: Vec<Parameter>,
    pub returns: Option<Expression>,
    pub body: Vec<Statement>,
}

impl Function {
    /// Whether the first parameter is `self`.
    pub fn is_method(&self) -> bool {
        self.parameters
            .first()
            .is_some_and(|parameter| parameter.name.bare == Atom::SELF)
    }

    /// The parameters excluding `self`.
    pub fn value_parameters(&self) -> &[Parameter] {
        if self.is_method() {
            &self.parameters[1..]
        } else {
            &self.parameters
        }
    }

    pub fn contains_yield(&self) -> bool {
        visit::contains_yield(&self.body)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Parameter {
    pub name: Identifier,
    /// Absent for `self`.
    pub annotation: Option<Expression>,
    pub default: Option<Expression>,
}

/// A class definition.
///
/// Traits and enums are classes decorated with `@trait` and `@enum` respectively.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Class {
    pub name: Identifier,
    pub decorators: Vec<Decorator>,
    pub bases: Vec<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Assign {
    /// A name, an attribute, a subscript or a tuple of names.
    pub target: Expression,
    pub value: Expression,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AnnotatedAssign {
    pub target: Expression,
    pub annotation: Expression,
    pub value: Option<Expression>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AugmentedAssign {
    pub target: Expression,
    pub operator: BinaryOperator,
    pub value: Expression,
}

/// A conditional statement.
///
/// `elif` branches are nested conditionals in the `orelse` branch.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct If {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub orelse: Vec<Statement>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct While {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct For {
    pub target: Expression,
    pub iterable: Expression,
    pub body: Vec<Statement>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Try {
    pub body: Vec<Statement>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Statement>,
    pub finalbody: Vec<Statement>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExceptHandler {
    pub span: Span,
    pub type_: Option<Expression>,
    pub name: Option<Identifier>,
    pub body: Vec<Statement>,
}

pub type Expression = Spanned<BareExpression>;

/// An expression without an enclosing [`Span`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BareExpression {
    Name(Atom),
    Constant(Constant),
    Attribute(Box<Attribute>),
    Call(Box<Call>),
    Subscript(Box<Subscript>),
    /// Only valid as the index of a [subscript](BareExpression::Subscript).
    Slice(Box<Slice>),
    Binary(Box<Binary>),
    Unary(Box<Unary>),
    Boolean(Box<Boolean>),
    Compare(Box<Compare>),
    Conditional(Box<Conditional>),
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Set(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    ListComprehension(Box<Comprehension>),
    SetComprehension(Box<Comprehension>),
    DictComprehension(Box<DictComprehension>),
}

impl BareExpression {
    pub fn name(name: impl Into<Atom>) -> Self {
        Self::Name(name.into())
    }

    pub fn call(function: Expression, arguments: Vec<Expression>) -> Self {
        Self::Call(Box::new(Call {
            function,
            arguments,
            keywords: Vec::new(),
        }))
    }

    pub fn attribute(value: Expression, name: impl Into<Atom>) -> Self {
        Self::Attribute(Box::new(Attribute {
            value,
            name: Spanned::bare(name.into()),
        }))
    }
}

impl BareExpression {
    /// The dotted name of a name or a chain of attribute accesses on a name.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.to_str().to_owned()),
            Self::Attribute(attribute) => Some(format!(
                "{}.{}",
                attribute.value.dotted_name()?,
                attribute.name.bare
            )),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<Atom> {
        utility::obtain!(*self, Self::Name(name) => name)
    }
}

/// Replace every name occurring in the map, in value and in type position alike.
///
/// Used to substitute generic parameters with concrete types.
pub fn substitute(expression: &mut Expression, substitutions: &HashMap<Atom, Expression>) {
    visit::Substitute(substitutions).visit_expression(expression);
}

/// [Substitute](substitute) names in every expression of the given statements.
pub fn substitute_in_body(body: &mut [Statement], substitutions: &HashMap<Atom, Expression>) {
    let mut visitor = visit::Substitute(substitutions);
    for statement in body {
        visitor.visit_statement(statement);
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Constant {
    Integer(Int),
    /// The unprocessed text of the literal.
    Float(Atom),
    String(String),
    Char(char),
    Bytes(Vec<u8>),
    Bool(bool),
    None,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribute {
    pub value: Expression,
    pub name: Identifier,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Call {
    pub function: Expression,
    pub arguments: Vec<Expression>,
    pub keywords: Vec<Keyword>,
}

/// A keyword argument.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Keyword {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Subscript {
    pub value: Expression,
    pub index: Expression,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Slice {
    pub lower: Option<Expression>,
    pub upper: Option<Expression>,
    pub step: Option<Expression>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Binary {
    pub left: Expression,
    pub operator: BinaryOperator,
    pub right: Expression,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Unary {
    pub operator: UnaryOperator,
    pub operand: Expression,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Boolean {
    pub left: Expression,
    pub operator: BooleanOperator,
    pub right: Expression,
}

/// A possibly chained comparison like `a < b <= c`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Compare {
    pub left: Expression,
    pub comparisons: Vec<(CompareOperator, Expression)>,
}

/// A conditional expression `body if condition else orelse`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Conditional {
    pub condition: Expression,
    pub body: Expression,
    pub orelse: Expression,
}

/// A list or set comprehension with a single `for` clause.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Comprehension {
    pub element: Expression,
    pub generator: Generator,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DictComprehension {
    pub key: Expression,
    pub value: Expression,
    pub generator: Generator,
}

/// The `for target in iterable if condition` clause of a comprehension.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Generator {
    pub target: Expression,
    pub iterable: Expression,
    pub conditions: Vec<Expression>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinaryOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::FloorDivide => "//",
            Self::Modulo => "%",
            Self::Power => "**",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
        }
    }

    /// The name of the method a class implements to overload the operator.
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Add => "__add__",
            Self::Subtract => "__sub__",
            Self::Multiply => "__mul__",
            Self::Divide => "__div__",
            Self::FloorDivide => "__floordiv__",
            Self::Modulo => "__mod__",
            Self::Power => "__pow__",
            Self::LeftShift => "__lshift__",
            Self::RightShift => "__rshift__",
            Self::BitOr => "__or__",
            Self::BitXor => "__xor__",
            Self::BitAnd => "__and__",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    Invert,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CompareOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// The docstring of a function or class body.
pub fn docstring(body: &[Statement]) -> Option<&str> {
    match &body.first()?.bare {
        BareStatement::Expression(Spanned {
            bare: BareExpression::Constant(Constant::String(text)),
            ..
        }) => Some(text),
        _ => None,
    }
}

/// Whether the body consists of a docstring, optionally followed only by `pass`, or of `pass`.
pub fn is_pure_body(body: &[Statement]) -> bool {
    let body = match docstring(body) {
        Some(_) => &body[1..],
        None => body,
    };

    match body {
        [] => true,
        [statement] => matches!(statement.bare, BareStatement::Pass),
        _ => false,
    }
}
