//! The definitions collector.
//!
//! Walks the top-level statements of a module once and builds its [`Definitions`]: the
//! functions, classes, traits, enums, global variables and imports. Naming conventions,
//! redefinitions and decorators are validated on the way. The first violation aborts the
//! collection, no partial definitions are returned.
//!
//! Types are recorded as written. They are made fully-qualified by the name resolver.

use ast::{BareExpression, BareStatement, Constant, Statement};
use decorator::{Decorators, Target};
use diagnostics::{Diag, Result};
use hir::{
    Class, Definitions, Enum, Function, FunctionFlags, Identifier, Import, Kind, Member,
    Parameter, Primitive, Table, Trait, Type, Variable,
};
use span::Spanned;
use std::rc::Rc;
use utility::{is_pascal_case, is_snake_case, is_upper_snake_case, Atom, Int, QuoteExt};

mod decorator;
#[cfg(test)]
mod test;

#[derive(Clone, Copy, Default)]
pub struct Options {
    /// Drop functions decorated with `@test`.
    pub skip_tests: bool,
    /// Require a free function `main`.
    pub has_main: bool,
}

/// Collect the definitions of the given module.
pub fn collect(module: &str, syntax: &ast::Module, options: Options) -> Result<Definitions> {
    let mut collector = Collector {
        definitions: Definitions::new(module),
        options,
    };

    for (index, statement) in syntax.body.iter().enumerate() {
        collector.collect_statement(statement, index == 0)?;
    }

    for overloads in collector.definitions.functions.values_mut() {
        mark_overloads(overloads);
    }

    if options.has_main && !collector.definitions.functions.contains(Atom::MAIN) {
        return Err(Diag::error().message("main() is not defined"));
    }

    let definitions = collector.definitions;
    tracing::debug!(
        module,
        functions = definitions.functions.len(),
        classes = definitions.classes.len(),
        traits = definitions.traits.len(),
        enums = definitions.enums.len(),
        "collected definitions",
    );

    Ok(definitions)
}

struct Collector {
    definitions: Definitions,
    options: Options,
}

impl Collector {
    fn collect_statement(&mut self, statement: &Statement, is_first: bool) -> Result {
        match &statement.bare {
            BareStatement::Import(import) => {
                for imported in &import.names {
                    let alias = imported.binder();
                    self.check_unique(alias, Kind::Import)?;
                    self.definitions.imports.insert(
                        alias.bare,
                        Import {
                            module: import.module.clone(),
                            name: imported.name,
                            alias,
                            kind: None,
                        },
                    );
                }
            }
            BareStatement::Function(function) => {
                let decorators = Decorators::parse(&function.decorators, Target::Function)?;
                if decorators.test && self.options.skip_tests {
                    return Ok(());
                }

                let function = self.lower_function(function, decorators, FunctionFlags::empty())?;
                self.check_unique(function.name, Kind::Function)?;
                let overloads = self.definitions.functions.entry(function.name.bare);
                add_overload(overloads, function)?;
            }
            BareStatement::Class(class) => self.collect_class(class)?,
            BareStatement::AnnotatedAssign(assign) => {
                let Some(name) = assign.target.as_name() else {
                    return Err(Diag::error()
                        .message(format!("invalid global variable {}", assign.target.quote()))
                        .unlabeled_span(&assign.target));
                };
                let name = Spanned::new(assign.target.span, name);

                if !is_upper_snake_case(name.bare.to_str()) {
                    return Err(Diag::error()
                        .message(format!(
                            "global variable name {} is not upper snake case",
                            name.quote()
                        ))
                        .unlabeled_span(name));
                }
                if assign.value.is_none() {
                    return Err(Diag::error()
                        .message(format!("global variable {} is not initialized", name.quote()))
                        .unlabeled_span(name));
                }
                self.check_unique(name, Kind::Variable)?;

                self.definitions.variables.insert(
                    name.bare,
                    Variable {
                        name,
                        type_: Type::from_annotation(&assign.annotation)?,
                        annotation: assign.annotation.clone(),
                        value: assign.value.clone(),
                    },
                );
            }
            BareStatement::Assign(assign) => {
                return Err(Diag::error()
                    .message(format!(
                        "global variable {} is missing a type annotation",
                        assign.target.quote()
                    ))
                    .unlabeled_span(&assign.target));
            }
            // the module docstring
            BareStatement::Expression(Spanned {
                bare: BareExpression::Constant(Constant::String(_)),
                ..
            }) if is_first => {}
            _ => {
                return Err(Diag::error()
                    .message("unsupported statement at module level")
                    .unlabeled_span(statement));
            }
        }

        Ok(())
    }

    fn collect_class(&mut self, class: &ast::Class) -> Result {
        let decorators = Decorators::parse(&class.decorators, Target::Class)?;
        let name = class.name;

        if !is_pascal_case(name.bare.to_str()) {
            return Err(Diag::error()
                .message(format!("class name {} is not pascal case", name.quote()))
                .unlabeled_span(name));
        }

        if let Some(type_) = decorators.enum_ {
            self.check_unique(name, Kind::Enum)?;
            let enum_ = Enum {
                name,
                module: self.definitions.module.clone(),
                type_,
                members: enum_members(class, type_)?,
            };
            self.definitions.enums.insert(name.bare, Rc::new(enum_));
            return Ok(());
        }

        if decorators.trait_ {
            self.check_unique(name, Kind::Trait)?;
            let trait_ = self.lower_trait(class)?;
            self.definitions.traits.insert(name.bare, Rc::new(trait_));
            return Ok(());
        }

        self.check_unique(name, Kind::Class)?;

        let mut implements = Vec::new();
        for base in &class.bases {
            let Some(trait_) = base.dotted_name() else {
                return Err(Diag::error()
                    .message(format!("invalid trait {}", base.quote()))
                    .unlabeled_span(base));
            };
            implements.push(Spanned::new(base.span, trait_));
        }

        let mut members = Table::default();
        let mut methods = Table::default();
        let mut static_functions = Table::default();

        for statement in body_without_docstring(&class.body) {
            match &statement.bare {
                BareStatement::AnnotatedAssign(assign) => {
                    let Some(member) = assign.target.as_name() else {
                        return Err(Diag::error()
                            .message(format!("invalid class member {}", assign.target.quote()))
                            .unlabeled_span(&assign.target));
                    };
                    let member = Spanned::new(assign.target.span, member);

                    if !is_snake_case(member.bare.to_str()) {
                        return Err(Diag::error()
                            .message(format!("class member name {} is not snake case", member.quote()))
                            .unlabeled_span(member));
                    }
                    if let Some(value) = &assign.value {
                        return Err(Diag::error()
                            .message(format!(
                                "class member {} cannot have a default value",
                                member.quote()
                            ))
                            .unlabeled_span(value));
                    }
                    if members.contains(member.bare) {
                        return Err(Diag::error()
                            .message(format!("class member {} is already defined", member.quote()))
                            .unlabeled_span(member));
                    }

                    members.insert(
                        member.bare,
                        Member {
                            name: member,
                            type_: Type::from_annotation(&assign.annotation)?,
                        },
                    );
                }
                BareStatement::Function(function) => {
                    let target = if function.is_method() {
                        Target::Method
                    } else {
                        Target::Function
                    };
                    let decorators = Decorators::parse(&function.decorators, target)?;
                    if decorators.test {
                        return Err(Diag::error()
                            .message("test functions cannot be members of classes")
                            .unlabeled_span(function.name));
                    }

                    let flags = if function.is_method() {
                        FunctionFlags::METHOD
                    } else {
                        FunctionFlags::empty()
                    };
                    let function = self.lower_function(function, decorators, flags)?;

                    if members.contains(function.name.bare) {
                        return Err(Diag::error()
                            .message(format!(
                                "method {} has the same name as a class member",
                                function.name.quote()
                            ))
                            .unlabeled_span(function.name));
                    }

                    let table = if function.is_method() {
                        &mut methods
                    } else {
                        &mut static_functions
                    };
                    add_overload(table.entry(function.name.bare), function)?;
                }
                BareStatement::Pass => {}
                _ => {
                    return Err(Diag::error()
                        .message("unsupported statement in class body")
                        .unlabeled_span(statement));
                }
            }
        }

        for overloads in methods.values_mut().chain(static_functions.values_mut()) {
            mark_overloads(overloads);
        }

        let class = Class {
            name,
            module: self.definitions.module.clone(),
            generic_types: decorators.generic,
            members,
            methods,
            static_functions,
            implements,
            docstring: ast::docstring(&class.body).map(ToOwned::to_owned),
            node: class.clone(),
        };
        self.definitions.classes.insert(name.bare, Rc::new(class));
        Ok(())
    }

    fn lower_trait(&self, class: &ast::Class) -> Result<Trait> {
        if let Some(base) = class.bases.first() {
            return Err(Diag::error()
                .message(format!("trait {} cannot implement other traits", class.name.quote()))
                .unlabeled_span(base));
        }

        let mut methods = Table::default();

        for statement in body_without_docstring(&class.body) {
            match &statement.bare {
                BareStatement::Function(function) if function.is_method() => {
                    let decorators = Decorators::parse(&function.decorators, Target::Method)?;
                    let mut flags = FunctionFlags::METHOD;
                    if ast::is_pure_body(&function.body) {
                        flags |= FunctionFlags::PURE;
                    }
                    let function = self.lower_function(function, decorators, flags)?;
                    add_overload(methods.entry(function.name.bare), function)?;
                }
                BareStatement::AnnotatedAssign(_) => {
                    return Err(Diag::error()
                        .message(format!("trait {} cannot have members", class.name.quote()))
                        .unlabeled_span(statement));
                }
                BareStatement::Pass => {}
                _ => {
                    return Err(Diag::error()
                        .message("traits may only contain methods")
                        .unlabeled_span(statement));
                }
            }
        }

        for overloads in methods.values_mut() {
            mark_overloads(overloads);
        }

        Ok(Trait {
            name: class.name,
            module: self.definitions.module.clone(),
            methods,
            docstring: ast::docstring(&class.body).map(ToOwned::to_owned),
            node: class.clone(),
        })
    }

    fn lower_function(
        &self,
        function: &ast::Function,
        decorators: Decorators,
        mut flags: FunctionFlags,
    ) -> Result<Function> {
        let name = function.name;

        if !is_snake_case(name.bare.to_str()) && !is_dunder(name.bare) {
            return Err(Diag::error()
                .message(format!("function name {} is not snake case", name.quote()))
                .unlabeled_span(name));
        }

        if decorators.test {
            flags |= FunctionFlags::TEST;
            if let Some(parameter) = function.parameters.first() {
                return Err(Diag::error()
                    .message(format!("test {} cannot take parameters", name.quote()))
                    .unlabeled_span(parameter.name));
            }
        }

        let mut parameters: Vec<Parameter> = Vec::new();
        for parameter in function.value_parameters() {
            if !is_snake_case(parameter.name.bare.to_str()) {
                return Err(Diag::error()
                    .message(format!("parameter name {} is not snake case", parameter.name.quote()))
                    .unlabeled_span(parameter.name));
            }
            if parameters.iter().any(|other| other.name.bare == parameter.name.bare) {
                return Err(Diag::error()
                    .message(format!("parameter {} is defined multiple times", parameter.name.quote()))
                    .unlabeled_span(parameter.name));
            }
            if parameter.name.bare == Atom::SELF {
                return Err(Diag::error()
                    .message("'self' is only allowed as the first parameter of methods")
                    .unlabeled_span(parameter.name));
            }
            let Some(annotation) = &parameter.annotation else {
                return Err(Diag::error()
                    .message(format!("parameter {} is missing a type annotation", parameter.name.quote()))
                    .unlabeled_span(parameter.name));
            };

            parameters.push(Parameter {
                name: parameter.name,
                type_: Type::from_annotation(annotation)?,
                default: parameter.default.clone(),
            });
        }

        let returns = match &function.returns {
            Some(returns) => match Type::from_annotation(returns)? {
                Type::None => None,
                type_ => Some(type_),
            },
            None => None,
        };

        Ok(Function {
            name,
            module: self.definitions.module.clone(),
            generic_types: decorators.generic,
            raises: decorators.raises,
            flags,
            parameters,
            returns,
            node: function.clone(),
        })
    }

    fn check_unique(&self, name: Identifier, kind: Kind) -> Result {
        match self.definitions.kind_of(name.bare) {
            None => Ok(()),
            Some(Kind::Function) if kind == Kind::Function => Ok(()),
            Some(existing) => Err(Diag::error()
                .message(format!(
                    "{} is already defined as {}",
                    name.quote(),
                    existing.with_article()
                ))
                .unlabeled_span(name)),
        }
    }
}

/// Add a function to an overload set rejecting identical signatures.
fn add_overload(overloads: &mut Vec<Rc<Function>>, function: Function) -> Result {
    let same_signature = |other: &Function| {
        other.returns == function.returns
            && other.parameters.len() == function.parameters.len()
            && other
                .parameters
                .iter()
                .zip(&function.parameters)
                .all(|(other, parameter)| other.type_ == parameter.type_)
    };

    if overloads.iter().any(|other| same_signature(other)) {
        return Err(Diag::error()
            .message(format!(
                "{} is already defined with the same signature",
                function.name.quote()
            ))
            .unlabeled_span(function.name));
    }

    overloads.push(Rc::new(function));
    Ok(())
}

fn mark_overloads(overloads: &mut [Rc<Function>]) {
    if overloads.len() > 1 {
        for function in overloads {
            Rc::make_mut(function).flags |= FunctionFlags::OVERLOADED;
        }
    }
}

/// Whether the name is a special method name like `__init__`.
fn is_dunder(name: Atom) -> bool {
    let name = name.to_str();
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn body_without_docstring(body: &[Statement]) -> &[Statement] {
    match ast::docstring(body) {
        Some(_) => &body[1..],
        None => body,
    }
}

/// The members of an enumeration together with their values.
///
/// Values count up from zero unless given explicitly. Explicit values may not decrease and
/// every value has to fit into the underlying integer type.
fn enum_members(class: &ast::Class, type_: Primitive) -> Result<Vec<(Identifier, Int)>> {
    if let Some(base) = class.bases.first() {
        return Err(Diag::error()
            .message(format!("enum {} cannot implement traits", class.name.quote()))
            .unlabeled_span(base));
    }

    let mut members: Vec<(Identifier, Int)> = Vec::new();
    let mut next = Int::from(0);

    for statement in body_without_docstring(&class.body) {
        let (name, value) = match &statement.bare {
            BareStatement::Expression(expression) => match expression.as_name() {
                Some(name) => (Spanned::new(expression.span, name), None),
                None => return Err(invalid_enum_member(statement)),
            },
            BareStatement::Assign(assign) => match assign.target.as_name() {
                Some(name) => (
                    Spanned::new(assign.target.span, name),
                    Some(integer_literal(&assign.value)?),
                ),
                None => return Err(invalid_enum_member(statement)),
            },
            _ => return Err(invalid_enum_member(statement)),
        };

        if !is_pascal_case(name.bare.to_str()) {
            return Err(Diag::error()
                .message(format!("enum member name {} is not pascal case", name.quote()))
                .unlabeled_span(name));
        }
        if members.iter().any(|(member, _)| member.bare == name.bare) {
            return Err(Diag::error()
                .message(format!("enum member {} is already defined", name.quote()))
                .unlabeled_span(name));
        }

        let value = match value {
            Some(value) => {
                if let Some((_, previous)) = members.last() {
                    if value < *previous {
                        return Err(Diag::error()
                            .message(format!(
                                "enum member value {value} is smaller than the previous value {previous}"
                            ))
                            .note("enum member values must not decrease")
                            .unlabeled_span(statement));
                    }
                }
                value
            }
            None => next.clone(),
        };

        if let Some((minimum, maximum)) = type_.integer_range() {
            if value < minimum || value > maximum {
                return Err(Diag::error()
                    .message(format!(
                        "enum member value {value} is out of range for {}",
                        type_.quote()
                    ))
                    .note(format!("the range of {} is {minimum} to {maximum}", type_.quote()))
                    .unlabeled_span(statement));
            }
        }

        next = &value + 1u32;
        members.push((name, value));
    }

    Ok(members)
}

fn integer_literal(expression: &ast::Expression) -> Result<Int> {
    match &expression.bare {
        BareExpression::Constant(Constant::Integer(value)) => Ok(value.clone()),
        BareExpression::Unary(unary) if unary.operator == ast::UnaryOperator::Minus => {
            integer_literal(&unary.operand).map(|value| -value)
        }
        _ => Err(Diag::error()
            .message(format!("enum member value {} is not an integer", expression.quote()))
            .unlabeled_span(expression)),
    }
}

fn invalid_enum_member(statement: &Statement) -> Diag {
    Diag::error()
        .message("invalid enum member")
        .note("enum members are names optionally assigned an integer")
        .unlabeled_span(statement)
}
