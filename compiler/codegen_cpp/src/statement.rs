//! The emission of statements.
//!
//! Every `for` loop is compiled to a counting loop over a chain of cursors, one per iteration
//! adaptor, e.g. `for i, x in enumerate(slice(xs, 1))` iterates over
//! `mys::enumerate(mys::slice(mys::cursor(xs), ...), i64(0))`. Iterator classes are driven by
//! calling `next()` until it returns `None` instead.

use crate::{block, convert::escape, types::cpp_path, Generator};
use ast::{BareExpression, BareStatement, Binary, Expression, Statement};
use diagnostics::{Diag, Result};
use hir::{is_builtin_type, last_segment, module_of, Type};
use span::{Span, Spanned};
use typer::{
    adaptor, default_type, element_type, intersection_of, iteration_type, resolve_annotation,
    resolve_entity, value_type, Entity,
};
use utility::{Atom, QuoteExt};

/// The code producing the items of a loop.
struct Cursor {
    code: String,
    packing: Packing,
}

/// How the items of a cursor are laid out.
enum Packing {
    /// Plain values, tuples being shared pointers.
    Value,
    /// Tuples by value produced by `enumerate`, `zip` and dicts.
    Packed(Vec<Packing>),
}

impl Generator<'_, '_> {
    pub(crate) fn body(&mut self, body: &[Statement]) -> Result<String> {
        let mut text = String::new();
        for statement in body {
            text += &self.statement(statement)?;
        }
        Ok(text)
    }

    /// Compile the statements in a nested scope, wrapped in braces.
    fn scoped_body(&mut self, body: &[Statement]) -> Result<String> {
        self.context.push_scope();
        let text = self.body(body);
        self.context.pop_scope();
        Ok(block(&text?))
    }

    fn statement(&mut self, statement: &Statement) -> Result<String> {
        let span = statement.span;

        Ok(match &statement.bare {
            BareStatement::Import(_) => {
                return Err(Diag::error()
                    .message("imports are only allowed at module level")
                    .unlabeled_span(span))
            }
            BareStatement::Function(_) | BareStatement::Class(_) => {
                return Err(Diag::error()
                    .message("nested definitions are not supported")
                    .unlabeled_span(span))
            }
            BareStatement::Assign(assign) => self.assign(&assign.target, &assign.value, span)?,
            BareStatement::AnnotatedAssign(assign) => {
                let BareExpression::Name(name) = assign.target.bare else {
                    return Err(Diag::error()
                        .message("only variables can be annotated")
                        .unlabeled_span(&assign.target));
                };
                if self.context.is_local(name) {
                    return Err(Diag::error()
                        .message(format!("redefinition of variable {}", name.quote()))
                        .unlabeled_span(&assign.target));
                }

                let type_ = resolve_annotation(self.context, &assign.annotation)?;
                let value = match &assign.value {
                    Some(value) => self.convert(value, &type_)?,
                    None => self.zero_value(&type_),
                };
                self.context.define_local(name, type_.clone());
                format!("{} {name} = {value};\n", self.cpp_type(&type_))
            }
            BareStatement::AugmentedAssign(assign) => {
                let type_ = default_type(&value_type(self.context, &assign.target)?);
                let target = self.emit(&assign.target, &type_)?;
                let binary = Spanned::new(
                    span,
                    BareExpression::Binary(Box::new(Binary {
                        left: assign.target.clone(),
                        operator: assign.operator,
                        right: assign.value.clone(),
                    })),
                );
                let value = self.convert(&binary, &type_)?;
                format!("{target} = {value};\n")
            }
            BareStatement::Expression(expression) => match expression.bare {
                // docstrings
                BareExpression::Constant(ast::Constant::String(_)) => String::new(),
                _ => format!("{};\n", self.expression(expression)?),
            },
            BareStatement::Return(value) => self.return_(value.as_ref(), span)?,
            BareStatement::Yield(_) => {
                return Err(Diag::bug()
                    .message("'yield' outside of a lowered iterator")
                    .unlabeled_span(span))
            }
            BareStatement::If(if_) => self.if_(if_)?,
            BareStatement::While(while_) => {
                let condition = self.condition(&while_.condition)?;
                format!("while ({condition}) {}\n", self.scoped_body(&while_.body)?)
            }
            BareStatement::For(for_) => {
                let body = self.iterate(&for_.target, &for_.iterable, |this| this.body(&for_.body))?;
                block(&body) + "\n"
            }
            BareStatement::Break => "break;\n".to_owned(),
            BareStatement::Continue => "continue;\n".to_owned(),
            BareStatement::Pass => String::new(),
            BareStatement::Raise(None) => "throw;\n".to_owned(),
            BareStatement::Raise(Some(error)) => {
                let (value, type_) = self.value(error)?;
                if !self.is_error(&type_) {
                    return Err(Diag::error()
                        .message(format!("{} is not an error", type_.quote()))
                        .unlabeled_span(error));
                }
                format!("{value}->__throw();\n")
            }
            BareStatement::Try(try_) => self.try_(try_)? + "\n",
            BareStatement::Assert(condition) => {
                let text = escape(&condition.to_string());
                let condition = self.condition(condition)?;
                format!(
                    "if (!({condition})) {{\n    \
                     mys::make_shared<mys::AssertionError>(String(\"{text}\"))->__throw();\n}}\n"
                )
            }
        })
    }

    fn assign(&mut self, target: &Expression, value: &Expression, span: Span) -> Result<String> {
        match &target.bare {
            BareExpression::Name(name) if *name == Atom::UNDERSCORE => {
                Ok(format!("(void){};\n", self.expression(value)?))
            }
            BareExpression::Name(name) => {
                if let Some(type_) = self.context.local(*name).cloned() {
                    let value = self.convert(value, &type_)?;
                    return Ok(format!("{name} = {value};\n"));
                }

                if let Some(Entity::Variable { qualified, type_ }) = resolve_entity(self.context, target) {
                    let type_ = self.concrete(&type_, span)?;
                    let value = self.convert(value, &type_)?;
                    return Ok(format!("{} = {value};\n", cpp_path(&qualified)));
                }

                let type_ = default_type(&value_type(self.context, value)?);
                if type_.is_none() {
                    return Err(Diag::error()
                        .message(format!("the type of {} cannot be inferred from 'None'", name.quote()))
                        .unlabeled_span(target));
                }
                let value = self.convert(value, &type_)?;
                self.context.define_local(*name, type_.clone());
                Ok(format!("{} {name} = {value};\n", self.cpp_type(&type_)))
            }
            BareExpression::Attribute(_) => {
                let type_ = value_type(self.context, target)?;
                let target = self.emit(target, &type_)?;
                let value = self.convert(value, &type_)?;
                Ok(format!("{target} = {value};\n"))
            }
            BareExpression::Subscript(subscript) => {
                let (container, container_type) = self.value(&subscript.value)?;
                match &container_type {
                    Type::Dict(key, element) => {
                        let key = self.convert(&subscript.index, key)?;
                        let value = self.convert(value, element)?;
                        Ok(format!("(*{container})[{key}] = {value};\n"))
                    }
                    Type::List(element) => {
                        let index = self.convert(&subscript.index, &Type::I64)?;
                        let value = self.convert(value, element)?;
                        Ok(format!("{container}->get({index}) = {value};\n"))
                    }
                    type_ => Err(Diag::error()
                        .message(format!("{} does not support item assignment", type_.quote()))
                        .unlabeled_span(target)),
                }
            }
            BareExpression::Tuple(targets) => {
                let type_ = default_type(&value_type(self.context, value)?);
                let Type::Tuple(types) = &type_ else {
                    return Err(Diag::error()
                        .message(format!("cannot unpack {}", type_.quote()))
                        .unlabeled_span(value));
                };
                if types.len() != targets.len() {
                    return Err(Diag::error()
                        .message(format!(
                            "cannot unpack {} into {} variables",
                            type_.quote(),
                            targets.len()
                        ))
                        .unlabeled_span(target));
                }

                let temporary = self.context.unique("tuple");
                let mut text = format!("auto {temporary} = {};\n", self.convert(value, &type_)?);
                for (position, (target, type_)) in targets.iter().zip(types).enumerate() {
                    text += &self.assign_element(target, &format!("std::get<{position}>(*{temporary})"), type_)?;
                }
                Ok(text)
            }
            _ => Err(Diag::error()
                .message(format!("cannot assign to {}", target.quote()))
                .unlabeled_span(target)),
        }
    }

    /// Assign an element of an unpacked tuple to a variable.
    fn assign_element(&mut self, target: &Expression, value: &str, type_: &Type) -> Result<String> {
        let Some(name) = target.as_name() else {
            return Err(Diag::error()
                .message(format!("cannot unpack into {}", target.quote()))
                .unlabeled_span(target));
        };

        if name == Atom::UNDERSCORE {
            return Ok(String::new());
        }

        match self.context.local(name).cloned() {
            Some(local) => {
                if intersection_of(&local, type_).is_none() {
                    return Err(Diag::error()
                        .message(format!(
                            "types {} and {} differ",
                            type_.quote(),
                            local.quote()
                        ))
                        .unlabeled_span(target));
                }
                Ok(format!("{name} = {value};\n"))
            }
            None => {
                self.context.define_local(name, type_.clone());
                Ok(format!("{} {name} = {value};\n", self.cpp_type(type_)))
            }
        }
    }

    fn return_(&mut self, value: Option<&Expression>, span: Span) -> Result<String> {
        let returns = self.context.returns.clone();

        match (value, returns) {
            (None, None) => Ok("return;\n".to_owned()),
            (Some(value), None) => match value.bare {
                BareExpression::Constant(ast::Constant::None) => Ok("return;\n".to_owned()),
                _ => Err(Diag::error()
                    .message("function does not return a value")
                    .unlabeled_span(value)),
            },
            (Some(value), Some(returns)) => Ok(format!("return {};\n", self.convert(value, &returns)?)),
            (None, Some(returns)) => Err(Diag::error()
                .message(format!("missing return value of type {}", returns.quote()))
                .unlabeled_span(span)),
        }
    }

    fn if_(&mut self, if_: &ast::If) -> Result<String> {
        let condition = self.condition(&if_.condition)?;
        let mut text = format!("if ({condition}) {}", self.scoped_body(&if_.body)?);

        match if_.orelse.as_slice() {
            [] => text.push('\n'),
            [Spanned {
                bare: BareStatement::If(nested),
                ..
            }] => {
                text += " else ";
                text += &self.if_(nested)?;
            }
            orelse => {
                text += &format!(" else {}\n", self.scoped_body(orelse)?);
            }
        }

        Ok(text)
    }

    /// Compile a `try` statement.
    ///
    /// The `finally` body is run by the destructor of a deferred action and the `else` body only
    /// if no handler ran.
    fn try_(&mut self, try_: &ast::Try) -> Result<String> {
        let mut text = String::new();

        let ok = if try_.orelse.is_empty() {
            None
        } else {
            Some(self.context.unique("ok"))
        };
        if let Some(ok) = &ok {
            text += &format!("bool {ok} = true;\n");
        }

        if !try_.finalbody.is_empty() {
            let finally = self.scoped_body(&try_.finalbody)?;
            let name = self.context.unique("finally");
            text += &format!("auto {name} = mys::defer([&]() {finally});\n");
        }

        let body = self.scoped_body(&try_.body)?;
        if try_.handlers.is_empty() {
            text += &body;
            text.push('\n');
        } else {
            text += &format!("try {body}\n");
        }

        for handler in &try_.handlers {
            let (exception, type_) = match &handler.type_ {
                Some(annotation) => {
                    let type_ = resolve_annotation(self.context, annotation)?;
                    let Type::Named(name) = &type_ else {
                        return Err(Diag::error()
                            .message(format!("{} is not an error", type_.quote()))
                            .unlabeled_span(annotation));
                    };
                    if !self.is_error(&type_) {
                        return Err(Diag::error()
                            .message(format!("{} is not an error", type_.quote()))
                            .unlabeled_span(annotation));
                    }
                    (adapter_path(name), type_)
                }
                None => ("mys::__Error".to_owned(), Type::named(Atom::ERROR.to_str())),
            };

            self.context.push_scope();
            let mut body = String::new();
            if let Some(ok) = &ok {
                body += &format!("{ok} = false;\n");
            }
            if let Some(name) = handler.name {
                body += &format!("auto {} = __error.m_error;\n", name.bare);
                self.context.define_local(name.bare, type_);
            }
            let handler_body = self.body(&handler.body);
            self.context.pop_scope();
            body += &handler_body?;

            text += &format!("catch ({exception}& __error) {}\n", block(&body));
        }

        if let Some(ok) = &ok {
            text += &format!("if ({ok}) {}\n", self.scoped_body(&try_.orelse)?);
        }

        Ok(block(&text))
    }

    /// Compile a loop binding the target to the items of the iterable in a new scope.
    ///
    /// The body is compiled by the given function after the target is bound.
    pub(crate) fn iterate(
        &mut self,
        target: &Expression,
        iterable: &Expression,
        body: impl FnOnce(&mut Self) -> Result<String>,
    ) -> Result<String> {
        self.context.push_scope();
        let result = self.iterate_in_scope(target, iterable, body);
        self.context.pop_scope();
        result
    }

    fn iterate_in_scope(
        &mut self,
        target: &Expression,
        iterable: &Expression,
        body: impl FnOnce(&mut Self) -> Result<String>,
    ) -> Result<String> {
        let item_type = default_type(&iteration_type(self.context, iterable)?);
        let iterator = self.context.unique("iterator");

        if adaptor(self.context, iterable).is_none() {
            let type_ = default_type(&value_type(self.context, iterable)?);
            if let Type::Named(_) = type_ {
                // an iterator class
                element_type(self.context, &type_, iterable.span)?;
                let value = self.convert(iterable, &type_)?;
                let next = self.context.unique("next");
                let item = if self.is_nullable(&item_type) {
                    next.clone()
                } else {
                    format!("{next}.value()")
                };
                let exhausted = if self.is_nullable(&item_type) {
                    format!("{next} == nullptr")
                } else {
                    format!("!{next}.has_value()")
                };
                let binding = self.bind(target, &item, &item_type, None)?;
                let body = body(self)?;

                return Ok(format!(
                    "auto {iterator} = {value};\nwhile (true) {}\n",
                    block(&format!(
                        "auto {next} = {iterator}->next();\nif ({exhausted}) {{\n    break;\n}}\n{binding}{body}"
                    ))
                ));
            }
        }

        let cursor = self.cursor(iterable)?;
        let index = self.context.unique("i");
        let length = self.context.unique("length");
        let item = self.context.unique("item");
        let binding = self.bind(target, &item, &item_type, Some(&cursor.packing))?;
        let body = body(self)?;

        Ok(format!(
            "auto {iterator} = {};\nfor (i64 {index} = 0, {length} = {iterator}.length(); {index} < {length}; {index}++) {}\n",
            cursor.code,
            block(&format!("auto {item} = {iterator}.next();\n{binding}{body}"))
        ))
    }

    /// The chain of cursors iterating over the iterable, mirroring its adaptors.
    fn cursor(&mut self, iterable: &Expression) -> Result<Cursor> {
        let Some((name, call)) = adaptor(self.context, iterable) else {
            let (value, type_) = self.value(iterable)?;
            let packing = match type_ {
                Type::Dict(..) => Packing::Packed(vec![Packing::Value, Packing::Value]),
                _ => Packing::Value,
            };
            return Ok(Cursor {
                code: format!("mys::cursor({value})"),
                packing,
            });
        };

        let arguments = call.arguments.as_slice();
        let missing = || {
            Diag::bug()
                .message(format!("unexpected arguments to {}", name.quote()))
                .unlabeled_span(iterable)
        };

        Ok(match name.to_str() {
            "range" => {
                let type_ = default_type(&iteration_type(self.context, iterable)?);
                let cpp_type = self.cpp_type(&type_);
                let mut values = Vec::new();
                for argument in arguments {
                    values.push(self.convert(argument, &type_)?);
                }
                let zero = format!("{cpp_type}(0)");
                let one = format!("{cpp_type}(1)");
                let (start, stop, step) = match values.as_slice() {
                    [stop] => (zero, stop.clone(), one),
                    [start, stop] => (start.clone(), stop.clone(), one),
                    [start, stop, step] => (start.clone(), stop.clone(), step.clone()),
                    _ => return Err(missing()),
                };
                Cursor {
                    code: format!("mys::range({start}, {stop}, {step})"),
                    packing: Packing::Value,
                }
            }
            "enumerate" => {
                let (inner, start) = match arguments {
                    [inner] => (inner, "i64(0)".to_owned()),
                    [inner, start] => (inner, self.convert(start, &Type::I64)?),
                    _ => return Err(missing()),
                };
                let inner = self.cursor(inner)?;
                Cursor {
                    code: format!("mys::enumerate({}, {start})", inner.code),
                    packing: Packing::Packed(vec![Packing::Value, inner.packing]),
                }
            }
            "zip" => {
                let mut codes = Vec::new();
                let mut packings = Vec::new();
                for argument in arguments {
                    let cursor = self.cursor(argument)?;
                    codes.push(cursor.code);
                    packings.push(cursor.packing);
                }
                Cursor {
                    code: format!("mys::zip({})", codes.join(", ")),
                    packing: Packing::Packed(packings),
                }
            }
            "slice" => {
                let [inner, bounds @ ..] = arguments else {
                    return Err(missing());
                };
                let inner = self.cursor(inner)?;
                let mut codes = vec![inner.code];
                for bound in bounds {
                    codes.push(self.convert(bound, &Type::I64)?);
                }
                Cursor {
                    code: format!("mys::slice({})", codes.join(", ")),
                    packing: inner.packing,
                }
            }
            _ => {
                let [inner] = arguments else {
                    return Err(missing());
                };
                let inner = self.cursor(inner)?;
                Cursor {
                    code: format!("mys::reversed({})", inner.code),
                    packing: inner.packing,
                }
            }
        })
    }

    /// Define the variables of a loop target, unpacking tuples.
    fn bind(&mut self, target: &Expression, value: &str, type_: &Type, packing: Option<&Packing>) -> Result<String> {
        match (&target.bare, type_) {
            (BareExpression::Name(name), type_) => {
                self.context.define_local(*name, type_.clone());
                if *name == Atom::UNDERSCORE {
                    return Ok(String::new());
                }
                Ok(format!("{} {name} = {value};\n", self.cpp_type(type_)))
            }
            (BareExpression::Tuple(targets), Type::Tuple(types)) if targets.len() == types.len() => {
                let mut text = String::new();
                for (position, (target, type_)) in targets.iter().zip(types).enumerate() {
                    let (element, packing) = match packing {
                        Some(Packing::Packed(packings)) => {
                            (format!("std::get<{position}>({value})"), packings.get(position))
                        }
                        _ => (format!("std::get<{position}>(*{value})"), None),
                    };
                    text += &self.bind(target, &element, type_, packing)?;
                }
                Ok(text)
            }
            _ => {
                typer::bind_target(self.context, target, type_.clone())?;
                Err(Diag::bug()
                    .message(format!("unexpected loop target {}", target.quote()))
                    .unlabeled_span(target))
            }
        }
    }
}

/// The C++ type thrown by raising values of the given error class.
fn adapter_path(name: &str) -> String {
    if is_builtin_type(name) {
        return format!("mys::__{name}");
    }

    match module_of(name) {
        Some(module) => format!("{}::__{}", cpp_path(module), last_segment(name)),
        None => format!("mys::__{name}"),
    }
}
