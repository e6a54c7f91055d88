//! Traversal of the syntax tree.
//!
//! The default methods of [`Visitor`] and [`VisitorMut`] walk into every child node. Implementors
//! override the methods of the nodes they are interested in and call the corresponding `walk_`
//! function to continue the traversal.

use super::*;

pub trait Visitor: Sized {
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }
}

pub trait VisitorMut: Sized {
    fn visit_statement(&mut self, statement: &mut Statement) {
        walk_statement_mut(self, statement);
    }

    fn visit_expression(&mut self, expression: &mut Expression) {
        walk_expression_mut(self, expression);
    }
}

pub fn walk_body<V: Visitor>(visitor: &mut V, body: &[Statement]) {
    for statement in body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &Statement) {
    match &statement.bare {
        BareStatement::Import(_) | BareStatement::Break | BareStatement::Continue | BareStatement::Pass => {}
        BareStatement::Function(function) => {
            for parameter in &function.parameters {
                if let Some(annotation) = &parameter.annotation {
                    visitor.visit_expression(annotation);
                }
                if let Some(default) = &parameter.default {
                    visitor.visit_expression(default);
                }
            }
            if let Some(returns) = &function.returns {
                visitor.visit_expression(returns);
            }
            walk_body(visitor, &function.body);
        }
        BareStatement::Class(class) => {
            for base in &class.bases {
                visitor.visit_expression(base);
            }
            walk_body(visitor, &class.body);
        }
        BareStatement::Assign(assign) => {
            visitor.visit_expression(&assign.target);
            visitor.visit_expression(&assign.value);
        }
        BareStatement::AnnotatedAssign(assign) => {
            visitor.visit_expression(&assign.target);
            visitor.visit_expression(&assign.annotation);
            if let Some(value) = &assign.value {
                visitor.visit_expression(value);
            }
        }
        BareStatement::AugmentedAssign(assign) => {
            visitor.visit_expression(&assign.target);
            visitor.visit_expression(&assign.value);
        }
        BareStatement::Expression(expression)
        | BareStatement::Yield(expression)
        | BareStatement::Assert(expression) => visitor.visit_expression(expression),
        BareStatement::Return(value) | BareStatement::Raise(value) => {
            if let Some(value) = value {
                visitor.visit_expression(value);
            }
        }
        BareStatement::If(if_) => {
            visitor.visit_expression(&if_.condition);
            walk_body(visitor, &if_.body);
            walk_body(visitor, &if_.orelse);
        }
        BareStatement::While(while_) => {
            visitor.visit_expression(&while_.condition);
            walk_body(visitor, &while_.body);
        }
        BareStatement::For(for_) => {
            visitor.visit_expression(&for_.target);
            visitor.visit_expression(&for_.iterable);
            walk_body(visitor, &for_.body);
        }
        BareStatement::Try(try_) => {
            walk_body(visitor, &try_.body);
            for handler in &try_.handlers {
                if let Some(type_) = &handler.type_ {
                    visitor.visit_expression(type_);
                }
                walk_body(visitor, &handler.body);
            }
            walk_body(visitor, &try_.orelse);
            walk_body(visitor, &try_.finalbody);
        }
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &Expression) {
    match &expression.bare {
        BareExpression::Name(_) | BareExpression::Constant(_) => {}
        BareExpression::Attribute(attribute) => visitor.visit_expression(&attribute.value),
        BareExpression::Call(call) => {
            visitor.visit_expression(&call.function);
            for argument in &call.arguments {
                visitor.visit_expression(argument);
            }
            for keyword in &call.keywords {
                visitor.visit_expression(&keyword.value);
            }
        }
        BareExpression::Subscript(subscript) => {
            visitor.visit_expression(&subscript.value);
            visitor.visit_expression(&subscript.index);
        }
        BareExpression::Slice(slice) => {
            for bound in [&slice.lower, &slice.upper, &slice.step].into_iter().flatten() {
                visitor.visit_expression(bound);
            }
        }
        BareExpression::Binary(binary) => {
            visitor.visit_expression(&binary.left);
            visitor.visit_expression(&binary.right);
        }
        BareExpression::Unary(unary) => visitor.visit_expression(&unary.operand),
        BareExpression::Boolean(boolean) => {
            visitor.visit_expression(&boolean.left);
            visitor.visit_expression(&boolean.right);
        }
        BareExpression::Compare(compare) => {
            visitor.visit_expression(&compare.left);
            for (_, right) in &compare.comparisons {
                visitor.visit_expression(right);
            }
        }
        BareExpression::Conditional(conditional) => {
            visitor.visit_expression(&conditional.condition);
            visitor.visit_expression(&conditional.body);
            visitor.visit_expression(&conditional.orelse);
        }
        BareExpression::List(elements)
        | BareExpression::Tuple(elements)
        | BareExpression::Set(elements) => {
            for element in elements {
                visitor.visit_expression(element);
            }
        }
        BareExpression::Dict(items) => {
            for (key, value) in items {
                visitor.visit_expression(key);
                visitor.visit_expression(value);
            }
        }
        BareExpression::ListComprehension(comprehension)
        | BareExpression::SetComprehension(comprehension) => {
            visitor.visit_expression(&comprehension.element);
            walk_generator(visitor, &comprehension.generator);
        }
        BareExpression::DictComprehension(comprehension) => {
            visitor.visit_expression(&comprehension.key);
            visitor.visit_expression(&comprehension.value);
            walk_generator(visitor, &comprehension.generator);
        }
    }
}

fn walk_generator<V: Visitor>(visitor: &mut V, generator: &Generator) {
    visitor.visit_expression(&generator.target);
    visitor.visit_expression(&generator.iterable);
    for condition in &generator.conditions {
        visitor.visit_expression(condition);
    }
}

pub fn walk_body_mut<V: VisitorMut>(visitor: &mut V, body: &mut [Statement]) {
    for statement in body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement_mut<V: VisitorMut>(visitor: &mut V, statement: &mut Statement) {
    match &mut statement.bare {
        BareStatement::Import(_) | BareStatement::Break | BareStatement::Continue | BareStatement::Pass => {}
        BareStatement::Function(function) => {
            for parameter in &mut function.parameters {
                if let Some(annotation) = &mut parameter.annotation {
                    visitor.visit_expression(annotation);
                }
                if let Some(default) = &mut parameter.default {
                    visitor.visit_expression(default);
                }
            }
            if let Some(returns) = &mut function.returns {
                visitor.visit_expression(returns);
            }
            walk_body_mut(visitor, &mut function.body);
        }
        BareStatement::Class(class) => {
            for base in &mut class.bases {
                visitor.visit_expression(base);
            }
            walk_body_mut(visitor, &mut class.body);
        }
        BareStatement::Assign(assign) => {
            visitor.visit_expression(&mut assign.target);
            visitor.visit_expression(&mut assign.value);
        }
        BareStatement::AnnotatedAssign(assign) => {
            visitor.visit_expression(&mut assign.target);
            visitor.visit_expression(&mut assign.annotation);
            if let Some(value) = &mut assign.value {
                visitor.visit_expression(value);
            }
        }
        BareStatement::AugmentedAssign(assign) => {
            visitor.visit_expression(&mut assign.target);
            visitor.visit_expression(&mut assign.value);
        }
        BareStatement::Expression(expression)
        | BareStatement::Yield(expression)
        | BareStatement::Assert(expression) => visitor.visit_expression(expression),
        BareStatement::Return(value) | BareStatement::Raise(value) => {
            if let Some(value) = value {
                visitor.visit_expression(value);
            }
        }
        BareStatement::If(if_) => {
            visitor.visit_expression(&mut if_.condition);
            walk_body_mut(visitor, &mut if_.body);
            walk_body_mut(visitor, &mut if_.orelse);
        }
        BareStatement::While(while_) => {
            visitor.visit_expression(&mut while_.condition);
            walk_body_mut(visitor, &mut while_.body);
        }
        BareStatement::For(for_) => {
            visitor.visit_expression(&mut for_.target);
            visitor.visit_expression(&mut for_.iterable);
            walk_body_mut(visitor, &mut for_.body);
        }
        BareStatement::Try(try_) => {
            walk_body_mut(visitor, &mut try_.body);
            for handler in &mut try_.handlers {
                if let Some(type_) = &mut handler.type_ {
                    visitor.visit_expression(type_);
                }
                walk_body_mut(visitor, &mut handler.body);
            }
            walk_body_mut(visitor, &mut try_.orelse);
            walk_body_mut(visitor, &mut try_.finalbody);
        }
    }
}

pub fn walk_expression_mut<V: VisitorMut>(visitor: &mut V, expression: &mut Expression) {
    match &mut expression.bare {
        BareExpression::Name(_) | BareExpression::Constant(_) => {}
        BareExpression::Attribute(attribute) => visitor.visit_expression(&mut attribute.value),
        BareExpression::Call(call) => {
            visitor.visit_expression(&mut call.function);
            for argument in &mut call.arguments {
                visitor.visit_expression(argument);
            }
            for keyword in &mut call.keywords {
                visitor.visit_expression(&mut keyword.value);
            }
        }
        BareExpression::Subscript(subscript) => {
            visitor.visit_expression(&mut subscript.value);
            visitor.visit_expression(&mut subscript.index);
        }
        BareExpression::Slice(slice) => {
            for bound in [&mut slice.lower, &mut slice.upper, &mut slice.step]
                .into_iter()
                .flatten()
            {
                visitor.visit_expression(bound);
            }
        }
        BareExpression::Binary(binary) => {
            visitor.visit_expression(&mut binary.left);
            visitor.visit_expression(&mut binary.right);
        }
        BareExpression::Unary(unary) => visitor.visit_expression(&mut unary.operand),
        BareExpression::Boolean(boolean) => {
            visitor.visit_expression(&mut boolean.left);
            visitor.visit_expression(&mut boolean.right);
        }
        BareExpression::Compare(compare) => {
            visitor.visit_expression(&mut compare.left);
            for (_, right) in &mut compare.comparisons {
                visitor.visit_expression(right);
            }
        }
        BareExpression::Conditional(conditional) => {
            visitor.visit_expression(&mut conditional.condition);
            visitor.visit_expression(&mut conditional.body);
            visitor.visit_expression(&mut conditional.orelse);
        }
        BareExpression::List(elements)
        | BareExpression::Tuple(elements)
        | BareExpression::Set(elements) => {
            for element in elements {
                visitor.visit_expression(element);
            }
        }
        BareExpression::Dict(items) => {
            for (key, value) in items {
                visitor.visit_expression(key);
                visitor.visit_expression(value);
            }
        }
        BareExpression::ListComprehension(comprehension)
        | BareExpression::SetComprehension(comprehension) => {
            visitor.visit_expression(&mut comprehension.element);
            walk_generator_mut(visitor, &mut comprehension.generator);
        }
        BareExpression::DictComprehension(comprehension) => {
            visitor.visit_expression(&mut comprehension.key);
            visitor.visit_expression(&mut comprehension.value);
            walk_generator_mut(visitor, &mut comprehension.generator);
        }
    }
}

fn walk_generator_mut<V: VisitorMut>(visitor: &mut V, generator: &mut Generator) {
    visitor.visit_expression(&mut generator.target);
    visitor.visit_expression(&mut generator.iterable);
    for condition in &mut generator.conditions {
        visitor.visit_expression(condition);
    }
}

pub(crate) struct Substitute<'a>(pub(crate) &'a HashMap<Atom, Expression>);

impl VisitorMut for Substitute<'_> {
    fn visit_expression(&mut self, expression: &mut Expression) {
        if let BareExpression::Name(name) = expression.bare {
            if let Some(substitution) = self.0.get(&name) {
                expression.bare = substitution.bare.clone();
            }
            return;
        }

        walk_expression_mut(self, expression);
    }
}

struct ContainsYield(bool);

impl Visitor for ContainsYield {
    fn visit_statement(&mut self, statement: &Statement) {
        match statement.bare {
            BareStatement::Yield(_) => self.0 = true,
            // nested definitions suspend on their own
            BareStatement::Function(_) | BareStatement::Class(_) => {}
            _ => walk_statement(self, statement),
        }
    }
}

/// Whether any of the statements suspends, not counting nested definitions.
pub fn contains_yield(body: &[Statement]) -> bool {
    let mut visitor = ContainsYield(false);
    walk_body(&mut visitor, body);
    visitor.0
}

/// Collect the names read or written anywhere in the given statements, in order of first occurrence.
pub fn names_in(body: &[Statement]) -> Vec<Atom> {
    struct Names(Vec<Atom>);

    impl Visitor for Names {
        fn visit_expression(&mut self, expression: &Expression) {
            match &expression.bare {
                BareExpression::Name(name) => {
                    if !self.0.contains(name) {
                        self.0.push(*name);
                    }
                }
                _ => walk_expression(self, expression),
            }
        }
    }

    let mut visitor = Names(Vec::new());
    walk_body(&mut visitor, body);
    visitor.0
}

/// Collect the names read anywhere in the given expression, in order of first occurrence.
pub fn names_in_expression(expression: &Expression) -> Vec<Atom> {
    let statement = Spanned::new(expression.span, BareStatement::Expression(expression.clone()));
    names_in(std::slice::from_ref(&statement))
}
