//! Iterator lowering.
//!
//! A function returning `iterator[T]` whose body contains `yield` is rewritten into a class
//! holding the suspended computation together with a factory function of the same name:
//!
//! ```text
//! def count(n: i64) -> iterator[i64]:      class CountIterator:
//!     i = 0                                    _state: i64
//!     while i < n:                             _n: i64
//!         yield i                              _i: i64
//!         i += 1                               def __init__(self, n: i64): ...
//!                                              def next(self) -> optional[i64]:
//!                                                  while True:
//!                                                      if self._state == 0: ...
//!                                                      elif self._state == 1: ...
//!                                                      else:
//!                                                          return None
//!
//!                                          def count(n: i64) -> CountIterator:
//!                                              return CountIterator(n)
//! ```
//!
//! Every suspension point gets a fresh state id. A `while` loop containing a suspension point
//! becomes two states, one checking the condition and one running the body, so that resuming
//! re-evaluates the condition. Parameters and local variables become private members.
//!
//! `for` loops and `try` statements are not supported inside iterators.

use ast::{
    BareExpression, BareStatement, CompareOperator, Constant, Expression, Statement,
    visit::{contains_yield, walk_statement, Visitor},
};
use diagnostics::{Diag, Result};
use span::{Span, Spanned};
use utility::{to_pascal_case, Atom, HashMap, QuoteExt};

#[cfg(test)]
mod test;

/// The state id of an exhausted iterator.
const EXHAUSTED: i64 = -1;

/// The name of the member holding the current state id.
const STATE: &str = "_state";

/// Lower every iterator of the module.
pub fn lower_iterators(module: &mut ast::Module) -> Result {
    let mut body = Vec::with_capacity(module.body.len());

    for statement in std::mem::take(&mut module.body) {
        match statement.bare {
            BareStatement::Function(function) if function.contains_yield() => {
                let [class, factory] = lower_iterator(*function, statement.span)?;
                body.push(class);
                body.push(factory);
            }
            BareStatement::Class(class) => {
                if let Some(method) = class.body.iter().find_map(|statement| {
                    utility::obtain!(&statement.bare, BareStatement::Function(method) if method.contains_yield() => method)
                }) {
                    return Err(Diag::error()
                        .message(format!(
                            "iterator method {} is not implemented",
                            method.name.quote()
                        ))
                        .note("only free functions can contain 'yield'")
                        .unlabeled_span(method.name));
                }
                body.push(Spanned::new(statement.span, BareStatement::Class(class)));
            }
            bare => body.push(Spanned::new(statement.span, bare)),
        }
    }

    module.body = body;
    Ok(())
}

fn lower_iterator(function: ast::Function, span: Span) -> Result<[Statement; 2]> {
    let Some(item) = function.returns.as_ref().and_then(iterator_item) else {
        return Err(Diag::error()
            .message(format!(
                "function {} contains 'yield' but does not return 'iterator[T]'",
                function.name.quote()
            ))
            .unlabeled_span(function.returns.as_ref().map_or(function.name.span, |returns| returns.span)));
    };

    if let Some(decorator) = function.decorators.first() {
        return Err(Diag::error()
            .message("decorated iterators are not implemented")
            .unlabeled_span(decorator));
    }

    check_supported(&function.body)?;

    let variables = Variables::collect(&function)?;
    let class_name = Atom::from(format!("{}Iterator", to_pascal_case(function.name.bare.to_str())));

    let mut body = function.body;
    ast::substitute_in_body(&mut body, &variables.substitutions(span));
    let body = strip_annotations(body);

    let mut machine = Machine::default();
    let entry = machine.allocate();
    machine.lower_block(body, entry, EXHAUSTED)?;

    tracing::debug!(
        iterator = %function.name.bare,
        states = machine.states.len(),
        "lowered iterator",
    );

    let members = variables.declarations.iter().map(|(name, annotation)| {
        Spanned::new(
            span,
            BareStatement::AnnotatedAssign(Box::new(ast::AnnotatedAssign {
                target: self::name(member(*name), span),
                annotation: annotation.clone(),
                value: None,
            })),
        )
    });

    let parameters: Vec<_> = function
        .parameters
        .iter()
        .map(|parameter| ast::Parameter {
            name: parameter.name,
            annotation: parameter.annotation.clone(),
            default: parameter.default.clone(),
        })
        .collect();

    let constructor = {
        let mut body: Vec<_> = parameters
            .iter()
            .map(|parameter| {
                assign(
                    self_attribute(member(parameter.name.bare), span),
                    name(parameter.name.bare, span),
                    span,
                )
            })
            .collect();
        body.push(set_state(entry_id(entry), span));

        method(Atom::INIT, parameters.clone(), None, body, span)
    };

    let next = method(
        Atom::NEXT,
        Vec::new(),
        Some(subscript(Atom::OPTIONAL, item, span)),
        vec![Spanned::new(
            span,
            BareStatement::While(Box::new(ast::While {
                condition: constant(Constant::Bool(true), span),
                body: vec![machine.dispatch(span)],
            })),
        )],
        span,
    );

    let class = Spanned::new(
        span,
        BareStatement::Class(Box::new(ast::Class {
            name: Spanned::new(function.name.span, class_name),
            decorators: Vec::new(),
            bases: Vec::new(),
            body: members.chain([constructor, next]).collect(),
        })),
    );

    let factory = Spanned::new(
        span,
        BareStatement::Function(Box::new(ast::Function {
            name: function.name,
            decorators: Vec::new(),
            returns: Some(name(class_name, span)),
            body: vec![Spanned::new(
                span,
                BareStatement::Return(Some(Spanned::new(
                    span,
                    BareExpression::call(
                        name(class_name, span),
                        parameters
                            .iter()
                            .map(|parameter| name(parameter.name.bare, span))
                            .collect(),
                    ),
                ))),
            )],
            parameters,
        })),
    );

    Ok([class, factory])
}

/// The item type `T` of `iterator[T]`.
fn iterator_item(returns: &Expression) -> Option<Expression> {
    match &returns.bare {
        BareExpression::Subscript(subscript)
            if subscript.value.as_name() == Some(Atom::ITERATOR) =>
        {
            Some(subscript.index.clone())
        }
        _ => None,
    }
}

fn check_supported(body: &[Statement]) -> Result {
    struct Unsupported(Option<Diag>);

    impl Visitor for Unsupported {
        fn visit_statement(&mut self, statement: &Statement) {
            if self.0.is_some() {
                return;
            }

            let construct = match &statement.bare {
                BareStatement::For(_) => "'for' loops",
                BareStatement::Try(_) => "'try' statements",
                BareStatement::Function(_) | BareStatement::Class(_) => "nested definitions",
                _ => return walk_statement(self, statement),
            };

            self.0 = Some(
                Diag::error()
                    .message(format!("{construct} in iterators are not implemented"))
                    .unlabeled_span(statement),
            );
        }
    }

    let mut visitor = Unsupported(None);
    ast::visit::walk_body(&mut visitor, body);
    visitor.0.map_or(Ok(()), Err)
}

/// The parameters and local variables of an iterator, which become members of its class.
struct Variables {
    /// The variables in order of first declaration together with their type annotation.
    declarations: Vec<(Atom, Expression)>,
}

impl Variables {
    fn collect(function: &ast::Function) -> Result<Self> {
        let mut this = Self {
            declarations: vec![(Atom::from(STATE), name(Atom::from("i64"), function.name.span))],
        };

        for parameter in &function.parameters {
            let Some(annotation) = &parameter.annotation else {
                return Err(Diag::error()
                    .message(format!(
                        "parameter {} of iterator {} is missing a type annotation",
                        parameter.name.quote(),
                        function.name.quote(),
                    ))
                    .unlabeled_span(parameter.name));
            };
            this.declare(parameter.name.bare, annotation.clone());
        }

        this.collect_locals(&function.body, function)?;
        Ok(this)
    }

    fn collect_locals(&mut self, body: &[Statement], function: &ast::Function) -> Result {
        for statement in body {
            match &statement.bare {
                BareStatement::AnnotatedAssign(assign) => {
                    if let Some(target) = assign.target.as_name() {
                        self.declare(target, assign.annotation.clone());
                    }
                }
                BareStatement::Assign(assign) => match &assign.target.bare {
                    BareExpression::Name(target) => {
                        self.declare_inferred(*target, &assign.target, &assign.value, function)?;
                    }
                    BareExpression::Tuple(targets) => {
                        let values = utility::obtain!(&assign.value.bare, BareExpression::Tuple(values) => values);
                        for (index, target) in targets.iter().enumerate() {
                            let Some(name) = target.as_name() else { continue };
                            match values.and_then(|values| values.get(index)) {
                                Some(value) => self.declare_inferred(name, target, value, function)?,
                                None if self.is_declared(name) => {}
                                None => return Err(uninferable(name, target, function)),
                            }
                        }
                    }
                    _ => {}
                },
                BareStatement::If(if_) => {
                    self.collect_locals(&if_.body, function)?;
                    self.collect_locals(&if_.orelse, function)?;
                }
                BareStatement::While(while_) => self.collect_locals(&while_.body, function)?,
                _ => {}
            }
        }

        Ok(())
    }

    fn declare(&mut self, name: Atom, annotation: Expression) {
        if !self.is_declared(name) {
            self.declarations.push((name, annotation));
        }
    }

    fn declare_inferred(
        &mut self,
        name: Atom,
        target: &Expression,
        value: &Expression,
        function: &ast::Function,
    ) -> Result {
        if self.is_declared(name) {
            return Ok(());
        }

        match literal_type(value) {
            Some(type_) => {
                self.declare(name, self::name(Atom::from(type_), target.span));
                Ok(())
            }
            None => Err(uninferable(name, target, function)),
        }
    }

    fn is_declared(&self, name: Atom) -> bool {
        self.declarations.iter().any(|(declared, _)| *declared == name)
    }

    /// Map every variable to the member of `self` it is stored in.
    fn substitutions(&self, span: Span) -> HashMap<Atom, Expression> {
        self.declarations
            .iter()
            .filter(|(name, _)| *name != STATE)
            .map(|(name, _)| (*name, self_attribute(member(*name), span)))
            .collect()
    }
}

fn uninferable(name: Atom, target: &Expression, function: &ast::Function) -> Diag {
    Diag::error()
        .message(format!(
            "cannot infer the type of variable {} of iterator {}",
            name.quote(),
            function.name.quote(),
        ))
        .note("annotate the variable or initialize it with a literal")
        .unlabeled_span(target)
}

/// The type of a literal whose type is evident.
fn literal_type(value: &Expression) -> Option<&'static str> {
    Some(match &value.bare {
        BareExpression::Constant(constant) => match constant {
            Constant::Integer(_) => "i64",
            Constant::Float(_) => "f64",
            Constant::String(_) => "string",
            Constant::Char(_) => "char",
            Constant::Bytes(_) => "bytes",
            Constant::Bool(_) => "bool",
            Constant::None => return None,
        },
        BareExpression::Unary(unary) => literal_type(&unary.operand)?,
        _ => return None,
    })
}

/// The name of the member a variable is stored in.
fn member(name: Atom) -> Atom {
    match name.to_str() {
        name if name.starts_with('_') => Atom::from(name),
        name => Atom::from(format!("_{name}")),
    }
}

/// Turn annotated assignments into plain ones since the variables are declared as members.
fn strip_annotations(body: Vec<Statement>) -> Vec<Statement> {
    body.into_iter()
        .filter_map(|statement| {
            let span = statement.span;
            let bare = match statement.bare {
                BareStatement::AnnotatedAssign(assign) => {
                    let value = assign.value?;
                    BareStatement::Assign(Box::new(ast::Assign {
                        target: assign.target,
                        value,
                    }))
                }
                BareStatement::If(mut if_) => {
                    if_.body = strip_annotations(if_.body);
                    if_.orelse = strip_annotations(if_.orelse);
                    BareStatement::If(if_)
                }
                BareStatement::While(mut while_) => {
                    while_.body = strip_annotations(while_.body);
                    BareStatement::While(while_)
                }
                bare => bare,
            };
            Some(Spanned::new(span, bare))
        })
        .collect()
}

#[derive(Default)]
struct Machine {
    /// The bodies of the states indexed by their id.
    states: Vec<Vec<Statement>>,
    /// The enclosing loops containing suspension points.
    loops: Vec<Loop>,
}

#[derive(Clone, Copy)]
struct Loop {
    condition: usize,
    exit: usize,
}

impl Machine {
    fn allocate(&mut self) -> usize {
        let id = self.states.len();
        self.states.push(Vec::new());
        tracing::trace!(state = id, "allocated iterator state");
        id
    }

    /// Lower the statements into the given state, transitioning to the continuation at the end.
    fn lower_block(&mut self, body: Vec<Statement>, mut state: usize, continuation: i64) -> Result {
        for statement in body {
            let span = statement.span;

            match statement.bare {
                BareStatement::Yield(value) => {
                    let next = self.allocate();
                    self.states[state].push(set_state(entry_id(next), span));
                    self.states[state].push(Spanned::new(span, BareStatement::Return(Some(value))));
                    state = next;
                }
                BareStatement::If(if_)
                    if contains_yield(&if_.body) || contains_yield(&if_.orelse) =>
                {
                    let then = self.allocate();
                    let orelse = self.allocate();
                    let after = self.allocate();

                    self.states[state].push(conditional(
                        if_.condition,
                        vec![set_state(entry_id(then), span)],
                        vec![set_state(entry_id(orelse), span)],
                        span,
                    ));
                    self.states[state].push(Spanned::new(span, BareStatement::Continue));

                    self.lower_block(if_.body, then, entry_id(after))?;
                    self.lower_block(if_.orelse, orelse, entry_id(after))?;
                    state = after;
                }
                BareStatement::While(while_) if contains_yield(&while_.body) => {
                    let condition = self.allocate();
                    let body = self.allocate();
                    let after = self.allocate();

                    self.jump(state, entry_id(condition), span);
                    self.states[condition].push(conditional(
                        while_.condition,
                        vec![set_state(entry_id(body), span)],
                        vec![set_state(entry_id(after), span)],
                        span,
                    ));
                    self.states[condition].push(Spanned::new(span, BareStatement::Continue));

                    self.loops.push(Loop {
                        condition,
                        exit: after,
                    });
                    self.lower_block(while_.body, body, entry_id(condition))?;
                    self.loops.pop();
                    state = after;
                }
                BareStatement::Return(None) => {
                    self.states[state].push(set_state(EXHAUSTED, span));
                    self.states[state].push(Spanned::new(
                        span,
                        BareStatement::Return(Some(constant(Constant::None, span))),
                    ));
                    return Ok(());
                }
                BareStatement::Return(Some(value)) => {
                    return Err(Diag::error()
                        .message("'return' with a value in an iterator")
                        .unlabeled_span(value));
                }
                jump @ (BareStatement::Break | BareStatement::Continue)
                    if !self.loops.is_empty() =>
                {
                    let loop_ = self.loops[self.loops.len() - 1];
                    let target = match jump {
                        BareStatement::Break => loop_.exit,
                        _ => loop_.condition,
                    };
                    self.jump(state, entry_id(target), span);
                    return Ok(());
                }
                bare => {
                    let mut statements = vec![Spanned::new(span, bare)];
                    self.rewrite_jumps(&mut statements);
                    self.states[state].extend(statements);
                }
            }
        }

        let span = span_of(&self.states[state]);
        self.jump(state, continuation, span);
        Ok(())
    }

    fn jump(&mut self, state: usize, target: i64, span: Span) {
        self.states[state].push(set_state(target, span));
        self.states[state].push(Spanned::new(span, BareStatement::Continue));
    }

    /// Redirect `break` and `continue` of the innermost suspending loop.
    ///
    /// Loops without suspension points are kept as they are, so jumps inside them are left alone.
    fn rewrite_jumps(&self, body: &mut Vec<Statement>) {
        let Some(loop_) = self.loops.last().copied() else {
            return;
        };

        let mut index = 0;
        while index < body.len() {
            let span = body[index].span;
            let target = match &mut body[index].bare {
                BareStatement::Break => Some(loop_.exit),
                BareStatement::Continue => Some(loop_.condition),
                BareStatement::If(if_) => {
                    self.rewrite_jumps(&mut if_.body);
                    self.rewrite_jumps(&mut if_.orelse);
                    None
                }
                _ => None,
            };

            if let Some(target) = target {
                body[index] = set_state(entry_id(target), span);
                body.insert(index + 1, Spanned::new(span, BareStatement::Continue));
                index += 1;
            }
            index += 1;
        }
    }

    /// The chain of conditionals selecting the body of the current state.
    fn dispatch(self, span: Span) -> Statement {
        let exhausted = vec![Spanned::new(
            span,
            BareStatement::Return(Some(constant(Constant::None, span))),
        )];

        let chain = self
            .states
            .into_iter()
            .enumerate()
            .rev()
            .fold(exhausted, |orelse, (id, mut body)| {
                if body.is_empty() {
                    body.push(Spanned::new(span, BareStatement::Pass));
                }
                let condition = Spanned::new(
                    span,
                    BareExpression::Compare(Box::new(ast::Compare {
                        left: self_attribute(Atom::from(STATE), span),
                        comparisons: vec![(CompareOperator::Equal, integer(entry_id(id), span))],
                    })),
                );
                vec![conditional(condition, body, orelse, span)]
            });

        chain
            .into_iter()
            .next()
            .unwrap_or_else(|| Spanned::new(span, BareStatement::Pass))
    }
}

#[allow(clippy::cast_possible_wrap)]
fn entry_id(state: usize) -> i64 {
    state as i64
}

fn span_of(body: &[Statement]) -> Span {
    body.last().map(|statement| statement.span).unwrap_or_default()
}

fn name(name: Atom, span: Span) -> Expression {
    Spanned::new(span, BareExpression::Name(name))
}

fn constant(constant: Constant, span: Span) -> Expression {
    Spanned::new(span, BareExpression::Constant(constant))
}

fn integer(value: i64, span: Span) -> Expression {
    constant(Constant::Integer(value.into()), span)
}

fn self_attribute(member: Atom, span: Span) -> Expression {
    Spanned::new(span, BareExpression::attribute(name(Atom::SELF, span), member))
}

fn subscript(value: Atom, index: Expression, span: Span) -> Expression {
    Spanned::new(
        span,
        BareExpression::Subscript(Box::new(ast::Subscript {
            value: name(value, span),
            index,
        })),
    )
}

fn assign(target: Expression, value: Expression, span: Span) -> Statement {
    Spanned::new(span, BareStatement::Assign(Box::new(ast::Assign { target, value })))
}

fn set_state(state: i64, span: Span) -> Statement {
    assign(self_attribute(Atom::from(STATE), span), integer(state, span), span)
}

fn conditional(
    condition: Expression,
    body: Vec<Statement>,
    orelse: Vec<Statement>,
    span: Span,
) -> Statement {
    Spanned::new(
        span,
        BareStatement::If(Box::new(ast::If {
            condition,
            body,
            orelse,
        })),
    )
}

fn method(
    name: Atom,
    parameters: Vec<ast::Parameter>,
    returns: Option<Expression>,
    body: Vec<Statement>,
    span: Span,
) -> Statement {
    let receiver = ast::Parameter {
        name: Spanned::new(span, Atom::SELF),
        annotation: None,
        default: None,
    };

    Spanned::new(
        span,
        BareStatement::Function(Box::new(ast::Function {
            name: Spanned::new(span, name),
            decorators: Vec::new(),
            parameters: std::iter::once(receiver).chain(parameters).collect(),
            returns,
            body,
        })),
    )
}
