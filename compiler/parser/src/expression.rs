//! The parsing of expressions following the precedence of Python.

use crate::base::{Expected, Parser};
use ast::{
    Attribute, BareExpression, Binary, BinaryOperator, Boolean, BooleanOperator, Call, Compare,
    CompareOperator, Comprehension, Conditional, Constant, DictComprehension, Expression,
    Generator, Keyword, Slice, Subscript, Unary, UnaryOperator,
};
use diagnostics::{Diag, Result};
use lexer::BareToken::{self, *};
use span::{Span, Spanned};

impl Parser {
    /// Parse one or more comma-separated expressions.
    ///
    /// More than one expression or a trailing comma results in a tuple.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Expressions ::= Expression ("," Expression)* ","?
    /// ```
    pub(crate) fn parse_expressions(&mut self) -> Result<Expression> {
        let first = self.parse_expression()?;

        if self.token().bare != Comma {
            return Ok(first);
        }

        let mut span = first.span;
        let mut elements = vec![first];

        while self.maybe_consume(Comma) {
            if !starts_expression(&self.token().bare) {
                break;
            }
            elements.push(span.merging(self.parse_expression()?));
        }

        Ok(Spanned::new(span, BareExpression::Tuple(elements)))
    }

    /// Parse the targets of a for loop or of a comprehension.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Targets ::= Bitwise-Or ("," Bitwise-Or)*
    /// ```
    pub(crate) fn parse_targets(&mut self) -> Result<Expression> {
        let first = self.parse_bitwise_or()?;

        if self.token().bare != Comma {
            return Ok(first);
        }

        let mut span = first.span;
        let mut elements = vec![first];
        while self.maybe_consume(Comma) {
            elements.push(span.merging(self.parse_bitwise_or()?));
        }

        Ok(Spanned::new(span, BareExpression::Tuple(elements)))
    }

    /// Parse an expression.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Expression ::= Or-Test ("if" Or-Test "else" Expression)?
    /// ```
    pub(crate) fn parse_expression(&mut self) -> Result<Expression> {
        let body = self.parse_or_test()?;

        if !self.maybe_consume(If) {
            return Ok(body);
        }

        let condition = self.parse_or_test()?;
        self.consume(Else)?;
        let orelse = self.parse_expression()?;

        Ok(Spanned::new(
            body.span.merge(&orelse),
            BareExpression::Conditional(Box::new(Conditional {
                condition,
                body,
                orelse,
            })),
        ))
    }

    fn parse_or_test(&mut self) -> Result<Expression> {
        let mut left = self.parse_and_test()?;

        while self.maybe_consume(Or) {
            let right = self.parse_and_test()?;
            left = boolean(left, BooleanOperator::Or, right);
        }

        Ok(left)
    }

    fn parse_and_test(&mut self) -> Result<Expression> {
        let mut left = self.parse_not_test()?;

        while self.maybe_consume(And) {
            let right = self.parse_not_test()?;
            left = boolean(left, BooleanOperator::And, right);
        }

        Ok(left)
    }

    fn parse_not_test(&mut self) -> Result<Expression> {
        if self.token().bare == Not {
            let start = self.token().span;
            self.advance();
            let operand = self.parse_not_test()?;
            return Ok(unary(start, UnaryOperator::Not, operand));
        }

        self.parse_comparison()
    }

    /// Parse a possibly chained comparison.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Comparison ::= Bitwise-Or (Comparison-Operator Bitwise-Or)*
    /// Comparison-Operator ::= "==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not" "in" | "is" | "is" "not"
    /// ```
    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_bitwise_or()?;
        let mut comparisons = Vec::new();
        let mut span = left.span;

        loop {
            let operator = match self.token().bare {
                DoubleEquals => CompareOperator::Equal,
                NotEquals => CompareOperator::NotEqual,
                Less => CompareOperator::Less,
                LessEquals => CompareOperator::LessEqual,
                Greater => CompareOperator::Greater,
                GreaterEquals => CompareOperator::GreaterEqual,
                In => CompareOperator::In,
                Not if self.look_ahead(1).bare == In => {
                    self.advance();
                    CompareOperator::NotIn
                }
                Is if self.look_ahead(1).bare == Not => {
                    self.advance();
                    CompareOperator::IsNot
                }
                Is => CompareOperator::Is,
                _ => break,
            };
            self.advance();

            let right = span.merging(self.parse_bitwise_or()?);
            comparisons.push((operator, right));
        }

        if comparisons.is_empty() {
            return Ok(left);
        }

        Ok(Spanned::new(
            span,
            BareExpression::Compare(Box::new(Compare { left, comparisons })),
        ))
    }

    pub(crate) fn parse_bitwise_or(&mut self) -> Result<Expression> {
        self.parse_binary_level(0)
    }

    /// Parse a left-associative binary operator level.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Bitwise-Or ::= Bitwise-Xor ("|" Bitwise-Xor)*
    /// Bitwise-Xor ::= Bitwise-And ("^" Bitwise-And)*
    /// Bitwise-And ::= Shift ("&" Shift)*
    /// Shift ::= Sum (("<<" | ">>") Sum)*
    /// Sum ::= Term (("+" | "-") Term)*
    /// Term ::= Factor (("*" | "/" | "//" | "%") Factor)*
    /// ```
    fn parse_binary_level(&mut self, level: usize) -> Result<Expression> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.parse_factor();
        };

        let mut left = self.parse_binary_level(level + 1)?;

        while let Some(&(_, operator)) = operators
            .iter()
            .find(|(token, _)| *token == self.token().bare)
        {
            self.advance();
            let right = self.parse_binary_level(level + 1)?;
            left = binary(left, operator, right);
        }

        Ok(left)
    }

    /// Parse a factor.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Factor ::= ("-" | "+" | "~") Factor | Power
    /// Power ::= Primary ("**" Factor)?
    /// ```
    fn parse_factor(&mut self) -> Result<Expression> {
        let operator = match self.token().bare {
            Minus => Some(UnaryOperator::Minus),
            Plus => Some(UnaryOperator::Plus),
            Tilde => Some(UnaryOperator::Invert),
            _ => None,
        };

        if let Some(operator) = operator {
            let start = self.token().span;
            self.advance();
            let operand = self.parse_factor()?;
            return Ok(unary(start, operator, operand));
        }

        let base = self.parse_primary()?;

        if self.maybe_consume(DoubleAsterisk) {
            let exponent = self.parse_factor()?;
            return Ok(binary(base, BinaryOperator::Power, exponent));
        }

        Ok(base)
    }

    /// Parse a primary expression.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Primary ::= Atom ("." Word | "(" Arguments ")" | "[" Index "]")*
    /// ```
    fn parse_primary(&mut self) -> Result<Expression> {
        let mut expression = self.parse_atom()?;

        loop {
            match self.token().bare {
                Dot => {
                    self.advance();
                    let name = self.consume_word()?;
                    expression = Spanned::new(
                        expression.span.merge(&name),
                        BareExpression::Attribute(Box::new(Attribute {
                            value: expression,
                            name,
                        })),
                    );
                }
                OpeningRoundBracket => {
                    self.advance();
                    let (arguments, keywords) = self.parse_arguments()?;
                    expression = Spanned::new(
                        expression.span.merge(self.preceeding_span()),
                        BareExpression::Call(Box::new(Call {
                            function: expression,
                            arguments,
                            keywords,
                        })),
                    );
                }
                OpeningSquareBracket => {
                    self.advance();
                    let index = self.parse_index()?;
                    self.consume(ClosingSquareBracket)?;
                    expression = Spanned::new(
                        expression.span.merge(self.preceeding_span()),
                        BareExpression::Subscript(Box::new(Subscript {
                            value: expression,
                            index,
                        })),
                    );
                }
                _ => break,
            }
        }

        Ok(expression)
    }

    /// Parse the arguments of a call up to and including the closing bracket.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Arguments ::= (Argument ("," Argument)* ","?)?
    /// Argument ::= (Word "=")? Expression
    /// ```
    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, Vec<Keyword>)> {
        let mut arguments = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        loop {
            if self.maybe_consume(ClosingRoundBracket) {
                break;
            }

            if matches!(self.token().bare, Word(_)) && self.look_ahead(1).bare == Equals {
                let name = self.consume_word()?;
                self.advance();
                let value = self.parse_expression()?;
                keywords.push(Keyword { name, value });
            } else {
                let argument = self.parse_expression()?;
                if let Some(keyword) = keywords.first() {
                    return Err(Diag::error()
                        .message("positional argument follows keyword argument")
                        .unlabeled_span(&argument)
                        .note(format!("the first keyword argument is '{}'", keyword.name)));
                }
                arguments.push(argument);
            }

            if !self.maybe_consume(Comma) {
                self.consume(ClosingRoundBracket)?;
                break;
            }
        }

        Ok((arguments, keywords))
    }

    /// Parse the index of a subscript.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Index ::= Slice | Expressions
    /// Slice ::= Expression? ":" Expression? (":" Expression?)?
    /// ```
    fn parse_index(&mut self) -> Result<Expression> {
        let start = self.token().span;

        let lower = if self.token().bare == Colon {
            None
        } else {
            let index = self.parse_expressions()?;
            if self.token().bare != Colon {
                return Ok(index);
            }
            Some(index)
        };

        self.consume(Colon)?;
        let upper = self.parse_optional_slice_bound()?;
        let step = if self.maybe_consume(Colon) {
            self.parse_optional_slice_bound()?
        } else {
            None
        };

        Ok(Spanned::new(
            start.merge(self.preceeding_span()),
            BareExpression::Slice(Box::new(Slice { lower, upper, step })),
        ))
    }

    fn parse_optional_slice_bound(&mut self) -> Result<Option<Expression>> {
        match self.token().bare {
            Colon | ClosingSquareBracket => Ok(None),
            _ => Ok(Some(self.parse_expression()?)),
        }
    }

    /// Parse an atom.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Atom ::=
    ///     | Word
    ///     | Literal
    ///     | "True" | "False" | "None"
    ///     | "(" (Expression ("," Expression)* ","?)? ")"
    ///     | "[" (Expressions | Expression Comprehension-Clause)? "]"
    ///     | "{" (Dict-Items | Set-Items | Comprehension)? "}"
    /// ```
    fn parse_atom(&mut self) -> Result<Expression> {
        let token = self.token().clone();

        let constant = match token.bare {
            Word(name) => {
                self.advance();
                return Ok(Spanned::new(token.span, BareExpression::Name(name)));
            }
            IntegerLiteral(value) => Constant::Integer(value),
            FloatLiteral(value) => Constant::Float(value),
            StringLiteral(value) => Constant::String(self.concatenate_strings(value)),
            BytesLiteral(value) => Constant::Bytes(value),
            CharLiteral(value) => Constant::Char(value),
            True => Constant::Bool(true),
            False => Constant::Bool(false),
            None_ => Constant::None,
            OpeningRoundBracket => return self.parse_parenthesized(),
            OpeningSquareBracket => return self.parse_list(),
            OpeningCurlyBracket => return self.parse_braced(),
            _ => {
                return Err(Expected::Category("expression").but_actual_is(&token));
            }
        };

        self.advance();
        Ok(Spanned::new(
            token.span.merge(self.preceeding_span()),
            BareExpression::Constant(constant),
        ))
    }

    /// Concatenate adjacent string literals.
    ///
    /// The current token is the first literal.
    fn concatenate_strings(&mut self, mut value: String) -> String {
        while let StringLiteral(next) = &self.look_ahead(1).bare {
            value += next;
            self.advance();
        }
        value
    }

    fn parse_parenthesized(&mut self) -> Result<Expression> {
        let start = self.consume(OpeningRoundBracket)?;

        if self.maybe_consume(ClosingRoundBracket) {
            return Ok(Spanned::new(
                start.merge(self.preceeding_span()),
                BareExpression::Tuple(Vec::new()),
            ));
        }

        let first = self.parse_expression()?;

        if self.maybe_consume(ClosingRoundBracket) {
            // keep the span of the parentheses for diagnostics
            return Ok(Spanned::new(start.merge(self.preceeding_span()), first.bare));
        }

        self.consume(Comma)?;
        let mut elements = vec![first];
        let rest = self.parse_comma_separated(ClosingRoundBracket, Self::parse_expression)?;
        elements.extend(rest);

        Ok(Spanned::new(
            start.merge(self.preceeding_span()),
            BareExpression::Tuple(elements),
        ))
    }

    fn parse_list(&mut self) -> Result<Expression> {
        let start = self.consume(OpeningSquareBracket)?;

        if self.maybe_consume(ClosingSquareBracket) {
            return Ok(Spanned::new(
                start.merge(self.preceeding_span()),
                BareExpression::List(Vec::new()),
            ));
        }

        let first = self.parse_expression()?;

        if self.token().bare == For {
            let generator = self.parse_generator()?;
            self.consume(ClosingSquareBracket)?;
            return Ok(Spanned::new(
                start.merge(self.preceeding_span()),
                BareExpression::ListComprehension(Box::new(Comprehension {
                    element: first,
                    generator,
                })),
            ));
        }

        let mut elements = vec![first];
        if self.maybe_consume(Comma) {
            elements.extend(self.parse_comma_separated(ClosingSquareBracket, Self::parse_expression)?);
        } else {
            self.consume(ClosingSquareBracket)?;
        }

        Ok(Spanned::new(
            start.merge(self.preceeding_span()),
            BareExpression::List(elements),
        ))
    }

    fn parse_braced(&mut self) -> Result<Expression> {
        let start = self.consume(OpeningCurlyBracket)?;

        if self.maybe_consume(ClosingCurlyBracket) {
            return Ok(Spanned::new(
                start.merge(self.preceeding_span()),
                BareExpression::Dict(Vec::new()),
            ));
        }

        let first = self.parse_expression()?;

        let bare = if self.maybe_consume(Colon) {
            let value = self.parse_expression()?;

            if self.token().bare == For {
                let generator = self.parse_generator()?;
                self.consume(ClosingCurlyBracket)?;
                BareExpression::DictComprehension(Box::new(DictComprehension {
                    key: first,
                    value,
                    generator,
                }))
            } else {
                let mut items = vec![(first, value)];
                if self.maybe_consume(Comma) {
                    items.extend(self.parse_comma_separated(ClosingCurlyBracket, |this| {
                        let key = this.parse_expression()?;
                        this.consume(Colon)?;
                        Ok((key, this.parse_expression()?))
                    })?);
                } else {
                    self.consume(ClosingCurlyBracket)?;
                }
                BareExpression::Dict(items)
            }
        } else if self.token().bare == For {
            let generator = self.parse_generator()?;
            self.consume(ClosingCurlyBracket)?;
            BareExpression::SetComprehension(Box::new(Comprehension {
                element: first,
                generator,
            }))
        } else {
            let mut elements = vec![first];
            if self.maybe_consume(Comma) {
                elements
                    .extend(self.parse_comma_separated(ClosingCurlyBracket, Self::parse_expression)?);
            } else {
                self.consume(ClosingCurlyBracket)?;
            }
            BareExpression::Set(elements)
        };

        Ok(Spanned::new(start.merge(self.preceeding_span()), bare))
    }

    /// Parse the clause of a comprehension.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Comprehension-Clause ::= "for" Targets "in" Or-Test ("if" Or-Test)*
    /// ```
    fn parse_generator(&mut self) -> Result<Generator> {
        self.consume(For)?;
        let target = self.parse_targets()?;
        self.consume(In)?;
        let iterable = self.parse_or_test()?;

        let mut conditions = Vec::new();
        while self.maybe_consume(If) {
            conditions.push(self.parse_or_test()?);
        }

        Ok(Generator {
            target,
            iterable,
            conditions,
        })
    }
}

const BINARY_LEVELS: &[&[(BareToken, BinaryOperator)]] = &[
    &[(Pipe, BinaryOperator::BitOr)],
    &[(Caret, BinaryOperator::BitXor)],
    &[(Ampersand, BinaryOperator::BitAnd)],
    &[
        (DoubleLess, BinaryOperator::LeftShift),
        (DoubleGreater, BinaryOperator::RightShift),
    ],
    &[
        (Plus, BinaryOperator::Add),
        (Minus, BinaryOperator::Subtract),
    ],
    &[
        (Asterisk, BinaryOperator::Multiply),
        (Slash, BinaryOperator::Divide),
        (DoubleSlash, BinaryOperator::FloorDivide),
        (Percent, BinaryOperator::Modulo),
    ],
];

pub(crate) fn augmented_operator(token: &BareToken) -> Option<BinaryOperator> {
    Some(match token {
        PlusEquals => BinaryOperator::Add,
        MinusEquals => BinaryOperator::Subtract,
        AsteriskEquals => BinaryOperator::Multiply,
        SlashEquals => BinaryOperator::Divide,
        DoubleSlashEquals => BinaryOperator::FloorDivide,
        PercentEquals => BinaryOperator::Modulo,
        DoubleAsteriskEquals => BinaryOperator::Power,
        DoubleLessEquals => BinaryOperator::LeftShift,
        DoubleGreaterEquals => BinaryOperator::RightShift,
        PipeEquals => BinaryOperator::BitOr,
        CaretEquals => BinaryOperator::BitXor,
        AmpersandEquals => BinaryOperator::BitAnd,
        _ => return None,
    })
}

fn starts_expression(token: &BareToken) -> bool {
    matches!(
        token,
        Word(_)
            | IntegerLiteral(_)
            | FloatLiteral(_)
            | StringLiteral(_)
            | BytesLiteral(_)
            | CharLiteral(_)
            | True
            | False
            | None_
            | Not
            | Minus
            | Plus
            | Tilde
            | OpeningRoundBracket
            | OpeningSquareBracket
            | OpeningCurlyBracket
    )
}

fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
    Spanned::new(
        left.span.merge(&right),
        BareExpression::Binary(Box::new(Binary {
            left,
            operator,
            right,
        })),
    )
}

fn boolean(left: Expression, operator: BooleanOperator, right: Expression) -> Expression {
    Spanned::new(
        left.span.merge(&right),
        BareExpression::Boolean(Box::new(Boolean {
            left,
            operator,
            right,
        })),
    )
}

fn unary(start: Span, operator: UnaryOperator, operand: Expression) -> Expression {
    Spanned::new(
        start.merge(&operand),
        BareExpression::Unary(Box::new(Unary { operator, operand })),
    )
}
