//! The syntactic analyzer (parser).
//!
//! A recursive-descent parser producing an [`ast::Module`]. The grammar rules are documented
//! on the respective parsing functions in an EBNF-like notation where all-uppercase names
//! denote tokens emitted by the lexer that are not written literally.
//!
//! The first syntax error aborts parsing.

use ast::{
    AnnotatedAssign, Assign, AugmentedAssign, BareDecorator, BareStatement, Decorator,
    ExceptHandler, Expression, Function, ImportedName, Parameter, Statement,
};
use base::{Expected, Parser};
use diagnostics::{Diag, Result};
use lexer::{BareToken::*, Token};
use span::{SourceFile, Spanned};

mod base;
mod expression;
#[cfg(test)]
mod test;

/// Parse the given source file.
pub fn parse(file: &SourceFile) -> Result<ast::Module> {
    let tokens = lexer::lex(file)?;
    parse_tokens(tokens)
}

pub fn parse_tokens(tokens: Vec<Token>) -> Result<ast::Module> {
    Parser::new(tokens).parse_module()
}

impl Parser {
    /// Parse a module.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Module ::= (LINE_BREAK | Statement)* END_OF_INPUT
    /// ```
    fn parse_module(mut self) -> Result<ast::Module> {
        let mut body = Vec::new();

        loop {
            match self.token().bare {
                EndOfInput => break,
                LineBreak => self.advance(),
                _ => body.push(self.parse_statement()?),
            }
        }

        Ok(ast::Module { body })
    }

    /// Parse a statement.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Statement ::=
    ///     | Decorated
    ///     | Function
    ///     | Class
    ///     | Import
    ///     | If
    ///     | While
    ///     | For
    ///     | Try
    ///     | Simple-Statement LINE_BREAK
    /// ```
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.token().bare {
            At => self.parse_decorated(),
            Def => self.parse_function(Vec::new()),
            Class => self.parse_class(Vec::new()),
            From => self.parse_import(),
            If => self.parse_if(),
            While => self.parse_while(),
            For => self.parse_for(),
            Try => self.parse_try(),
            Indentation => Err(Diag::error()
                .message("unexpected indentation")
                .unlabeled_span(self.token())),
            _ => {
                let statement = self.parse_simple_statement()?;
                self.consume_statement_terminator()?;
                Ok(statement)
            }
        }
    }

    fn consume_statement_terminator(&mut self) -> Result {
        match self.token().bare {
            LineBreak => {
                self.advance();
                Ok(())
            }
            EndOfInput | Dedentation => Ok(()),
            _ => Err(Expected::Token(LineBreak).but_actual_is(self.token())),
        }
    }

    /// Parse a simple statement.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Simple-Statement ::=
    ///     | "pass" | "break" | "continue"
    ///     | "return" Expressions?
    ///     | "raise" Expression?
    ///     | "assert" Expression
    ///     | "yield" Expression
    ///     | Expressions (("=" | Augmented-Operator) Expressions | ":" Expression ("=" Expressions)?)?
    /// ```
    fn parse_simple_statement(&mut self) -> Result<Statement> {
        let start = self.token().span;

        let statement = match self.token().bare {
            Pass => {
                self.advance();
                BareStatement::Pass
            }
            Break => {
                self.advance();
                BareStatement::Break
            }
            Continue => {
                self.advance();
                BareStatement::Continue
            }
            Return => {
                self.advance();
                BareStatement::Return(match self.token().bare {
                    LineBreak | EndOfInput | Dedentation => None,
                    _ => Some(self.parse_expressions()?),
                })
            }
            Raise => {
                self.advance();
                BareStatement::Raise(match self.token().bare {
                    LineBreak | EndOfInput | Dedentation => None,
                    _ => Some(self.parse_expression()?),
                })
            }
            Assert => {
                self.advance();
                BareStatement::Assert(self.parse_expression()?)
            }
            Yield => {
                self.advance();
                BareStatement::Yield(self.parse_expressions()?)
            }
            _ => {
                let target = self.parse_expressions()?;

                match self.token().bare {
                    Equals => {
                        self.advance();
                        let value = self.parse_expressions()?;
                        BareStatement::Assign(Box::new(Assign { target, value }))
                    }
                    Colon => {
                        self.advance();
                        let annotation = self.parse_expression()?;
                        let value = if self.maybe_consume(Equals) {
                            Some(self.parse_expressions()?)
                        } else {
                            None
                        };
                        BareStatement::AnnotatedAssign(Box::new(AnnotatedAssign {
                            target,
                            annotation,
                            value,
                        }))
                    }
                    ref token => match expression::augmented_operator(token) {
                        Some(operator) => {
                            self.advance();
                            let value = self.parse_expressions()?;
                            BareStatement::AugmentedAssign(Box::new(AugmentedAssign {
                                target,
                                operator,
                                value,
                            }))
                        }
                        None => BareStatement::Expression(target),
                    },
                }
            }
        };

        Ok(Spanned::new(start.merge(self.preceeding_span()), statement))
    }

    /// Parse a block of statements following a colon.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Block ::= ":" (LINE_BREAK INDENTATION Statement+ DEDENTATION | Simple-Statement LINE_BREAK)
    /// ```
    fn parse_block(&mut self) -> Result<Vec<Statement>> {
        self.consume(Colon)?;

        if !self.maybe_consume(LineBreak) {
            let statement = self.parse_simple_statement()?;
            self.consume_statement_terminator()?;
            return Ok(vec![statement]);
        }

        self.consume(Indentation)?;

        let mut body = Vec::new();
        while !self.maybe_consume(Dedentation) {
            if self.token().bare == EndOfInput {
                break;
            }
            body.push(self.parse_statement()?);
        }

        Ok(body)
    }

    /// Parse a decorated function or class.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Decorated ::= ("@" Word ("(" Expression* ")")? LINE_BREAK)+ (Function | Class)
    /// ```
    fn parse_decorated(&mut self) -> Result<Statement> {
        let mut decorators: Vec<Decorator> = Vec::new();

        while self.token().bare == At {
            let start = self.token().span;
            self.advance();
            let name = self.consume_word()?;

            let arguments = if self.maybe_consume(OpeningRoundBracket) {
                Some(self.parse_comma_separated(ClosingRoundBracket, Self::parse_expression)?)
            } else {
                None
            };

            let span = start.merge(self.preceeding_span());
            self.consume(LineBreak)?;
            decorators.push(Spanned::new(span, BareDecorator { name, arguments }));
        }

        match self.token().bare {
            Def => self.parse_function(decorators),
            Class => self.parse_class(decorators),
            _ => Err(Expected::OneOf(vec![Expected::Token(Def), Expected::Token(Class)])
                .but_actual_is(self.token())),
        }
    }

    /// Parse a function definition.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Function ::= "def" Word "(" (Parameter ("," Parameter)* ","?)? ")" ("->" Expression)? Block
    /// Parameter ::= Word (":" Expression)? ("=" Expression)?
    /// ```
    fn parse_function(&mut self, decorators: Vec<Decorator>) -> Result<Statement> {
        let start = self.consume(Def)?;
        let name = self.consume_word()?;

        self.consume(OpeningRoundBracket)?;
        let parameters = self.parse_comma_separated(ClosingRoundBracket, |this| {
            let name = this.consume_word()?;
            let annotation = if this.maybe_consume(Colon) {
                Some(this.parse_expression()?)
            } else {
                None
            };
            let default = if this.maybe_consume(Equals) {
                Some(this.parse_expression()?)
            } else {
                None
            };

            Ok(Parameter {
                name,
                annotation,
                default,
            })
        })?;

        let returns = if self.maybe_consume(ThinArrowRight) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let signature_span = start.merge(self.preceeding_span());
        let body = self.parse_block()?;

        Ok(Spanned::new(
            signature_span,
            BareStatement::Function(Box::new(Function {
                name,
                decorators,
                parameters,
                returns,
                body,
            })),
        ))
    }

    /// Parse a class definition.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Class ::= "class" Word ("(" (Expression ("," Expression)*)? ")")? Block
    /// ```
    fn parse_class(&mut self, decorators: Vec<Decorator>) -> Result<Statement> {
        let start = self.consume(Class)?;
        let name = self.consume_word()?;

        let bases = if self.maybe_consume(OpeningRoundBracket) {
            self.parse_comma_separated(ClosingRoundBracket, Self::parse_expression)?
        } else {
            Vec::new()
        };

        let header_span = start.merge(self.preceeding_span());
        let body = self.parse_block()?;

        Ok(Spanned::new(
            header_span,
            BareStatement::Class(Box::new(ast::Class {
                name,
                decorators,
                bases,
                body,
            })),
        ))
    }

    /// Parse an import statement.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Import ::= "from" Word ("." Word)* "import" Imported-Name ("," Imported-Name)* LINE_BREAK
    /// Imported-Name ::= Word ("as" Word)?
    /// ```
    fn parse_import(&mut self) -> Result<Statement> {
        let start = self.consume(From)?;

        let first = self.consume_word()?;
        let mut module = Spanned::new(first.span, first.bare.to_str().to_owned());
        while self.maybe_consume(Dot) {
            let segment = self.consume_word()?;
            module.bare.push('.');
            module.bare += segment.bare.to_str();
            module.span = module.span.merge(segment);
        }

        self.consume(Import)?;

        let mut names = Vec::new();
        loop {
            let name = self.consume_word()?;
            let alias = if self.maybe_consume(As) {
                Some(self.consume_word()?)
            } else {
                None
            };
            names.push(ImportedName { name, alias });

            if !self.maybe_consume(Comma) {
                break;
            }
        }

        let span = start.merge(self.preceeding_span());
        self.consume_statement_terminator()?;

        Ok(Spanned::new(
            span,
            BareStatement::Import(Box::new(ast::Import { module, names })),
        ))
    }

    /// Parse a conditional statement.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// If ::= ("if" | "elif") Expression Block ("elif" … | "else" Block)?
    /// ```
    fn parse_if(&mut self) -> Result<Statement> {
        let start = self.token().span;
        // `if` or `elif`
        self.advance();

        let condition = self.parse_expression()?;
        let span = start.merge(&condition);
        let body = self.parse_block()?;

        let orelse = match self.token().bare {
            Elif => vec![self.parse_if()?],
            Else => {
                self.advance();
                self.parse_block()?
            }
            _ => Vec::new(),
        };

        Ok(Spanned::new(
            span,
            BareStatement::If(Box::new(ast::If {
                condition,
                body,
                orelse,
            })),
        ))
    }

    /// Parse a while loop.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// While ::= "while" Expression Block
    /// ```
    fn parse_while(&mut self) -> Result<Statement> {
        let start = self.consume(While)?;
        let condition = self.parse_expression()?;
        let span = start.merge(&condition);
        let body = self.parse_block()?;

        Ok(Spanned::new(
            span,
            BareStatement::While(Box::new(ast::While { condition, body })),
        ))
    }

    /// Parse a for loop.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// For ::= "for" Targets "in" Expressions Block
    /// ```
    fn parse_for(&mut self) -> Result<Statement> {
        let start = self.consume(For)?;
        let target = self.parse_targets()?;
        self.consume(In)?;
        let iterable = self.parse_expressions()?;
        let span = start.merge(&iterable);
        let body = self.parse_block()?;

        Ok(Spanned::new(
            span,
            BareStatement::For(Box::new(ast::For {
                target,
                iterable,
                body,
            })),
        ))
    }

    /// Parse a try statement.
    ///
    /// # Grammar
    ///
    /// ```ebnf
    /// Try ::= "try" Block Handler* ("else" Block)? ("finally" Block)?
    /// Handler ::= "except" (Expression ("as" Word)?)? Block
    /// ```
    fn parse_try(&mut self) -> Result<Statement> {
        let span = self.consume(Try)?;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.token().bare == Except {
            let start = self.token().span;
            self.advance();

            let (type_, name) = if self.token().bare == Colon {
                (None, None)
            } else {
                let type_ = self.parse_expression()?;
                let name = if self.maybe_consume(As) {
                    Some(self.consume_word()?)
                } else {
                    None
                };
                (Some(type_), name)
            };

            let span = start.merge(self.preceeding_span());
            let body = self.parse_block()?;
            handlers.push(ExceptHandler {
                span,
                type_,
                name,
                body,
            });
        }

        let orelse = if self.maybe_consume(Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        let finalbody = if self.maybe_consume(Finally) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(Diag::error()
                .message("try statement without 'except' or 'finally'")
                .unlabeled_span(span));
        }

        Ok(Spanned::new(
            span,
            BareStatement::Try(Box::new(ast::Try {
                body,
                handlers,
                orelse,
                finalbody,
            })),
        ))
    }

    /// Parse comma-separated items up to and including the given closing token.
    ///
    /// A trailing comma is permitted.
    fn parse_comma_separated<T>(
        &mut self,
        closing: lexer::BareToken,
        mut parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();

        loop {
            if self.maybe_consume(closing.clone()) {
                break;
            }

            items.push(parse_item(self)?);

            if !self.maybe_consume(Comma) {
                self.consume(closing)?;
                break;
            }
        }

        Ok(items)
    }
}

/// Parse the given expression written in source code.
///
/// Used for type names synthesized by the compiler.
pub fn parse_expression(source: &str) -> Result<Expression> {
    let tokens = lexer::lex_string(source)?;
    let mut parser = Parser::new(tokens);
    let expression = parser.parse_expression()?;
    parser.consume_statement_terminator()?;
    parser.consume(EndOfInput)?;
    Ok(expression)
}
