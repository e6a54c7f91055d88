use ast::Identifier;
use diagnostics::{Diag, Result};
use lexer::{BareToken, Token};
use span::{Span, Spanned};
use utility::{Conjunction, ListingExt};

/// The parser.
pub(crate) struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub(crate) fn expect(&self, expected: BareToken) -> Result<&Token> {
        let token = self.token();
        if token.bare == expected {
            Ok(token)
        } else {
            Err(Expected::Token(expected).but_actual_is(token))
        }
    }

    /// [Expect] the current token to match the given one and [advance] on success.
    ///
    /// [Expect]: Self::expect
    /// [advance]: Self::advance
    pub(crate) fn consume(&mut self, token: BareToken) -> Result<Span> {
        let span = self.expect(token)?.span;
        self.advance();
        Ok(span)
    }

    pub(crate) fn consume_word(&mut self) -> Result<Identifier> {
        let token = self.token();
        match token.bare {
            BareToken::Word(word) => {
                let identifier = Spanned::new(token.span, word);
                self.advance();
                Ok(identifier)
            }
            _ => Err(Expected::Identifier.but_actual_is(token)),
        }
    }

    /// Consume the current token if it matches the given one.
    ///
    /// Returns whether the token was found and skipped.
    #[must_use]
    pub(crate) fn maybe_consume(&mut self, token: BareToken) -> bool {
        if self.token().bare == token {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Step to the next token.
    ///
    /// Don't advance past [`BareToken::EndOfInput`].
    pub(crate) fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Get the current token.
    pub(crate) fn token(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// Look ahead by the given amount of tokens.
    ///
    /// Looking past the end yields the [end of input](BareToken::EndOfInput).
    pub(crate) fn look_ahead(&self, amount: usize) -> &Token {
        let index = (self.index + amount).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn preceeding_span(&self) -> Span {
        self.index
            .checked_sub(1)
            .map_or_else(|| self.token().span, |index| self.tokens[index].span)
    }
}

pub(crate) enum Expected {
    Token(BareToken),
    Identifier,
    Category(&'static str),
    OneOf(Vec<Self>),
}

impl Expected {
    pub(crate) fn but_actual_is(self, actual: &Token) -> Diag {
        Diag::error()
            .message(format!("found {} but expected {self}", actual.bare))
            .unlabeled_span(actual)
    }
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(token) => write!(f, "{token}"),
            Self::Identifier => f.write_str("identifier"),
            Self::Category(category) => f.write_str(category),
            Self::OneOf(expected) => write!(f, "{}", expected.iter().list(Conjunction::Or)),
        }
    }
}
