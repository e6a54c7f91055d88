//! The lexical analyzer (lexer).
//!
//! The language is indentation-sensitive. Apart from ordinary tokens, the lexer emits
//! [line breaks](BareToken::LineBreak) terminating logical lines as well as
//! [indentation](BareToken::Indentation) and [dedentation](BareToken::Dedentation) tokens
//! whenever the indentation of a logical line changes. Inside of brackets, line breaks and
//! indentation are insignificant.

use diagnostics::{Diag, Result};
use span::{SourceFile, SourceMap, Span, Spanned};
use token::{parse_keyword, parse_reserved_punctuation, Bracket};
use utility::{Int, QuoteExt};
use BareToken::*;

pub use token::{BareToken, Token};

#[cfg(test)]
mod test;
pub mod token;

pub fn lex(file: &SourceFile) -> Result<Vec<Token>> {
    Lexer::new(file).lex()
}

pub fn lex_string(source: &str) -> Result<Vec<Token>> {
    let mut map = SourceMap::default();
    let file = map.add_str("<string>", source);
    lex(&map[file])
}

/// The state of the lexer.
struct Lexer<'a> {
    file: &'a SourceFile,
    source: &'a str,
    /// The file-local byte offset of the next character.
    index: usize,
    /// The file-local byte offset of the token-to-be-added.
    start: usize,
    tokens: Vec<Token>,
    /// The indentation levels in spaces of the enclosing blocks. Never empty.
    indentations: Vec<usize>,
    brackets: Vec<Spanned<Bracket>>,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a SourceFile) -> Self {
        Self {
            source: file.content(),
            file,
            index: 0,
            start: 0,
            tokens: Vec::new(),
            indentations: vec![0],
            brackets: Vec::new(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>> {
        self.lex_indentation()?;

        while let Some(character) = self.peek() {
            self.start = self.index;

            match character {
                ' ' | '\t' | '\r' => self.advance(),
                '#' => self.lex_comment(),
                '\\' if self.peek_nth(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '\n' if self.brackets.is_empty() => {
                    self.advance();
                    self.add_line_break();
                    self.lex_indentation()?;
                }
                '\n' => self.advance(),
                'b' if self.peek_nth(1) == Some('"') => self.lex_bytes_literal()?,
                character if is_identifier_start(character) => self.lex_identifier(),
                character if character.is_ascii_digit() => self.lex_number_literal()?,
                '"' => self.lex_string_literal()?,
                '\'' => self.lex_char_literal()?,
                '(' => self.add_opening_bracket(Bracket::Round),
                '[' => self.add_opening_bracket(Bracket::Square),
                '{' => self.add_opening_bracket(Bracket::Curly),
                ')' => self.add_closing_bracket(Bracket::Round)?,
                ']' => self.add_closing_bracket(Bracket::Square)?,
                '}' => self.add_closing_bracket(Bracket::Curly)?,
                character if token::is_punctuation(character) => self.lex_punctuation()?,
                character => {
                    self.advance();
                    return Err(Diag::error()
                        .message(format!("invalid character {}", character.quote()))
                        .unlabeled_span(self.span()));
                }
            }
        }

        if let Some(bracket) = self.brackets.last() {
            return Err(Diag::error()
                .message(format!("unbalanced {} bracket", bracket.bare))
                .unlabeled_span(bracket));
        }

        self.start = self.index;
        self.add_line_break();
        for _ in 1..self.indentations.len() {
            self.add(Dedentation);
        }
        self.add(EndOfInput);

        Ok(self.tokens)
    }

    /// Lex the indentation of the next non-blank line.
    ///
    /// Blank lines and lines only containing a comment do not affect the indentation.
    fn lex_indentation(&mut self) -> Result {
        loop {
            self.start = self.index;
            let mut spaces = 0;

            while let Some(character) = self.peek() {
                match character {
                    ' ' => spaces += 1,
                    '\t' => {
                        self.start = self.index;
                        self.advance();
                        return Err(Diag::error()
                            .message("tabs are not allowed in indentation")
                            .unlabeled_span(self.span()));
                    }
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => return Ok(()),
                Some('\n' | '\r') => {
                    self.take_while(|character| character != '\n');
                    self.advance();
                    continue;
                }
                Some('#') => {
                    self.lex_comment();
                    self.advance();
                    continue;
                }
                Some(_) => {}
            }

            let current = self.current_indentation();

            if spaces > current {
                self.indentations.push(spaces);
                self.add(Indentation);
            } else if spaces < current {
                while spaces < self.current_indentation() {
                    self.indentations.pop();
                    self.start = self.index;
                    self.add(Dedentation);
                }

                if spaces != self.current_indentation() {
                    return Err(Diag::error()
                        .message("dedentation does not match any outer indentation level")
                        .unlabeled_span(self.span()));
                }
            }

            return Ok(());
        }
    }

    fn current_indentation(&self) -> usize {
        self.indentations.last().copied().unwrap_or_default()
    }

    /// Skip a comment up to but excluding the line break.
    fn lex_comment(&mut self) {
        self.take_while(|character| character != '\n');
    }

    fn add_line_break(&mut self) {
        if self
            .tokens
            .last()
            .is_some_and(|token| !token.bare.is_line_break_like())
        {
            self.add(LineBreak);
        }
    }

    fn lex_identifier(&mut self) {
        self.take_while(is_identifier_middle);

        match parse_keyword(self.source()) {
            Some(keyword) => self.add(keyword),
            None => self.add(Word(self.source().into())),
        }
    }

    fn lex_punctuation(&mut self) -> Result {
        // longest match
        for length in (1..=3).rev() {
            let Some(candidate) = self.source.get(self.index..self.index + length) else {
                continue;
            };

            if let Some(punctuation) = parse_reserved_punctuation(candidate) {
                self.index += length;
                self.add(punctuation);
                return Ok(());
            }
        }

        self.advance();
        Err(Diag::error()
            .message(format!("invalid punctuation {}", self.source().quote()))
            .unlabeled_span(self.span()))
    }

    fn lex_number_literal(&mut self) -> Result {
        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.advance();
            self.advance();
        }

        let mut digits = String::new();
        let mut is_float = false;

        self.lex_digits(&mut digits, radix)?;

        if radix == 10 {
            if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                digits.push('.');
                self.advance();
                self.lex_digits(&mut digits, 10)?;
            }

            if let Some('e' | 'E') = self.peek() {
                let exponent_start = match self.peek_nth(1) {
                    Some('+' | '-') => self.peek_nth(2),
                    character => character,
                };

                if exponent_start.is_some_and(|c| c.is_ascii_digit()) {
                    is_float = true;
                    digits.push('e');
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        digits.push(sign);
                        self.advance();
                    }
                    self.lex_digits(&mut digits, 10)?;
                }
            }
        }

        if self.peek().is_some_and(is_identifier_middle) {
            self.take_while(is_identifier_middle);
            return Err(Diag::error()
                .message(format!("invalid number literal {}", self.source().quote()))
                .unlabeled_span(self.span()));
        }

        if is_float {
            self.add(FloatLiteral(digits.as_str().into()));
            return Ok(());
        }

        match Int::parse_bytes(digits.as_bytes(), radix) {
            Some(value) => {
                self.add(IntegerLiteral(value));
                Ok(())
            }
            None => Err(Diag::error()
                .message(format!("invalid number literal {}", self.source().quote()))
                .unlabeled_span(self.span())),
        }
    }

    fn lex_digits(&mut self, digits: &mut String, radix: u32) -> Result {
        let mut previous_was_separator = false;

        while let Some(character) = self.peek() {
            if character == NUMERIC_SEPARATOR {
                if previous_was_separator {
                    self.advance();
                    return Err(Diag::error()
                        .message("consecutive separators in number literal")
                        .unlabeled_span(self.span()));
                }
                previous_was_separator = true;
            } else if character.is_digit(radix) {
                digits.push(character);
                previous_was_separator = false;
            } else {
                break;
            }
            self.advance();
        }

        if previous_was_separator {
            return Err(Diag::error()
                .message("trailing separator in number literal")
                .unlabeled_span(self.span()));
        }

        Ok(())
    }

    fn lex_string_literal(&mut self) -> Result {
        let is_triple = self.source[self.index..].starts_with(r#"""""#);
        let quotes = if is_triple { 3 } else { 1 };
        self.index += quotes;

        let mut content = String::new();

        loop {
            match self.peek() {
                None => return Err(self.unterminated("string")),
                Some('\n') if !is_triple => return Err(self.unterminated("string")),
                Some('"') if !is_triple => {
                    self.advance();
                    break;
                }
                Some('"') if self.source[self.index..].starts_with(r#"""""#) => {
                    self.index += 3;
                    break;
                }
                Some('\\') => content.push(self.lex_escape_sequence()?),
                Some(character) => {
                    content.push(character);
                    self.advance();
                }
            }
        }

        self.add(StringLiteral(content));
        Ok(())
    }

    fn lex_bytes_literal(&mut self) -> Result {
        // `b"`
        self.advance();
        self.advance();

        let mut content = Vec::new();

        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.unterminated("bytes")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_nth(1) == Some('x') => {
                    self.advance();
                    self.advance();
                    content.push(self.lex_hex_byte()?);
                }
                Some('\\') => {
                    let character = self.lex_escape_sequence()?;
                    let mut buffer = [0; 4];
                    content.extend_from_slice(character.encode_utf8(&mut buffer).as_bytes());
                }
                Some(character) => {
                    let mut buffer = [0; 4];
                    content.extend_from_slice(character.encode_utf8(&mut buffer).as_bytes());
                    self.advance();
                }
            }
        }

        self.add(BytesLiteral(content));
        Ok(())
    }

    fn lex_char_literal(&mut self) -> Result {
        self.advance();

        let character = match self.peek() {
            None | Some('\n' | '\'') => return Err(self.unterminated("character")),
            Some('\\') => self.lex_escape_sequence()?,
            Some(character) => {
                self.advance();
                character
            }
        };

        if self.peek() != Some('\'') {
            self.take_while(|character| character != '\'' && character != '\n');
            return Err(Diag::error()
                .message("character literal contains more than one character")
                .unlabeled_span(self.span()));
        }
        self.advance();

        self.add(CharLiteral(character));
        Ok(())
    }

    fn lex_escape_sequence(&mut self) -> Result<char> {
        let escape_start = self.index;
        // `\`
        self.advance();

        let character = match self.peek() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('u') if self.peek_nth(1) == Some('{') => {
                self.advance();
                self.advance();
                let mut digits = String::new();
                while let Some(character) = self.peek() {
                    self.advance();
                    if character == '}' {
                        break;
                    }
                    digits.push(character);
                }

                return u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        Diag::error()
                            .message("invalid unicode escape sequence")
                            .unlabeled_span(self.span_from(escape_start))
                    });
            }
            _ => {
                self.advance();
                return Err(Diag::error()
                    .message(format!(
                        "invalid escape sequence {}",
                        self.source[escape_start..self.index].quote()
                    ))
                    .unlabeled_span(self.span_from(escape_start)));
            }
        };

        self.advance();
        Ok(character)
    }

    fn lex_hex_byte(&mut self) -> Result<u8> {
        let start = self.index;
        let digits = self.source.get(start..start + 2).unwrap_or_default();

        match u8::from_str_radix(digits, 16) {
            Ok(byte) if digits.len() == 2 => {
                self.index += 2;
                Ok(byte)
            }
            _ => Err(Diag::error()
                .message("invalid hexadecimal escape sequence")
                .unlabeled_span(self.span_from(start))),
        }
    }

    fn unterminated(&self, kind: &str) -> Diag {
        Diag::error()
            .message(format!("unterminated {kind} literal"))
            .unlabeled_span(self.span())
    }

    fn add_opening_bracket(&mut self, bracket: Bracket) {
        self.advance();
        self.add(bracket.opening());
        self.brackets.push(Spanned::new(self.span(), bracket));
    }

    fn add_closing_bracket(&mut self, bracket: Bracket) -> Result {
        self.advance();

        match self.brackets.pop() {
            Some(opening) if opening.bare == bracket => {}
            Some(opening) => {
                return Err(Diag::error()
                    .message(format!(
                        "unbalanced {} bracket, expected a closing {} bracket",
                        bracket, opening.bare
                    ))
                    .unlabeled_span(self.span()));
            }
            None => {
                return Err(Diag::error()
                    .message(format!("unbalanced {bracket} bracket"))
                    .unlabeled_span(self.span()));
            }
        }

        self.add(bracket.closing());
        Ok(())
    }

    fn span(&self) -> Span {
        self.span_from(self.start)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file.global(start), self.file.global(self.index))
    }

    fn source(&self) -> &'a str {
        &self.source[self.start..self.index]
    }

    /// Step to the next character in the input stream.
    fn advance(&mut self) {
        if let Some(character) = self.peek() {
            self.index += character.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.index..].chars().nth(n)
    }

    /// Step over all succeeding characters where the predicate holds.
    fn take_while(&mut self, predicate: fn(char) -> bool) {
        while let Some(character) = self.peek() {
            if !predicate(character) {
                break;
            }
            self.advance();
        }
    }

    /// Add a token with the given kind to the output of the lexer.
    ///
    /// The span of the token reaches from the start of the current token to the current index.
    fn add(&mut self, token: BareToken) {
        let span = self.span();
        self.tokens.push(Spanned::new(span, token));
    }
}

const NUMERIC_SEPARATOR: char = '_';

fn is_identifier_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_identifier_middle(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_'
}
