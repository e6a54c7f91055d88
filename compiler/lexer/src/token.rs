//! The tokens emitted by the lexer.

use span::Spanned;
use std::fmt;
use utility::{Atom, Int};
use BareToken::*;

pub type Token = Spanned<BareToken>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BareToken {
    //
    // Keywords
    //
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Elif,
    Else,
    Except,
    False,
    Finally,
    For,
    From,
    If,
    Import,
    In,
    Is,
    /// `None`
    None_,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    True,
    Try,
    While,
    Yield,
    //
    // Reserved Symbols
    //
    Ampersand,
    AmpersandEquals,
    Asterisk,
    AsteriskEquals,
    At,
    Caret,
    CaretEquals,
    Colon,
    Dot,
    DoubleAsterisk,
    DoubleAsteriskEquals,
    DoubleEquals,
    DoubleGreater,
    DoubleGreaterEquals,
    DoubleLess,
    DoubleLessEquals,
    DoubleSlash,
    DoubleSlashEquals,
    Equals,
    Greater,
    GreaterEquals,
    Less,
    LessEquals,
    Minus,
    MinusEquals,
    NotEquals,
    Percent,
    PercentEquals,
    Pipe,
    PipeEquals,
    Plus,
    PlusEquals,
    Slash,
    SlashEquals,
    /// `->`
    ThinArrowRight,
    Tilde,
    //
    // Punctuation
    //
    Comma,
    ClosingCurlyBracket,
    ClosingRoundBracket,
    ClosingSquareBracket,
    OpeningCurlyBracket,
    OpeningRoundBracket,
    OpeningSquareBracket,
    //
    // Other Tokens
    //
    Dedentation,
    EndOfInput,
    Indentation,
    LineBreak,
    BytesLiteral(Vec<u8>),
    CharLiteral(char),
    /// The unprocessed text of a float literal.
    FloatLiteral(Atom),
    IntegerLiteral(Int),
    StringLiteral(String),
    Word(Atom),
}

impl BareToken {
    pub const fn is_line_break_like(&self) -> bool {
        matches!(self, LineBreak | Indentation | Dedentation)
    }
}

impl fmt::Display for BareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            //
            // Keywords
            //
            And => "'and'",
            As => "'as'",
            Assert => "'assert'",
            Break => "'break'",
            Class => "'class'",
            Continue => "'continue'",
            Def => "'def'",
            Elif => "'elif'",
            Else => "'else'",
            Except => "'except'",
            False => "'False'",
            Finally => "'finally'",
            For => "'for'",
            From => "'from'",
            If => "'if'",
            Import => "'import'",
            In => "'in'",
            Is => "'is'",
            None_ => "'None'",
            Not => "'not'",
            Or => "'or'",
            Pass => "'pass'",
            Raise => "'raise'",
            Return => "'return'",
            True => "'True'",
            Try => "'try'",
            While => "'while'",
            Yield => "'yield'",
            //
            // Reserved Symbols
            //
            Ampersand => "'&'",
            AmpersandEquals => "'&='",
            Asterisk => "'*'",
            AsteriskEquals => "'*='",
            At => "'@'",
            Caret => "'^'",
            CaretEquals => "'^='",
            Colon => "':'",
            Dot => "'.'",
            DoubleAsterisk => "'**'",
            DoubleAsteriskEquals => "'**='",
            DoubleEquals => "'=='",
            DoubleGreater => "'>>'",
            DoubleGreaterEquals => "'>>='",
            DoubleLess => "'<<'",
            DoubleLessEquals => "'<<='",
            DoubleSlash => "'//'",
            DoubleSlashEquals => "'//='",
            Equals => "'='",
            Greater => "'>'",
            GreaterEquals => "'>='",
            Less => "'<'",
            LessEquals => "'<='",
            Minus => "'-'",
            MinusEquals => "'-='",
            NotEquals => "'!='",
            Percent => "'%'",
            PercentEquals => "'%='",
            Pipe => "'|'",
            PipeEquals => "'|='",
            Plus => "'+'",
            PlusEquals => "'+='",
            Slash => "'/'",
            SlashEquals => "'/='",
            ThinArrowRight => "'->'",
            Tilde => "'~'",
            //
            // Punctuation
            //
            Comma => "','",
            ClosingCurlyBracket => "'}'",
            ClosingRoundBracket => "')'",
            ClosingSquareBracket => "']'",
            OpeningCurlyBracket => "'{'",
            OpeningRoundBracket => "'('",
            OpeningSquareBracket => "'['",
            //
            // Other Tokens
            //
            Dedentation => "dedentation",
            EndOfInput => "end of input",
            Indentation => "indentation",
            LineBreak => "line break",
            BytesLiteral(_) => "bytes literal",
            CharLiteral(_) => "character literal",
            FloatLiteral(_) => "float literal",
            IntegerLiteral(_) => "integer literal",
            StringLiteral(_) => "string literal",
            Word(_) => "identifier",
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bracket {
    Round,
    Square,
    Curly,
}

impl Bracket {
    pub const fn opening(self) -> BareToken {
        match self {
            Self::Round => OpeningRoundBracket,
            Self::Square => OpeningSquareBracket,
            Self::Curly => OpeningCurlyBracket,
        }
    }

    pub const fn closing(self) -> BareToken {
        match self {
            Self::Round => ClosingRoundBracket,
            Self::Square => ClosingSquareBracket,
            Self::Curly => ClosingCurlyBracket,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Square => "square",
            Self::Curly => "curly",
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn parse_keyword(source: &str) -> Option<BareToken> {
    Some(match source {
        "and" => And,
        "as" => As,
        "assert" => Assert,
        "break" => Break,
        "class" => Class,
        "continue" => Continue,
        "def" => Def,
        "elif" => Elif,
        "else" => Else,
        "except" => Except,
        "False" => False,
        "finally" => Finally,
        "for" => For,
        "from" => From,
        "if" => If,
        "import" => Import,
        "in" => In,
        "is" => Is,
        "None" => None_,
        "not" => Not,
        "or" => Or,
        "pass" => Pass,
        "raise" => Raise,
        "return" => Return,
        "True" => True,
        "try" => Try,
        "while" => While,
        "yield" => Yield,
        _ => return None,
    })
}

pub(crate) fn parse_reserved_punctuation(source: &str) -> Option<BareToken> {
    Some(match source {
        "&" => Ampersand,
        "&=" => AmpersandEquals,
        "*" => Asterisk,
        "*=" => AsteriskEquals,
        "@" => At,
        "^" => Caret,
        "^=" => CaretEquals,
        ":" => Colon,
        "." => Dot,
        "**" => DoubleAsterisk,
        "**=" => DoubleAsteriskEquals,
        "==" => DoubleEquals,
        ">>" => DoubleGreater,
        ">>=" => DoubleGreaterEquals,
        "<<" => DoubleLess,
        "<<=" => DoubleLessEquals,
        "//" => DoubleSlash,
        "//=" => DoubleSlashEquals,
        "=" => Equals,
        ">" => Greater,
        ">=" => GreaterEquals,
        "<" => Less,
        "<=" => LessEquals,
        "-" => Minus,
        "-=" => MinusEquals,
        "!=" => NotEquals,
        "%" => Percent,
        "%=" => PercentEquals,
        "|" => Pipe,
        "|=" => PipeEquals,
        "+" => Plus,
        "+=" => PlusEquals,
        "/" => Slash,
        "/=" => SlashEquals,
        "->" => ThinArrowRight,
        "~" => Tilde,
        "," => Comma,
        _ => return None,
    })
}

pub(crate) const fn is_punctuation(character: char) -> bool {
    matches!(
        character,
        '&' | '*' | '@' | '^' | ':' | '.' | '=' | '>' | '<' | '-' | '!' | '%' | '|' | '+' | '/' | '~' | ','
    )
}
