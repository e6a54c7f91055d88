use crate::{lex_string, BareToken::*, Token};
use span::span;
use utility::difference;

fn lex(source: &str) -> Vec<Token> {
    match lex_string(source) {
        Ok(tokens) => tokens,
        Err(error) => panic!("unexpected lexical error: {error:?}"),
    }
}

#[track_caller]
fn assert_lex_eq(source: &str, expected: Vec<Token>) {
    let actual = lex(source);

    if actual != expected {
        panic!(
            "the output by the lexer does not match the expected one:\n{}",
            difference(&format!("{expected:#?}"), &format!("{actual:#?}"), "\n"),
        );
    }
}

#[track_caller]
fn assert_lex_error(source: &str, message: &str) {
    match lex_string(source) {
        Ok(tokens) => panic!("expected a lexical error but got {tokens:#?}"),
        Err(error) => assert_eq!(error.text(), message),
    }
}

fn bare(source: &str) -> Vec<crate::BareToken> {
    lex(source).into_iter().map(|token| token.bare).collect()
}

#[test]
fn identifiers_and_keywords() {
    assert_lex_eq(
        "def foo_bar(self)",
        vec![
            Token::new(span(1, 4), Def),
            Token::new(span(5, 12), Word("foo_bar".into())),
            Token::new(span(12, 13), OpeningRoundBracket),
            Token::new(span(13, 17), Word("self".into())),
            Token::new(span(17, 18), ClosingRoundBracket),
            Token::new(span(18, 18), LineBreak),
            Token::new(span(18, 18), EndOfInput),
        ],
    );
}

#[test]
fn indentation_and_dedentation() {
    assert_eq!(
        bare(
            "\
if x:
    y = 1
    if z:
        pass
w = 2
"
        ),
        vec![
            If,
            Word("x".into()),
            Colon,
            LineBreak,
            Indentation,
            Word("y".into()),
            Equals,
            IntegerLiteral(1.into()),
            LineBreak,
            If,
            Word("z".into()),
            Colon,
            LineBreak,
            Indentation,
            Pass,
            LineBreak,
            Dedentation,
            Dedentation,
            Word("w".into()),
            Equals,
            IntegerLiteral(2.into()),
            LineBreak,
            EndOfInput,
        ]
    );
}

#[test]
fn dedentation_at_end_of_input() {
    assert_eq!(
        bare("def f():\n    pass"),
        vec![
            Def,
            Word("f".into()),
            OpeningRoundBracket,
            ClosingRoundBracket,
            Colon,
            LineBreak,
            Indentation,
            Pass,
            LineBreak,
            Dedentation,
            EndOfInput,
        ]
    );
}

#[test]
fn blank_and_comment_lines_do_not_affect_indentation() {
    assert_eq!(
        bare("if x:\n\n        # comment\n    pass  # trailing\n\n"),
        vec![
            If,
            Word("x".into()),
            Colon,
            LineBreak,
            Indentation,
            Pass,
            LineBreak,
            Dedentation,
            EndOfInput,
        ]
    );
}

#[test]
fn line_breaks_inside_brackets_are_ignored() {
    assert_eq!(
        bare("x = [\n    1,\n        2]\n"),
        vec![
            Word("x".into()),
            Equals,
            OpeningSquareBracket,
            IntegerLiteral(1.into()),
            Comma,
            IntegerLiteral(2.into()),
            ClosingSquareBracket,
            LineBreak,
            EndOfInput,
        ]
    );
}

#[test]
fn number_literals() {
    assert_eq!(
        bare("0x_ff 0o17 0b101 1_000 1.5 2e3 7.25e-1"),
        vec![
            IntegerLiteral(255.into()),
            IntegerLiteral(15.into()),
            IntegerLiteral(5.into()),
            IntegerLiteral(1000.into()),
            FloatLiteral("1.5".into()),
            FloatLiteral("2e3".into()),
            FloatLiteral("7.25e-1".into()),
            LineBreak,
            EndOfInput,
        ]
    );
}

#[test]
fn huge_integer_literal() {
    let tokens = bare("0xffff_ffff_ffff_ffff_ff");
    let expected: utility::Int = utility::Int::from(u64::MAX) * 256 + 255;
    assert_eq!(tokens[0], IntegerLiteral(expected));
}

#[test]
fn attribute_access_on_integer_is_not_a_float() {
    assert_eq!(
        bare("x.y"),
        vec![Word("x".into()), Dot, Word("y".into()), LineBreak, EndOfInput]
    );
}

#[test]
fn text_literals() {
    assert_eq!(
        bare(r#""a\tb\"" b"\x00z" 'c' '\n' """multi "line"
text""""#),
        vec![
            StringLiteral("a\tb\"".into()),
            BytesLiteral(vec![0, b'z']),
            CharLiteral('c'),
            CharLiteral('\n'),
            StringLiteral("multi \"line\"\ntext".into()),
            LineBreak,
            EndOfInput,
        ]
    );
}

#[test]
fn punctuation_longest_match() {
    assert_eq!(
        bare("a **= b // c -> d != e <<= f"),
        vec![
            Word("a".into()),
            DoubleAsteriskEquals,
            Word("b".into()),
            DoubleSlash,
            Word("c".into()),
            ThinArrowRight,
            Word("d".into()),
            NotEquals,
            Word("e".into()),
            DoubleLessEquals,
            Word("f".into()),
            LineBreak,
            EndOfInput,
        ]
    );
}

#[test]
fn tabs_in_indentation() {
    assert_lex_error("if x:\n\tpass\n", "tabs are not allowed in indentation");
}

#[test]
fn inconsistent_dedentation() {
    assert_lex_error(
        "if x:\n    if y:\n        pass\n  pass\n",
        "dedentation does not match any outer indentation level",
    );
}

#[test]
fn unbalanced_brackets() {
    assert_lex_error("f(x", "unbalanced round bracket");
    assert_lex_error("f(x]", "unbalanced square bracket, expected a closing round bracket");
}

#[test]
fn unterminated_string_literal() {
    assert_lex_error("x = \"abc\n", "unterminated string literal");
}

#[test]
fn invalid_number_literals() {
    assert_lex_error("1__0", "consecutive separators in number literal");
    assert_lex_error("10_", "trailing separator in number literal");
    assert_lex_error("12abc", "invalid number literal '12abc'");
}

#[test]
fn invalid_character() {
    assert_lex_error("x = $", "invalid character '$'");
}
