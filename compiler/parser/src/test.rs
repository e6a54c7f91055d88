//! Positive and negative behavior tests for the parser.

use super::{parse, parse_expression};
use ast::{BareExpression, BareStatement, Constant, Module, Statement};
use span::SourceMap;

fn parse_module(source: &str) -> Module {
    let mut map = SourceMap::default();
    let file = map.add_str("test", source);
    match parse(&map[file]) {
        Ok(module) => module,
        Err(error) => panic!("unexpected syntax error: {error:?}"),
    }
}

#[track_caller]
fn assert_syntax_error(source: &str, message: &str) {
    let mut map = SourceMap::default();
    let file = map.add_str("test", source);
    match parse(&map[file]) {
        Ok(module) => panic!("expected a syntax error but got {module:#?}"),
        Err(error) => assert_eq!(error.text(), message),
    }
}

/// Render an expression back to source code making precedence explicit.
#[track_caller]
fn assert_expression(source: &str, rendered: &str) {
    match parse_expression(source) {
        Ok(expression) => assert_eq!(expression.to_string(), rendered),
        Err(error) => panic!("unexpected syntax error: {error:?}"),
    }
}

fn function(statement: &Statement) -> &ast::Function {
    match &statement.bare {
        BareStatement::Function(function) => function,
        bare => panic!("expected a function but got {bare:?}"),
    }
}

#[test]
fn operator_precedence() {
    assert_expression("1 + 2 * 3 ** 2", "(1 + (2 * (3 ** 2)))");
    assert_expression("-x ** 2", "-(x ** 2)");
    assert_expression("a or b and not c", "(a or (b and not c))");
    assert_expression("a | b ^ c & d << 1", "(a | (b ^ (c & (d << 1))))");
    assert_expression("a - b - c", "((a - b) - c)");
}

#[test]
fn chained_comparisons() {
    assert_expression("0 <= x < 10", "0 <= x < 10");
    assert_expression("x not in y", "x not in y");
    assert_expression("x is not None", "x is not None");
}

#[test]
fn conditional_expression() {
    assert_expression("a if b else c if d else e", "a if b else c if d else e");
}

#[test]
fn calls_attributes_and_subscripts() {
    assert_expression("foo.bar(1, x=2)[0]", "foo.bar(1, x=2)[0]");
    assert_expression("s[1:]", "s[1:]");
    assert_expression("s[::2]", "s[::2]");
    assert_expression("Pair[i64, string](1, \"a\")", "Pair[(i64, string)](1, \"a\")");
}

#[test]
fn displays_and_comprehensions() {
    assert_expression("[]", "[]");
    assert_expression("{}", "{}");
    assert_expression("(1,)", "(1,)");
    assert_expression("{1: 2, 3: 4}", "{1: 2, 3: 4}");
    assert_expression("{1, 2}", "{1, 2}");
    assert_expression("[x * 2 for x in xs if x > 0]", "[(x * 2) for x in xs if x > 0]");
    assert_expression("{k: v for k, v in items}", "{k: v for (k, v) in items}");
    assert_expression("{x for x in xs}", "{x for x in xs}");
}

#[test]
fn type_annotations() {
    assert_expression("[i64]", "[i64]");
    assert_expression("{string: [u8]}", "{string: [u8]}");
    assert_expression("(i64, optional[Foo])", "(i64, optional[Foo])");
}

#[test]
fn adjacent_string_literals_are_concatenated() {
    let expression = parse_expression("\"ab\" \"cd\"").unwrap();
    assert_eq!(
        expression.bare,
        BareExpression::Constant(Constant::String("abcd".into()))
    );
}

#[test]
fn decorated_function() {
    let module = parse_module(
        "\
@generic(T)
@raises(ValueError)
def first(values: [T], default: T = None) -> T:
    \"\"\"Returns the first value.\"\"\"
    return values[0]
",
    );

    assert_eq!(module.body.len(), 1);
    let function = function(&module.body[0]);
    assert_eq!(function.name.bare, "first");
    assert_eq!(function.decorators.len(), 2);
    assert_eq!(function.decorators[0].name.bare, "generic");
    assert_eq!(function.decorators[0].arguments.as_ref().map(Vec::len), Some(1));
    assert_eq!(function.parameters.len(), 2);
    assert!(function.parameters[1].default.is_some());
    assert_eq!(
        function.returns.as_ref().map(ToString::to_string),
        Some("T".to_owned())
    );
    assert_eq!(ast::docstring(&function.body), Some("Returns the first value."));
}

#[test]
fn class_with_members_and_methods() {
    let module = parse_module(
        "\
class Point(Base):
    x: i64
    _y: i64

    def sum(self) -> i64:
        return self.x + self._y
",
    );

    let BareStatement::Class(class) = &module.body[0].bare else {
        panic!("expected a class");
    };
    assert_eq!(class.name.bare, "Point");
    assert_eq!(class.bases.len(), 1);
    assert_eq!(class.body.len(), 3);
    assert!(function(&class.body[2]).is_method());
}

#[test]
fn if_elif_else() {
    let module = parse_module(
        "\
if a:
    pass
elif b:
    x = 1
else:
    x = 2
",
    );

    let BareStatement::If(if_) = &module.body[0].bare else {
        panic!("expected a conditional");
    };
    assert_eq!(if_.orelse.len(), 1);
    let BareStatement::If(elif) = &if_.orelse[0].bare else {
        panic!("expected a nested conditional");
    };
    assert_eq!(elif.orelse.len(), 1);
}

#[test]
fn statements() {
    let module = parse_module(
        "\
from foo.bar import baz as qux, Quux
def main():
    a, b = 1, 2
    c: [i64] = []
    c += [a]
    for i, x in enumerate(c):
        continue
    while True:
        break
    try:
        raise ValueError()
    except ValueError as error:
        pass
    except:
        pass
    finally:
        pass
    assert a == 1
",
    );

    let BareStatement::Import(import) = &module.body[0].bare else {
        panic!("expected an import");
    };
    assert_eq!(import.module.bare, "foo.bar");
    assert_eq!(import.names[0].binder().bare, "qux");
    assert_eq!(import.names[1].binder().bare, "Quux");

    let body = &function(&module.body[1]).body;
    assert!(matches!(body[0].bare, BareStatement::Assign(_)));
    assert!(matches!(body[1].bare, BareStatement::AnnotatedAssign(_)));
    assert!(matches!(body[2].bare, BareStatement::AugmentedAssign(_)));
    assert!(matches!(body[3].bare, BareStatement::For(_)));
    assert!(matches!(body[4].bare, BareStatement::While(_)));
    let BareStatement::Try(try_) = &body[5].bare else {
        panic!("expected a try statement");
    };
    assert_eq!(try_.handlers.len(), 2);
    assert!(try_.handlers[1].type_.is_none());
    assert_eq!(try_.finalbody.len(), 1);
    assert!(matches!(body[6].bare, BareStatement::Assert(_)));
}

#[test]
fn generator_function() {
    let module = parse_module(
        "\
def count(n: i64) -> iterator[i64]:
    i = 0
    while i < n:
        yield i
        i += 1
",
    );

    assert!(function(&module.body[0]).contains_yield());
}

#[test]
fn one_line_block() {
    let module = parse_module("def f(): pass\n");
    assert_eq!(function(&module.body[0]).body.len(), 1);
}

#[test]
fn missing_colon() {
    assert_syntax_error("def f()\n    pass\n", "found line break but expected ':'");
}

#[test]
fn unexpected_indentation() {
    assert_syntax_error("x = 1\n    y = 2\n", "unexpected indentation");
}

#[test]
fn positional_argument_after_keyword_argument() {
    assert_syntax_error(
        "f(x=1, 2)\n",
        "positional argument follows keyword argument",
    );
}

#[test]
fn decorator_without_definition() {
    assert_syntax_error("@test\nx = 1\n", "found identifier but expected 'def' or 'class'");
}
