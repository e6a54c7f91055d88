use super::{
    arrange_arguments, check_integer_range, default_type, iteration_type, value_type, Argument,
};
use ast::{BareExpression, BareStatement, Expression};
use hir::{Definitions, Primitive, Type};
use session::{Context, Registry, Specializations};
use span::{SourceMap, Span};
use utility::{Atom, Int};

const LIBRARY: &str = "\
def twice(value: i64) -> i64:
    return 2 * value

def twice(value: string) -> string:
    return value + value

def widen(value: i32) -> i64:
    return i64(value)

def widen(value: i64) -> i64:
    return value

def area(width: i64, height: i64 = 1) -> i64:
    return width * height

@generic(T)
def first(values: [T]) -> T:
    return values[0]

class Vault:
    _secret: i64

    def peek(self) -> i64:
        return self._secret

class Counter:
    _count: i64

    def next(self) -> optional[i64]:
        return None
";

fn registry() -> Registry {
    let mut map = SourceMap::default();
    let file = map.add_str("lib", LIBRARY);
    let syntax = parser::parse(&map[file]).unwrap();
    let mut modules: Vec<Definitions> =
        vec![collector::collect("lib", &syntax, collector::Options::default()).unwrap()];
    resolver::resolve(&mut modules).unwrap();
    Registry::new(modules)
}

fn expression(source: &str) -> Expression {
    let mut map = SourceMap::default();
    let file = map.add_str("expression", &format!("{source}\n"));
    let module = parser::parse(&map[file]).unwrap();
    let BareStatement::Expression(expression) = &module.body[0].bare else {
        panic!("expected an expression statement");
    };
    expression.clone()
}

fn with_context<T>(run: impl FnOnce(&mut Context<'_>) -> T) -> T {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");
    context.push_scope();
    run(&mut context)
}

#[track_caller]
fn type_of(source: &str) -> Type {
    with_context(|context| match value_type(context, &expression(source)) {
        Ok(type_) => type_,
        Err(error) => panic!("unexpected error: {}", error.text()),
    })
}

#[track_caller]
fn error_of(source: &str) -> String {
    with_context(|context| match value_type(context, &expression(source)) {
        Ok(type_) => panic!("expected an error but got {type_}"),
        Err(error) => error.text().to_owned(),
    })
}

#[test]
fn number_literals_are_candidates() {
    assert_eq!(type_of("1"), Type::integer_candidates());
    assert_eq!(type_of("1.5"), Type::float_candidates());
    assert_eq!(default_type(&type_of("1 + 2")), Type::I64);
    assert_eq!(default_type(&type_of("[1, 2]")), Type::list(Type::I64));
}

#[test]
fn literals_narrow_to_the_other_operand() {
    assert_eq!(type_of("u8(1) + 2"), Type::U8);
    assert_eq!(type_of("[1, i32(2)]"), Type::list(Type::Primitive(Primitive::I32)));
}

#[test]
fn mismatched_operands() {
    assert_eq!(error_of("1 + 2.0"), "types 'i64' and 'f64' differ");
    assert_eq!(error_of("[1, \"one\"]"), "types 'i64' and 'string' differ");
    assert_eq!(error_of("\"a\" - \"b\""), "operator '-' is not supported by type 'string'");
}

#[test]
fn repetition_of_strings() {
    assert_eq!(type_of("\"ab\" * 3"), Type::String);
}

#[test]
fn empty_displays_need_a_context() {
    assert_eq!(error_of("[]"), "cannot infer the type of an empty list");
}

#[test]
fn integer_ranges() {
    let span = Span::default();

    assert!(check_integer_range(&Int::from(255), Primitive::U8, span).is_ok());
    assert!(check_integer_range(&Int::from(-128), Primitive::I8, span).is_ok());

    let error = check_integer_range(&Int::from(256), Primitive::U8, span).unwrap_err();
    assert_eq!(error.text(), "integer literal out of range for 'u8'");
    assert_eq!(error.notes().collect::<Vec<_>>(), ["the range of 'u8' is 0 to 255"]);

    let error = check_integer_range(&Int::from(-1), Primitive::U64, span).unwrap_err();
    assert_eq!(error.text(), "integer literal out of range for 'u64'");

    let error = check_integer_range(&Int::from(1), Primitive::F32, span).unwrap_err();
    assert_eq!(error.text(), "integer literal cannot be converted to 'f32'");
}

#[test]
fn overloads_are_selected_by_argument_types() {
    assert_eq!(type_of("twice(\"ab\")"), Type::String);
    assert_eq!(type_of("twice(21)"), Type::I64);
}

#[test]
fn ambiguous_overloads() {
    assert_eq!(
        error_of("widen(1)"),
        "ambiguous call to 'widen': 2 overloads match the arguments"
    );
    assert_eq!(
        error_of("widen(\"one\")"),
        "ambiguous call to 'widen': no overload matches the arguments"
    );
    assert_eq!(type_of("widen(i32(1))"), Type::I64);
}

#[test]
fn generic_type_arguments_are_inferred() {
    with_context(|context| {
        let type_ = value_type(context, &expression("first([1, 2])")).unwrap();
        assert_eq!(type_, Type::I64);

        let type_ = value_type(context, &expression("first([\"a\"])")).unwrap();
        assert_eq!(type_, Type::String);

        // the same instantiation is only recorded once
        value_type(context, &expression("first([3])")).unwrap();
        assert_eq!(context.used_specializations(), ["lib.first_i64", "lib.first_string"]);
    });
}

#[test]
fn explicit_type_arguments() {
    assert_eq!(type_of("first[u8]([1])"), Type::U8);
    assert_eq!(error_of("twice[i64](1)"), "'twice' is not generic");
}

#[test]
fn private_members() {
    assert_eq!(error_of("Vault()._secret"), "'_secret' of class 'Vault' is private");
    assert_eq!(type_of("Vault().peek()"), Type::I64);
    assert_eq!(error_of("Vault().open()"), "class 'Vault' has no method 'open'");
}

#[test]
fn builtin_functions_and_methods() {
    assert_eq!(type_of("len(\"abc\")"), Type::I64);
    assert_eq!(type_of("\"abc\".upper()"), Type::String);
    assert_eq!(error_of("len(1)"), "'i64' has no length");
    assert_eq!(error_of("len()"), "'len' takes exactly one argument");
    assert_eq!(error_of("\"abc\".foo()"), "'string' has no method 'foo'");
    assert_eq!(
        error_of("range(3)"),
        "'range' can only be iterated over in 'for' loops and comprehensions"
    );
}

#[test]
fn unresolved_names() {
    assert_eq!(error_of("missing + 1"), "cannot resolve variable 'missing'");
    assert_eq!(error_of("missing()"), "cannot resolve function 'missing'");
    assert_eq!(error_of("twice"), "function 'twice' cannot be used as a value");
}

#[test]
fn tuple_indexing() {
    with_context(|context| {
        context.define_local(Atom::from("pair"), Type::Tuple(vec![Type::I64, Type::String]));

        let type_ = value_type(context, &expression("pair[-1]")).unwrap();
        assert_eq!(type_, Type::String);

        let error = value_type(context, &expression("pair[5]")).unwrap_err();
        assert_eq!(error.text(), "tuple index '5' is out of range");
    });
}

#[test]
fn iteration() {
    with_context(|context| {
        context.define_local(Atom::from("names"), Type::list(Type::String));
        context.define_local(Atom::from("counter"), Type::named("lib.Counter"));
        context.define_local(Atom::from("count"), Type::I64);

        let mut iterate = |source: &str| iteration_type(context, &expression(source));

        assert_eq!(iterate("range(10)").unwrap(), Type::I64);
        assert_eq!(iterate("range(u8(1), 10)").unwrap(), Type::U8);
        assert_eq!(
            iterate("enumerate(names)").unwrap(),
            Type::Tuple(vec![Type::I64, Type::String])
        );
        assert_eq!(
            iterate("zip(names, \"abc\")").unwrap(),
            Type::Tuple(vec![Type::String, Type::CHAR])
        );
        assert_eq!(iterate("reversed(slice(names, 1))").unwrap(), Type::String);
        assert_eq!(iterate("counter").unwrap(), Type::I64);
        assert_eq!(iterate("count").unwrap_err().text(), "'i64' is not iterable");
        assert_eq!(
            iterate("range()").unwrap_err().text(),
            "'range' takes one to three arguments"
        );
    });
}

#[test]
fn comprehensions_bind_their_targets_locally() {
    with_context(|context| {
        context.define_local(Atom::from("names"), Type::list(Type::String));

        let type_ = value_type(context, &expression("[(i, name) for i, name in enumerate(names)]"));
        assert_eq!(
            type_.unwrap(),
            Type::list(Type::Tuple(vec![Type::I64, Type::String]))
        );
        assert!(context.local(Atom::from("name")).is_none());
    });
}

#[test]
fn arguments_are_arranged_by_keyword() {
    let registry = registry();
    let area = registry.functions("lib.area").unwrap()[0].clone();
    let call = |source: &str| {
        let BareExpression::Call(call) = expression(source).bare else {
            panic!("expected a call");
        };
        *call
    };

    let arranged = call("area(height=2, width=3)");
    let arguments = arrange_arguments(&area, &arranged, Span::default()).unwrap();
    assert!(matches!(&arguments[..], [Argument::Given(width), Argument::Given(height)]
        if width.to_string() == "3" && height.to_string() == "2"));

    let defaulted = call("area(3)");
    let arguments = arrange_arguments(&area, &defaulted, Span::default()).unwrap();
    assert!(matches!(&arguments[..], [Argument::Given(_), Argument::Default]));

    let twice = call("area(1, width=2)");
    let error = arrange_arguments(&area, &twice, Span::default()).unwrap_err();
    assert_eq!(error.text(), "parameter 'width' is given more than once");

    let missing = call("area(height=2)");
    let error = arrange_arguments(&area, &missing, Span::default()).unwrap_err();
    assert_eq!(error.text(), "missing argument for parameter 'width'");

    let unknown = call("area(1, depth=2)");
    let error = arrange_arguments(&area, &unknown, Span::default()).unwrap_err();
    assert_eq!(error.text(), "'area' has no parameter 'depth'");

    let many = call("area(1, 2, 3)");
    let error = arrange_arguments(&area, &many, Span::default()).unwrap_err();
    assert_eq!(error.text(), "'area' takes 2 arguments but 3 were given");
}
