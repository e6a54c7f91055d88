use super::lower_iterators;
use ast::{BareExpression, BareStatement, Statement};
use span::SourceMap;

fn lower(source: &str) -> diagnostics::Result<ast::Module> {
    let mut map = SourceMap::default();
    let file = map.add_str("test", source);
    let mut module = parser::parse(&map[file])?;
    lower_iterators(&mut module)?;
    Ok(module)
}

#[track_caller]
fn lower_ok(source: &str) -> ast::Module {
    match lower(source) {
        Ok(module) => module,
        Err(error) => panic!("unexpected error: {error:?}"),
    }
}

#[track_caller]
fn assert_error(source: &str, message: &str) {
    match lower(source) {
        Ok(module) => panic!("expected an error but got {module:#?}"),
        Err(error) => assert_eq!(error.text(), message),
    }
}

fn class(statement: &Statement) -> &ast::Class {
    match &statement.bare {
        BareStatement::Class(class) => class,
        bare => panic!("expected a class but got {bare:?}"),
    }
}

fn function(statement: &Statement) -> &ast::Function {
    match &statement.bare {
        BareStatement::Function(function) => function,
        bare => panic!("expected a function but got {bare:?}"),
    }
}

/// The bodies of the states of the `next` method in the order of their ids.
fn states(class: &ast::Class) -> Vec<&[Statement]> {
    let next = class
        .body
        .iter()
        .map(function)
        .find(|method| method.name.bare == "next")
        .expect("missing 'next' method");

    let BareStatement::While(dispatcher) = &next.body[0].bare else {
        panic!("expected a dispatch loop");
    };

    let mut states = Vec::new();
    let mut chain = &dispatcher.body;
    while let [statement] = chain.as_slice() {
        let BareStatement::If(if_) = &statement.bare else {
            break;
        };
        states.push(if_.body.as_slice());
        chain = &if_.orelse;
    }
    states
}

fn member_names(class: &ast::Class) -> Vec<String> {
    class
        .body
        .iter()
        .filter_map(|statement| match &statement.bare {
            BareStatement::AnnotatedAssign(assign) => {
                Some(format!("{}: {}", assign.target, assign.annotation))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn straight_line_yields() {
    let module = lower_ok(
        "\
def abc() -> iterator[char]:
    yield 'a'
    yield 'b'
    yield 'c'
",
    );

    assert_eq!(module.body.len(), 2);
    let class = class(&module.body[0]);
    assert_eq!(class.name.bare, "AbcIterator");
    // one state per suspension point plus the entry state
    assert_eq!(states(class).len(), 4);

    let factory = function(&module.body[1]);
    assert_eq!(factory.name.bare, "abc");
    assert_eq!(
        factory.returns.as_ref().map(ToString::to_string),
        Some("AbcIterator".to_owned())
    );
}

#[test]
fn state_bodies_assign_next_state_and_return_value() {
    let module = lower_ok(
        "\
def one() -> iterator[i64]:
    yield 1
",
    );

    let class = class(&module.body[0]);
    let states = states(class);
    let [first, last] = states.as_slice() else {
        panic!("expected two states");
    };

    let BareStatement::Assign(assign) = &first[0].bare else {
        panic!("expected a state transition");
    };
    assert_eq!(assign.target.to_string(), "self._state");
    assert_eq!(assign.value.to_string(), "1");
    assert!(matches!(&first[1].bare, BareStatement::Return(Some(value)) if value.to_string() == "1"));

    let BareStatement::Assign(assign) = &last[0].bare else {
        panic!("expected a state transition");
    };
    assert_eq!(assign.value.to_string(), "-1");
}

#[test]
fn while_loop_becomes_condition_and_body_states() {
    let module = lower_ok(
        "\
def count(n: i64) -> iterator[i64]:
    i = 0
    while i < n:
        yield i
        i += 1
",
    );

    let class = class(&module.body[0]);
    assert_eq!(
        member_names(class),
        ["_state: i64", "_n: i64", "_i: i64"]
    );
    // entry, condition, body, after the loop and after the suspension point
    let states = states(class);
    assert_eq!(states.len(), 5);

    let BareStatement::If(check) = &states[1][0].bare else {
        panic!("expected the loop condition");
    };
    assert_eq!(check.condition.to_string(), "self._i < self._n");
}

#[test]
fn conditional_suspension() {
    let module = lower_ok(
        "\
def pick(flag: bool) -> iterator[string]:
    if flag:
        yield \"yes\"
    else:
        yield \"no\"
",
    );

    // entry, then branch, else branch, join point and one state per suspension point
    assert_eq!(states(class(&module.body[0])).len(), 6);
}

#[test]
fn constructor_stores_parameters() {
    let module = lower_ok(
        "\
def repeat(value: string, times: u8 = 2) -> iterator[string]:
    yield value
",
    );

    let class = class(&module.body[0]);
    let constructor = function(&class.body[3]);
    assert_eq!(constructor.name.bare, "__init__");
    assert_eq!(constructor.parameters.len(), 3);
    assert!(constructor.parameters[2].default.is_some());
    assert_eq!(constructor.body.len(), 3);
}

#[test]
fn annotated_locals_become_members() {
    let module = lower_ok(
        "\
def squares() -> iterator[u64]:
    x: u64 = 0
    while True:
        yield x * x
        x += 1
",
    );

    assert_eq!(
        member_names(class(&module.body[0])),
        ["_state: i64", "_x: u64"]
    );
}

#[test]
fn functions_without_yield_are_untouched() {
    let module = lower_ok("def f() -> i64:\n    return 1\n");
    assert_eq!(module.body.len(), 1);
    assert_eq!(function(&module.body[0]).name.bare, "f");
}

#[test]
fn break_in_suspending_loop_jumps_to_exit_state() {
    let module = lower_ok(
        "\
def until(n: i64) -> iterator[i64]:
    i = 0
    while True:
        if i == n:
            break
        yield i
        i += 1
",
    );

    let states = states(class(&module.body[0]));
    let body_state = states[2];
    let BareStatement::If(check) = &body_state[0].bare else {
        panic!("expected the conditional");
    };
    assert!(matches!(check.body[0].bare, BareStatement::Assign(_)));
    assert!(matches!(check.body[1].bare, BareStatement::Continue));
}

#[test]
fn for_loops_are_not_implemented() {
    assert_error(
        "\
def f(xs: [i64]) -> iterator[i64]:
    for x in xs:
        yield x
",
        "'for' loops in iterators are not implemented",
    );
}

#[test]
fn try_statements_are_not_implemented() {
    assert_error(
        "\
def f() -> iterator[i64]:
    try:
        yield 1
    finally:
        pass
",
        "'try' statements in iterators are not implemented",
    );
}

#[test]
fn uninferable_local() {
    assert_error(
        "\
def f(xs: [i64]) -> iterator[i64]:
    x = xs[0]
    yield x
",
        "cannot infer the type of variable 'x' of iterator 'f'",
    );
}

#[test]
fn yield_without_iterator_return_type() {
    assert_error(
        "def f() -> i64:\n    yield 1\n",
        "function 'f' contains 'yield' but does not return 'iterator[T]'",
    );
}

#[test]
fn return_with_value() {
    assert_error(
        "def f() -> iterator[i64]:\n    yield 1\n    return 2\n",
        "'return' with a value in an iterator",
    );
}

#[test]
fn iterator_methods_are_not_implemented() {
    assert_error(
        "\
class Foo:
    def items(self) -> iterator[i64]:
        yield 1
",
        "iterator method 'items' is not implemented",
    );
}

#[test]
fn factory_calls_constructor() {
    let module = lower_ok("def f(a: i64) -> iterator[i64]:\n    yield a\n");
    let factory = function(&module.body[1]);
    let BareStatement::Return(Some(value)) = &factory.body[0].bare else {
        panic!("expected a return statement");
    };
    assert!(matches!(value.bare, BareExpression::Call(_)));
    assert_eq!(value.to_string(), "FIterator(a)");
}
