use super::{collect, Options};
use hir::{Definitions, Primitive, Type};
use span::SourceMap;
use utility::{Atom, Int};

fn collect_with(source: &str, options: Options) -> diagnostics::Result<Definitions> {
    let mut map = SourceMap::default();
    let file = map.add_str("test", source);
    let mut module = parser::parse(&map[file])?;
    lowerer::lower_iterators(&mut module)?;
    collect("pkg.lib", &module, options)
}

#[track_caller]
fn collect_ok(source: &str) -> Definitions {
    match collect_with(source, Options::default()) {
        Ok(definitions) => definitions,
        Err(error) => panic!("unexpected error: {error:?}"),
    }
}

#[track_caller]
fn assert_error(source: &str, message: &str) {
    match collect_with(source, Options::default()) {
        Ok(definitions) => panic!("expected an error but got {definitions:#?}"),
        Err(error) => assert_eq!(error.text(), message),
    }
}

#[test]
fn functions_and_overloads() {
    let definitions = collect_ok(
        "\
def add(a: i64, b: i64) -> i64:
    return a + b

def add(a: string, b: string) -> string:
    return a + b

def run():
    pass
",
    );

    let add = definitions.functions.get(Atom::from("add")).unwrap();
    assert_eq!(add.len(), 2);
    assert!(add.iter().all(|function| function.is_overloaded()));
    assert_eq!(add[1].parameters[0].type_, Type::String);

    let run = &definitions.functions.get(Atom::from("run")).unwrap()[0];
    assert!(!run.is_overloaded());
    assert_eq!(run.returns, None);
}

#[test]
fn identical_overload() {
    assert_error(
        "\
def f(a: i64):
    pass

def f(b: i64):
    pass
",
        "'f' is already defined with the same signature",
    );
}

#[test]
fn classes() {
    let definitions = collect_ok(
        "\
class Point(Shape):
    \"\"\"A point.\"\"\"
    x: i64
    _tag: string

    def __init__(self, x: i64):
        self.x = x
        self._tag = \"\"

    def length(self) -> f64:
        return 0.0

    def origin() -> Point:
        return Point(0)
",
    );

    let point = definitions.classes.get(Atom::from("Point")).unwrap();
    assert_eq!(point.docstring.as_deref(), Some("A point."));
    let members: Vec<_> = point.members.names().map(Atom::to_str).collect();
    assert_eq!(members, ["x", "_tag"]);
    assert_eq!(point.public_members().count(), 1);
    assert!(point.methods.contains(Atom::INIT));
    assert!(point.methods.contains(Atom::from("length")));
    assert!(point.static_functions.contains(Atom::from("origin")));
    assert_eq!(point.implements[0].bare, "Shape");
    assert!(point.method(Atom::from("length")).unwrap()[0].is_method());
}

#[test]
fn traits() {
    let definitions = collect_ok(
        "\
@trait
class Shape:
    def area(self) -> f64:
        \"\"\"The area.\"\"\"

    def describe(self) -> string:
        return \"shape\"
",
    );

    let shape = definitions.traits.get(Atom::from("Shape")).unwrap();
    let area = &shape.methods.get(Atom::from("area")).unwrap()[0];
    let describe = &shape.methods.get(Atom::from("describe")).unwrap()[0];
    assert!(area.flags.contains(hir::FunctionFlags::PURE));
    assert!(!describe.flags.contains(hir::FunctionFlags::PURE));
}

#[test]
fn trait_with_members() {
    assert_error(
        "@trait\nclass Shape:\n    x: i64\n",
        "trait 'Shape' cannot have members",
    );
}

#[test]
fn enums() {
    let definitions = collect_ok(
        "\
@enum(u8)
class Color:
    Red
    Green = 5
    Blue
    Alpha = 6
",
    );

    let color = definitions.enums.get(Atom::from("Color")).unwrap();
    assert_eq!(color.type_, Primitive::U8);
    let values: Vec<_> = color.members.iter().map(|(_, value)| value.clone()).collect();
    assert_eq!(values, [0, 5, 6, 6].map(Int::from));
}

#[test]
fn decreasing_enum_value() {
    assert_error(
        "\
@enum
class Color:
    Red = 5
    Green = 2
",
        "enum member value 2 is smaller than the previous value 5",
    );
}

#[test]
fn enum_value_out_of_range() {
    assert_error(
        "@enum(u8)\nclass Color:\n    Red = 300\n",
        "enum member value 300 is out of range for 'u8'",
    );
    assert_error(
        "@enum(u8)\nclass Sign:\n    Negative = -1\n",
        "enum member value -1 is out of range for 'u8'",
    );
}

#[test]
fn enum_value_counted_up_out_of_range() {
    assert_error(
        "\
@enum(i8)
class Level:
    Top = 127
    Beyond
",
        "enum member value 128 is out of range for 'i8'",
    );
}

#[test]
fn enum_values_at_the_bounds() {
    let definitions = collect_ok("@enum(i8)\nclass Level:\n    Bottom = -128\n    Top = 127\n");

    let level = definitions.enums.get(Atom::from("Level")).unwrap();
    let values: Vec<_> = level.members.iter().map(|(_, value)| value.clone()).collect();
    assert_eq!(values, [-128, 127].map(Int::from));
}

#[test]
fn enum_with_non_integer_type() {
    assert_error(
        "@enum(f32)\nclass Color:\n    Red\n",
        "invalid enum type 'f32'",
    );
}

#[test]
fn generic_function() {
    let definitions = collect_ok(
        "\
@generic(T1, T2)
@raises(ValueError)
def pair(a: T1, b: T2) -> (T1, T2):
    return (a, b)
",
    );

    let pair = &definitions.functions.get(Atom::from("pair")).unwrap()[0];
    let generic: Vec<_> = pair.generic_types.iter().map(|name| name.bare.to_str()).collect();
    assert_eq!(generic, ["T1", "T2"]);
    assert_eq!(pair.raises, [Type::named("ValueError")]);
}

#[test]
fn tests_are_skipped_on_request() {
    let source = "@test\ndef test_add():\n    assert 1 + 1 == 2\n";

    let definitions = collect_ok(source);
    assert_eq!(definitions.function_tests().count(), 1);

    let definitions = collect_with(
        source,
        Options {
            skip_tests: true,
            has_main: false,
        },
    )
    .unwrap();
    assert!(definitions.functions.is_empty());
}

#[test]
fn missing_main() {
    let error = collect_with(
        "def foo():\n    pass\n",
        Options {
            skip_tests: false,
            has_main: true,
        },
    )
    .unwrap_err();
    assert_eq!(error.text(), "main() is not defined");
}

#[test]
fn global_variables() {
    let definitions = collect_ok("MAX_SIZE: u32 = 10\n");
    let variable = definitions.variables.get(Atom::from("MAX_SIZE")).unwrap();
    assert_eq!(variable.type_, Type::Primitive(Primitive::U32));
}

#[test]
fn naming_conventions() {
    assert_error("def fooBar():\n    pass\n", "function name 'fooBar' is not snake case");
    assert_error("class point:\n    pass\n", "class name 'point' is not pascal case");
    assert_error("max_size: u32 = 1\n", "global variable name 'max_size' is not upper snake case");
    assert_error(
        "class Foo:\n    Bar: i64\n",
        "class member name 'Bar' is not snake case",
    );
    assert_error(
        "def f(Value: i64):\n    pass\n",
        "parameter name 'Value' is not snake case",
    );
}

#[test]
fn member_with_default_value() {
    assert_error(
        "class Foo:\n    x: i64 = 1\n",
        "class member 'x' cannot have a default value",
    );
}

#[test]
fn redefinition_of_a_different_kind() {
    assert_error(
        "\
class Foo:
    pass

def Foo():
    pass
",
        "function name 'Foo' is not snake case",
    );
    assert_error(
        "\
from a.b import value

def value():
    pass
",
        "'value' is already defined as an import",
    );
    assert_error(
        "\
class Foo:
    pass

@trait
class Foo:
    pass
",
        "'Foo' is already defined as a class",
    );
}

#[test]
fn unknown_and_misplaced_decorators() {
    assert_error("@inline\ndef f():\n    pass\n", "unknown decorator '@inline'");
    assert_error("@trait\ndef f():\n    pass\n", "decorator '@trait' is not allowed on functions");
    assert_error(
        "class Foo:\n    @test\n    def f(self):\n        pass\n",
        "decorator '@test' is not allowed on methods",
    );
}

#[test]
fn iterators_are_collected_as_classes() {
    let definitions = collect_ok("def count() -> iterator[i64]:\n    yield 1\n");
    assert!(definitions.classes.contains(Atom::from("CountIterator")));
    let factory = &definitions.functions.get(Atom::from("count")).unwrap()[0];
    assert_eq!(factory.returns, Some(Type::named("CountIterator")));
}

#[test]
fn unsupported_module_statement() {
    assert_error("print(1)\n", "unsupported statement at module level");
}
