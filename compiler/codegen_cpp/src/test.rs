use super::{compile_module, Options, Output};
use session::{Registry, Specializations};
use span::SourceMap;

fn compile_with(source: &str, has_main: bool) -> diagnostics::Result<Output> {
    let mut map = SourceMap::default();
    let file = map.add_str("test", source);
    let mut module = parser::parse(&map[file])?;
    lowerer::lower_iterators(&mut module)?;
    let definitions = collector::collect(
        "lib",
        &module,
        collector::Options {
            skip_tests: false,
            has_main,
        },
    )?;

    let mut modules = vec![definitions];
    resolver::resolve(&mut modules)?;
    let registry = Registry::new(modules);
    let mut specializations = Specializations::default();
    compile_module(&registry, &mut specializations, "lib", Options { has_main })
}

#[track_caller]
fn compile(source: &str) -> Output {
    match compile_with(source, false) {
        Ok(output) => output,
        Err(error) => panic!("unexpected error: {error:?}"),
    }
}

#[track_caller]
fn assert_error(source: &str, message: &str) {
    match compile_with(source, false) {
        Ok(output) => panic!("expected an error but got:\n{}", output.source),
        Err(error) => assert_eq!(error.text(), message),
    }
}

#[track_caller]
fn assert_contains(text: &str, expected: &str) {
    assert!(
        text.contains(expected),
        "expected to find\n{expected}\nin\n{text}"
    );
}

#[test]
fn files_include_each_other() {
    let output = compile("def f():\n    pass\n");

    assert!(output.early_header.starts_with("#pragma once\n\n#include \"mys.hpp\"\n"));
    assert_contains(&output.header, "#include \"lib.mys.early.hpp\"");
    assert!(output.source.starts_with("#include \"lib.mys.hpp\"\n"));
    assert_contains(&output.source, "namespace mys::lib {");
    assert_contains(&output.early_header, "void f();");
    assert_contains(&output.source, "void __module_init()");
}

#[test]
fn synthesized_constructor_zero_initializes_private_members() {
    let output = compile(
        "\
class Point:
    _x: i64
    _name: string
",
    );

    assert_contains(&output.early_header, "class Point;");
    assert_contains(&output.header, "class Point : public virtual mys::Object {");
    assert_contains(&output.header, "    Point();\n");
    assert_contains(
        &output.source,
        "Point::Point()\n{\n    this->_x = i64(0);\n    this->_name = String(\"\");\n}",
    );
    assert_contains(&output.source, "os << \"Point(\";");
    assert_contains(&output.source, "os << \"_x=\" << mys::repr(_x);");
}

#[test]
fn public_members_become_constructor_parameters() {
    let output = compile(
        "\
class Point:
    x: i64
    y: i64

def origin() -> Point:
    return Point(0, 0)
",
    );

    assert_contains(&output.header, "    Point(i64 x, i64 y);\n");
    assert_contains(&output.source, "this->x = x;");
    assert_contains(&output.source, "mys::make_shared<mys::lib::Point>(i64(0), i64(0))");
}

#[test]
fn generic_function_is_specialized_per_type_arguments() {
    let output = compile(
        "\
@generic(T1, T2)
def first(a: T1, b: T2) -> T1:
    return a

def run():
    first(1, \"a\")
    first(\"b\", 2)
",
    );

    assert_contains(&output.source, "inline i64 first_i64_string(i64 a, String b)");
    assert_contains(&output.source, "inline String first_string_i64(String a, i64 b)");
    for text in [&output.early_header, &output.header, &output.source] {
        assert!(!text.contains("T1"));
        assert!(!text.contains("T2"));
    }
}

#[test]
fn integer_literal_out_of_range() {
    assert_error(
        "\
def f() -> u8:
    return 256
",
        "integer literal out of range for 'u8'",
    );
}

#[test]
fn class_does_not_implement_trait() {
    assert_error(
        "\
@trait
class Shape:
    def area(self) -> f64:
        pass

class Circle:
    x: i64

def draw(shape: Shape):
    pass

def run():
    draw(Circle(1))
",
        "class 'Circle' does not implement trait 'Shape'",
    );
}

#[test]
fn class_implementing_trait_derives_from_it() {
    let output = compile(
        "\
@trait
class Shape:
    def area(self) -> f64:
        pass

class Square(Shape):
    side: f64

    def area(self) -> f64:
        return self.side * self.side
",
    );

    assert_contains(&output.header, "class Shape : public virtual mys::Object {");
    assert_contains(&output.header, "    virtual f64 area() = 0;");
    assert_contains(&output.header, "public mys::lib::Shape");
    assert_contains(&output.source, "f64 Square::area()");
}

#[test]
fn enumerate_loop() {
    let output = compile(
        "\
def weighted(values: [i64]) -> i64:
    result = 0
    for i, value in enumerate(values):
        result += i * value
    return result
",
    );

    assert_contains(&output.source, "mys::enumerate(mys::cursor(values), i64(0))");
    assert_contains(&output.source, "= std::get<0>(__item_");
    assert_contains(&output.source, "result = (result + (i * value));");
}

#[test]
fn range_loop() {
    let output = compile(
        "\
def total(n: i64) -> i64:
    sum = 0
    for i in range(n):
        sum += i
    return sum
",
    );

    assert_contains(&output.source, "mys::range(i64(0), n, i64(1))");
    assert_contains(&output.source, "i64 i = __item_");
}

#[test]
fn raised_errors_are_caught_through_adapters() {
    let output = compile(
        "\
class ParseError(Error):
    message: string

def parse(text: string) -> i64:
    if text == \"\":
        raise ParseError(\"empty\")
    return 1

def run() -> i64:
    try:
        return parse(\"\")
    except ParseError as error:
        print(error.message)
    return 0
",
    );

    assert_contains(&output.header, "class __ParseError : public mys::__Error");
    assert_contains(&output.header, "public mys::Error");
    assert_contains(&output.source, "catch (mys::lib::__ParseError& __error)");
    assert_contains(
        &output.source,
        "mys::make_shared<mys::lib::ParseError>(String(\"empty\"))->__throw();",
    );
    assert_contains(&output.source, "static const String __constant_1 = String(\"\");");
}

#[test]
fn raising_a_non_error() {
    assert_error(
        "\
class Point:
    x: i64

def f():
    raise Point(1)
",
        "'Point' is not an error",
    );
}

#[test]
fn comprehension_is_lifted_with_captured_locals() {
    let output = compile(
        "\
def shifted(values: [i64], offset: i64) -> [i64]:
    return [value + offset for value in values]
",
    );

    assert_contains(
        &output.source,
        "static SharedList<i64> __comprehension_1(i64 offset, SharedList<i64> values)",
    );
    assert_contains(&output.source, "return __comprehension_1(offset, values);");
    assert_contains(&output.source, "->append(");
}

#[test]
fn entry_point() {
    let output = match compile_with("def main():\n    print(\"hi\")\n", true) {
        Ok(output) => output,
        Err(error) => panic!("unexpected error: {error:?}"),
    };

    assert_contains(&output.source, "int __application_main(int argc, const char* argv[])");
    assert_contains(&output.source, "__module_init();");
    assert_contains(&output.source, "std::cout << String(\"hi\") << \"\\n\";");
}

#[test]
fn entry_point_with_arguments() {
    let output = match compile_with("def main(argv: [string]):\n    pass\n", true) {
        Ok(output) => output,
        Err(error) => panic!("unexpected error: {error:?}"),
    };

    assert_contains(&output.source, "mys::create_args(argc, argv)");
}

#[test]
fn entry_point_with_wrong_parameters() {
    match compile_with("def main(count: i64):\n    pass\n", true) {
        Ok(output) => panic!("expected an error but got:\n{}", output.source),
        Err(error) => assert_eq!(
            error.text(),
            "main() takes no parameters or the command line arguments as '[string]'"
        ),
    }
}

#[test]
fn default_arguments_use_accessors() {
    let output = compile(
        "\
def area(width: i64, height: i64 = 2) -> i64:
    return width * height

def run() -> i64:
    return area(3)
",
    );

    assert_contains(&output.early_header, "i64 area__height_default();");
    assert_contains(&output.source, "mys::lib::area(i64(3), mys::lib::area__height_default())");
}

#[test]
fn enum_with_explicit_values() {
    let output = compile(
        "\
@enum(u8)
class Color:
    Red
    Green = 5

def favorite() -> Color:
    return Color.Green
",
    );

    assert_contains(&output.early_header, "enum class Color : u8");
    assert_contains(&output.early_header, "Green = 5");
    assert_contains(&output.source, "mys::lib::Color::Green");
}

#[test]
fn global_variable_is_initialized_by_the_module() {
    let output = compile("LIMIT: i64 = 10\n");

    assert_contains(&output.early_header, "extern i64 LIMIT;");
    assert_contains(&output.source, "LIMIT = i64(10);");
}

#[test]
fn test_functions_are_registered() {
    let output = compile("@test\ndef addition():\n    assert 1 + 1 == 2\n");

    assert_contains(&output.source, "static mys::Test __test_addition(\"lib.addition\", addition);");
    assert_contains(&output.source, "mys::AssertionError");
}

#[test]
fn iterator_is_lowered_to_a_class() {
    let output = compile(
        "\
def count(n: i64) -> iterator[i64]:
    i = 0
    while i < n:
        yield i
        i += 1

def total() -> i64:
    sum = 0
    for value in count(3):
        sum += value
    return sum
",
    );

    assert_contains(&output.header, "class CountIterator : public virtual mys::Object {");
    assert_contains(&output.source, "->next();");
}

#[test]
fn missing_return_value() {
    assert_error(
        "\
def f() -> i64:
    return
",
        "missing return value of type 'i64'",
    );
}

#[test]
fn none_cannot_be_compared_with_primitives() {
    assert_error(
        "\
def f(value: i64) -> bool:
    return value is None
",
        "'i64' is never 'None'",
    );
}

#[test]
fn operator_overload_is_chosen_by_the_right_operand() {
    let output = compile(
        "\
class Point:
    x: i64

    def __add__(self, other: Point) -> Point:
        return Point(self.x + other.x)

    def __add__(self, offset: i64) -> i64:
        return self.x + offset

def shifted(point: Point) -> i64:
    return point + 5

def doubled(point: Point) -> Point:
    return point + point
",
    );

    assert_contains(&output.source, "point->__add__(i64(5))");
    assert_contains(&output.source, "point->__add__(point)");
}
