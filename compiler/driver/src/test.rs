use super::{compile, compile_in, module_name, render::render, CompileError, ErrorKind, Output, Source};
use span::{SourceMap, Span};
use std::path::Path;
use utility::paint::{paint_to_string, ColorChoice};

#[track_caller]
fn compile_ok(sources: &[Source]) -> Vec<Output> {
    match compile(sources) {
        Ok(outputs) => outputs,
        Err(error) => panic!("unexpected error: {error:?}"),
    }
}

#[track_caller]
fn compile_error(sources: &[Source]) -> CompileError {
    match compile(sources) {
        Ok(_) => panic!("expected an error"),
        Err(error) => error,
    }
}

#[test]
fn modules_import_each_other() {
    let outputs = compile_ok(&[
        Source::new(
            "geo.shapes",
            "\
def area(width: i64, height: i64) -> i64:
    return width * height
",
        ),
        Source::new(
            "geo.app",
            "\
from geo.shapes import area

def double_area(side: i64) -> i64:
    return 2 * area(side, side)
",
        ),
    ]);

    assert_eq!(outputs.len(), 2);
    let app = &outputs[1];
    assert!(app.early_header.contains("#include \"geo/shapes.mys.early.hpp\""));
    assert!(app.header.contains("#include \"geo/shapes.mys.hpp\""));
    assert!(app.source.contains("namespace mys::geo::app {"));
    assert!(app.source.contains("mys::geo::shapes::area(side, side)"));
}

#[test]
fn error_position_is_resolved() {
    let error = compile_error(&[Source::new(
        "lib",
        "\
def f() -> u8:
    return 256
",
    )]);

    assert_eq!(error.kind, ErrorKind::Error);
    assert_eq!(error.message, "integer literal out of range for 'u8'");
    assert_eq!(error.line, 2);
    assert_eq!(error.column, 11);
    assert_eq!(error.to_string(), "integer literal out of range for 'u8'");
}

#[test]
fn errors_of_later_modules_point_into_their_own_text() {
    let error = compile_error(&[
        Source::new("lib", "def f():\n    pass\n"),
        Source::new("app", "def g():\n    pass\n\ndef h() -> i64:\n    return \"text\"\n"),
    ]);

    assert_eq!(error.file.map(|file| file.to_string()).as_deref(), Some("app"));
    assert_eq!(error.line, 5);
}

#[test]
fn unresolved_import() {
    let error = compile_error(&[Source::new("app", "from nowhere import thing\n")]);

    assert_eq!(error.message, "cannot resolve module 'nowhere'");
    assert_eq!(error.line, 1);
}

#[test]
fn duplicate_module() {
    let error = compile_error(&[Source::new("lib", ""), Source::new("lib", "")]);

    assert_eq!(error.message, "module 'lib' is given more than once");
}

#[test]
fn main_is_required_when_requested() {
    let mut source = Source::new("app", "def run():\n    pass\n");
    source.has_main = true;

    let error = compile_error(&[source]);
    assert_eq!(error.message, "main() is not defined");
}

#[test]
fn tests_are_skipped() {
    let text = "@test\ndef addition():\n    assert 1 + 1 == 2\n";

    let outputs = compile_ok(&[Source::new("lib", text)]);
    assert!(outputs[0].source.contains("mys::Test"));

    let mut source = Source::new("lib", text);
    source.skip_tests = true;
    let outputs = compile_ok(&[source]);
    assert!(!outputs[0].source.contains("mys::Test"));
}

#[test]
fn specializations_are_emitted_by_each_user() {
    let outputs = compile_ok(&[
        Source::new(
            "lib",
            "\
@generic(T)
def identity(value: T) -> T:
    return value
",
        ),
        Source::new(
            "app",
            "\
from lib import identity

def one() -> i64:
    return identity(1)

def name() -> string:
    return identity(\"name\")
",
        ),
    ]);

    assert!(!outputs[0].source.contains("identity_i64"));
    assert!(outputs[1].source.contains("inline i64 identity_i64(i64 value)"));
    assert!(outputs[1].source.contains("inline String identity_string(String value)"));
}

#[test]
fn output_paths() {
    let source = Source::new("pkg.foo", "");

    assert_eq!(source.header_path, Path::new("pkg/foo.mys.hpp"));
    assert_eq!(source.source_path, Path::new("pkg/foo.mys.cpp"));
    assert_eq!(source.early_header_path(), Path::new("pkg/foo.mys.early.hpp"));
}

#[test]
fn module_names_from_paths() {
    assert_eq!(
        module_name(Some("pkg"), Path::new("src/foo/bar.mys")).as_deref(),
        Some("pkg.foo.bar")
    );
    assert_eq!(module_name(Some("pkg"), Path::new("lib.mys")).as_deref(), Some("pkg.lib"));
    assert_eq!(module_name(None, Path::new("./src/lib.mys")).as_deref(), Some("lib"));
    assert_eq!(module_name(None, Path::new("src/lib.txt")), None);
    assert_eq!(module_name(None, Path::new("src/Foo.mys")), None);
    assert_eq!(module_name(None, Path::new("../lib.mys")), None);
}

#[test]
fn rendered_error_highlights_the_expression() {
    let mut map = SourceMap::default();
    let error = match compile_in(&mut map, &[Source::new("lib", "def f() -> u8:\n    return 256\n")]) {
        Ok(_) => panic!("expected an error"),
        Err(error) => error,
    };
    let line = error.span.and_then(|span| map.line_with_highlight(span));

    let rendered = paint_to_string(
        |painter| render(&error, "src/lib.mys", line, painter),
        ColorChoice::Never,
    );

    assert_eq!(
        rendered.as_deref(),
        Ok("\
error: integer literal out of range for 'u8'
 --> src/lib.mys:2:12
  |
2 |     return 256
  |            ^^^
")
    );
}

#[test]
fn rendered_caret_accounts_for_wide_characters() {
    let mut map = SourceMap::default();
    let file = map.add_str("lib", "x = \"日\" + y\n");
    let span = Span::with_length(map[file].global(4), 5);

    let error = CompileError {
        kind: ErrorKind::Internal,
        message: "unexpected expression".to_owned(),
        notes: vec!["emitted by the test".to_owned()],
        file: None,
        line: 1,
        column: 4,
        span: Some(span),
    };

    let rendered = paint_to_string(
        |painter| render(&error, "lib.mys", map.line_with_highlight(span), painter),
        ColorChoice::Never,
    );

    assert_eq!(
        rendered.as_deref(),
        Ok("\
internal error: unexpected expression
 --> lib.mys:1:5
  |
1 | x = \"日\" + y
  |     ^^^^
  |
  = note: emitted by the test
")
    );
}

#[test]
fn rendered_error_without_location() {
    let error = compile_error(&[Source::new("lib", ""), Source::new("lib", "")]);

    let rendered = paint_to_string(
        |painter| render(&error, "<unknown>", None, painter),
        ColorChoice::Never,
    );

    assert_eq!(
        rendered.as_deref(),
        Ok("error: module 'lib' is given more than once\n --> <unknown>\n")
    );
}

#[test]
fn pure_trait_method_of_imported_trait_must_be_implemented() {
    let error = compile_error(&[
        Source::new(
            "shapes",
            "\
@trait
class Shape:
    def area(self) -> i64:
        \"\"\"The area of the shape.\"\"\"
",
        ),
        Source::new(
            "app",
            "\
from shapes import Shape

class Square(Shape):
    side: i64
",
        ),
    ]);

    assert_eq!(error.message, "pure trait method 'area' is not implemented");
    assert_eq!(
        error.notes,
        ["required by trait 'shapes.Shape' implemented by class 'Square'"]
    );
    assert_eq!(error.file.map(|file| file.to_string()).as_deref(), Some("app"));
    assert_eq!(error.line, 3);
}

#[test]
fn default_trait_methods_are_inherited() {
    let outputs = compile_ok(&[Source::new(
        "lib",
        "\
@trait
class Greeter:
    def greet(self) -> string:
        return \"hello\"

class Person(Greeter):
    name: string

def welcome(person: Person) -> string:
    return person.greet()
",
    )]);

    assert!(outputs[0].header.contains("    virtual String greet();"));
    assert!(outputs[0].source.contains("String Person::greet()"));
}

#[test]
fn enum_value_must_fit_the_declared_type() {
    let error = compile_error(&[Source::new(
        "lib",
        "\
@enum(u8)
class Color:
    Red = 300
",
    )]);

    assert_eq!(error.message, "enum member value 300 is out of range for 'u8'");
    assert_eq!(error.notes, ["the range of 'u8' is 0 to 255"]);
    assert_eq!(error.line, 3);
}

#[test]
fn same_named_classes_of_different_modules_are_specialized_separately() {
    let outputs = compile_ok(&[
        Source::new("a", "class Foo:\n    value: i64\n"),
        Source::new("b", "class Foo:\n    text: string\n"),
        Source::new(
            "app",
            "\
from a import Foo as AFoo
from b import Foo as BFoo

@generic(T)
def identity(value: T) -> T:
    return value

def first() -> AFoo:
    return identity(AFoo(1))

def second() -> BFoo:
    return identity(BFoo(\"s\"))
",
        ),
    ]);

    let app = &outputs[2];
    assert!(app.source.contains("identity_a_Foo("));
    assert!(app.source.contains("identity_b_Foo("));
}
