use super::resolve;
use hir::{Definitions, Kind, Type};
use span::SourceMap;
use utility::Atom;

fn resolve_modules(sources: &[(&str, &str)]) -> diagnostics::Result<Vec<Definitions>> {
    let mut map = SourceMap::default();
    let mut modules = Vec::new();

    for (module, source) in sources {
        let file = map.add_str(*module, source);
        let mut syntax = parser::parse(&map[file])?;
        lowerer::lower_iterators(&mut syntax)?;
        modules.push(collector::collect(module, &syntax, collector::Options::default())?);
    }

    resolve(&mut modules)?;
    Ok(modules)
}

#[track_caller]
fn resolve_ok(sources: &[(&str, &str)]) -> Vec<Definitions> {
    match resolve_modules(sources) {
        Ok(modules) => modules,
        Err(error) => panic!("unexpected error: {error:?}"),
    }
}

#[track_caller]
fn assert_error(sources: &[(&str, &str)], message: &str) {
    match resolve_modules(sources) {
        Ok(modules) => panic!("expected an error but got {modules:#?}"),
        Err(error) => assert_eq!(error.text(), message),
    }
}

const SHAPES: &str = "\
@trait
class Shape:
    def area(self) -> f64:
        pass

    def name(self) -> string:
        return \"shape\"

class Square(Shape):
    side: f64

    def area(self) -> f64:
        return self.side * self.side
";

#[test]
fn types_become_fully_qualified() {
    let modules = resolve_ok(&[
        ("geo.shapes", SHAPES),
        (
            "app.main",
            "\
from geo.shapes import Square, Shape as Figure

class Canvas:
    shapes: [Figure]
    selected: optional[Square]
    named: {string: (Square, i64)}

def largest(canvas: Canvas) -> Square:
    return canvas.selected
",
        ),
    ]);

    let app = &modules[1];
    assert_eq!(app.imports.get(Atom::from("Figure")).unwrap().kind, Some(Kind::Trait));

    let canvas = app.classes.get(Atom::from("Canvas")).unwrap();
    let types: Vec<_> = canvas.members.values().map(|member| member.type_.to_string()).collect();
    assert_eq!(
        types,
        [
            "[geo.shapes.Shape]",
            "optional[geo.shapes.Square]",
            "{string: (geo.shapes.Square, i64)}",
        ]
    );

    let largest = &app.functions.get(Atom::from("largest")).unwrap()[0];
    assert_eq!(largest.parameters[0].type_, Type::named("app.main.Canvas"));
    assert_eq!(largest.returns, Some(Type::named("geo.shapes.Square")));
}

#[test]
fn generic_parameters_stay_unqualified() {
    let modules = resolve_ok(&[(
        "lib",
        "\
@generic(T)
class Box:
    value: T

    @generic(U)
    def pair(self, other: U) -> (T, U):
        return (self.value, other)

def unbox(boxed: Box[i64]) -> i64:
    return boxed.value
",
    )]);

    let box_ = modules[0].classes.get(Atom::from("Box")).unwrap();
    assert_eq!(box_.members.get(Atom::from("value")).unwrap().type_, Type::named("T"));
    let pair = &box_.methods.get(Atom::from("pair")).unwrap()[0];
    assert_eq!(
        pair.returns,
        Some(Type::Tuple(vec![Type::named("T"), Type::named("U")]))
    );

    let unbox = &modules[0].functions.get(Atom::from("unbox")).unwrap()[0];
    assert_eq!(
        unbox.parameters[0].type_,
        Type::Generic("lib.Box".into(), vec![Type::I64])
    );
}

#[test]
fn default_trait_methods_are_inherited() {
    let modules = resolve_ok(&[("geo.shapes", SHAPES)]);
    let square = modules[0].classes.get(Atom::from("Square")).unwrap();
    assert_eq!(square.implements[0].bare, "geo.shapes.Shape");
    assert!(square.methods.contains(Atom::from("area")));
    assert!(square.methods.contains(Atom::from("name")));
    assert!(square.implements("geo.shapes.Shape"));
}

#[test]
fn pure_trait_method_not_implemented() {
    assert_error(
        &[(
            "lib",
            "\
@trait
class Shape:
    def area(self) -> f64:
        \"\"\"The area of the shape.\"\"\"
        pass

class Circle(Shape):
    radius: f64
",
        )],
        "pure trait method 'area' is not implemented",
    );
}

#[test]
fn traits_from_other_modules() {
    assert_error(
        &[
            ("geo.shapes", SHAPES),
            (
                "app",
                "\
from geo.shapes import Shape

class Circle(Shape):
    radius: f64
",
            ),
        ],
        "pure trait method 'area' is not implemented",
    );
}

#[test]
fn builtin_error_trait() {
    let modules = resolve_ok(&[(
        "lib",
        "\
class MyError(Error):
    code: i64

@raises(MyError, ValueError)
def fail():
    raise MyError(1)
",
    )]);
    let error = modules[0].classes.get(Atom::from("MyError")).unwrap();
    assert!(error.is_error());
    let fail = &modules[0].functions.get(Atom::from("fail")).unwrap()[0];
    assert_eq!(fail.raises, [Type::named("lib.MyError"), Type::named("ValueError")]);
}

#[test]
fn unknown_module() {
    assert_error(&[("app", "from nowhere import thing\n")], "cannot resolve module 'nowhere'");
}

#[test]
fn unknown_imported_name() {
    let error = resolve_modules(&[
        ("geo.shapes", SHAPES),
        ("app", "from geo.shapes import Squar\n"),
    ])
    .unwrap_err();
    assert_eq!(error.text(), "cannot resolve 'Squar' in module 'geo.shapes'");
    assert_eq!(
        error.notes().collect::<Vec<_>>(),
        ["a definition with a similar name exists: 'Square'"]
    );
}

#[test]
fn unknown_type() {
    assert_error(
        &[("lib", "def f(point: Pointt) -> i64:\n    return 0\n")],
        "cannot resolve type 'Pointt'",
    );
}

#[test]
fn unknown_trait() {
    assert_error(
        &[("lib", "class Foo(Hashable):\n    pass\n")],
        "cannot resolve trait 'Hashable'",
    );
}

#[test]
fn base_is_not_a_trait() {
    assert_error(
        &[("lib", "class Foo:\n    pass\n\nclass Bar(Foo):\n    pass\n")],
        "'Foo' is not a trait",
    );
}

#[test]
fn dotted_type_names() {
    let modules = resolve_ok(&[
        ("geo.shapes", SHAPES),
        ("app", "def area(square: geo.shapes.Square) -> f64:\n    return 0.0\n"),
    ]);
    let area = &modules[1].functions.get(Atom::from("area")).unwrap()[0];
    assert_eq!(area.parameters[0].type_, Type::named("geo.shapes.Square"));
}
