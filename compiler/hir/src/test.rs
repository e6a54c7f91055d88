use super::{Definitions, Kind, Primitive, Table, Type};
use utility::{Atom, Int};

#[track_caller]
fn annotation(source: &str) -> Type {
    let expression = match parser::parse_expression(source) {
        Ok(expression) => expression,
        Err(error) => panic!("unexpected syntax error: {error:?}"),
    };
    match Type::from_annotation(&expression) {
        Ok(type_) => type_,
        Err(error) => panic!("unexpected invalid type: {error:?}"),
    }
}

#[track_caller]
fn invalid_annotation(source: &str) -> String {
    let expression = parser::parse_expression(source).unwrap();
    match Type::from_annotation(&expression) {
        Ok(type_) => panic!("expected an invalid type but got {type_:?}"),
        Err(error) => error.text().to_owned(),
    }
}

#[test]
fn primitive_and_builtin_annotations() {
    assert_eq!(annotation("i64"), Type::I64);
    assert_eq!(annotation("u8"), Type::U8);
    assert_eq!(annotation("string"), Type::String);
    assert_eq!(annotation("regexmatch"), Type::RegexMatch);
    assert_eq!(annotation("None"), Type::None);
}

#[test]
fn container_annotations() {
    assert_eq!(annotation("[i64]"), Type::list(Type::I64));
    assert_eq!(
        annotation("{string: [u8]}"),
        Type::dict(Type::String, Type::list(Type::U8))
    );
    assert_eq!(annotation("{char}"), Type::set(Type::CHAR));
    assert_eq!(
        annotation("(bool, f64)"),
        Type::Tuple(vec![Type::BOOL, Type::F64])
    );
    assert_eq!(annotation("optional[Foo]"), Type::optional(Type::named("Foo")));
    assert_eq!(
        annotation("weak[bar.Node]"),
        Type::Weak(Box::new(Type::named("bar.Node")))
    );
}

#[test]
fn generic_annotations() {
    assert_eq!(
        annotation("Pair[i64, string]"),
        Type::Generic("Pair".into(), vec![Type::I64, Type::String])
    );
    assert_eq!(
        annotation("Box[[T]]"),
        Type::Generic("Box".into(), vec![Type::list(Type::named("T"))])
    );
}

#[test]
fn invalid_annotations() {
    assert_eq!(
        invalid_annotation("[i64, u8]"),
        "expected exactly one item type in list type"
    );
    assert_eq!(invalid_annotation("1 + 2"), "invalid type '(1 + 2)'");
    assert_eq!(
        invalid_annotation("optional[i64, u8]"),
        "'optional' takes exactly one type argument"
    );
    assert_eq!(
        invalid_annotation("iterator[i64]"),
        "'iterator' is only allowed as the return type of functions containing 'yield'"
    );
}

#[test]
fn display() {
    let type_ = Type::dict(
        Type::String,
        Type::Tuple(vec![Type::optional(Type::named("a.Foo")), Type::list(Type::I64)]),
    );
    assert_eq!(type_.to_string(), "{string: (optional[a.Foo], [i64])}");
    assert_eq!(Type::Tuple(vec![Type::BOOL]).to_string(), "(bool,)");
    assert_eq!(Type::float_candidates().to_string(), "f64 | f32");
}

#[test]
fn mangled_names() {
    assert_eq!(Type::I64.mangled(), "i64");
    assert_eq!(Type::named("foo.bar.Baz").mangled(), "foo_bar_Baz");
    assert_eq!(
        Type::dict(Type::String, Type::list(Type::U8)).mangled(),
        "dict_string_list_u8"
    );
    assert_eq!(
        Type::Generic("lib.Pair".into(), vec![Type::I64, Type::String]).mangled(),
        "lib_Pair_i64_string"
    );
}

#[test]
fn annotation_round_trip_through_expression() {
    for source in ["[i64]", "{string: (bool, Foo)}", "optional[weak[a.B]]", "Pair[i64, u8]"] {
        let type_ = annotation(source);
        assert_eq!(Type::from_annotation(&type_.to_expression()).unwrap(), type_);
    }
}

#[test]
fn substitute_generic_parameters() {
    let mut type_ = annotation("{T: [optional[U]]}");
    type_.substitute(&[(Atom::from("T"), Type::String), (Atom::from("U"), Type::I64)]);
    assert_eq!(type_, annotation("{string: [optional[i64]]}"));
}

#[test]
fn map_names_rewrites_nested_names() {
    let mut type_ = annotation("(Foo, [Bar[Foo]])");
    type_.map_names(&mut |name| (name == "Foo" || name == "Bar").then(|| format!("m.{name}")));
    assert_eq!(type_, annotation("(m.Foo, [m.Bar[m.Foo]])"));
}

#[test]
fn integer_ranges() {
    assert_eq!(
        Primitive::I32.integer_range(),
        Some((Int::from(-0x8000_0000_i64), Int::from(0x7fff_ffff)))
    );
    assert_eq!(
        Primitive::U64.integer_range(),
        Some((Int::from(0), Int::from(u64::MAX)))
    );
    assert_eq!(Primitive::F32.integer_range(), None);
}

#[test]
fn table_preserves_insertion_order() {
    let mut table = Table::default();
    table.insert(Atom::from("zeta"), 1);
    table.insert(Atom::from("alpha"), 2);
    assert_eq!(table.insert(Atom::from("zeta"), 3), Some(1));
    let names: Vec<_> = table.names().map(Atom::to_str).collect();
    assert_eq!(names, ["zeta", "alpha"]);
    assert_eq!(table.get(Atom::from("zeta")), Some(&3));
}

#[test]
fn kinds_of_names() {
    let mut definitions = Definitions::new("pkg.lib");
    definitions.functions.entry(Atom::from("fib")).clear();
    assert_eq!(definitions.kind_of(Atom::from("fib")), Some(Kind::Function));
    assert_eq!(definitions.kind_of(Atom::from("missing")), None);
    assert_eq!(definitions.qualify_type_name(Atom::from("fib")), None);
}
