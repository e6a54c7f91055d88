use super::{Binding, Context, Registry, Specializations};
use hir::{Definitions, Import, Kind, Type, Variable};
use span::Spanned;
use utility::Atom;

fn registry() -> Registry {
    let mut lib = Definitions::new("pkg.lib");
    lib.variables.insert(
        Atom::from("LIMIT"),
        Variable {
            name: Spanned::bare(Atom::from("LIMIT")),
            type_: Type::I64,
            annotation: Spanned::bare(ast::BareExpression::name("i64")),
            value: None,
        },
    );
    lib.functions.entry(Atom::from("fib"));

    let mut app = Definitions::new("pkg.app");
    app.imports.insert(
        Atom::from("fibonacci"),
        Import {
            module: Spanned::bare("pkg.lib".to_owned()),
            name: Spanned::bare(Atom::from("fib")),
            alias: Spanned::bare(Atom::from("fibonacci")),
            kind: Some(Kind::Function),
        },
    );

    Registry::new(vec![lib, app])
}

#[test]
fn registry_lookup_by_qualified_name() {
    let registry = registry();
    assert!(registry.variable("pkg.lib.LIMIT").is_some());
    assert!(registry.functions("pkg.lib.fib").is_some());
    assert_eq!(registry.kind("pkg.lib.fib"), Some(Kind::Function));
    assert_eq!(registry.kind("pkg.app.fibonacci"), Some(Kind::Function));
    assert!(registry.class("pkg.lib.Missing").is_none());
    assert!(registry.module("pkg").is_none());
}

#[test]
fn locals_shadow_globals() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "pkg.app");

    assert!(matches!(
        context.lookup(Atom::from("fibonacci")),
        Some(Binding::Functions(name)) if name == "pkg.lib.fib"
    ));

    context.scoped(|context| {
        context.define_local(Atom::from("fibonacci"), Type::String);
        assert!(matches!(
            context.lookup(Atom::from("fibonacci")),
            Some(Binding::Local(Type::String))
        ));
    });

    assert!(!context.is_local(Atom::from("fibonacci")));
    assert!(context.lookup(Atom::from("LIMIT")).is_none());
}

#[test]
fn constants_are_deduplicated() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "pkg.lib");

    let first = context.constant(&Type::String, "String(\"a\")".to_owned());
    let second = context.constant(&Type::String, "String(\"b\")".to_owned());
    let third = context.constant(&Type::String, "String(\"a\")".to_owned());

    assert_eq!(first, third);
    assert_ne!(first, second);
    assert_eq!(context.constants().len(), 2);
}

#[test]
fn unique_names() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "pkg.lib");
    assert_ne!(context.unique("list"), context.unique("list"));
}

#[test]
fn tagged_contexts_synthesize_distinct_names() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context =
        Context::new(&registry, &mut specializations, "pkg.lib").tagged("fib_i64");

    assert_eq!(context.unique("iterator"), "__iterator_fib_i64_1");
    assert_eq!(
        context.constant(&Type::String, "String(\"a\")".to_owned()),
        "__constant_fib_i64_1"
    );
}
