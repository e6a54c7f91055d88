use super::{concretize, specialize_class, specialize_function};
use hir::{Definitions, Type};
use session::{Context, Registry, Specializations};
use span::{SourceMap, Span};
use std::rc::Rc;
use utility::Atom;

const SOURCE: &str = "\
@generic(T1, T2)
def identity(first: T1, second: T2) -> T1:
    value: T1 = first
    return value

@generic(T)
class Box:
    value: T

    def get(self) -> T:
        return self.value

    def wrap(self) -> Box[T]:
        return Box(self.value)

class Plain:
    x: i64

@generic(T)
def pick(value: T) -> T:
    return value

@generic(T)
def pick(value: T, fallback: T) -> T:
    return fallback
";

fn registry() -> Registry {
    let mut map = SourceMap::default();
    let file = map.add_str("lib", SOURCE);
    let syntax = parser::parse(&map[file]).unwrap();
    let mut modules: Vec<Definitions> =
        vec![collector::collect("lib", &syntax, collector::Options::default()).unwrap()];
    resolver::resolve(&mut modules).unwrap();
    Registry::new(modules)
}

fn identity(registry: &Registry) -> Rc<hir::Function> {
    registry.functions("lib.identity").unwrap()[0].clone()
}

#[test]
fn function_specialization() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");

    let (name, function) = specialize_function(
        &mut context,
        &identity(&registry),
        "lib.identity",
        &[Type::I64, Type::String],
        Span::default(),
    )
    .unwrap();

    assert_eq!(name, "lib.identity_i64_string");
    assert_eq!(function.name.bare, "identity_i64_string");
    assert!(!function.is_generic());
    assert_eq!(function.parameters[0].type_, Type::I64);
    assert_eq!(function.parameters[1].type_, Type::String);
    assert_eq!(function.returns, Some(Type::I64));

    // the annotation of the local variable is rewritten as well
    let ast::BareStatement::AnnotatedAssign(assign) = &function.node.body[0].bare else {
        panic!("expected an annotated assignment");
    };
    assert_eq!(assign.annotation.to_string(), "i64");
}

#[test]
fn specializations_are_cached() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");
    let generic = identity(&registry);

    let (first_name, first) = specialize_function(
        &mut context,
        &generic,
        "lib.identity",
        &[Type::I64, Type::I64],
        Span::default(),
    )
    .unwrap();
    let (second_name, second) = specialize_function(
        &mut context,
        &generic,
        "lib.identity",
        &[Type::I64, Type::I64],
        Span::default(),
    )
    .unwrap();
    let (third_name, third) = specialize_function(
        &mut context,
        &generic,
        "lib.identity",
        &[Type::String, Type::I64],
        Span::default(),
    )
    .unwrap();

    assert_eq!(first_name, second_name);
    assert!(Rc::ptr_eq(&first, &second));
    assert_ne!(first_name, third_name);
    assert!(!Rc::ptr_eq(&first, &third));
    assert_eq!(context.used_specializations().len(), 2);
    drop(context);
    assert_eq!(specializations.len(), 2);
}

#[test]
fn overloads_are_specialized_separately() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");
    let overloads = registry.functions("lib.pick").unwrap();
    assert_eq!(overloads.len(), 2);

    let (first_name, first) =
        specialize_function(&mut context, &overloads[0], "lib.pick", &[Type::I64], Span::default())
            .unwrap();
    let (second_name, second) =
        specialize_function(&mut context, &overloads[1], "lib.pick", &[Type::I64], Span::default())
            .unwrap();

    assert_ne!(first_name, second_name);
    assert_eq!(first.parameters.len(), 1);
    assert_eq!(second.parameters.len(), 2);
    assert_eq!(context.used_specializations().len(), 2);
}

#[test]
fn wrong_number_of_type_arguments() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");

    let error = specialize_function(
        &mut context,
        &identity(&registry),
        "lib.identity",
        &[Type::I64],
        Span::default(),
    )
    .unwrap_err();
    assert_eq!(error.text(), "expected 2 type arguments but got 1");
    assert_eq!(
        error.notes().collect::<Vec<_>>(),
        ["'identity' is declared with the generic parameters T1, T2"]
    );
}

#[test]
fn class_specialization() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");

    let (name, class) =
        specialize_class(&mut context, "lib.Box", &[Type::String], Span::default()).unwrap();

    assert_eq!(name, "lib.Box_string");
    assert_eq!(class.qualified_name(), "lib.Box_string");
    assert_eq!(class.members.get(Atom::from("value")).unwrap().type_, Type::String);

    let get = &class.method(Atom::from("get")).unwrap()[0];
    assert_eq!(get.returns, Some(Type::String));

    let wrap = &class.method(Atom::from("wrap")).unwrap()[0];
    assert_eq!(
        wrap.returns,
        Some(Type::Generic("lib.Box".into(), vec![Type::String]))
    );

    assert!(context.class("lib.Box_string").is_some());
}

#[test]
fn concretize_nested_instantiations() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");

    let type_ = Type::list(Type::Generic(
        "lib.Box".into(),
        vec![Type::Generic("lib.Box".into(), vec![Type::I64])],
    ));
    let concrete = concretize(&mut context, &type_, Span::default()).unwrap();

    assert_eq!(concrete, Type::list(Type::named("lib.Box_lib_Box_i64")));
    assert_eq!(context.used_specializations(), ["lib.Box_i64", "lib.Box_lib_Box_i64"]);
}

#[test]
fn plain_classes_are_not_generic() {
    let registry = registry();
    let mut specializations = Specializations::default();
    let mut context = Context::new(&registry, &mut specializations, "lib");

    let error =
        specialize_class(&mut context, "lib.Plain", &[Type::I64], Span::default()).unwrap_err();
    assert_eq!(error.text(), "class 'Plain' is not generic");
}
