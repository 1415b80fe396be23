//! Java source output for checked modules.

use tern_codegen::{emit_java, CodegenError, EmitOptions};
use tern_syntax::{
    BinaryOp, Condition, Expr, ExtensionDef, FieldDef, FnDef, InterfaceDef, InterfaceMethod, Item,
    Module, Param, Pattern, SumTypeDef, TypeExpr, TypeParam, ValDef, VariantDef,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn java(items: Vec<Item>) -> Result<String, CodegenError> {
    java_in(items, None)
}

fn java_in(items: Vec<Item>, package: Option<&str>) -> Result<String, CodegenError> {
    let program = tern_typeck::check(&Module::new("Main", items)).expect("module should check");
    let options = EmitOptions {
        package: package.map(str::to_string),
    };
    emit_java(&program, &options)
}

fn assert_contains(text: &str, needle: &str) {
    assert!(text.contains(needle), "expected `{}` in:\n{}", needle, text);
}

fn val(name: &str, init: Expr) -> Item {
    Item::Val(ValDef::new(name, None, init))
}

/// `fun add(a: Int, b: Int): Int = a + b`
fn add() -> Item {
    Item::Fn(FnDef::new(
        "add",
        vec![Param::new("a", TypeExpr::int()), Param::new("b", TypeExpr::int())],
        Some(TypeExpr::int()),
        Expr::binary(BinaryOp::Add, Expr::name("a"), Expr::name("b")),
    ))
}

/// `sum Shape { Circle(r: Float), Rect(w: Int, h: Int) }`
fn shape() -> Item {
    Item::Sum(SumTypeDef::new(
        "Shape",
        vec![
            VariantDef::new("Circle", vec![FieldDef::new("r", TypeExpr::float())]),
            VariantDef::new(
                "Rect",
                vec![
                    FieldDef::new("w", TypeExpr::int()),
                    FieldDef::new("h", TypeExpr::int()),
                ],
            ),
        ],
    ))
}

/// `interface Show { show(): String; describe(): String = this.show() }`
fn show_interface() -> Item {
    Item::Interface(InterfaceDef::new(
        "Show",
        vec![
            InterfaceMethod::required("show", vec![], TypeExpr::string()),
            InterfaceMethod::with_default(
                "describe",
                vec![],
                TypeExpr::string(),
                Expr::method(Expr::this(), "show", vec![]),
            ),
        ],
    ))
}

// ── Module layout ──────────────────────────────────────────────────────

#[test]
fn header_and_package() {
    let text = java_in(vec![add()], Some("demo.app")).unwrap();
    assert!(text.starts_with("// Generated by ternc from module `Main`. Do not edit.\npackage demo.app;\n"));
    assert_contains(&text, "public final class Main {");
    assert_contains(&text, "public interface Fn2<A1, A2, R> {");
}

#[test]
fn globals_are_static_fields() {
    let text = java(vec![
        val("x", Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2))),
        Item::Val(ValDef::var("count", None, Expr::int(0))),
    ])
    .unwrap();
    assert_contains(&text, "public static final Integer x;");
    assert_contains(&text, "x = (1 + 2);");
    assert_contains(&text, "public static Integer count;");
}

#[test]
fn functions_are_static_methods() {
    let text = java(vec![add()]).unwrap();
    assert_contains(&text, "public static Integer add(Integer a, Integer b) {");
    assert_contains(&text, "return (a + b);");
}

#[test]
fn main_prints_its_result() {
    let main = Item::Fn(FnDef::new("main", vec![], Some(TypeExpr::int()), Expr::int(42)));
    let text = java(vec![main]).unwrap();
    assert_contains(&text, "public static void main(String[] args) {");
    assert_contains(&text, "System.out.println(main());");
}

// ── Generics ───────────────────────────────────────────────────────────

#[test]
fn generic_calls_pass_constraint_objects() {
    let id = Item::Fn(
        FnDef::new(
            "id",
            vec![Param::new("x", TypeExpr::named("T"))],
            Some(TypeExpr::named("T")),
            Expr::name("x"),
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Any"))]),
    );
    let text = java(vec![id, val("y", Expr::call(Expr::name("id"), vec![Expr::int(5)]))]).unwrap();
    assert_contains(&text, "public static <T> T id(Any$Constraint<T> T$dict, T x) {");
    assert_contains(&text, "Main.<Integer>id(Dictionaries.Any$for$Int, 5)");
    assert_contains(&text, "static final class Dictionaries {");
    assert_contains(
        &text,
        "static final Any$Constraint<Integer> Any$for$Int = new Any$Constraint<Integer>() {};",
    );
}

// ── Interfaces, extensions and sums ────────────────────────────────────

#[test]
fn interfaces_get_a_constraint_object_interface() {
    let text = java(vec![show_interface()]).unwrap();
    assert_contains(&text, "public interface Show {");
    assert_contains(&text, "String show();");
    assert_contains(&text, "default String describe() {");
    assert_contains(
        &text,
        "public interface Show$Constraint<ThisConstraint> extends Any$Constraint<ThisConstraint> {",
    );
    assert_contains(&text, "return upcast$($this).show();");
}

#[test]
fn primitive_extensions_become_static_holders() {
    let twice = Item::Extension(ExtensionDef::new(
        "Int",
        vec![FnDef::new(
            "twice",
            vec![],
            Some(TypeExpr::int()),
            Expr::binary(BinaryOp::Mul, Expr::this(), Expr::int(2)),
        )],
    ));
    let text = java(vec![twice, val("d", Expr::method(Expr::int(21), "twice", vec![]))]).unwrap();
    assert_contains(&text, "public static final class Int$Extension {");
    assert_contains(&text, "public static Integer twice(Integer $this) {");
    assert_contains(&text, "return ($this * 2);");
    assert_contains(&text, "Int$Extension.twice(21)");
}

#[test]
fn sum_variants_implement_a_marker_interface() {
    let text = java(vec![shape()]).unwrap();
    assert_contains(&text, "public interface Shape {}");
    assert_contains(&text, "public static final class Circle implements Shape {");
    assert_contains(&text, "public final Double r;");
    assert_contains(&text, "this.r = r;");
}

#[test]
fn type_patterns_test_with_try_cast() {
    // fun radius(s: Shape) = if (s is Circle(r)) r else 0.0
    let body = Expr::if_else(
        Condition::is(Expr::name("s"), Pattern::record("Circle", vec![Pattern::ident("r")])),
        Expr::name("r"),
        Expr::float(0.0),
    );
    let radius = Item::Fn(FnDef::new(
        "radius",
        vec![Param::new("s", TypeExpr::named("Shape"))],
        None,
        body,
    ));
    let text = java(vec![shape(), radius]).unwrap();
    assert_contains(&text, "= Main.$tryCast(");
    assert_contains(&text, "Circle.class);");
    assert_contains(&text, " != null) {");
    assert_contains(&text, "} else {");
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn wide_function_types_are_rejected() {
    let wide = TypeExpr::function(vec![TypeExpr::int(); 5], TypeExpr::int());
    let f = Item::Fn(FnDef::new(
        "f",
        vec![Param::new("g", wide)],
        Some(TypeExpr::int()),
        Expr::int(0),
    ));
    let err = java(vec![f]).unwrap_err();
    assert_eq!(err, CodegenError::TooManyParameters { count: 5, max: 4 });
}

#[test]
fn astral_characters_are_rejected() {
    let err = java(vec![val("c", Expr::char('\u{1F600}'))]).unwrap_err();
    assert!(matches!(err, CodegenError::CharOutOfRange { value: '\u{1F600}', .. }));
}
