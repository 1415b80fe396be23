//! Generated Java that is compiled with `javac` and run.
//!
//! Each test checks a module, writes the emitted class into a temporary
//! directory, compiles and runs it, and asserts on what `main` printed.
//! Tests pass without running anything when no JDK is on the path.

use std::path::Path;
use std::process::Command;

use tern_codegen::{emit_java, EmitOptions};
use tern_syntax::{
    BinaryOp, Condition, Expr, ExtensionDef, FieldDef, FnDef, InterfaceDef, InterfaceMethod, Item,
    Module, Param, Pattern, RecordDef, SumTypeDef, TypeExpr, TypeParam, ValDef, VariantDef,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn jdk_available() -> bool {
    Command::new("javac").arg("-version").output().is_ok()
}

/// Emit `items` as class `Main`, compile it and run it, returning stdout.
/// `None` when there is no `javac` to compile with.
fn compile_and_run(items: Vec<Item>) -> Option<String> {
    if !jdk_available() {
        eprintln!("javac not found, skipping");
        return None;
    }
    let program = tern_typeck::check(&Module::new("Main", items)).expect("module should check");
    let source = emit_java(&program, &EmitOptions::default()).expect("module should emit");

    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let main_java = temp_dir.path().join("Main.java");
    std::fs::write(&main_java, &source).expect("failed to write Main.java");

    let output = Command::new("javac")
        .args(["-nowarn", "-d"])
        .arg(temp_dir.path())
        .arg(&main_java)
        .output()
        .expect("failed to invoke javac");
    assert!(
        output.status.success(),
        "javac failed:\nstderr: {}\nsource:\n{}",
        String::from_utf8_lossy(&output.stderr),
        source
    );

    let run_output = run_class(temp_dir.path());
    assert!(
        run_output.status.success(),
        "java failed with exit code {:?}:\nstdout: {}\nstderr: {}",
        run_output.status.code(),
        String::from_utf8_lossy(&run_output.stdout),
        String::from_utf8_lossy(&run_output.stderr)
    );
    Some(String::from_utf8_lossy(&run_output.stdout).to_string())
}

fn run_class(class_path: &Path) -> std::process::Output {
    Command::new("java")
        .arg("-cp")
        .arg(class_path)
        .arg("Main")
        .output()
        .expect("failed to invoke java")
}

fn main_returning(ret: TypeExpr, body: Expr) -> Item {
    Item::Fn(FnDef::new("main", vec![], Some(ret), body))
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::call(Expr::name(name), args)
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

/// `fun render<T: Show>(x: T): String = x.describe()`
fn render() -> Item {
    Item::Fn(
        FnDef::new(
            "render",
            vec![Param::new("x", TypeExpr::named("T"))],
            Some(TypeExpr::string()),
            Expr::method(Expr::name("x"), "describe", vec![]),
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Show"))]),
    )
}

// ── Globals and functions ──────────────────────────────────────────────

#[test]
fn global_initializers_run_before_main() {
    let Some(output) = compile_and_run(vec![
        Item::Val(ValDef::new(
            "x",
            None,
            Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2)),
        )),
        main_returning(TypeExpr::int(), Expr::name("x")),
    ]) else {
        return;
    };
    assert_eq!(output, "3\n");
}

// ── Generics ───────────────────────────────────────────────────────────

#[test]
fn generic_identity_returns_its_argument() {
    let id = Item::Fn(
        FnDef::new(
            "id",
            vec![Param::new("x", TypeExpr::named("T"))],
            Some(TypeExpr::named("T")),
            Expr::name("x"),
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Any"))]),
    );
    let Some(output) = compile_and_run(vec![id, main_returning(TypeExpr::int(), call("id", vec![Expr::int(5)]))])
    else {
        return;
    };
    assert_eq!(output, "5\n");
}

#[test]
fn bounded_generic_calls_the_implementation() {
    // interface Comparable<T: Any> { compare(other: T): Int }
    let comparable = Item::Interface(
        InterfaceDef::new(
            "Comparable",
            vec![InterfaceMethod::required(
                "compare",
                vec![Param::new("other", TypeExpr::named("T"))],
                TypeExpr::int(),
            )],
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Any"))]),
    );
    // record Num(n: Int) implements Comparable<Num> { compare(other) = n - other.n }
    let num = Item::Record(
        RecordDef::new("Num", vec![FieldDef::new("n", TypeExpr::int())])
            .with_methods(vec![FnDef::new(
                "compare",
                vec![Param::new("other", TypeExpr::named("Num"))],
                Some(TypeExpr::int()),
                Expr::binary(
                    BinaryOp::Sub,
                    Expr::name("n"),
                    Expr::member(Expr::name("other"), "n"),
                ),
            )])
            .implementing(vec![TypeExpr::generic("Comparable", vec![TypeExpr::named("Num")])]),
    );
    // fun max<T: Comparable>(a: T, b: T): T = if (a.compare(b) > 0) a else b
    let max = Item::Fn(
        FnDef::new(
            "max",
            vec![
                Param::new("a", TypeExpr::named("T")),
                Param::new("b", TypeExpr::named("T")),
            ],
            Some(TypeExpr::named("T")),
            Expr::if_else(
                Condition::expr(Expr::binary(
                    BinaryOp::Gt,
                    Expr::method(Expr::name("a"), "compare", vec![Expr::name("b")]),
                    Expr::int(0),
                )),
                Expr::name("a"),
                Expr::name("b"),
            ),
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Comparable"))]),
    );
    let num_of = |n| call("Num", vec![Expr::int(n)]);
    // max(Num(3), Num(7)).n * 100 + max(Num(9), Num(2)).n
    let body = Expr::binary(
        BinaryOp::Add,
        Expr::binary(
            BinaryOp::Mul,
            Expr::member(call("max", vec![num_of(3), num_of(7)]), "n"),
            Expr::int(100),
        ),
        Expr::member(call("max", vec![num_of(9), num_of(2)]), "n"),
    );
    let Some(output) = compile_and_run(vec![comparable, num, max, main_returning(TypeExpr::int(), body)])
    else {
        return;
    };
    assert_eq!(output, "709\n");
}

// ── Interfaces and extensions ──────────────────────────────────────────

#[test]
fn default_method_reaches_a_primitive_extension() {
    let show_int = ExtensionDef::new(
        "Int",
        vec![FnDef::new("show", vec![], Some(TypeExpr::string()), Expr::string("int"))],
    )
    .implementing(vec![TypeExpr::named("Show")]);
    let Some(output) = compile_and_run(vec![
        show_interface(),
        Item::Extension(show_int),
        render(),
        main_returning(TypeExpr::string(), call("render", vec![Expr::int(1)])),
    ]) else {
        return;
    };
    assert_eq!(output, "int\n");
}

#[test]
fn default_method_reaches_a_record_method() {
    let point = RecordDef::new("Point", vec![FieldDef::new("x", TypeExpr::int())])
        .with_methods(vec![FnDef::new(
            "show",
            vec![],
            Some(TypeExpr::string()),
            Expr::string("point"),
        )])
        .implementing(vec![TypeExpr::named("Show")]);
    let Some(output) = compile_and_run(vec![
        show_interface(),
        Item::Record(point),
        render(),
        main_returning(
            TypeExpr::string(),
            call("render", vec![call("Point", vec![Expr::int(1)])]),
        ),
    ]) else {
        return;
    };
    assert_eq!(output, "point\n");
}

// ── Patterns ───────────────────────────────────────────────────────────

#[test]
fn variant_pattern_binds_the_field_or_falls_through() {
    // fun radius(s: Shape): Float = if (s is Circle(r)) r else 100.0
    let radius = Item::Fn(FnDef::new(
        "radius",
        vec![Param::new("s", TypeExpr::named("Shape"))],
        Some(TypeExpr::float()),
        Expr::if_else(
            Condition::is(Expr::name("s"), Pattern::record("Circle", vec![Pattern::ident("r")])),
            Expr::name("r"),
            Expr::float(100.0),
        ),
    ));
    let body = Expr::binary(
        BinaryOp::Add,
        call("radius", vec![call("Circle", vec![Expr::float(2.5)])]),
        call("radius", vec![call("Rect", vec![Expr::int(1), Expr::int(2)])]),
    );
    let Some(output) = compile_and_run(vec![shape(), radius, main_returning(TypeExpr::float(), body)])
    else {
        return;
    };
    assert_eq!(output, "102.5\n");
}

#[test]
fn conjunction_after_a_pattern_takes_the_else_on_every_failure() {
    // fun wide(s: Shape): Int = if (s is Rect(w, h) && w > h) w - h else 100
    let condition = Condition::is(
        Expr::name("s"),
        Pattern::record("Rect", vec![Pattern::ident("w"), Pattern::ident("h")]),
    )
    .and(Condition::expr(Expr::binary(
        BinaryOp::Gt,
        Expr::name("w"),
        Expr::name("h"),
    )));
    let wide = Item::Fn(FnDef::new(
        "wide",
        vec![Param::new("s", TypeExpr::named("Shape"))],
        Some(TypeExpr::int()),
        Expr::if_else(
            condition,
            Expr::binary(BinaryOp::Sub, Expr::name("w"), Expr::name("h")),
            Expr::int(100),
        ),
    ));
    let rect = |w, h| call("Rect", vec![Expr::int(w), Expr::int(h)]);
    // 5 + 100 + 100
    let body = Expr::binary(
        BinaryOp::Add,
        Expr::binary(
            BinaryOp::Add,
            call("wide", vec![rect(7, 2)]),
            call("wide", vec![rect(1, 2)]),
        ),
        call("wide", vec![call("Circle", vec![Expr::float(1.0)])]),
    );
    let Some(output) = compile_and_run(vec![shape(), wide, main_returning(TypeExpr::int(), body)])
    else {
        return;
    };
    assert_eq!(output, "205\n");
}
