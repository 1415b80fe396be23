//! `if` conditions with patterns: type tests, destructuring, literal and
//! identifier patterns, and binding scope.

use tern_syntax::{
    BinaryOp, Condition, Expr, FieldDef, FnDef, InterfaceDef, InterfaceMethod, Item, Literal,
    Module, Param, Pattern, RecordDef, SumTypeDef, TypeExpr, TypeParam, VariantDef,
};
use tern_typeck::error::{ConstraintOrigin, ErrorKind, TypeError};
use tern_typeck::tast;
use tern_typeck::ty::Type;
use tern_typeck::CheckedProgram;

// ── Helpers ────────────────────────────────────────────────────────────

fn check(items: Vec<Item>) -> Result<CheckedProgram, TypeError> {
    tern_typeck::check(&Module::new("Main", items))
}

fn assert_has_error<F: Fn(&TypeError) -> bool>(
    result: &Result<CheckedProgram, TypeError>,
    pred: F,
    desc: &str,
) {
    match result {
        Err(err) => assert!(pred(err), "expected error matching `{}`, got: {:?}", desc, err),
        Ok(_) => panic!("expected error matching `{}`, got success", desc),
    }
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

/// `fun <name>(s: Shape) = <body>`
fn on_shape(name: &str, body: Expr) -> Item {
    Item::Fn(FnDef::new(
        name,
        vec![Param::new("s", TypeExpr::named("Shape"))],
        None,
        body,
    ))
}

fn function_ret(program: &CheckedProgram, name: &str) -> Type {
    program
        .module
        .items
        .iter()
        .find_map(|item| match item {
            tast::Item::Function(f) if f.name == name => Some(f.ret.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no function `{}`", name))
}

fn is_circle(binding: &str) -> Condition {
    Condition::is(
        Expr::name("s"),
        Pattern::record("Circle", vec![Pattern::ident(binding)]),
    )
}

// ── Destructuring ──────────────────────────────────────────────────────

#[test]
fn destructured_fields_are_bound_in_the_then_branch() {
    // if (s is Circle(r)) r else 0.0
    let body = Expr::if_else(is_circle("r"), Expr::name("r"), Expr::float(0.0));
    let program = check(vec![shape(), on_shape("radius", body)]).unwrap();
    assert_eq!(function_ret(&program, "radius"), Type::float());
}

#[test]
fn bindings_are_visible_on_the_right_of_and() {
    // if (s is Circle(r) && r > 1.0) r else 0.0
    let condition = is_circle("r").and(Condition::expr(Expr::binary(
        BinaryOp::Gt,
        Expr::name("r"),
        Expr::float(1.0),
    )));
    let body = Expr::if_else(condition, Expr::name("r"), Expr::float(0.0));
    assert!(check(vec![shape(), on_shape("big", body)]).is_ok());
}

#[test]
fn bindings_are_not_visible_in_the_else_branch() {
    let body = Expr::if_else(is_circle("r"), Expr::float(1.0), Expr::name("r"));
    let result = check(vec![shape(), on_shape("leak", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::UndefinedIdentifier { name, .. } if name == "r"),
        "UndefinedIdentifier r",
    );
}

#[test]
fn bindings_do_not_outlive_the_if() {
    let body = Expr::block(
        vec![tern_syntax::Stmt::expr(Expr::if_then(is_circle("r"), Expr::name("r")))],
        Some(Expr::name("r")),
    );
    let result = check(vec![shape(), on_shape("after", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::UndefinedIdentifier { name, .. } if name == "r"),
        "UndefinedIdentifier r",
    );
}

#[test]
fn patterns_under_or_are_rejected() {
    let condition = is_circle("r").or(Condition::expr(Expr::bool(true)));
    let body = Expr::if_else(condition, Expr::float(1.0), Expr::float(0.0));
    let result = check(vec![shape(), on_shape("either", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::PatternInDisjunction { .. }),
        "PatternInDisjunction",
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidPattern);
}

#[test]
fn or_without_patterns_is_fine() {
    let condition = Condition::expr(Expr::bool(false)).or(Condition::expr(Expr::bool(true)));
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    assert!(check(vec![shape(), on_shape("plain", body)]).is_ok());
}

#[test]
fn field_pattern_count_must_match() {
    let condition = Condition::is(
        Expr::name("s"),
        Pattern::record("Rect", vec![Pattern::ident("w")]),
    );
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    let result = check(vec![shape(), on_shape("count", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::PatternFieldCount { expected: 2, found: 1, .. }),
        "PatternFieldCount 2/1",
    );
}

#[test]
fn nested_literal_and_wildcard_patterns() {
    // if (s is Rect(1, _)) 1 else 0
    let condition = Condition::is(
        Expr::name("s"),
        Pattern::record(
            "Rect",
            vec![Pattern::literal(Literal::Int(1)), Pattern::wildcard()],
        ),
    );
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    let program = check(vec![shape(), on_shape("unit", body)]).unwrap();

    let Some(tast::Item::Function(f)) = program.module.items.last() else {
        panic!("expected a function");
    };
    let tast::ExprKind::If { condition, .. } = &f.body.kind else {
        panic!("expected an if");
    };
    let tast::Condition::Is {
        pattern: tast::Pattern::Type { fields: Some(fields), .. },
        ..
    } = &**condition
    else {
        panic!("expected a type pattern, got {:?}", condition);
    };
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["w", "h"]);
    assert!(matches!(fields[0].pattern, tast::Pattern::Literal(Literal::Int(1))));
    assert!(matches!(fields[1].pattern, tast::Pattern::Wildcard));
}

#[test]
fn literal_pattern_must_match_field_type() {
    let condition = Condition::is(
        Expr::name("s"),
        Pattern::record("Circle", vec![Pattern::literal(Literal::String("x".into()))]),
    );
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    let result = check(vec![shape(), on_shape("odd", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::OperandMismatch { op, .. } if op == "=="),
        "OperandMismatch ==",
    );
}

// ── Type tests ─────────────────────────────────────────────────────────

#[test]
fn type_pattern_binds_the_downcast_value() {
    // if (s is Rect as rect) rect.w else 0
    let condition = Condition::is(Expr::name("s"), Pattern::typed(TypeExpr::named("Rect"), "rect"));
    let body = Expr::if_else(condition, Expr::member(Expr::name("rect"), "w"), Expr::int(0));
    let program = check(vec![shape(), on_shape("width", body)]).unwrap();
    assert_eq!(function_ret(&program, "width"), Type::int());
}

#[test]
fn pattern_type_must_belong_to_the_scrutinee() {
    let other = Item::Record(RecordDef::new("Other", vec![]));
    let condition = Condition::is(Expr::name("s"), Pattern::typed(TypeExpr::named("Other"), "o"));
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    let result = check(vec![shape(), other, on_shape("foreign", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::Mismatch { origin: ConstraintOrigin::Pattern { .. }, .. }),
        "Mismatch on pattern",
    );
}

#[test]
fn type_pattern_needs_an_interface_or_sum() {
    let condition = Condition::is(Expr::int(1), Pattern::typed(TypeExpr::named("Circle"), "c"));
    let body = Expr::if_else(condition, Expr::int(1), Expr::int(0));
    let result = check(vec![shape(), on_shape("prim", body)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::TypePatternOnNonInterface { ty, .. } if *ty == Type::int()),
        "TypePatternOnNonInterface",
    );
}

#[test]
fn interface_scrutinee() {
    // interface Named { name(): String }
    // record Dog() implements Named { fun name(): String = "dog" }
    // fun f(n: Named): String = if (n is Dog as d) d.name() else "?"
    let named = Item::Interface(InterfaceDef::new(
        "Named",
        vec![InterfaceMethod::required("name", vec![], TypeExpr::string())],
    ));
    let dog = Item::Record(
        RecordDef::new("Dog", vec![])
            .with_methods(vec![FnDef::new(
                "name",
                vec![],
                Some(TypeExpr::string()),
                Expr::string("dog"),
            )])
            .implementing(vec![TypeExpr::named("Named")]),
    );
    let condition = Condition::is(Expr::name("n"), Pattern::typed(TypeExpr::named("Dog"), "d"));
    let body = Expr::if_else(
        condition,
        Expr::method(Expr::name("d"), "name", vec![]),
        Expr::string("?"),
    );
    let f = Item::Fn(FnDef::new(
        "f",
        vec![Param::new("n", TypeExpr::named("Named"))],
        Some(TypeExpr::string()),
        body,
    ));
    assert!(check(vec![named, dog, f]).is_ok());
}

#[test]
fn identifier_pattern_binds_the_scrutinee() {
    // if (s is t) t else s
    let condition = Condition::is(Expr::name("s"), Pattern::ident("t"));
    let body = Expr::if_else(condition, Expr::name("t"), Expr::name("s"));
    let program = check(vec![shape(), on_shape("same", body)]).unwrap();
    assert_eq!(function_ret(&program, "same").to_string(), "Shape");
}

// ── Generic sums ───────────────────────────────────────────────────────

#[test]
fn generic_variant_takes_the_scrutinee_arguments() {
    // sum Option<T: Any> { Some(value: T), None }
    // fun get(o: Option<Int>): Int = if (o is Some(v)) v else 0
    let option = Item::Sum(
        SumTypeDef::new(
            "Option",
            vec![
                VariantDef::new("Some", vec![FieldDef::new("value", TypeExpr::named("T"))]),
                VariantDef::new("None", vec![]),
            ],
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Any"))]),
    );
    let condition = Condition::is(
        Expr::name("o"),
        Pattern::record("Some", vec![Pattern::ident("v")]),
    );
    let get = Item::Fn(FnDef::new(
        "get",
        vec![Param::new(
            "o",
            TypeExpr::generic("Option", vec![TypeExpr::int()]),
        )],
        Some(TypeExpr::int()),
        Expr::if_else(condition, Expr::name("v"), Expr::int(0)),
    ));
    let program = check(vec![option, get]).unwrap();
    assert_eq!(function_ret(&program, "get"), Type::int());
}
