//! Rendering checker errors against source text.

use tern_common::Span;
use tern_syntax::{Condition, Expr, Item, Module, TypeExpr, ValDef};
use tern_typeck::diagnostics::{error_code, render_diagnostic, DiagnosticOptions};
use tern_typeck::error::{ConstraintOrigin, TypeError};
use tern_typeck::ty::Type;

/// `val x: Int = 1.5` with real spans.
fn float_into_int() -> (String, TypeError) {
    let source = "val x: Int = 1.5".to_string();
    let annotation = TypeExpr::Named {
        name: tern_syntax::Name::at("Int", Span::new(7, 10)),
        args: Vec::new(),
        span: Span::new(7, 10),
    };
    let def = ValDef::new("x", Some(annotation), Expr::float(1.5).with_span(Span::new(13, 16)));
    let err = tern_typeck::check(&Module::new("Main", vec![Item::Val(def)])).unwrap_err();
    (source, err)
}

#[test]
fn mismatch_report_names_both_types() {
    let (source, err) = float_into_int();
    let out = render_diagnostic(&err, &source, "main.tern", &DiagnosticOptions::colorless());
    assert!(out.contains("E0001"), "missing code in:\n{}", out);
    assert!(out.contains("type mismatch: expected `Int`, found `Float`"), "{}", out);
    assert!(out.contains("convert with `as Int`"), "missing help in:\n{}", out);
}

#[test]
fn colorless_output_has_no_escape_codes() {
    let (source, err) = float_into_int();
    let out = render_diagnostic(&err, &source, "main.tern", &DiagnosticOptions::colorless());
    assert!(!out.contains('\u{1b}'));
}

#[test]
fn json_report_points_at_the_annotation() {
    let (source, err) = float_into_int();
    let out = render_diagnostic(&err, &source, "main.tern", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["code"], "E0001");
    assert_eq!(value["severity"], "error");
    assert_eq!(value["spans"][0]["start"], 7);
    assert_eq!(value["spans"][0]["end"], 10);
    assert_eq!(value["fix"], "convert with `as Int`");
}

#[test]
fn branch_mismatch_labels_both_branches() {
    let source = "if (c) 1 else \"one\"";
    let condition = Condition::expr(Expr::bool(true).with_span(Span::new(4, 5)));
    let expr = Expr::if_else(
        condition,
        Expr::int(1).with_span(Span::new(7, 8)),
        Expr::string("one").with_span(Span::new(14, 19)),
    )
    .with_span(Span::new(0, 19));
    let def = ValDef::new("r", None, expr);
    let err = tern_typeck::check(&Module::new("Main", vec![Item::Val(def)])).unwrap_err();

    let out = render_diagnostic(&err, source, "main.tern", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let spans = value["spans"].as_array().unwrap();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0]["start"], 14);
    assert_eq!(spans[1]["start"], 7);
    assert!(value["fix"].is_null());
}

#[test]
fn spans_past_the_end_are_clamped() {
    let err = TypeError::Mismatch {
        expected: Type::bool(),
        found: Type::int(),
        origin: ConstraintOrigin::Condition {
            span: Span::new(40, 50),
        },
    };
    let out = render_diagnostic(&err, "while (1) {}", "loop.tern", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["spans"][0]["start"], 12);
    assert_eq!(value["spans"][0]["end"], 12);
    assert_eq!(error_code(&err), "E0001");
}
