//! Reading module trees from the parser's JSON.

use tern_common::Span;
use tern_syntax::{from_json, to_json, BinaryOp, Expr, ExprKind, FnDef, Item, Literal, Module, Param, TypeExpr};

#[test]
fn minimal_module_without_spans() {
    let text = r#"{
        "name": { "text": "Main" },
        "items": [
            { "Val": { "name": { "text": "x" }, "init": { "kind": { "Literal": { "Int": 1 } } } } }
        ]
    }"#;
    let module = from_json(text).unwrap();
    assert_eq!(module.name.text, "Main");
    let Item::Val(def) = &module.items[0] else {
        panic!("expected a val");
    };
    assert!(!def.mutable);
    assert!(def.ty.is_none());
    assert_eq!(def.init.kind, ExprKind::Literal(Literal::Int(1)));
    assert_eq!(def.init.span, Span::dummy());
}

#[test]
fn spans_are_read_when_present() {
    let text = r#"{
        "name": { "text": "Main" },
        "items": [
            { "Val": {
                "name": { "text": "x", "span": { "start": 4, "end": 5 } },
                "mutable": true,
                "init": { "kind": { "Name": { "text": "y" } }, "span": { "start": 8, "end": 9 } },
                "span": { "start": 0, "end": 9 }
            } }
        ]
    }"#;
    let module = from_json(text).unwrap();
    let Item::Val(def) = &module.items[0] else {
        panic!("expected a val");
    };
    assert!(def.mutable);
    assert_eq!(def.name.span, Span::new(4, 5));
    assert_eq!(def.init.span, Span::new(8, 9));
    assert_eq!(module.items[0].span(), Span::new(0, 9));
}

#[test]
fn written_trees_read_back_unchanged() {
    let add = FnDef::new(
        "add",
        vec![
            Param::new("a", TypeExpr::int()),
            Param::new("b", TypeExpr::int()),
        ],
        Some(TypeExpr::int()),
        Expr::binary(BinaryOp::Add, Expr::name("a"), Expr::name("b")),
    );
    let module = Module::new("Math", vec![Item::Fn(add)]);
    let text = to_json(&module).unwrap();
    assert_eq!(from_json(&text).unwrap(), module);
}

#[test]
fn malformed_input_is_an_error() {
    assert!(from_json(r#"{ "name": { "text": "Main" } }"#).is_err());
    assert!(from_json("not json").is_err());
}
