//! Generic functions, records, interfaces and sums: instantiation, bounds
//! and inference.

use tern_syntax::{
    BinaryOp, Condition, Expr, ExtensionDef, FieldDef, FnDef, InterfaceDef, InterfaceMethod, Item,
    Module, Param, RecordDef, SumTypeDef, TypeExpr, TypeParam, ValDef, VariantDef,
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

fn global_type(program: &CheckedProgram, name: &str) -> Type {
    program
        .module
        .items
        .iter()
        .find_map(|item| match item {
            tast::Item::Global(global) if global.name == name => Some(global.ty.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no global `{}`", name))
}

fn any_param(name: &str) -> TypeParam {
    TypeParam::new(name, TypeExpr::named("Any"))
}

fn val(name: &str, init: Expr) -> Item {
    Item::Val(ValDef::new(name, None, init))
}

fn typed_val(name: &str, ty: TypeExpr, init: Expr) -> Item {
    Item::Val(ValDef::new(name, Some(ty), init))
}

/// `fun id<T: Any>(x: T): T = x`
fn id() -> Item {
    Item::Fn(
        FnDef::new(
            "id",
            vec![Param::new("x", TypeExpr::named("T"))],
            Some(TypeExpr::named("T")),
            Expr::name("x"),
        )
        .with_type_params(vec![any_param("T")]),
    )
}

/// `record Box<T: Any>(value: T)`
fn boxed() -> Item {
    Item::Record(
        RecordDef::new("Box", vec![FieldDef::new("value", TypeExpr::named("T"))])
            .with_type_params(vec![any_param("T")]),
    )
}

/// `interface Show { show(): String }`
fn show() -> Item {
    Item::Interface(InterfaceDef::new(
        "Show",
        vec![InterfaceMethod::required("show", vec![], TypeExpr::string())],
    ))
}

/// `fun render<T: Show>(x: T): String = x.show()`
fn render() -> Item {
    Item::Fn(
        FnDef::new(
            "render",
            vec![Param::new("x", TypeExpr::named("T"))],
            Some(TypeExpr::string()),
            Expr::method(Expr::name("x"), "show", vec![]),
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Show"))]),
    )
}

/// `interface Comparable<T: Any> { compare(other: T): Int }`
fn comparable() -> Item {
    Item::Interface(
        InterfaceDef::new(
            "Comparable",
            vec![InterfaceMethod::required(
                "compare",
                vec![Param::new("other", TypeExpr::named("T"))],
                TypeExpr::int(),
            )],
        )
        .with_type_params(vec![any_param("T")]),
    )
}

/// `record Num(n: Int) implements Comparable<Num>`
fn num() -> Item {
    let compare = FnDef::new(
        "compare",
        vec![Param::new("other", TypeExpr::named("Num"))],
        Some(TypeExpr::int()),
        Expr::binary(
            BinaryOp::Sub,
            Expr::name("n"),
            Expr::member(Expr::name("other"), "n"),
        ),
    );
    Item::Record(
        RecordDef::new("Num", vec![FieldDef::new("n", TypeExpr::int())])
            .with_methods(vec![compare])
            .implementing(vec![TypeExpr::generic(
                "Comparable",
                vec![TypeExpr::named("Num")],
            )]),
    )
}

/// `fun max<T: Comparable>(a: T, b: T): T = if (a.compare(b) > 0) a else b`
fn max() -> Item {
    let body = Expr::if_else(
        Condition::expr(Expr::binary(
            BinaryOp::Gt,
            Expr::method(Expr::name("a"), "compare", vec![Expr::name("b")]),
            Expr::int(0),
        )),
        Expr::name("a"),
        Expr::name("b"),
    );
    Item::Fn(
        FnDef::new(
            "max",
            vec![
                Param::new("a", TypeExpr::named("T")),
                Param::new("b", TypeExpr::named("T")),
            ],
            Some(TypeExpr::named("T")),
            body,
        )
        .with_type_params(vec![TypeParam::new("T", TypeExpr::named("Comparable"))]),
    )
}

/// `sum Option<T: Any> { Some(value: T), None }`
fn option() -> Item {
    Item::Sum(
        SumTypeDef::new(
            "Option",
            vec![
                VariantDef::new("Some", vec![FieldDef::new("value", TypeExpr::named("T"))]),
                VariantDef::new("None", vec![]),
            ],
        )
        .with_type_params(vec![any_param("T")]),
    )
}

fn box_of(arg: TypeExpr) -> TypeExpr {
    TypeExpr::generic("Box", vec![arg])
}

// ── Functions ──────────────────────────────────────────────────────────

#[test]
fn type_arguments_are_inferred() {
    let program = check(vec![
        id(),
        val("a", Expr::call(Expr::name("id"), vec![Expr::int(5)])),
        val("b", Expr::call(Expr::name("id"), vec![Expr::string("s")])),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "a"), Type::int());
    assert_eq!(global_type(&program, "b"), Type::string());
}

#[test]
fn explicit_type_arguments() {
    let program = check(vec![
        id(),
        val(
            "a",
            Expr::call_with_types(Expr::name("id"), vec![TypeExpr::bool()], vec![Expr::bool(true)]),
        ),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "a"), Type::bool());

    let tast::Item::Global(a) = &program.module.items[1] else {
        panic!("expected a global");
    };
    let tast::ExprKind::Call {
        callee: tast::Callee::Function { instantiation, .. },
        ..
    } = &a.init.kind
    else {
        panic!("expected a function call, got {:?}", a.init.kind);
    };
    let instantiation = instantiation.as_ref().unwrap();
    assert_eq!(instantiation.args, vec![Type::bool()]);
}

#[test]
fn explicit_argument_is_checked_against_the_instance() {
    let result = check(vec![
        id(),
        val(
            "a",
            Expr::call_with_types(Expr::name("id"), vec![TypeExpr::int()], vec![Expr::bool(true)]),
        ),
    ]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::Mismatch { expected, found, .. } if *expected == Type::int() && *found == Type::bool()),
        "Mismatch Int/Bool",
    );
}

#[test]
fn unused_parameter_cannot_be_inferred() {
    let make = FnDef::new("make", vec![], Some(TypeExpr::int()), Expr::int(1))
        .with_type_params(vec![any_param("T")]);
    let result = check(vec![
        Item::Fn(make),
        val("m", Expr::call(Expr::name("make"), vec![])),
    ]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::CannotInferTypeArgument { param, .. } if param == "T"),
        "CannotInferTypeArgument T",
    );
    insta::assert_snapshot!(result.unwrap_err().to_string(), @"cannot infer type argument `T`");
}

#[test]
fn bound_must_be_an_interface() {
    let bad = FnDef::new("f", vec![], None, Expr::int(1))
        .with_type_params(vec![TypeParam::new("T", TypeExpr::int())]);
    let result = check(vec![Item::Fn(bad)]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::InvalidConstraint { param, .. } if param == "T"),
        "InvalidConstraint",
    );
}

// ── Bounds ─────────────────────────────────────────────────────────────

#[test]
fn unsatisfied_bound() {
    let result = check(vec![
        show(),
        render(),
        val("s", Expr::call(Expr::name("render"), vec![Expr::int(1)])),
    ]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::ConstraintNotSatisfied { ty, param, .. } if *ty == Type::int() && param == "T"),
        "ConstraintNotSatisfied Int",
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ConstraintViolation);
}

#[test]
fn bound_satisfied_through_an_extension() {
    let extension = ExtensionDef::new(
        "Int",
        vec![FnDef::new("show", vec![], Some(TypeExpr::string()), Expr::string("int"))],
    )
    .implementing(vec![TypeExpr::named("Show")]);
    let program = check(vec![
        show(),
        render(),
        Item::Extension(extension),
        val("s", Expr::call(Expr::name("render"), vec![Expr::int(1)])),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "s"), Type::string());
}

#[test]
fn self_referential_bound() {
    let num_of = |n| Expr::call(Expr::name("Num"), vec![Expr::int(n)]);
    let program = check(vec![
        comparable(),
        num(),
        max(),
        val("m", Expr::call(Expr::name("max"), vec![num_of(1), num_of(2)])),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "m"), Type::record("Num"));
}

#[test]
fn self_referential_bound_rejects_non_conforming_types() {
    let result = check(vec![
        comparable(),
        max(),
        val("m", Expr::call(Expr::name("max"), vec![Expr::int(1), Expr::int(2)])),
    ]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::ConstraintNotSatisfied { constraint, .. } if constraint.to_string() == "Comparable<Int>"),
        "ConstraintNotSatisfied Comparable<Int>",
    );
}

// ── Generic records ────────────────────────────────────────────────────

#[test]
fn instances_with_equal_arguments_are_one_type() {
    let program = check(vec![
        boxed(),
        typed_val("a", box_of(TypeExpr::int()), Expr::call(Expr::name("Box"), vec![Expr::int(1)])),
        val(
            "b",
            Expr::call_with_types(Expr::name("Box"), vec![TypeExpr::int()], vec![Expr::int(2)]),
        ),
    ])
    .unwrap();
    let a = global_type(&program, "a");
    assert_eq!(a, global_type(&program, "b"));
    assert_eq!(a.to_string(), "Box<Int>");
    assert_eq!(
        program
            .types
            .instances()
            .filter(|ty| ty.to_string() == "Box<Int>")
            .count(),
        1
    );
}

#[test]
fn instance_fields_are_substituted() {
    let program = check(vec![
        boxed(),
        val("a", Expr::call(Expr::name("Box"), vec![Expr::string("s")])),
        val("v", Expr::member(Expr::name("a"), "value")),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "v"), Type::string());
}

#[test]
fn instances_with_different_arguments_differ() {
    let result = check(vec![
        boxed(),
        typed_val(
            "a",
            box_of(TypeExpr::int()),
            Expr::call(Expr::name("Box"), vec![Expr::string("s")]),
        ),
    ]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::Mismatch { expected, found, .. } if expected.to_string() == "Box<Int>" && found.to_string() == "Box<String>"),
        "Mismatch Box<Int>/Box<String>",
    );
}

#[test]
fn wrong_number_of_type_arguments() {
    let result = check(vec![
        boxed(),
        typed_val(
            "a",
            TypeExpr::generic("Box", vec![TypeExpr::int(), TypeExpr::int()]),
            Expr::call(Expr::name("Box"), vec![Expr::int(1)]),
        ),
    ]);
    assert_has_error(
        &result,
        |e| {
            matches!(
                e,
                TypeError::ArityMismatch {
                    expected: 1,
                    found: 2,
                    origin: ConstraintOrigin::TypeArguments { .. },
                }
            )
        },
        "ArityMismatch on type arguments",
    );
}

#[test]
fn generic_record_implements_generic_interface() {
    // record Cell<T: Any>(item: T) implements Getter<T> { fun get(): T = item }
    let getter = Item::Interface(
        InterfaceDef::new(
            "Getter",
            vec![InterfaceMethod::required("get", vec![], TypeExpr::named("T"))],
        )
        .with_type_params(vec![any_param("T")]),
    );
    let cell = Item::Record(
        RecordDef::new("Cell", vec![FieldDef::new("item", TypeExpr::named("T"))])
            .with_type_params(vec![any_param("T")])
            .with_methods(vec![FnDef::new(
                "get",
                vec![],
                Some(TypeExpr::named("T")),
                Expr::name("item"),
            )])
            .implementing(vec![TypeExpr::generic("Getter", vec![TypeExpr::named("T")])]),
    );
    let program = check(vec![
        getter,
        cell,
        typed_val(
            "g",
            TypeExpr::generic("Getter", vec![TypeExpr::int()]),
            Expr::call(Expr::name("Cell"), vec![Expr::int(3)]),
        ),
        val("v", Expr::method(Expr::name("g"), "get", vec![])),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "g").to_string(), "Getter<Int>");
    assert_eq!(global_type(&program, "v"), Type::int());
}

// ── Generic sums ───────────────────────────────────────────────────────

#[test]
fn generic_variant_flows_into_its_sum_instance() {
    let program = check(vec![
        option(),
        typed_val(
            "o",
            TypeExpr::generic("Option", vec![TypeExpr::int()]),
            Expr::call(Expr::name("Some"), vec![Expr::int(1)]),
        ),
        typed_val(
            "n",
            TypeExpr::generic("Option", vec![TypeExpr::int()]),
            Expr::call_with_types(Expr::name("None"), vec![TypeExpr::int()], vec![]),
        ),
    ])
    .unwrap();
    assert_eq!(global_type(&program, "o").to_string(), "Option<Int>");
    assert!(program.types.relation().implements(
        &Type::Record(tern_typeck::ty::NominalType::instance("Some", vec![Type::int()])),
        &global_type(&program, "o"),
    ));
}

#[test]
fn argumentless_generic_variant_needs_type_arguments() {
    let result = check(vec![option(), val("n", Expr::call(Expr::name("None"), vec![]))]);
    assert_has_error(
        &result,
        |e| matches!(e, TypeError::CannotInferTypeArgument { .. }),
        "CannotInferTypeArgument",
    );
}
