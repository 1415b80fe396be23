//! The Tern syntax tree.
//!
//! Tern's lexer and parser live outside the compiler core. The parser hands
//! over a fully built tree, either directly as these values or serialized as
//! JSON, and the type checker walks it top to bottom.
//!
//! - [`ast::item`]: top-level declarations (`val`, `fun`, `record`, ...)
//! - [`ast::expr`]: expressions and block statements
//! - [`ast::pat`]: conditions and patterns used by `if`
//! - [`ast::ty`]: type expressions

pub mod ast;

pub use ast::expr::{BinaryOp, Expr, ExprKind, LetStmt, Literal, Stmt, UnaryOp};
pub use ast::item::{
    ExtensionDef, FieldDef, FnDef, InterfaceDef, InterfaceMethod, Item, Module, Param, RecordDef,
    SumTypeDef, TypeParam, ValDef, VariantDef,
};
pub use ast::pat::{Condition, Pattern};
pub use ast::ty::TypeExpr;
pub use ast::Name;

/// Read a module tree from the JSON produced by the external parser.
pub fn from_json(text: &str) -> Result<Module, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serialize a module tree to JSON, the inverse of [`from_json`].
pub fn to_json(module: &Module) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(module)
}
