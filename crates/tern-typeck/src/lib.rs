//! Tern type checker: nominal interfaces, bounded generics and pattern
//! conditions.
//!
//! This crate validates the static semantics of a Tern module and lowers it
//! into a typed AST for code generation. Checking walks the declarations in
//! source order and stops at the first error.
//!
//! - Nominal records, interfaces and sum types; structural arrays and
//!   functions
//! - An explicit implementation relation (`implements`, extensions, sum
//!   variants) deciding assignability
//! - Generic functions, records, interfaces and sums with interface-bounded
//!   type parameters, instantiated by substitution
//! - `if` conditions with type, literal and identifier patterns
//!
//! # Architecture
//!
//! - [`ty`]: Type representation and substitution
//! - [`relation`]: The implementation relation and `cannot_assign`
//! - [`env`]: Scope stack of identifiers and types
//! - [`registry`]: Member maps, generic instances and conformance
//! - [`builtins`]: Primitive types, `Array<T>` and `Any`
//! - [`checker`]: The checking context and scope guard
//! - [`generics`]: Type parameters, instantiation and inference
//! - [`decl`], [`expr`], [`pattern`]: Declaration, expression and condition
//!   checking
//! - [`tast`]: The typed AST
//! - [`error`]: Type error types with provenance tracking
//! - [`diagnostics`]: Ariadne rendering of errors

pub mod builtins;
pub mod checker;
pub mod decl;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod expr;
pub mod generics;
pub mod pattern;
pub mod registry;
pub mod relation;
pub mod tast;
pub mod ty;

use tern_syntax as syntax;

use crate::checker::Checker;
use crate::error::TypeError;
use crate::registry::TypeRegistry;

/// A module that passed type checking.
#[derive(Debug)]
pub struct CheckedProgram {
    pub module: tast::Module,
    /// Record, interface and sum declarations, the implementation relation
    /// and every generic instance created while checking.
    pub types: TypeRegistry,
}

/// Type-check a module.
///
/// This is the main entry point for the type checker. A fresh checking
/// context is created for every call.
pub fn check(module: &syntax::Module) -> Result<CheckedProgram, TypeError> {
    Checker::new().check_module(module)
}
