//! Type error types with provenance tracking.
//!
//! Checking stops at the first error: every checking function returns
//! `Result<_, TypeError>` and propagates failures with `?` up to
//! [`check`](crate::check). Each variant carries the span it is reported at,
//! and mismatches carry a [`ConstraintOrigin`] recording why the two types
//! had to agree.

use std::fmt;

use tern_common::Span;

use crate::ty::Type;

/// Where a type requirement came from.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// `f(x)`: argument `param_idx` must fit the parameter type.
    FnArg { call_site: Span, param_idx: usize },
    /// `a + b`: operand types must agree.
    BinOp { op_span: Span },
    /// Both `if` branches must have the same type.
    IfBranches {
        if_span: Span,
        then_span: Span,
        else_span: Span,
    },
    /// `val x: Int = ...`: the value must fit the annotation.
    Annotation { annotation_span: Span },
    /// A function body must fit the declared return type.
    Return { body_span: Span, fn_span: Span },
    /// `target = value`
    Assignment { lhs_span: Span, rhs_span: Span },
    /// `if`/`while` conditions must be `Bool`.
    Condition { span: Span },
    /// Array literal elements must share one type.
    ArrayElement { span: Span },
    /// `a[i]`: the index must be `Int`.
    Index { span: Span },
    /// `Box<Int>`, `id<Int>(...)`: explicit or implied type arguments.
    TypeArguments { span: Span },
    /// `x is P(...)`: the pattern must fit the scrutinee.
    Pattern { span: Span },
}

impl ConstraintOrigin {
    /// The primary span to report the error at.
    pub fn span(&self) -> Span {
        match self {
            ConstraintOrigin::FnArg { call_site, .. } => *call_site,
            ConstraintOrigin::BinOp { op_span } => *op_span,
            ConstraintOrigin::IfBranches { if_span, .. } => *if_span,
            ConstraintOrigin::Annotation { annotation_span } => *annotation_span,
            ConstraintOrigin::Return { body_span, .. } => *body_span,
            ConstraintOrigin::Assignment { rhs_span, .. } => *rhs_span,
            ConstraintOrigin::Condition { span }
            | ConstraintOrigin::ArrayElement { span }
            | ConstraintOrigin::Index { span }
            | ConstraintOrigin::TypeArguments { span }
            | ConstraintOrigin::Pattern { span } => *span,
        }
    }
}

/// The coarse error categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Redefinition,
    Undefined,
    TypeMismatch,
    Arity,
    ConstraintViolation,
    NonConformance,
    InvalidPattern,
    Other,
}

/// A type error encountered during checking.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// A name already bound in the innermost scope.
    Redefinition {
        name: String,
        is_type: bool,
        span: Span,
    },
    UndefinedIdentifier { name: String, span: Span },
    UndefinedType { name: String, span: Span },
    /// A value does not fit the type it flows into.
    Mismatch {
        expected: Type,
        found: Type,
        origin: ConstraintOrigin,
    },
    /// Operand types an operator does not accept.
    OperandMismatch {
        op: String,
        lhs: Type,
        rhs: Option<Type>,
        span: Span,
    },
    /// Wrong number of call arguments or type arguments.
    ArityMismatch {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
    /// A type argument does not satisfy its parameter's bound.
    ConstraintNotSatisfied {
        ty: Type,
        param: String,
        constraint: Type,
        span: Span,
    },
    /// A type-parameter bound that is not an interface.
    InvalidConstraint {
        param: String,
        bound: Type,
        span: Span,
    },
    /// An `implements` clause whose interface member is not provided.
    MissingMember {
        ty: Type,
        interface: Type,
        member: String,
        span: Span,
    },
    /// A provided member whose type differs from the interface's.
    SignatureMismatch {
        interface: Type,
        member: String,
        expected: Type,
        found: Type,
        span: Span,
    },
    NotAFunction { ty: Type, span: Span },
    NoSuchMember {
        ty: Type,
        member: String,
        span: Span,
    },
    /// Assignment to an immutable binding or field.
    Immutable { name: String, span: Span },
    /// Assignment to something that is not a variable, field or element.
    InvalidAssignTarget { span: Span },
    /// A type pattern matched against a value whose static type is neither an
    /// interface nor a sum type.
    TypePatternOnNonInterface { ty: Type, span: Span },
    /// A pattern appearing under `||`.
    PatternInDisjunction { span: Span },
    PatternFieldCount {
        record: Type,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// A pattern type that cannot be tested at run time, or field patterns on
    /// something other than a record.
    InvalidPatternType { ty: Type, span: Span },
    CannotInferTypeArgument { param: String, span: Span },
    /// `extension` of a type that is not a record or primitive.
    InvalidExtension { name: String, span: Span },
    /// `implements` naming something other than an interface.
    NotAnInterface { ty: Type, span: Span },
    EmptyArrayLiteral { span: Span },
    /// A member name declared twice on one type.
    DuplicateMember {
        ty: Type,
        member: String,
        span: Span,
    },
    /// A generic function or constructor used as a value.
    UninstantiatedGeneric { name: String, span: Span },
    ThisOutsideMethod { span: Span },
    /// A lambda referring to a mutable local of an enclosing function.
    CapturedMutable { name: String, span: Span },
    /// Type parameters on a record, interface or extension method.
    GenericMethod { name: String, span: Span },
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::Redefinition { .. } | TypeError::DuplicateMember { .. } => {
                ErrorKind::Redefinition
            }
            TypeError::UndefinedIdentifier { .. }
            | TypeError::UndefinedType { .. }
            | TypeError::NoSuchMember { .. } => ErrorKind::Undefined,
            TypeError::Mismatch { .. }
            | TypeError::OperandMismatch { .. }
            | TypeError::NotAFunction { .. }
            | TypeError::SignatureMismatch { .. } => ErrorKind::TypeMismatch,
            TypeError::ArityMismatch { .. } => ErrorKind::Arity,
            TypeError::ConstraintNotSatisfied { .. } | TypeError::InvalidConstraint { .. } => {
                ErrorKind::ConstraintViolation
            }
            TypeError::MissingMember { .. } => ErrorKind::NonConformance,
            TypeError::TypePatternOnNonInterface { .. }
            | TypeError::PatternInDisjunction { .. }
            | TypeError::PatternFieldCount { .. }
            | TypeError::InvalidPatternType { .. } => ErrorKind::InvalidPattern,
            TypeError::Immutable { .. }
            | TypeError::InvalidAssignTarget { .. }
            | TypeError::CannotInferTypeArgument { .. }
            | TypeError::InvalidExtension { .. }
            | TypeError::NotAnInterface { .. }
            | TypeError::EmptyArrayLiteral { .. }
            | TypeError::UninstantiatedGeneric { .. }
            | TypeError::ThisOutsideMethod { .. }
            | TypeError::CapturedMutable { .. }
            | TypeError::GenericMethod { .. } => ErrorKind::Other,
        }
    }

    /// The span the error is reported at.
    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { origin, .. } | TypeError::ArityMismatch { origin, .. } => {
                origin.span()
            }
            TypeError::Redefinition { span, .. }
            | TypeError::UndefinedIdentifier { span, .. }
            | TypeError::UndefinedType { span, .. }
            | TypeError::OperandMismatch { span, .. }
            | TypeError::ConstraintNotSatisfied { span, .. }
            | TypeError::InvalidConstraint { span, .. }
            | TypeError::MissingMember { span, .. }
            | TypeError::SignatureMismatch { span, .. }
            | TypeError::NotAFunction { span, .. }
            | TypeError::NoSuchMember { span, .. }
            | TypeError::Immutable { span, .. }
            | TypeError::InvalidAssignTarget { span }
            | TypeError::TypePatternOnNonInterface { span, .. }
            | TypeError::PatternInDisjunction { span }
            | TypeError::PatternFieldCount { span, .. }
            | TypeError::InvalidPatternType { span, .. }
            | TypeError::CannotInferTypeArgument { span, .. }
            | TypeError::InvalidExtension { span, .. }
            | TypeError::NotAnInterface { span, .. }
            | TypeError::EmptyArrayLiteral { span }
            | TypeError::DuplicateMember { span, .. }
            | TypeError::UninstantiatedGeneric { span, .. }
            | TypeError::ThisOutsideMethod { span }
            | TypeError::CapturedMutable { span, .. }
            | TypeError::GenericMethod { span, .. } => *span,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Redefinition { name, is_type, .. } => {
                let what = if *is_type { "type" } else { "identifier" };
                write!(f, "{} `{}` is already defined in this scope", what, name)
            }
            TypeError::UndefinedIdentifier { name, .. } => {
                write!(f, "undefined identifier `{}`", name)
            }
            TypeError::UndefinedType { name, .. } => write!(f, "undefined type `{}`", name),
            TypeError::Mismatch {
                expected, found, ..
            } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", expected, found)
            }
            TypeError::OperandMismatch { op, lhs, rhs, .. } => match rhs {
                Some(rhs) => write!(
                    f,
                    "operator `{}` cannot be applied to `{}` and `{}`",
                    op, lhs, rhs
                ),
                None => write!(f, "operator `{}` cannot be applied to `{}`", op, lhs),
            },
            TypeError::ArityMismatch {
                expected,
                found,
                origin,
            } => {
                let what = match origin {
                    ConstraintOrigin::TypeArguments { .. } => "type arguments",
                    _ => "arguments",
                };
                write!(
                    f,
                    "arity mismatch: expected {} {}, found {}",
                    expected, what, found
                )
            }
            TypeError::ConstraintNotSatisfied {
                ty,
                param,
                constraint,
                ..
            } => write!(
                f,
                "type `{}` does not satisfy the bound `{}: {}`",
                ty, param, constraint
            ),
            TypeError::InvalidConstraint { param, bound, .. } => write!(
                f,
                "bound `{}` of type parameter `{}` is not an interface",
                bound, param
            ),
            TypeError::MissingMember {
                ty,
                interface,
                member,
                ..
            } => write!(
                f,
                "`{}` does not implement `{}`: missing member `{}`",
                ty, interface, member
            ),
            TypeError::SignatureMismatch {
                interface,
                member,
                expected,
                found,
                ..
            } => write!(
                f,
                "member `{}` of `{}` has the wrong type: expected `{}`, found `{}`",
                member, interface, expected, found
            ),
            TypeError::NotAFunction { ty, .. } => write!(f, "`{}` is not a function", ty),
            TypeError::NoSuchMember { ty, member, .. } => {
                write!(f, "type `{}` has no member `{}`", ty, member)
            }
            TypeError::Immutable { name, .. } => {
                write!(f, "cannot assign to immutable `{}`", name)
            }
            TypeError::InvalidAssignTarget { .. } => write!(f, "invalid assignment target"),
            TypeError::TypePatternOnNonInterface { ty, .. } => write!(
                f,
                "type patterns need an interface or sum type, found `{}`",
                ty
            ),
            TypeError::PatternInDisjunction { .. } => {
                write!(f, "patterns cannot appear in an `||` condition")
            }
            TypeError::PatternFieldCount {
                record,
                expected,
                found,
                ..
            } => write!(
                f,
                "pattern for `{}` expects {} fields, found {}",
                record, expected, found
            ),
            TypeError::InvalidPatternType { ty, .. } => {
                write!(f, "`{}` cannot be used as a pattern type", ty)
            }
            TypeError::CannotInferTypeArgument { param, .. } => {
                write!(f, "cannot infer type argument `{}`", param)
            }
            TypeError::InvalidExtension { name, .. } => write!(
                f,
                "cannot extend `{}`: only records and primitives can be extended",
                name
            ),
            TypeError::NotAnInterface { ty, .. } => write!(f, "`{}` is not an interface", ty),
            TypeError::EmptyArrayLiteral { .. } => {
                write!(f, "cannot infer the element type of an empty array")
            }
            TypeError::DuplicateMember { ty, member, .. } => {
                write!(f, "`{}` already has a member named `{}`", ty, member)
            }
            TypeError::UninstantiatedGeneric { name, .. } => {
                write!(f, "generic `{}` must be called", name)
            }
            TypeError::ThisOutsideMethod { .. } => write!(f, "`this` used outside a method"),
            TypeError::CapturedMutable { name, .. } => {
                write!(f, "lambda cannot capture mutable variable `{}`", name)
            }
            TypeError::GenericMethod { name, .. } => {
                write!(f, "method `{}` cannot declare type parameters", name)
            }
        }
    }
}

impl std::error::Error for TypeError {}
