//! Conditions and patterns.
//!
//! An `if` takes a [`Condition`] rather than a plain expression so that
//! `x is Circle(r) && r > 1.0` can bind `r` for the rest of the conjunction
//! and the `then` branch.

use serde::{Deserialize, Serialize};
use tern_common::Span;

use super::expr::{Expr, Literal};
use super::ty::TypeExpr;
use super::Name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A plain boolean expression.
    Expr(Expr),
    /// `scrutinee is pattern`
    Is {
        scrutinee: Expr,
        pattern: Pattern,
        #[serde(default)]
        span: Span,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn expr(expr: Expr) -> Self {
        Condition::Expr(expr)
    }

    pub fn is(scrutinee: Expr, pattern: Pattern) -> Self {
        Condition::Is {
            scrutinee,
            pattern,
            span: Span::dummy(),
        }
    }

    pub fn and(self, rhs: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(rhs))
    }

    pub fn span(&self) -> Span {
        match self {
            Condition::Expr(expr) => expr.span,
            Condition::Is { span, .. } => *span,
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => lhs.span().merge(rhs.span()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// `Circle(r)`, `Some(v)`, `Shape as s`: runtime type test and downcast.
    ///
    /// `fields` is `None` when the pattern only tests the type; otherwise it
    /// holds one sub-pattern per record field, in declaration order.
    Type {
        ty: TypeExpr,
        #[serde(default)]
        binding: Option<Name>,
        #[serde(default)]
        fields: Option<Vec<Pattern>>,
        #[serde(default)]
        span: Span,
    },
    /// Equality against a literal.
    Literal {
        value: Literal,
        #[serde(default)]
        span: Span,
    },
    /// Unconditionally binds the matched value.
    Ident(Name),
    /// Matches anything, binds nothing.
    Wildcard {
        #[serde(default)]
        span: Span,
    },
}

impl Pattern {
    /// `Name(p1, ..., pn)`
    pub fn record(name: &str, fields: Vec<Pattern>) -> Self {
        Pattern::Type {
            ty: TypeExpr::named(name),
            binding: None,
            fields: Some(fields),
            span: Span::dummy(),
        }
    }

    /// A bare type test binding the downcast value: `Name as binding`.
    pub fn typed(ty: TypeExpr, binding: &str) -> Self {
        Pattern::Type {
            ty,
            binding: Some(Name::new(binding)),
            fields: None,
            span: Span::dummy(),
        }
    }

    pub fn ident(name: &str) -> Self {
        Pattern::Ident(Name::new(name))
    }

    pub fn literal(value: Literal) -> Self {
        Pattern::Literal {
            value,
            span: Span::dummy(),
        }
    }

    pub fn wildcard() -> Self {
        Pattern::Wildcard { span: Span::dummy() }
    }

    pub fn span(&self) -> Span {
        match self {
            Pattern::Type { span, .. }
            | Pattern::Literal { span, .. }
            | Pattern::Wildcard { span } => *span,
            Pattern::Ident(name) => name.span,
        }
    }
}
