//! Type expressions as written in annotations, bounds and casts.

use serde::{Deserialize, Serialize};
use tern_common::Span;

use super::Name;

/// A written type: `Int`, `Box<String>`, `Array<Int>`, `(Int, Int) -> Bool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A named type, optionally applied to type arguments.
    Named {
        name: Name,
        #[serde(default)]
        args: Vec<TypeExpr>,
        #[serde(default)]
        span: Span,
    },
    /// A function type `(P1, ..., Pn) -> R`.
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
        #[serde(default)]
        span: Span,
    },
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            name: Name::new(name),
            args: Vec::new(),
            span: Span::dummy(),
        }
    }

    pub fn generic(name: &str, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named {
            name: Name::new(name),
            args,
            span: Span::dummy(),
        }
    }

    pub fn array(element: TypeExpr) -> Self {
        TypeExpr::generic("Array", vec![element])
    }

    pub fn function(params: Vec<TypeExpr>, ret: TypeExpr) -> Self {
        TypeExpr::Function {
            params,
            ret: Box::new(ret),
            span: Span::dummy(),
        }
    }

    pub fn int() -> Self {
        TypeExpr::named("Int")
    }

    pub fn float() -> Self {
        TypeExpr::named("Float")
    }

    pub fn bool() -> Self {
        TypeExpr::named("Bool")
    }

    pub fn string() -> Self {
        TypeExpr::named("String")
    }

    pub fn void() -> Self {
        TypeExpr::named("Void")
    }

    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. } | TypeExpr::Function { span, .. } => *span,
        }
    }
}
