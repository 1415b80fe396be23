//! Top-level declarations.

use serde::{Deserialize, Serialize};
use tern_common::Span;

use super::expr::Expr;
use super::ty::TypeExpr;
use super::Name;

/// A compilation unit. Its name becomes the name of the emitted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: Name,
    pub items: Vec<Item>,
    #[serde(default)]
    pub span: Span,
}

impl Module {
    pub fn new(name: &str, items: Vec<Item>) -> Self {
        Module {
            name: Name::new(name),
            items,
            span: Span::dummy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Val(ValDef),
    Fn(FnDef),
    Record(RecordDef),
    Interface(InterfaceDef),
    Extension(ExtensionDef),
    Sum(SumTypeDef),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Val(def) => def.span,
            Item::Fn(def) => def.span,
            Item::Record(def) => def.span,
            Item::Interface(def) => def.span,
            Item::Extension(def) => def.span,
            Item::Sum(def) => def.span,
        }
    }
}

/// `val name: Ty = init` or `var name: Ty = init` at module level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValDef {
    pub name: Name,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub ty: Option<TypeExpr>,
    pub init: Expr,
    #[serde(default)]
    pub span: Span,
}

impl ValDef {
    pub fn new(name: &str, ty: Option<TypeExpr>, init: Expr) -> Self {
        ValDef {
            name: Name::new(name),
            mutable: false,
            ty,
            init,
            span: Span::dummy(),
        }
    }

    pub fn var(name: &str, ty: Option<TypeExpr>, init: Expr) -> Self {
        ValDef {
            mutable: true,
            ..ValDef::new(name, ty, init)
        }
    }
}

/// `T: Bound` in a type parameter list. Every parameter is bounded; the
/// unconstrained form is written `T: Any`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: Name,
    pub bound: TypeExpr,
    #[serde(default)]
    pub span: Span,
}

impl TypeParam {
    pub fn new(name: &str, bound: TypeExpr) -> Self {
        TypeParam {
            name: Name::new(name),
            bound,
            span: Span::dummy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
    #[serde(default)]
    pub span: Span,
}

impl Param {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Param {
            name: Name::new(name),
            ty,
            span: Span::dummy(),
        }
    }
}

/// A function, either global or a method inside a record or extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDef {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// Inferred from the body when absent. Recursion requires it.
    #[serde(default)]
    pub ret: Option<TypeExpr>,
    pub body: Expr,
    #[serde(default)]
    pub span: Span,
}

impl FnDef {
    pub fn new(name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Expr) -> Self {
        FnDef {
            name: Name::new(name),
            type_params: Vec::new(),
            params,
            ret,
            body,
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParam>) -> Self {
        self.type_params = type_params;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: Name,
    pub ty: TypeExpr,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub span: Span,
}

impl FieldDef {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        FieldDef {
            name: Name::new(name),
            ty,
            mutable: false,
            span: Span::dummy(),
        }
    }

    pub fn var(name: &str, ty: TypeExpr) -> Self {
        FieldDef {
            mutable: true,
            ..FieldDef::new(name, ty)
        }
    }
}

/// `record Name<T>(fields) implements I, J { methods }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<FnDef>,
    #[serde(default)]
    pub implements: Vec<TypeExpr>,
    #[serde(default)]
    pub span: Span,
}

impl RecordDef {
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Self {
        RecordDef {
            name: Name::new(name),
            type_params: Vec::new(),
            fields,
            methods: Vec::new(),
            implements: Vec::new(),
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParam>) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn with_methods(mut self, methods: Vec<FnDef>) -> Self {
        self.methods = methods;
        self
    }

    pub fn implementing(mut self, interfaces: Vec<TypeExpr>) -> Self {
        self.implements = interfaces;
        self
    }
}

/// A member signature. A member with a default body is optional for
/// implementers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethod {
    pub name: Name,
    pub params: Vec<Param>,
    pub ret: TypeExpr,
    #[serde(default)]
    pub default_body: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

impl InterfaceMethod {
    pub fn required(name: &str, params: Vec<Param>, ret: TypeExpr) -> Self {
        InterfaceMethod {
            name: Name::new(name),
            params,
            ret,
            default_body: None,
            span: Span::dummy(),
        }
    }

    pub fn with_default(name: &str, params: Vec<Param>, ret: TypeExpr, body: Expr) -> Self {
        InterfaceMethod {
            default_body: Some(body),
            ..InterfaceMethod::required(name, params, ret)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub methods: Vec<InterfaceMethod>,
    #[serde(default)]
    pub span: Span,
}

impl InterfaceDef {
    pub fn new(name: &str, methods: Vec<InterfaceMethod>) -> Self {
        InterfaceDef {
            name: Name::new(name),
            type_params: Vec::new(),
            methods,
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParam>) -> Self {
        self.type_params = type_params;
        self
    }
}

/// `extension Target implements I { methods }`
///
/// A generic record target is named without arguments; its methods see the
/// record's own type parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDef {
    pub target: Name,
    #[serde(default)]
    pub methods: Vec<FnDef>,
    #[serde(default)]
    pub implements: Vec<TypeExpr>,
    #[serde(default)]
    pub span: Span,
}

impl ExtensionDef {
    pub fn new(target: &str, methods: Vec<FnDef>) -> Self {
        ExtensionDef {
            target: Name::new(target),
            methods,
            implements: Vec::new(),
            span: Span::dummy(),
        }
    }

    pub fn implementing(mut self, interfaces: Vec<TypeExpr>) -> Self {
        self.implements = interfaces;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: Name,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub span: Span,
}

impl VariantDef {
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Self {
        VariantDef {
            name: Name::new(name),
            fields,
            span: Span::dummy(),
        }
    }
}

/// `sum Option<T> = Some(value: T) | None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumTypeDef {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub variants: Vec<VariantDef>,
    #[serde(default)]
    pub span: Span,
}

impl SumTypeDef {
    pub fn new(name: &str, variants: Vec<VariantDef>) -> Self {
        SumTypeDef {
            name: Name::new(name),
            type_params: Vec::new(),
            variants,
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParam>) -> Self {
        self.type_params = type_params;
        self
    }
}
