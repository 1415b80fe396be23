//! The typed AST.
//!
//! The checker lowers each syntax node into one of these as it validates it.
//! Every expression carries its resolved [`Type`]; names carry the
//! [`Identifier`] they resolved to; calls record how they dispatch and, for
//! generics, the instantiation they were checked against. The code generator
//! works from this tree alone plus the registry in
//! [`CheckedProgram`](crate::CheckedProgram).

use tern_common::Span;
use tern_syntax::{BinaryOp, Literal, UnaryOp};

use crate::env::Identifier;
use crate::ty::{FunctionType, Primitive, Type, TypeParameter};

#[derive(Clone, Debug)]
pub struct Module {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug)]
pub enum Item {
    Global(Global),
    Function(Function),
    Record(Record),
    Interface(Interface),
    Extension(Extension),
    Sum(Sum),
}

#[derive(Clone, Debug)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub init: Expr,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A global function or a method.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Expr,
}

impl Function {
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.ret.clone(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

/// A record, or one variant of a sum type.
#[derive(Clone, Debug)]
pub struct Record {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub fields: Vec<Field>,
    pub methods: Vec<Function>,
    pub implements: Vec<Type>,
    /// The record as seen from inside its own body: `Box<T>` for
    /// `record Box<T>`.
    pub self_type: Type,
    /// The parent sum type of a variant, over the same parameters.
    pub variant_of: Option<Type>,
}

#[derive(Clone, Debug)]
pub struct InterfaceMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub default_body: Option<Expr>,
}

impl InterfaceMethod {
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.ret.clone(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct Interface {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub methods: Vec<InterfaceMethod>,
    pub self_type: Type,
}

/// Methods and implementations added to an existing record or primitive.
#[derive(Clone, Debug)]
pub struct Extension {
    /// A primitive, a plain record, or a generic record over its own
    /// parameters.
    pub target: Type,
    pub type_params: Vec<TypeParameter>,
    pub methods: Vec<Function>,
    pub implements: Vec<Type>,
}

#[derive(Clone, Debug)]
pub struct Sum {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub variants: Vec<Record>,
    pub self_type: Type,
}

// ── Expressions ────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Self {
        Expr { kind, ty, span }
    }
}

/// How a method call reaches its implementation.
#[derive(Clone, Debug)]
pub enum Dispatch {
    /// An ordinary method call on a record or interface value.
    Virtual,
    /// A method added to a primitive by an extension, or a default member
    /// inherited by the primitive.
    Extension(Primitive),
    /// A member of a type parameter's bound, called through the parameter's
    /// constraint object.
    Constraint(TypeParameter),
}

/// How a member access resolved.
#[derive(Clone, Debug)]
pub enum Access {
    Field { mutable: bool },
    /// A method referenced without being called.
    Method(Dispatch),
}

/// Type arguments a generic was instantiated with at a call site.
#[derive(Clone, Debug)]
pub struct Instantiation {
    pub params: Vec<TypeParameter>,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug)]
pub enum Callee {
    /// A global function, by name.
    Function {
        name: String,
        instantiation: Option<Instantiation>,
    },
    /// A record or variant constructor; `record` is the constructed type.
    Constructor {
        record: Type,
        instantiation: Option<Instantiation>,
    },
    Method {
        receiver: Box<Expr>,
        name: String,
        dispatch: Dispatch,
    },
    /// Any other function-typed value: a local, a field, a lambda.
    Value(Box<Expr>),
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Identifier),
    This,
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    Member {
        receiver: Box<Expr>,
        name: String,
        access: Access,
    },
    If {
        condition: Box<Condition>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    Block {
        stmts: Vec<Stmt>,
        tail: Option<Box<Expr>>,
    },
    Lambda {
        params: Vec<Param>,
        ret: Type,
        body: Box<Expr>,
    },
    /// Unchecked conversion to the expression's type.
    Cast(Box<Expr>),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// The inner value viewed as the (interface, sum or `Any`) type of this
    /// expression. Inserted wherever assignability went through the
    /// implementation relation.
    Upcast(Box<Expr>),
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Let {
        name: String,
        ty: Type,
        mutable: bool,
        init: Expr,
    },
    Expr(Expr),
}

// ── Conditions and patterns ────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum Condition {
    Expr(Expr),
    Is { scrutinee: Expr, pattern: Pattern },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Whether a pattern occurs anywhere in the condition.
    pub fn has_pattern(&self) -> bool {
        match self {
            Condition::Expr(_) => false,
            Condition::Is { .. } => true,
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                lhs.has_pattern() || rhs.has_pattern()
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Pattern {
    /// Runtime type test. `fields` holds one sub-pattern per record field.
    Type {
        ty: Type,
        binding: Option<String>,
        fields: Option<Vec<FieldPattern>>,
    },
    Literal(Literal),
    Ident { name: String, ty: Type },
    Wildcard,
}

#[derive(Clone, Debug)]
pub struct FieldPattern {
    pub name: String,
    pub ty: Type,
    pub pattern: Pattern,
}
