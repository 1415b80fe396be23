//! Expression nodes and block statements.

use std::fmt;

use serde::{Deserialize, Serialize};
use tern_common::Span;

use super::item::Param;
use super::pat::Condition;
use super::ty::TypeExpr;
use super::Name;

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
}

/// Binary operators, grouped by typing rule in the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::NotEq)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// The operator as written in source (and in Java, which shares them).
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    /// A reference to an identifier, function, or record/variant constructor.
    Name(Name),
    /// The receiver inside a method or interface default body.
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
    /// `callee<type_args>(args)`. `type_args` is empty unless written out.
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// `receiver.name`
    Member { receiver: Box<Expr>, name: Name },
    If {
        condition: Box<Condition>,
        then_branch: Box<Expr>,
        #[serde(default)]
        else_branch: Option<Box<Expr>>,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    Block {
        stmts: Vec<Stmt>,
        #[serde(default)]
        tail: Option<Box<Expr>>,
    },
    Lambda {
        params: Vec<Param>,
        #[serde(default)]
        ret: Option<TypeExpr>,
        body: Box<Expr>,
    },
    /// `expr as Type`
    Cast { expr: Box<Expr>, ty: TypeExpr },
    /// `target = value`
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// `[a, b, c]`
    Array { elements: Vec<Expr> },
    /// `array[index]`
    Index { array: Box<Expr>, index: Box<Expr> },
}

/// A `val`/`var` binding inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetStmt {
    pub name: Name,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub ty: Option<TypeExpr>,
    pub init: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let(LetStmt),
    Expr(Expr),
}

impl Stmt {
    pub fn val(name: &str, init: Expr) -> Self {
        Stmt::Let(LetStmt {
            name: Name::new(name),
            mutable: false,
            ty: None,
            init,
            span: Span::dummy(),
        })
    }

    pub fn var(name: &str, init: Expr) -> Self {
        Stmt::Let(LetStmt {
            name: Name::new(name),
            mutable: true,
            ty: None,
            init,
            span: Span::dummy(),
        })
    }

    pub fn typed_val(name: &str, ty: TypeExpr, init: Expr) -> Self {
        Stmt::Let(LetStmt {
            name: Name::new(name),
            mutable: false,
            ty: Some(ty),
            init,
            span: Span::dummy(),
        })
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }
}

// ── Construction helpers ─────────────────────────────────────────────

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::dummy(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn float(value: f64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Float(value)))
    }

    pub fn bool(value: bool) -> Self {
        Expr::new(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn char(value: char) -> Self {
        Expr::new(ExprKind::Literal(Literal::Char(value)))
    }

    pub fn string(value: &str) -> Self {
        Expr::new(ExprKind::Literal(Literal::String(value.to_string())))
    }

    pub fn name(name: &str) -> Self {
        Expr::new(ExprKind::Name(Name::new(name)))
    }

    pub fn this() -> Self {
        Expr::new(ExprKind::This)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::call_with_types(callee, Vec::new(), args)
    }

    pub fn call_with_types(callee: Expr, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Call {
            callee: Box::new(callee),
            type_args,
            args,
        })
    }

    pub fn member(receiver: Expr, name: &str) -> Self {
        Expr::new(ExprKind::Member {
            receiver: Box::new(receiver),
            name: Name::new(name),
        })
    }

    /// `receiver.name(args)`
    pub fn method(receiver: Expr, name: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(receiver, name), args)
    }

    pub fn if_else(condition: Condition, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::new(ExprKind::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        })
    }

    pub fn if_then(condition: Condition, then_branch: Expr) -> Self {
        Expr::new(ExprKind::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: None,
        })
    }

    pub fn while_loop(condition: Expr, body: Expr) -> Self {
        Expr::new(ExprKind::While {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    pub fn block(stmts: Vec<Stmt>, tail: Option<Expr>) -> Self {
        Expr::new(ExprKind::Block {
            stmts,
            tail: tail.map(Box::new),
        })
    }

    pub fn lambda(params: Vec<Param>, ret: Option<TypeExpr>, body: Expr) -> Self {
        Expr::new(ExprKind::Lambda {
            params,
            ret,
            body: Box::new(body),
        })
    }

    pub fn cast(expr: Expr, ty: TypeExpr) -> Self {
        Expr::new(ExprKind::Cast {
            expr: Box::new(expr),
            ty,
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::new(ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn array(elements: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Array { elements })
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        Expr::new(ExprKind::Index {
            array: Box::new(array),
            index: Box::new(index),
        })
    }
}
