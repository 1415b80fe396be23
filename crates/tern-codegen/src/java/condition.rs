//! `if` conditions with patterns.
//!
//! A condition such as `s is Circle(r) && r > 1.0` has no Java expression
//! form, so it is desugared into nested `if` statements. Each test opens an
//! `if`; the remaining conjuncts and field sub-patterns are carried as a
//! continuation that runs inside it, ending in the `then` branch. Every
//! failing test gets its own copy of the `else` branch.
//!
//! ```java
//! final Shape $s1 = s;
//! final Circle $m1 = Main.$tryCast($s1, Circle.class);
//! if ($m1 != null) {
//!     final Double r = $m1.radius;
//!     if ((r > 1.0)) { ... } else { ... }
//! } else { ... }
//! ```
//!
//! Pattern bindings are scoped to the `then` branch; the `else` branch is
//! lowered against the scopes as they were before the condition.

use log::trace;
use rustc_hash::FxHashMap;
use tern_syntax::BinaryOp;
use tern_typeck::tast::{Condition, Expr, FieldPattern, Pattern};

use crate::error::CodegenError;

use super::expr::{literal_value, Dest};
use super::types::{class_literal, value_name};
use super::writer::Writer;
use super::JavaGen;

/// The branches of the `if` being lowered.
struct Arms<'a> {
    then_branch: &'a Expr,
    else_branch: Option<&'a Expr>,
    dest: &'a Dest,
    /// Name scopes outside the condition.
    scopes: Vec<FxHashMap<String, String>>,
}

/// What runs once the current test succeeds.
#[derive(Clone)]
enum Cont<'c> {
    Then,
    Cond(&'c Condition, Box<Cont<'c>>),
    Fields {
        rest: &'c [FieldPattern],
        record: String,
        next: Box<Cont<'c>>,
    },
}

impl JavaGen<'_> {
    pub(crate) fn lower_if(
        &mut self,
        condition: &Condition,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        dest: &Dest,
        out: &mut Writer,
    ) -> Result<(), CodegenError> {
        let arms = Arms {
            then_branch,
            else_branch,
            dest,
            scopes: self.body.scopes.clone(),
        };
        if condition.has_pattern() {
            trace!("desugaring pattern condition");
        }
        self.body.push_scope();
        let result = self.lower_condition(condition, Cont::Then, &arms, out);
        self.body.pop_scope();
        result
    }

    fn lower_condition(
        &mut self,
        condition: &Condition,
        cont: Cont<'_>,
        arms: &Arms<'_>,
        out: &mut Writer,
    ) -> Result<(), CodegenError> {
        match condition {
            Condition::Expr(expr) => {
                let value = self.expr(expr, out)?;
                self.branch(&value, cont, arms, out)
            }
            Condition::Or(..) => {
                let value = self.condition_value(condition, out)?;
                self.branch(&value, cont, arms, out)
            }
            Condition::And(lhs, rhs) => self.lower_condition(lhs, Cont::Cond(&**rhs, Box::new(cont)), arms, out),
            Condition::Is { scrutinee, pattern } => {
                let value = self.expr(scrutinee, out)?;
                let value = self.spill(value, &scrutinee.ty, "s", out)?;
                self.lower_pattern(&value, pattern, cont, arms, out)
            }
        }
    }

    /// A pattern-free condition as a boolean value.
    fn condition_value(&mut self, condition: &Condition, out: &mut Writer) -> Result<String, CodegenError> {
        let (op, lhs, rhs) = match condition {
            Condition::Expr(expr) => return self.expr(expr, out),
            Condition::And(lhs, rhs) => (BinaryOp::And, lhs, rhs),
            Condition::Or(lhs, rhs) => (BinaryOp::Or, lhs, rhs),
            Condition::Is { scrutinee, .. } => {
                return Err(CodegenError::unsupported(
                    "java",
                    "patterns under `||`",
                    scrutinee.span,
                ))
            }
        };
        let left = self.condition_value(lhs, out)?;
        let mut prelude = Writer::new();
        let right = self.condition_value(rhs, &mut prelude)?;
        self.short_circuit(op, left, prelude, right, out)
    }

    /// `if (value) { cont } else { else }`
    fn branch(&mut self, value: &str, cont: Cont<'_>, arms: &Arms<'_>, out: &mut Writer) -> Result<(), CodegenError> {
        out.open(format!("if ({}) {{", value));
        self.run(cont, arms, out)?;
        self.lower_else(arms, out)
    }

    fn lower_pattern(
        &mut self,
        value: &str,
        pattern: &Pattern,
        cont: Cont<'_>,
        arms: &Arms<'_>,
        out: &mut Writer,
    ) -> Result<(), CodegenError> {
        match pattern {
            Pattern::Type { ty, binding, fields } => {
                let java = self.jtype(ty)?;
                let matched = self.body.temp("m");
                out.line(format!(
                    "final {} {} = {}.$tryCast({}, {});",
                    java,
                    matched,
                    self.class,
                    value,
                    class_literal(ty, &self.class)
                ));
                out.open(format!("if ({} != null) {{", matched));
                if let Some(binding) = binding {
                    let local = self.body.declare(binding);
                    out.line(format!("final {} {} = {};", java, local, matched));
                }
                let cont = match fields {
                    Some(fields) => Cont::Fields {
                        rest: fields,
                        record: matched,
                        next: Box::new(cont),
                    },
                    None => cont,
                };
                self.run(cont, arms, out)?;
                self.lower_else(arms, out)
            }
            Pattern::Literal(literal) => {
                let literal = literal_value(literal, arms.then_branch.span)?;
                let test = format!("java.util.Objects.equals({}, {})", value, literal);
                self.branch(&test, cont, arms, out)
            }
            Pattern::Ident { name, ty } => {
                let java = self.jtype(ty)?;
                let local = self.body.declare(name);
                out.line(format!("final {} {} = {};", java, local, value));
                self.run(cont, arms, out)
            }
            Pattern::Wildcard => self.run(cont, arms, out),
        }
    }

    fn run(&mut self, cont: Cont<'_>, arms: &Arms<'_>, out: &mut Writer) -> Result<(), CodegenError> {
        match cont {
            Cont::Then => self.lower_nested(arms.then_branch, arms.dest, out),
            Cont::Cond(condition, next) => self.lower_condition(condition, *next, arms, out),
            Cont::Fields { rest, record, next } => {
                let Some((field, rest)) = rest.split_first() else {
                    return self.run(*next, arms, out);
                };
                let value = format!("{}.{}", record, value_name(&field.name));
                let cont = Cont::Fields { rest, record, next };
                self.lower_pattern(&value, &field.pattern, cont, arms, out)
            }
        }
    }

    /// Close the `if` opened by a test, with the `else` branch when there
    /// is one.
    fn lower_else(&mut self, arms: &Arms<'_>, out: &mut Writer) -> Result<(), CodegenError> {
        let Some(else_branch) = arms.else_branch else {
            out.close("}");
            return Ok(());
        };
        out.reopen("} else {");
        let inner = std::mem::replace(&mut self.body.scopes, arms.scopes.clone());
        let result = self.lower_nested(else_branch, arms.dest, out);
        self.body.scopes = inner;
        out.close("}");
        result
    }
}
