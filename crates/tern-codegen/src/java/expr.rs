//! Expression lowering.
//!
//! Tern is expression-oriented and Java is not, so every expression lowers
//! to a list of statements plus a Java expression string for its value.
//! [`JavaGen::expr`] writes the statements to the buffer it is given and
//! returns the value. Control flow in value position goes through a fresh
//! temporary; in tail position it is lowered straight into its destination
//! (a `return`, an assignment, or nothing).
//!
//! Evaluation order is left to right. When a later operand needs statements
//! of its own, the values of earlier operands are spilled to `final` locals
//! first so the statements cannot observe them out of order.

use tern_common::Span;
use tern_syntax::{BinaryOp, Literal, UnaryOp};
use tern_typeck::env::Origin;
use tern_typeck::registry::MemberKind;
use tern_typeck::tast::{Access, Callee, Dispatch, Expr, ExprKind, Stmt};
use tern_typeck::ty::{Type, TypeParameter};

use crate::error::CodegenError;

use super::constraint::{adapter_name, extension_holder};
use super::types::{char_literal, string_literal, unboxed, value_name};
use super::writer::Writer;
use super::JavaGen;

/// Where the value of a statement-position expression goes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Dest {
    Return,
    Assign(String),
    Discard,
}

pub(crate) fn finish(dest: &Dest, value: &str, out: &mut Writer) {
    match dest {
        Dest::Return => out.line(format!("return {};", value)),
        Dest::Assign(target) => out.line(format!("{} = {};", target, value)),
        Dest::Discard => {}
    }
}

/// Whether evaluating the Java value has no effects, so it may be
/// reordered after other statements.
fn is_pure(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Literal(_) | ExprKind::This)
}

impl JavaGen<'_> {
    // ── Statement position ───────────────────────────────────────────

    /// Lower `expr` into `dest`, opening a scope when it is a block. Used
    /// for bodies whose braces the caller has already written.
    pub(crate) fn lower_nested(&mut self, expr: &Expr, dest: &Dest, out: &mut Writer) -> Result<(), CodegenError> {
        let ExprKind::Block { stmts, tail } = &expr.kind else {
            return self.lower_into(expr, dest, out);
        };
        self.body.push_scope();
        for stmt in stmts {
            self.lower_stmt(stmt, out)?;
        }
        match tail {
            Some(tail) => self.lower_into(tail, dest, out)?,
            None => finish(dest, "null", out),
        }
        self.body.pop_scope();
        Ok(())
    }

    pub(crate) fn lower_into(&mut self, expr: &Expr, dest: &Dest, out: &mut Writer) -> Result<(), CodegenError> {
        if expr.ty.is_void() && *dest != Dest::Discard {
            self.lower_into(expr, &Dest::Discard, out)?;
            finish(dest, "null", out);
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Block { .. } => {
                out.open("{");
                self.lower_nested(expr, dest, out)?;
                out.close("}");
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref(), dest, out)?,
            ExprKind::While { condition, body } => self.lower_while(condition, body, out)?,
            ExprKind::Assign { target, value } => self.lower_assign(target, value, out)?,
            _ => {
                let value = self.expr(expr, out)?;
                match dest {
                    Dest::Discard => discard(expr, &value, out),
                    _ => finish(dest, &value, out),
                }
            }
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt, out: &mut Writer) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Let {
                name,
                ty,
                mutable,
                init,
            } => {
                let value = self.expr(init, out)?;
                let ty = self.jtype(ty)?;
                let local = self.body.declare(name);
                let modifier = if *mutable { "" } else { "final " };
                out.line(format!("{}{} {} = {};", modifier, ty, local, value));
            }
            Stmt::Expr(expr) => self.lower_into(expr, &Dest::Discard, out)?,
        }
        Ok(())
    }

    fn lower_while(&mut self, condition: &Expr, body: &Expr, out: &mut Writer) -> Result<(), CodegenError> {
        let mut prelude = Writer::new();
        let value = self.expr(condition, &mut prelude)?;
        if prelude.is_empty() {
            // A constant condition would make the code after the loop
            // unreachable to javac.
            let value = match &condition.kind {
                ExprKind::Literal(Literal::Bool(true)) => "Boolean.TRUE".to_string(),
                ExprKind::Literal(Literal::Bool(false)) => "Boolean.FALSE".to_string(),
                _ => value,
            };
            out.open(format!("while ({}) {{", value));
        } else {
            out.open("while (true) {");
            out.append(prelude);
            out.line(format!("if (!{}) break;", value));
        }
        self.lower_nested(body, &Dest::Discard, out)?;
        out.close("}");
        Ok(())
    }

    fn lower_assign(&mut self, target: &Expr, value: &Expr, out: &mut Writer) -> Result<(), CodegenError> {
        match &target.kind {
            ExprKind::Ident(ident) => {
                let value = self.expr(value, out)?;
                let target = self.variable(&ident.name, ident.origin);
                out.line(format!("{} = {};", target, value));
            }
            ExprKind::Member { receiver, name, .. } => {
                let values = self.exprs(&[&**receiver, value], out)?;
                out.line(format!("{}.{} = {};", values[0], value_name(name), values[1]));
            }
            ExprKind::Index { array, index } => {
                let values = self.exprs(&[&**array, &**index, value], out)?;
                out.line(format!("{}.set({}, {});", values[0], values[1], values[2]));
            }
            _ => {
                return Err(CodegenError::unsupported("java", "this assignment target", target.span));
            }
        }
        Ok(())
    }

    // ── Value position ───────────────────────────────────────────────

    /// Lower `expr`, writing any statements it needs to `out`, and return
    /// its value as a Java expression.
    pub(crate) fn expr(&mut self, expr: &Expr, out: &mut Writer) -> Result<String, CodegenError> {
        match &expr.kind {
            ExprKind::Literal(literal) => literal_value(literal, expr.span),
            ExprKind::Ident(ident) => match ident.origin {
                Origin::Local | Origin::Global | Origin::Field => Ok(self.variable(&ident.name, ident.origin)),
                Origin::Function => Ok(format!(
                    "(({}) {}::{})",
                    self.jtype(&expr.ty)?,
                    self.class,
                    value_name(&ident.name)
                )),
                Origin::Constructor => {
                    let record = expr
                        .ty
                        .as_function()
                        .map(|signature| (*signature.ret).clone())
                        .unwrap_or_else(|| expr.ty.clone());
                    Ok(format!("(({}) {}::new)", self.jtype(&expr.ty)?, self.jtype(&record)?))
                }
            },
            ExprKind::This => Ok(self.body.receiver.to_string()),
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, out),
            ExprKind::Unary { op, operand } => {
                let value = self.expr(operand, out)?;
                Ok(match op {
                    UnaryOp::Neg => format!("(-{})", value),
                    UnaryOp::Not => format!("(!{})", value),
                })
            }
            ExprKind::Call { callee, args } => self.call(callee, args, out),
            ExprKind::Member {
                receiver,
                name,
                access,
            } => self.member(expr, receiver, name, access, out),
            ExprKind::If { .. } | ExprKind::While { .. } | ExprKind::Block { .. } | ExprKind::Assign { .. } => {
                if expr.ty.is_void() {
                    self.lower_into(expr, &Dest::Discard, out)?;
                    return Ok("null".to_string());
                }
                let temp = self.body.temp("t");
                out.line(format!("{} {};", self.jtype(&expr.ty)?, temp));
                self.lower_into(expr, &Dest::Assign(temp.clone()), out)?;
                Ok(temp)
            }
            ExprKind::Lambda { params, body, .. } => {
                let ty = self.jtype(&expr.ty)?;
                self.body.push_scope();
                let names: Vec<String> = params.iter().map(|p| self.body.declare(&p.name)).collect();
                let mut inner = Writer::at_depth(1);
                let lowered = self.lower_nested(body, &Dest::Return, &mut inner);
                self.body.pop_scope();
                lowered?;
                Ok(format!(
                    "(({}) ({}) -> {{\n{}\n}})",
                    ty,
                    names.join(", "),
                    inner.into_text()
                ))
            }
            ExprKind::Cast(inner) => {
                let value = self.expr(inner, out)?;
                if inner.ty == expr.ty {
                    return Ok(value);
                }
                let numeric = (
                    inner.ty.primitive().and_then(unboxed),
                    expr.ty.primitive().and_then(unboxed),
                );
                match numeric {
                    (Some(from), Some(to)) => Ok(format!("(({}) ({}) {})", to, from, value)),
                    _ => Ok(format!("(({}) (Object) {})", self.jtype(&expr.ty)?, value)),
                }
            }
            ExprKind::Array(elements) => {
                let element = match &expr.ty {
                    Type::Array(element) => self.jtype(element)?,
                    _ => "Object".to_string(),
                };
                let refs: Vec<&Expr> = elements.iter().collect();
                let values = self.exprs(&refs, out)?;
                Ok(format!("{}.<{}>$arrayOf({})", self.class, element, values.join(", ")))
            }
            ExprKind::Index { array, index } => {
                let values = self.exprs(&[&**array, &**index], out)?;
                Ok(format!("{}.get({})", values[0], values[1]))
            }
            ExprKind::Upcast(inner) => {
                let value = self.expr(inner, out)?;
                self.upcast(&inner.ty, &expr.ty, value, expr)
            }
        }
    }

    /// A local, global or field read or write target.
    fn variable(&self, name: &str, origin: Origin) -> String {
        match origin {
            Origin::Global => format!("{}.{}", self.class, value_name(name)),
            Origin::Field => format!("{}.{}", self.body.receiver, value_name(name)),
            _ => match self.body.lookup(name) {
                Some(local) => local.to_string(),
                None => value_name(name),
            },
        }
    }

    /// Lower several operands in order, spilling earlier values when a
    /// later operand emits statements.
    pub(crate) fn exprs(&mut self, exprs: &[&Expr], out: &mut Writer) -> Result<Vec<String>, CodegenError> {
        let mut lowered = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let mut buffer = Writer::new();
            let value = self.expr(expr, &mut buffer)?;
            lowered.push((buffer, value));
        }

        let mut values = Vec::with_capacity(exprs.len());
        let count = lowered.len();
        let mut pending: Vec<(Writer, String)> = lowered.into_iter().rev().collect();
        for i in 0..count {
            let Some((buffer, value)) = pending.pop() else {
                break;
            };
            out.append(buffer);
            let later_has_statements = pending.iter().any(|(buffer, _)| !buffer.is_empty());
            if later_has_statements && !is_pure(exprs[i]) {
                let temp = self.body.temp("t");
                out.line(format!("final {} {} = {};", self.jtype(&exprs[i].ty)?, temp, value));
                values.push(temp);
            } else {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Store a value in a `final` local unless it is already one.
    pub(crate) fn spill(&mut self, value: String, ty: &Type, prefix: &str, out: &mut Writer) -> Result<String, CodegenError> {
        let temp = self.body.temp(prefix);
        out.line(format!("final {} {} = {};", self.jtype(ty)?, temp, value));
        Ok(temp)
    }

    // ── Operators ────────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, out: &mut Writer) -> Result<String, CodegenError> {
        if op.is_logical() {
            let left = self.expr(lhs, out)?;
            let mut right_prelude = Writer::new();
            let right = self.expr(rhs, &mut right_prelude)?;
            return self.short_circuit(op, left, right_prelude, right, out);
        }
        let values = self.exprs(&[lhs, rhs], out)?;
        Ok(match op {
            BinaryOp::Eq => format!("java.util.Objects.equals({}, {})", values[0], values[1]),
            BinaryOp::NotEq => format!("(!java.util.Objects.equals({}, {}))", values[0], values[1]),
            _ => format!("({} {} {})", values[0], op.symbol(), values[1]),
        })
    }

    /// `&&` and `||`. When the right operand needs statements they may only
    /// run if the left operand does not decide the result.
    pub(crate) fn short_circuit(
        &mut self,
        op: BinaryOp,
        left: String,
        right_prelude: Writer,
        right: String,
        out: &mut Writer,
    ) -> Result<String, CodegenError> {
        if right_prelude.is_empty() {
            return Ok(format!("({} {} {})", left, op.symbol(), right));
        }
        let temp = self.body.temp("t");
        out.line(format!("Boolean {} = {};", temp, left));
        match op {
            BinaryOp::And => out.open(format!("if ({}) {{", temp)),
            _ => out.open(format!("if (!{}) {{", temp)),
        }
        out.append(right_prelude);
        out.line(format!("{} = {};", temp, right));
        out.close("}");
        Ok(temp)
    }

    // ── Calls and members ────────────────────────────────────────────

    fn call(&mut self, callee: &Callee, args: &[Expr], out: &mut Writer) -> Result<String, CodegenError> {
        match callee {
            Callee::Function { name, instantiation } => {
                let refs: Vec<&Expr> = args.iter().collect();
                let mut values = self.exprs(&refs, out)?;
                let type_args = match instantiation {
                    Some(inst) => {
                        let span = args.first().map(|arg| arg.span).unwrap_or_default();
                        let mut dicts = self.dictionary_args(inst, span)?;
                        dicts.append(&mut values);
                        values = dicts;
                        self.type_args(inst)?
                    }
                    None => String::new(),
                };
                Ok(format!(
                    "{}.{}{}({})",
                    self.class,
                    type_args,
                    value_name(name),
                    values.join(", ")
                ))
            }
            Callee::Constructor { record, instantiation } => {
                let refs: Vec<&Expr> = args.iter().collect();
                let mut values = self.exprs(&refs, out)?;
                if let Some(inst) = instantiation {
                    let span = args.first().map(|arg| arg.span).unwrap_or_default();
                    let mut dicts = self.dictionary_args(inst, span)?;
                    dicts.append(&mut values);
                    values = dicts;
                }
                Ok(format!("new {}({})", self.jtype(record)?, values.join(", ")))
            }
            Callee::Method {
                receiver,
                name,
                dispatch,
            } => {
                let mut refs: Vec<&Expr> = vec![&**receiver];
                refs.extend(args.iter());
                let mut values = self.exprs(&refs, out)?;
                let recv = values.remove(0);
                self.method_call(&receiver.ty, recv, name, dispatch, values, receiver)
            }
            Callee::Value(function) => {
                let mut refs: Vec<&Expr> = vec![&**function];
                refs.extend(args.iter());
                let mut values = self.exprs(&refs, out)?;
                let function = values.remove(0);
                Ok(format!("{}.apply({})", function, values.join(", ")))
            }
        }
    }

    /// A call of `name` on an already lowered receiver.
    fn method_call(
        &mut self,
        receiver_ty: &Type,
        receiver: String,
        name: &str,
        dispatch: &Dispatch,
        args: Vec<String>,
        at: &Expr,
    ) -> Result<String, CodegenError> {
        let method = value_name(name);
        match dispatch {
            Dispatch::Virtual => Ok(format!("{}.{}({})", receiver, method, args.join(", "))),
            Dispatch::Extension(prim) => {
                let types = &self.program.types;
                if types.own_member(receiver_ty, name).is_some() {
                    let mut all = vec![receiver];
                    all.extend(args);
                    return Ok(format!("{}.{}({})", extension_holder(*prim), method, all.join(", ")));
                }
                let iface = types
                    .relation()
                    .implemented_by(receiver_ty)
                    .iter()
                    .find(|iface| {
                        types
                            .lookup_member(iface, name)
                            .is_some_and(|member| member.kind == MemberKind::Default)
                    })
                    .cloned();
                match iface {
                    Some(iface) => Ok(format!(
                        "{}.{}({}).{}({})",
                        extension_holder(*prim),
                        adapter_name(&iface),
                        receiver,
                        method,
                        args.join(", ")
                    )),
                    None => Err(CodegenError::unsupported(
                        "java",
                        format!("the member `{}` of `{}`", name, receiver_ty),
                        at.span,
                    )),
                }
            }
            Dispatch::Constraint(param) => self.constraint_call(param, receiver, &method, args, at),
        }
    }

    fn constraint_call(
        &mut self,
        param: &TypeParameter,
        receiver: String,
        method: &str,
        args: Vec<String>,
        at: &Expr,
    ) -> Result<String, CodegenError> {
        match param.constraint() {
            Some(bound) if matches!(bound, Type::Interface(_)) && !bound.is_any() => {
                let dict = self.param_dictionary(param, at.span)?;
                let mut all = vec![receiver];
                all.extend(args);
                Ok(format!("{}.{}({})", dict, method, all.join(", ")))
            }
            Some(bound) => Ok(format!(
                "(({}) (Object) {}).{}({})",
                self.jtype(bound)?,
                receiver,
                method,
                args.join(", ")
            )),
            None => Err(CodegenError::unsupported(
                "java",
                format!("members of the unbounded parameter `{}`", param.name),
                at.span,
            )),
        }
    }

    fn member(
        &mut self,
        expr: &Expr,
        receiver: &Expr,
        name: &str,
        access: &Access,
        out: &mut Writer,
    ) -> Result<String, CodegenError> {
        let value = self.expr(receiver, out)?;
        match access {
            Access::Field { .. } if matches!(receiver.ty, Type::Array(_)) => Ok(format!("{}.size()", value)),
            Access::Field { .. } => Ok(format!("{}.{}", value, value_name(name))),
            Access::Method(dispatch) => {
                // A method used as a value becomes a lambda over a receiver
                // evaluated once, here.
                let Some(signature) = expr.ty.as_function() else {
                    return Err(CodegenError::unsupported("java", format!("the member `{}`", name), expr.span));
                };
                let recv = if is_pure(receiver) {
                    value
                } else {
                    self.spill(value, &receiver.ty, "t", out)?
                };
                let params: Vec<String> = signature.params.iter().map(|_| self.body.temp("a")).collect();
                let call = self.method_call(&receiver.ty, recv, name, dispatch, params.clone(), expr)?;
                Ok(format!(
                    "(({}) ({}) -> {})",
                    self.jtype(&expr.ty)?,
                    params.join(", "),
                    call
                ))
            }
        }
    }

    /// View a value of type `from` as the interface, sum or `Any` type `to`.
    fn upcast(&mut self, from: &Type, to: &Type, value: String, at: &Expr) -> Result<String, CodegenError> {
        if to.is_any() {
            return Ok(value);
        }
        match from {
            Type::Primitive(prim) => Ok(format!(
                "{}.{}({})",
                extension_holder(*prim),
                adapter_name(to),
                value
            )),
            Type::Param(param) if param.constraint() == Some(to) => {
                let dict = self.param_dictionary(param, at.span)?;
                Ok(format!("{}.upcast$({})", dict, value))
            }
            Type::Param(_) => Ok(format!("(({}) (Object) {})", self.jtype(to)?, value)),
            _ => Ok(value),
        }
    }
}

/// Statement form of a value that is not used.
fn discard(expr: &Expr, value: &str, out: &mut Writer) {
    match &expr.kind {
        ExprKind::Call { .. } => out.line(format!("{};", value)),
        ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::This | ExprKind::Lambda { .. } => {}
        _ if value == "null" => {}
        _ => out.line(format!("$discard({});", value)),
    }
}

pub(crate) fn literal_value(literal: &Literal, span: Span) -> Result<String, CodegenError> {
    match literal {
        Literal::Int(value) => {
            let Ok(value) = i32::try_from(*value) else {
                return Err(CodegenError::IntegerOutOfRange {
                    value: *value,
                    span,
                });
            };
            if value < 0 {
                Ok(format!("({})", value))
            } else {
                Ok(value.to_string())
            }
        }
        Literal::Float(value) => Ok(if value.is_nan() {
            "Double.NaN".to_string()
        } else if value.is_infinite() && *value > 0.0 {
            "Double.POSITIVE_INFINITY".to_string()
        } else if value.is_infinite() {
            "Double.NEGATIVE_INFINITY".to_string()
        } else if value.is_sign_negative() {
            format!("({:?})", value)
        } else {
            format!("{:?}", value)
        }),
        Literal::Bool(value) => Ok(value.to_string()),
        Literal::Char(value) => char_literal(*value).ok_or(CodegenError::CharOutOfRange {
            value: *value,
            span,
        }),
        Literal::String(value) => Ok(string_literal(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(literal: Literal, ty: Type) -> Expr {
        Expr::new(ExprKind::Literal(literal), ty, Span::new(0, 1))
    }

    #[test]
    fn literal_spelling() {
        let int = |v| literal_value(&Literal::Int(v), Span::new(0, 1));
        assert_eq!(int(42).unwrap(), "42");
        assert_eq!(int(-5).unwrap(), "(-5)");
        assert_eq!(
            int(1 << 40),
            Err(CodegenError::IntegerOutOfRange {
                value: 1 << 40,
                span: Span::new(0, 1)
            })
        );

        let float = |v| literal_value(&Literal::Float(v), Span::new(0, 1)).unwrap();
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(-2.5), "(-2.5)");
        assert_eq!(float(f64::NAN), "Double.NaN");
        assert_eq!(float(f64::NEG_INFINITY), "Double.NEGATIVE_INFINITY");
    }

    #[test]
    fn discarded_values() {
        let mut out = Writer::new();
        discard(&literal(Literal::Int(1), Type::int()), "1", &mut out);
        assert!(out.is_empty());

        let call = Expr::new(
            ExprKind::Call {
                callee: Callee::Function {
                    name: "f".to_string(),
                    instantiation: None,
                },
                args: vec![],
            },
            Type::int(),
            Span::new(0, 3),
        );
        discard(&call, "Main.f()", &mut out);
        assert_eq!(out.into_text(), "Main.f();");
    }
}
