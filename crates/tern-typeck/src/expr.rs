//! Expression checking.
//!
//! Expressions are checked bottom-up: operands first, then the rule for the
//! enclosing form. Each syntax expression becomes a typed [`Expr`].

use tern_common::Span;
use tern_syntax::{self as syntax, BinaryOp, Literal, Name, TypeExpr, UnaryOp};

use crate::checker::Checker;
use crate::env::{Identifier, Origin};
use crate::error::{ConstraintOrigin, TypeError};
use crate::registry::{Member, MemberKind};
use crate::tast::{self, Access, Callee, Dispatch, Expr, ExprKind, Instantiation};
use crate::ty::{FunctionType, GenericKind, Primitive, Type};

/// The type of a literal.
pub(crate) fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Int(_) => Type::int(),
        Literal::Float(_) => Type::float(),
        Literal::Bool(_) => Type::bool(),
        Literal::Char(_) => Type::char(),
        Literal::String(_) => Type::string(),
    }
}

/// How a method on a receiver of type `ty` is reached.
fn dispatch_for(ty: &Type) -> Dispatch {
    match ty {
        Type::Param(param) => Dispatch::Constraint(param.clone()),
        Type::Primitive(prim) => Dispatch::Extension(*prim),
        _ => Dispatch::Virtual,
    }
}

impl Checker {
    pub(crate) fn check_expr(&mut self, expr: &syntax::Expr) -> Result<Expr, TypeError> {
        let span = expr.span;
        match &expr.kind {
            syntax::ExprKind::Literal(literal) => Ok(Expr::new(
                ExprKind::Literal(literal.clone()),
                literal_type(literal),
                span,
            )),
            syntax::ExprKind::Name(name) => self.check_name(name, span),
            syntax::ExprKind::This => {
                let ty = self
                    .this_type
                    .clone()
                    .ok_or(TypeError::ThisOutsideMethod { span })?;
                Ok(Expr::new(ExprKind::This, ty, span))
            }
            syntax::ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, span),
            syntax::ExprKind::Unary { op, operand } => self.check_unary(*op, operand, span),
            syntax::ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.check_call(callee, type_args, args, span),
            syntax::ExprKind::Member { receiver, name } => {
                self.check_member(receiver, name, span)
            }
            syntax::ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.check_if(condition, then_branch, else_branch.as_deref(), span),
            syntax::ExprKind::While { condition, body } => {
                let condition = self.check_expr(condition)?;
                self.expect_bool(&condition)?;
                let body = self.check_expr(body)?;
                Ok(Expr::new(
                    ExprKind::While {
                        condition: Box::new(condition),
                        body: Box::new(body),
                    },
                    Type::void(),
                    span,
                ))
            }
            syntax::ExprKind::Block { stmts, tail } => {
                self.check_block(stmts, tail.as_deref(), span)
            }
            syntax::ExprKind::Lambda { params, ret, body } => {
                self.check_lambda(params, ret.as_ref(), body, span)
            }
            syntax::ExprKind::Cast { expr: inner, ty } => {
                let inner = self.check_expr(inner)?;
                let ty = self.resolve_type(ty)?;
                Ok(Expr::new(ExprKind::Cast(Box::new(inner)), ty, span))
            }
            syntax::ExprKind::Assign { target, value } => self.check_assign(target, value, span),
            syntax::ExprKind::Array { elements } => self.check_array(elements, span),
            syntax::ExprKind::Index { array, index } => self.check_index(array, index, span),
        }
    }

    fn check_name(&mut self, name: &Name, span: Span) -> Result<Expr, TypeError> {
        let (depth, ident) = self
            .env
            .lookup_identifier(&name.text)
            .ok_or_else(|| TypeError::UndefinedIdentifier {
                name: name.text.clone(),
                span,
            })?;
        if matches!(ident.ty, Type::Generics(_)) {
            return Err(TypeError::UninstantiatedGeneric {
                name: name.text.clone(),
                span,
            });
        }
        let captured = self.lambda_floor.is_some_and(|floor| depth < floor);
        if captured && ident.origin == Origin::Local && ident.is_mutable() {
            return Err(TypeError::CapturedMutable {
                name: name.text.clone(),
                span,
            });
        }
        let ident = ident.clone();
        let ty = ident.ty.clone();
        Ok(Expr::new(ExprKind::Ident(ident), ty, span))
    }

    pub(crate) fn expect_bool(&self, expr: &Expr) -> Result<(), TypeError> {
        if expr.ty != Type::bool() {
            return Err(TypeError::Mismatch {
                expected: Type::bool(),
                found: expr.ty.clone(),
                origin: ConstraintOrigin::Condition { span: expr.span },
            });
        }
        Ok(())
    }

    // ── Operators ──────────────────────────────────────────────────────

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &syntax::Expr,
        rhs: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let lhs = self.check_expr(lhs)?;
        let rhs = self.check_expr(rhs)?;
        if lhs.ty != rhs.ty {
            return Err(TypeError::Mismatch {
                expected: lhs.ty,
                found: rhs.ty,
                origin: ConstraintOrigin::BinOp { op_span: span },
            });
        }

        let accepted = if op.is_arithmetic() || op.is_ordering() {
            lhs.ty.is_numeric()
        } else if op.is_equality() {
            lhs.ty.primitive().is_some_and(Primitive::is_equatable)
        } else {
            lhs.ty == Type::bool()
        };
        if !accepted {
            return Err(TypeError::OperandMismatch {
                op: op.symbol().to_string(),
                lhs: lhs.ty,
                rhs: Some(rhs.ty),
                span,
            });
        }

        let ty = if op.is_arithmetic() {
            lhs.ty.clone()
        } else {
            Type::bool()
        };
        Ok(Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            span,
        ))
    }

    fn check_unary(
        &mut self,
        op: UnaryOp,
        operand: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let operand = self.check_expr(operand)?;
        let accepted = match op {
            UnaryOp::Neg => operand.ty.is_numeric(),
            UnaryOp::Not => operand.ty == Type::bool(),
        };
        if !accepted {
            return Err(TypeError::OperandMismatch {
                op: op.symbol().to_string(),
                lhs: operand.ty,
                rhs: None,
                span,
            });
        }
        let ty = operand.ty.clone();
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        ))
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn check_call(
        &mut self,
        callee: &syntax::Expr,
        type_args: &[TypeExpr],
        args: &[syntax::Expr],
        span: Span,
    ) -> Result<Expr, TypeError> {
        match &callee.kind {
            syntax::ExprKind::Name(name) => {
                let named = self
                    .env
                    .get_identifier(&name.text)
                    .filter(|ident| matches!(ident.origin, Origin::Function | Origin::Constructor))
                    .cloned();
                if let Some(ident) = named {
                    return self.check_named_call(ident, type_args, args, span);
                }
            }
            syntax::ExprKind::Member { receiver, name } => {
                return self.check_method_call(receiver, name, type_args, args, span);
            }
            _ => {}
        }

        no_type_args(type_args, span)?;
        let callee = self.check_expr(callee)?;
        let Type::Function(signature) = callee.ty.clone() else {
            return Err(TypeError::NotAFunction {
                ty: callee.ty,
                span: callee.span,
            });
        };
        let args = self.check_args(args)?;
        let args = self.coerce_args(&signature, args, span)?;
        Ok(Expr::new(
            ExprKind::Call {
                callee: Callee::Value(Box::new(callee)),
                args,
            },
            *signature.ret,
            span,
        ))
    }

    /// A call to a global function or constructor by name, instantiating it
    /// first when it is generic.
    fn check_named_call(
        &mut self,
        ident: Identifier,
        type_args: &[TypeExpr],
        args: &[syntax::Expr],
        span: Span,
    ) -> Result<Expr, TypeError> {
        let args = self.check_args(args)?;
        let (signature, instantiation) = match &ident.ty {
            Type::Function(signature) => {
                no_type_args(type_args, span)?;
                (signature.clone(), None)
            }
            Type::Generics(generics) => {
                let GenericKind::Function(template) = &generics.kind else {
                    return Err(TypeError::NotAFunction {
                        ty: ident.ty.clone(),
                        span,
                    });
                };
                let type_args = if type_args.is_empty() {
                    if template.params.len() != args.len() {
                        return Err(arg_count_error(template.params.len(), args.len(), span));
                    }
                    let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
                    self.infer_type_args(generics, &template.params, &arg_types, span)?
                } else {
                    type_args
                        .iter()
                        .map(|arg| self.resolve_type(arg))
                        .collect::<Result<Vec<_>, _>>()?
                };
                let Type::Function(signature) =
                    self.instantiate(generics, type_args.clone(), span)?
                else {
                    return Err(TypeError::NotAFunction {
                        ty: ident.ty.clone(),
                        span,
                    });
                };
                let instantiation = Instantiation {
                    params: generics.params.clone(),
                    args: type_args,
                };
                (signature, Some(instantiation))
            }
            other => {
                return Err(TypeError::NotAFunction {
                    ty: other.clone(),
                    span,
                })
            }
        };

        let args = self.coerce_args(&signature, args, span)?;
        let ret = (*signature.ret).clone();
        let callee = match ident.origin {
            Origin::Constructor => Callee::Constructor {
                record: ret.clone(),
                instantiation,
            },
            _ => Callee::Function {
                name: ident.name,
                instantiation,
            },
        };
        Ok(Expr::new(ExprKind::Call { callee, args }, ret, span))
    }

    /// `receiver.name(args)`: a method, or a function-typed field.
    fn check_method_call(
        &mut self,
        receiver: &syntax::Expr,
        name: &Name,
        type_args: &[TypeExpr],
        args: &[syntax::Expr],
        span: Span,
    ) -> Result<Expr, TypeError> {
        let receiver = self.check_expr(receiver)?;
        let member = self.lookup_member(&receiver.ty, name)?;
        no_type_args(type_args, span)?;
        let Type::Function(signature) = member.ty().clone() else {
            return Err(TypeError::NotAFunction {
                ty: member.ident.ty,
                span: name.span,
            });
        };
        let args = self.check_args(args)?;
        let args = self.coerce_args(&signature, args, span)?;

        let callee = match member.kind {
            MemberKind::Field => {
                let field = Expr::new(
                    ExprKind::Member {
                        receiver: Box::new(receiver),
                        name: name.text.clone(),
                        access: Access::Field {
                            mutable: member.ident.is_mutable(),
                        },
                    },
                    member.ident.ty,
                    span,
                );
                Callee::Value(Box::new(field))
            }
            _ => {
                let dispatch = dispatch_for(&receiver.ty);
                Callee::Method {
                    receiver: Box::new(receiver),
                    name: name.text.clone(),
                    dispatch,
                }
            }
        };
        Ok(Expr::new(ExprKind::Call { callee, args }, *signature.ret, span))
    }

    fn check_args(&mut self, args: &[syntax::Expr]) -> Result<Vec<Expr>, TypeError> {
        args.iter().map(|arg| self.check_expr(arg)).collect()
    }

    fn coerce_args(
        &mut self,
        signature: &FunctionType,
        args: Vec<Expr>,
        span: Span,
    ) -> Result<Vec<Expr>, TypeError> {
        if signature.params.len() != args.len() {
            return Err(arg_count_error(signature.params.len(), args.len(), span));
        }
        args.into_iter()
            .zip(&signature.params)
            .enumerate()
            .map(|(param_idx, (arg, param))| {
                self.coerce(
                    arg,
                    param,
                    ConstraintOrigin::FnArg {
                        call_site: span,
                        param_idx,
                    },
                )
            })
            .collect()
    }

    // ── Members ────────────────────────────────────────────────────────

    pub(crate) fn lookup_member(&mut self, ty: &Type, name: &Name) -> Result<Member, TypeError> {
        self.types.ensure_instances(ty);
        self.types
            .lookup_member(ty, &name.text)
            .ok_or_else(|| TypeError::NoSuchMember {
                ty: ty.clone(),
                member: name.text.clone(),
                span: name.span,
            })
    }

    fn check_member(
        &mut self,
        receiver: &syntax::Expr,
        name: &Name,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let receiver = self.check_expr(receiver)?;
        let member = self.lookup_member(&receiver.ty, name)?;
        let access = match member.kind {
            MemberKind::Field => Access::Field {
                mutable: member.ident.is_mutable(),
            },
            _ => Access::Method(dispatch_for(&receiver.ty)),
        };
        Ok(Expr::new(
            ExprKind::Member {
                receiver: Box::new(receiver),
                name: name.text.clone(),
                access,
            },
            member.ident.ty,
            span,
        ))
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn check_if(
        &mut self,
        condition: &syntax::Condition,
        then_branch: &syntax::Expr,
        else_branch: Option<&syntax::Expr>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        // Pattern bindings are visible in the condition and the then branch.
        let (condition, then_branch) = {
            let mut scope = self.enter_scope();
            let condition = scope.check_condition(condition)?;
            let then_branch = scope.check_expr(then_branch)?;
            (condition, then_branch)
        };

        let (else_branch, ty) = match else_branch {
            Some(else_branch) => {
                let else_branch = self.check_expr(else_branch)?;
                if else_branch.ty != then_branch.ty {
                    return Err(TypeError::Mismatch {
                        expected: then_branch.ty,
                        found: else_branch.ty,
                        origin: ConstraintOrigin::IfBranches {
                            if_span: span,
                            then_span: then_branch.span,
                            else_span: else_branch.span,
                        },
                    });
                }
                let ty = then_branch.ty.clone();
                (Some(Box::new(else_branch)), ty)
            }
            None => (None, Type::void()),
        };

        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            ty,
            span,
        ))
    }

    fn check_block(
        &mut self,
        stmts: &[syntax::Stmt],
        tail: Option<&syntax::Expr>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let mut scope = self.enter_scope();
        let mut checked = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            checked.push(match stmt {
                syntax::Stmt::Let(binding) => scope.check_let(binding)?,
                syntax::Stmt::Expr(expr) => tast::Stmt::Expr(scope.check_expr(expr)?),
            });
        }
        let tail = tail.map(|tail| scope.check_expr(tail)).transpose()?;
        let ty = tail.as_ref().map_or_else(Type::void, |tail| tail.ty.clone());
        Ok(Expr::new(
            ExprKind::Block {
                stmts: checked,
                tail: tail.map(Box::new),
            },
            ty,
            span,
        ))
    }

    fn check_let(&mut self, binding: &syntax::LetStmt) -> Result<tast::Stmt, TypeError> {
        self.check_identifier_redefinition(&binding.name)?;
        let init = self.check_expr(&binding.init)?;
        let (ty, init) = match &binding.ty {
            Some(annotation) => {
                let ty = self.resolve_type(annotation)?;
                let init = self.coerce(
                    init,
                    &ty,
                    ConstraintOrigin::Annotation {
                        annotation_span: annotation.span(),
                    },
                )?;
                (ty, init)
            }
            None => (init.ty.clone(), init),
        };

        let name = binding.name.text.clone();
        self.env.add_identifier(if binding.mutable {
            Identifier::mutable(name.clone(), ty.clone(), Origin::Local)
        } else {
            Identifier::new(name.clone(), ty.clone(), Origin::Local)
        });
        Ok(tast::Stmt::Let {
            name,
            ty,
            mutable: binding.mutable,
            init,
        })
    }

    fn check_lambda(
        &mut self,
        params: &[syntax::Param],
        ret: Option<&TypeExpr>,
        body: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let mut scope = self.enter_scope();
        let floor = scope.env.depth() - 1;
        let saved = scope.lambda_floor.replace(floor);
        let result = scope.check_lambda_body(params, ret, body, span);
        scope.lambda_floor = saved;
        result
    }

    fn check_lambda_body(
        &mut self,
        params: &[syntax::Param],
        ret: Option<&TypeExpr>,
        body: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let params = self.declare_params(params)?;
        let declared = ret.map(|ret| self.resolve_type(ret)).transpose()?;
        let body = self.check_expr(body)?;
        let (ret, body) = self.check_return(body, declared, span)?;
        let ty = Type::function(params.iter().map(|p| p.ty.clone()).collect(), ret.clone());
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                ret,
                body: Box::new(body),
            },
            ty,
            span,
        ))
    }

    // ── Assignment, arrays ─────────────────────────────────────────────

    fn check_assign(
        &mut self,
        target: &syntax::Expr,
        value: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let checked_target = self.check_expr(target)?;
        match &checked_target.kind {
            ExprKind::Ident(ident) => match ident.origin {
                Origin::Local | Origin::Global | Origin::Field => {
                    if !ident.is_mutable() {
                        return Err(TypeError::Immutable {
                            name: ident.name.clone(),
                            span: target.span,
                        });
                    }
                }
                Origin::Function | Origin::Constructor => {
                    return Err(TypeError::InvalidAssignTarget { span: target.span })
                }
            },
            ExprKind::Member {
                name,
                access: Access::Field { mutable },
                ..
            } => {
                if !mutable {
                    return Err(TypeError::Immutable {
                        name: name.clone(),
                        span: target.span,
                    });
                }
            }
            ExprKind::Index { .. } => {}
            _ => return Err(TypeError::InvalidAssignTarget { span: target.span }),
        }

        let value = self.check_expr(value)?;
        let origin = ConstraintOrigin::Assignment {
            lhs_span: target.span,
            rhs_span: value.span,
        };
        let value = self.coerce(value, &checked_target.ty, origin)?;
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(checked_target),
                value: Box::new(value),
            },
            Type::void(),
            span,
        ))
    }

    fn check_array(&mut self, elements: &[syntax::Expr], span: Span) -> Result<Expr, TypeError> {
        let elements = self.check_args(elements)?;
        let Some(first) = elements.first() else {
            return Err(TypeError::EmptyArrayLiteral { span });
        };
        let element_ty = first.ty.clone();
        if let Some(odd) = elements.iter().find(|element| element.ty != element_ty) {
            return Err(TypeError::Mismatch {
                expected: element_ty,
                found: odd.ty.clone(),
                origin: ConstraintOrigin::ArrayElement { span: odd.span },
            });
        }
        Ok(Expr::new(
            ExprKind::Array(elements),
            Type::array(element_ty),
            span,
        ))
    }

    fn check_index(
        &mut self,
        array: &syntax::Expr,
        index: &syntax::Expr,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let array = self.check_expr(array)?;
        let index = self.check_expr(index)?;
        let Type::Array(element) = array.ty.clone() else {
            return Err(TypeError::OperandMismatch {
                op: "[]".to_string(),
                lhs: array.ty,
                rhs: Some(index.ty),
                span,
            });
        };
        if index.ty != Type::int() {
            return Err(TypeError::Mismatch {
                expected: Type::int(),
                found: index.ty,
                origin: ConstraintOrigin::Index { span: index.span },
            });
        }
        Ok(Expr::new(
            ExprKind::Index {
                array: Box::new(array),
                index: Box::new(index),
            },
            *element,
            span,
        ))
    }
}

fn no_type_args(type_args: &[TypeExpr], span: Span) -> Result<(), TypeError> {
    if type_args.is_empty() {
        return Ok(());
    }
    Err(TypeError::ArityMismatch {
        expected: 0,
        found: type_args.len(),
        origin: ConstraintOrigin::TypeArguments { span },
    })
}

fn arg_count_error(expected: usize, found: usize, span: Span) -> TypeError {
    TypeError::ArityMismatch {
        expected,
        found,
        origin: ConstraintOrigin::FnArg {
            call_site: span,
            param_idx: expected.min(found),
        },
    }
}
