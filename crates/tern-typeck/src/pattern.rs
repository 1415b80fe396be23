//! Condition and pattern checking.
//!
//! `if` conditions may test patterns: `shape is Circle(r) && r > 1.0`.
//! Bindings introduced by a pattern go into the scope the caller opened for
//! the condition, so they are visible to the right operand of `&&` and to
//! the `then` branch, and to nothing else. A pattern under `||` is rejected:
//! the bindings of two alternatives cannot be merged into one scope.

use tern_common::Span;
use tern_syntax::{self as syntax, Name, TypeExpr};

use crate::checker::Checker;
use crate::env::{Identifier, Origin};
use crate::error::{ConstraintOrigin, TypeError};
use crate::expr::literal_type;
use crate::tast::{self, FieldPattern};
use crate::ty::{GenericKind, Primitive, Type};

impl Checker {
    pub(crate) fn check_condition(
        &mut self,
        condition: &syntax::Condition,
    ) -> Result<tast::Condition, TypeError> {
        match condition {
            syntax::Condition::Expr(expr) => {
                let expr = self.check_expr(expr)?;
                self.expect_bool(&expr)?;
                Ok(tast::Condition::Expr(expr))
            }
            syntax::Condition::Is {
                scrutinee, pattern, ..
            } => {
                let scrutinee = self.check_expr(scrutinee)?;
                let pattern = self.check_pattern(pattern, &scrutinee.ty)?;
                Ok(tast::Condition::Is { scrutinee, pattern })
            }
            syntax::Condition::And(lhs, rhs) => {
                let lhs = self.check_condition(lhs)?;
                let rhs = self.check_condition(rhs)?;
                Ok(tast::Condition::And(Box::new(lhs), Box::new(rhs)))
            }
            syntax::Condition::Or(lhs, rhs) => {
                if contains_pattern(lhs) || contains_pattern(rhs) {
                    return Err(TypeError::PatternInDisjunction {
                        span: condition.span(),
                    });
                }
                let lhs = self.check_condition(lhs)?;
                let rhs = self.check_condition(rhs)?;
                Ok(tast::Condition::Or(Box::new(lhs), Box::new(rhs)))
            }
        }
    }

    /// Check `pattern` against a value of type `scrutinee`, binding its
    /// names in the current scope.
    pub(crate) fn check_pattern(
        &mut self,
        pattern: &syntax::Pattern,
        scrutinee: &Type,
    ) -> Result<tast::Pattern, TypeError> {
        match pattern {
            syntax::Pattern::Type {
                ty,
                binding,
                fields,
                span,
            } => self.check_type_pattern(ty, binding.as_ref(), fields.as_deref(), scrutinee, *span),
            syntax::Pattern::Literal { value, span } => {
                let ty = literal_type(value);
                let equatable = ty.primitive().is_some_and(Primitive::is_equatable);
                if ty != *scrutinee || !equatable {
                    return Err(TypeError::OperandMismatch {
                        op: "==".to_string(),
                        lhs: scrutinee.clone(),
                        rhs: Some(ty),
                        span: *span,
                    });
                }
                Ok(tast::Pattern::Literal(value.clone()))
            }
            syntax::Pattern::Ident(name) => {
                self.bind(name, scrutinee)?;
                Ok(tast::Pattern::Ident {
                    name: name.text.clone(),
                    ty: scrutinee.clone(),
                })
            }
            syntax::Pattern::Wildcard { .. } => Ok(tast::Pattern::Wildcard),
        }
    }

    fn check_type_pattern(
        &mut self,
        ty: &TypeExpr,
        binding: Option<&Name>,
        fields: Option<&[syntax::Pattern]>,
        scrutinee: &Type,
        span: Span,
    ) -> Result<tast::Pattern, TypeError> {
        if !matches!(scrutinee, Type::Interface(_) | Type::Sum(_)) {
            return Err(TypeError::TypePatternOnNonInterface {
                ty: scrutinee.clone(),
                span,
            });
        }

        let target = self.resolve_pattern_type(ty, scrutinee)?;
        if !matches!(target, Type::Record(_) | Type::Interface(_)) {
            return Err(TypeError::InvalidPatternType { ty: target, span });
        }
        if self.cannot_assign(&target, scrutinee) {
            return Err(TypeError::Mismatch {
                expected: scrutinee.clone(),
                found: target,
                origin: ConstraintOrigin::Pattern { span },
            });
        }

        let binding = match binding {
            Some(name) => {
                self.bind(name, &target)?;
                Some(name.text.clone())
            }
            None => None,
        };

        let fields = match fields {
            None => None,
            Some(subpatterns) => {
                if !matches!(target, Type::Record(_)) {
                    return Err(TypeError::InvalidPatternType { ty: target, span });
                }
                let members = self.types.record_fields(&target);
                if members.len() != subpatterns.len() {
                    return Err(TypeError::PatternFieldCount {
                        record: target,
                        expected: members.len(),
                        found: subpatterns.len(),
                        span,
                    });
                }
                let mut checked = Vec::with_capacity(members.len());
                for (member, subpattern) in members.into_iter().zip(subpatterns) {
                    let pattern = self.check_pattern(subpattern, &member.ident.ty)?;
                    checked.push(FieldPattern {
                        name: member.ident.name,
                        ty: member.ident.ty,
                        pattern,
                    });
                }
                Some(checked)
            }
        };

        Ok(tast::Pattern::Type {
            ty: target,
            binding,
            fields,
        })
    }

    /// Resolve the type named by a type pattern. A generic variant written
    /// without arguments against an instance of its parent sum takes the
    /// scrutinee's arguments: `Some(v)` against `Option<Int>` is `Some<Int>`.
    fn resolve_pattern_type(&mut self, ty: &TypeExpr, scrutinee: &Type) -> Result<Type, TypeError> {
        if let TypeExpr::Named { name, args, span } = ty {
            let generics = match self.env.get_type(&name.text) {
                Some(Type::Generics(generics)) if args.is_empty() => Some(generics.clone()),
                _ => None,
            };
            if let (Some(generics), Some(parent)) = (generics, scrutinee.as_nominal()) {
                if let GenericKind::Record(raw) = &generics.kind {
                    let is_variant = self
                        .types
                        .record(raw)
                        .and_then(|info| info.variant_of.as_deref())
                        == Some(parent.raw_name());
                    if is_variant {
                        return self.instantiate(&generics, parent.args().to_vec(), *span);
                    }
                }
            }
        }
        self.resolve_type(ty)
    }

    fn bind(&mut self, name: &Name, ty: &Type) -> Result<(), TypeError> {
        self.check_identifier_redefinition(name)?;
        self.env
            .add_identifier(Identifier::new(name.text.clone(), ty.clone(), Origin::Local));
        Ok(())
    }
}

fn contains_pattern(condition: &syntax::Condition) -> bool {
    match condition {
        syntax::Condition::Expr(_) => false,
        syntax::Condition::Is { .. } => true,
        syntax::Condition::And(lhs, rhs) | syntax::Condition::Or(lhs, rhs) => {
            contains_pattern(lhs) || contains_pattern(rhs)
        }
    }
}
