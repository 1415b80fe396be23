//! The checking context.
//!
//! One [`Checker`] is created per program. It owns the scope stack, the type
//! registry (which holds the implementation relation) and the little state a
//! visit needs: the type of `this` inside methods and the innermost lambda
//! boundary. Declaration, expression and pattern checking are `impl Checker`
//! blocks in their own modules.

use std::ops::{Deref, DerefMut};

use log::debug;
use tern_syntax::{self as syntax, Name, TypeExpr};

use crate::builtins::register_builtins;
use crate::env::TypeEnv;
use crate::error::{ConstraintOrigin, TypeError};
use crate::registry::TypeRegistry;
use crate::tast::{self, Expr, ExprKind};
use crate::ty::Type;
use crate::CheckedProgram;

pub struct Checker {
    pub(crate) env: TypeEnv,
    pub(crate) types: TypeRegistry,
    /// The receiver type inside a method or interface default body.
    pub(crate) this_type: Option<Type>,
    /// Scope index of the innermost enclosing lambda.
    pub(crate) lambda_floor: Option<usize>,
}

impl Checker {
    pub fn new() -> Self {
        let mut env = TypeEnv::new();
        let mut types = TypeRegistry::new();
        register_builtins(&mut env, &mut types);
        Checker {
            env,
            types,
            this_type: None,
            lambda_floor: None,
        }
    }

    /// Check every declaration in source order.
    pub fn check_module(mut self, module: &syntax::Module) -> Result<CheckedProgram, TypeError> {
        let mut items = Vec::with_capacity(module.items.len());
        for item in &module.items {
            items.push(self.check_item(item)?);
        }
        debug!(
            "checked module {} ({} declarations, {} implementations)",
            module.name.text,
            items.len(),
            self.types.relation().len()
        );
        Ok(CheckedProgram {
            module: tast::Module {
                name: module.name.text.clone(),
                items,
            },
            types: self.types,
        })
    }

    /// Push a scope that is popped when the guard drops, on every exit path.
    pub fn enter_scope(&mut self) -> ScopeGuard<'_> {
        self.env.push_scope();
        ScopeGuard { checker: self }
    }

    // ── Redefinition checks ────────────────────────────────────────────

    pub(crate) fn check_identifier_redefinition(&self, name: &Name) -> Result<(), TypeError> {
        if self.env.is_redefine_identifier(&name.text) {
            return Err(TypeError::Redefinition {
                name: name.text.clone(),
                is_type: false,
                span: name.span,
            });
        }
        Ok(())
    }

    pub(crate) fn check_type_redefinition(&self, name: &Name) -> Result<(), TypeError> {
        if self.env.is_redefine_type(&name.text) {
            return Err(TypeError::Redefinition {
                name: name.text.clone(),
                is_type: true,
                span: name.span,
            });
        }
        Ok(())
    }

    // ── Types ──────────────────────────────────────────────────────────

    /// Resolve a written type in the current scope.
    pub(crate) fn resolve_type(&mut self, texpr: &TypeExpr) -> Result<Type, TypeError> {
        match texpr {
            TypeExpr::Named { name, args, span } => {
                let ty = self
                    .env
                    .get_type(&name.text)
                    .cloned()
                    .ok_or_else(|| TypeError::UndefinedType {
                        name: name.text.clone(),
                        span: name.span,
                    })?;
                match ty {
                    Type::Generics(generics) => {
                        let args = args
                            .iter()
                            .map(|arg| self.resolve_type(arg))
                            .collect::<Result<Vec<_>, _>>()?;
                        self.instantiate(&generics, args, *span)
                    }
                    ty if args.is_empty() => Ok(ty),
                    _ => Err(TypeError::ArityMismatch {
                        expected: 0,
                        found: args.len(),
                        origin: ConstraintOrigin::TypeArguments { span: *span },
                    }),
                }
            }
            TypeExpr::Function { params, ret, .. } => {
                let params = params
                    .iter()
                    .map(|param| self.resolve_type(param))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.resolve_type(ret)?;
                Ok(Type::function(params, ret))
            }
        }
    }

    /// Resolve a type that must name an interface (`implements` clauses).
    pub(crate) fn resolve_interface(&mut self, texpr: &TypeExpr) -> Result<Type, TypeError> {
        match self.resolve_type(texpr)? {
            iface @ Type::Interface(_) => Ok(iface),
            other => Err(TypeError::NotAnInterface {
                ty: other,
                span: texpr.span(),
            }),
        }
    }

    // ── Assignability ──────────────────────────────────────────────────

    pub(crate) fn cannot_assign(&mut self, source: &Type, target: &Type) -> bool {
        self.types.ensure_instances(source);
        self.types.ensure_instances(target);
        self.types.cannot_assign(source, target)
    }

    /// Let `expr` flow into a slot of type `target`.
    ///
    /// Equal types pass through unchanged. A value accepted through the
    /// implementation relation (or a type parameter's bound) is wrapped in
    /// an [`ExprKind::Upcast`] to `target`.
    pub(crate) fn coerce(
        &mut self,
        expr: Expr,
        target: &Type,
        origin: ConstraintOrigin,
    ) -> Result<Expr, TypeError> {
        if expr.ty == *target {
            return Ok(expr);
        }
        if self.cannot_assign(&expr.ty, target) {
            return Err(TypeError::Mismatch {
                expected: target.clone(),
                found: expr.ty,
                origin,
            });
        }
        let span = expr.span;
        Ok(Expr::new(
            ExprKind::Upcast(Box::new(expr)),
            target.clone(),
            span,
        ))
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

/// A pushed scope. Dereferences to the [`Checker`] and pops the scope when
/// dropped.
pub struct ScopeGuard<'a> {
    checker: &'a mut Checker,
}

impl Deref for ScopeGuard<'_> {
    type Target = Checker;

    fn deref(&self) -> &Checker {
        self.checker
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Checker {
        self.checker
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.checker.env.pop_scope();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Identifier, Origin};

    #[test]
    fn scope_guard_pops_on_drop() {
        let mut checker = Checker::new();
        let depth = checker.env.depth();
        {
            let mut scope = checker.enter_scope();
            scope
                .env
                .add_identifier(Identifier::new("x", Type::int(), Origin::Local));
            let inner = scope.enter_scope();
            assert_eq!(inner.env.depth(), depth + 2);
        }
        assert_eq!(checker.env.depth(), depth);
        assert!(!checker.env.has_identifier("x"));
    }

    #[test]
    fn scope_guard_pops_on_error_path() {
        fn failing(checker: &mut Checker) -> Result<(), TypeError> {
            let mut scope = checker.enter_scope();
            scope
                .env
                .add_identifier(Identifier::new("x", Type::int(), Origin::Local));
            scope.check_identifier_redefinition(&Name::new("x"))?;
            Ok(())
        }

        let mut checker = Checker::new();
        let depth = checker.env.depth();
        assert!(failing(&mut checker).is_err());
        assert_eq!(checker.env.depth(), depth);
    }

    #[test]
    fn resolve_array_type() {
        let mut checker = Checker::new();
        let ty = checker
            .resolve_type(&TypeExpr::array(TypeExpr::int()))
            .unwrap();
        assert_eq!(ty, Type::array(Type::int()));
    }

    #[test]
    fn raw_generic_needs_arguments() {
        let mut checker = Checker::new();
        let err = checker.resolve_type(&TypeExpr::named("Array")).unwrap_err();
        assert!(matches!(
            err,
            TypeError::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }
}
