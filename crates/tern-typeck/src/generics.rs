//! Generic instantiation and type-argument inference.
//!
//! Instantiating a [`GenericsType`] checks the argument count, checks every
//! argument against its parameter's bound (with the parameters substituted,
//! so self-referential bounds like `T: Comparable<T>` work), and substitutes
//! the arguments into the constructor's template. Aggregate instances are
//! registered with the [`TypeRegistry`](crate::registry::TypeRegistry), which
//! copies the constructor's implementations forward onto them.

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use tern_common::Span;
use tern_syntax::{TypeExpr, TypeParam};

use crate::checker::Checker;
use crate::error::{ConstraintOrigin, TypeError};
use crate::ty::{GenericKind, GenericsType, NominalType, Type, TypeParameter};

impl Checker {
    /// Declare type parameters in the current scope.
    ///
    /// All names are bound first, without bounds, so that a bound may mention
    /// its own parameter or a later one. Each bound is then resolved and
    /// materialized, and the parameter is rebound with it.
    pub(crate) fn declare_type_params(
        &mut self,
        params: &[TypeParam],
    ) -> Result<Vec<TypeParameter>, TypeError> {
        for param in params {
            self.check_type_redefinition(&param.name)?;
            self.env.add_type(
                param.name.text.clone(),
                Type::Param(TypeParameter::unbounded(param.name.text.clone())),
            );
        }

        let mut declared = Vec::with_capacity(params.len());
        for param in params {
            let bound = self.materialize_bound(param)?;
            let declared_param = TypeParameter::new(param.name.text.clone(), bound);
            self.env
                .add_type(param.name.text.clone(), Type::Param(declared_param.clone()));
            declared.push(declared_param);
        }
        Ok(declared)
    }

    /// Resolve a parameter's bound to an interface type.
    ///
    /// A bare generic interface with exactly one parameter is applied to the
    /// bounded parameter itself: `T: Comparable` means `T: Comparable<T>`.
    fn materialize_bound(&mut self, param: &TypeParam) -> Result<Type, TypeError> {
        if let TypeExpr::Named { name, args, span } = &param.bound {
            if args.is_empty() {
                if let Some(Type::Generics(generics)) = self.env.get_type(&name.text).cloned() {
                    if matches!(generics.kind, GenericKind::Interface(_)) && generics.arity() == 1 {
                        let this = Type::Param(TypeParameter::unbounded(param.name.text.clone()));
                        return self.instantiate(&generics, vec![this], *span);
                    }
                }
            }
        }

        match self.resolve_type(&param.bound)? {
            bound @ Type::Interface(_) => Ok(bound),
            other => Err(TypeError::InvalidConstraint {
                param: param.name.text.clone(),
                bound: other,
                span: param.bound.span(),
            }),
        }
    }

    /// Apply a generic constructor to concrete arguments.
    pub(crate) fn instantiate(
        &mut self,
        generics: &GenericsType,
        args: Vec<Type>,
        span: Span,
    ) -> Result<Type, TypeError> {
        if args.len() != generics.arity() {
            return Err(TypeError::ArityMismatch {
                expected: generics.arity(),
                found: args.len(),
                origin: ConstraintOrigin::TypeArguments { span },
            });
        }

        let map = generics.substitution(&args);
        for (param, arg) in generics.params.iter().zip(&args) {
            // A parameter seen from inside its own bound carries no bound yet.
            if matches!(arg, Type::Param(p) if p.constraint.is_none()) {
                continue;
            }
            let Some(constraint) = param.constraint() else {
                continue;
            };
            let constraint = constraint.substitute(&map);
            if self.cannot_assign(arg, &constraint) {
                return Err(TypeError::ConstraintNotSatisfied {
                    ty: arg.clone(),
                    param: param.name.clone(),
                    constraint,
                    span,
                });
            }
        }

        let instance = match &generics.kind {
            GenericKind::Function(template) => Type::Function(template.substitute(&map)),
            GenericKind::Record(raw) => Type::Record(NominalType::instance(raw.clone(), args)),
            GenericKind::Interface(raw) => {
                Type::Interface(NominalType::instance(raw.clone(), args))
            }
            GenericKind::Sum(raw) => Type::Sum(NominalType::instance(raw.clone(), args)),
            GenericKind::Array => Type::array(args[0].clone()),
        };
        trace!("instantiated {} as {}", Type::Generics(generics.clone()), instance);
        self.types.ensure_instances(&instance);
        Ok(instance)
    }

    /// Infer the type arguments of a generic call from its argument types.
    ///
    /// Each parameter type of the template is matched structurally against
    /// the corresponding argument type; the first binding found for a type
    /// parameter wins. Mismatches are left for the argument check that
    /// follows instantiation to report.
    pub(crate) fn infer_type_args(
        &self,
        generics: &GenericsType,
        template_params: &[Type],
        arg_types: &[Type],
        span: Span,
    ) -> Result<Vec<Type>, TypeError> {
        let names: FxHashSet<&str> = generics.params.iter().map(|p| p.name.as_str()).collect();
        let mut bindings = FxHashMap::default();
        for (template, actual) in template_params.iter().zip(arg_types) {
            match_types(template, actual, &names, &mut bindings);
        }

        generics
            .params
            .iter()
            .map(|param| {
                bindings
                    .get(&param.name)
                    .cloned()
                    .ok_or_else(|| TypeError::CannotInferTypeArgument {
                        param: param.name.clone(),
                        span,
                    })
            })
            .collect()
    }
}

fn match_types(
    template: &Type,
    actual: &Type,
    names: &FxHashSet<&str>,
    bindings: &mut FxHashMap<String, Type>,
) {
    match (template, actual) {
        (Type::Param(param), _) if names.contains(param.name.as_str()) => {
            bindings
                .entry(param.name.clone())
                .or_insert_with(|| actual.clone());
        }
        (Type::Array(t), Type::Array(a)) => match_types(t, a, names, bindings),
        (Type::Function(t), Type::Function(a)) if t.params.len() == a.params.len() => {
            for (tp, ap) in t.params.iter().zip(&a.params) {
                match_types(tp, ap, names, bindings);
            }
            match_types(&t.ret, &a.ret, names, bindings);
        }
        (Type::Record(t), Type::Record(a))
        | (Type::Interface(t), Type::Interface(a))
        | (Type::Sum(t), Type::Sum(a)) => {
            if t.raw_name() == a.raw_name() && t.args().len() == a.args().len() {
                for (ta, aa) in t.args().iter().zip(a.args()) {
                    match_types(ta, aa, names, bindings);
                }
            }
        }
        _ => {}
    }
}
