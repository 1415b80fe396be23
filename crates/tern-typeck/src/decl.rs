//! Declaration checking.
//!
//! Declarations are checked one at a time in source order, so a name is
//! visible only to the declarations after it. The one exception is a
//! function with a written return type, which is registered before its body
//! is checked so that it can call itself.
//!
//! Records, interfaces and sum types register their type and member maps
//! with the [`TypeRegistry`](crate::registry::TypeRegistry). Extensions
//! append to those maps in place.

use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHashSet;
use tern_common::Span;
use tern_syntax::{
    self as syntax, ExtensionDef, FieldDef, FnDef, InterfaceDef, Name, RecordDef, SumTypeDef,
    ValDef,
};

use crate::checker::Checker;
use crate::env::{Identifier, Origin, VirtualIdentifier};
use crate::error::{ConstraintOrigin, TypeError};
use crate::registry::{InterfaceInfo, Member, RecordInfo, SumInfo};
use crate::tast::{self, Expr};
use crate::ty::{
    FunctionType, GenericKind, GenericsType, NominalType, Primitive, Type, TypeParameter,
};

/// Whose member map a method is added to.
#[derive(Clone, Debug)]
enum MemberOwner {
    Record(String),
    Primitive(Primitive),
}

impl Checker {
    pub(crate) fn check_item(&mut self, item: &syntax::Item) -> Result<tast::Item, TypeError> {
        match item {
            syntax::Item::Val(def) => self.check_global(def).map(tast::Item::Global),
            syntax::Item::Fn(def) => self.check_function(def).map(tast::Item::Function),
            syntax::Item::Record(def) => self.check_record(def).map(tast::Item::Record),
            syntax::Item::Interface(def) => self.check_interface(def).map(tast::Item::Interface),
            syntax::Item::Extension(def) => self.check_extension(def).map(tast::Item::Extension),
            syntax::Item::Sum(def) => self.check_sum(def).map(tast::Item::Sum),
        }
    }

    // ── Globals ────────────────────────────────────────────────────────

    fn check_global(&mut self, def: &ValDef) -> Result<tast::Global, TypeError> {
        self.check_identifier_redefinition(&def.name)?;
        let init = self.check_expr(&def.init)?;
        let (ty, init) = match &def.ty {
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

        let name = def.name.text.clone();
        self.env.add_identifier(if def.mutable {
            Identifier::mutable(name.clone(), ty.clone(), Origin::Global)
        } else {
            Identifier::new(name.clone(), ty.clone(), Origin::Global)
        });
        debug!("checked global {}: {}", name, ty);
        Ok(tast::Global {
            name,
            ty,
            mutable: def.mutable,
            init,
        })
    }

    // ── Functions ──────────────────────────────────────────────────────

    fn check_function(&mut self, def: &FnDef) -> Result<tast::Function, TypeError> {
        self.check_identifier_redefinition(&def.name)?;
        let name = def.name.text.clone();

        let function = {
            let mut scope = self.enter_scope();
            let type_params = scope.declare_type_params(&def.type_params)?;
            let params = scope.declare_params(&def.params)?;
            let declared = def
                .ret
                .as_ref()
                .map(|ret| scope.resolve_type(ret))
                .transpose()?;
            if let Some(ret) = &declared {
                let ty = function_type(&type_params, &params, ret);
                scope
                    .env
                    .add_global_identifier(Identifier::new(name.clone(), ty, Origin::Function));
            }

            let body = scope.check_expr(&def.body)?;
            let (ret, body) = scope.check_return(body, declared, def.span)?;
            tast::Function {
                name: name.clone(),
                type_params,
                params,
                ret,
                body,
            }
        };

        let ty = function_type(&function.type_params, &function.params, &function.ret);
        debug!("checked function {}: {}", name, ty);
        self.env
            .add_identifier(Identifier::new(name, ty, Origin::Function));
        Ok(function)
    }

    /// Bind parameters in the current scope.
    pub(crate) fn declare_params(
        &mut self,
        params: &[syntax::Param],
    ) -> Result<Vec<tast::Param>, TypeError> {
        params
            .iter()
            .map(|param| {
                self.check_identifier_redefinition(&param.name)?;
                let ty = self.resolve_type(&param.ty)?;
                self.env.add_identifier(Identifier::new(
                    param.name.text.clone(),
                    ty.clone(),
                    Origin::Local,
                ));
                Ok(tast::Param {
                    name: param.name.text.clone(),
                    ty,
                })
            })
            .collect()
    }

    /// Fit a body to its declared return type, or take the body's type when
    /// none is written.
    pub(crate) fn check_return(
        &mut self,
        body: Expr,
        declared: Option<Type>,
        fn_span: Span,
    ) -> Result<(Type, Expr), TypeError> {
        match declared {
            Some(ret) => {
                let origin = ConstraintOrigin::Return {
                    body_span: body.span,
                    fn_span,
                };
                let body = self.coerce(body, &ret, origin)?;
                Ok((ret, body))
            }
            None => Ok((body.ty.clone(), body)),
        }
    }

    // ── Records ────────────────────────────────────────────────────────

    fn check_record(&mut self, def: &RecordDef) -> Result<tast::Record, TypeError> {
        self.check_type_redefinition(&def.name)?;
        self.check_identifier_redefinition(&def.name)?;
        let name = def.name.text.clone();

        let mut scope = self.enter_scope();
        let type_params = scope.declare_type_params(&def.type_params)?;
        let self_type = scope.declare_record_type(&name, &type_params, None);
        let fields = scope.declare_fields(&name, &self_type, &def.fields)?;
        scope.declare_constructor(&def.name, &type_params, &fields, &self_type);

        let implements = def
            .implements
            .iter()
            .map(|iface| scope.resolve_interface(iface))
            .collect::<Result<Vec<_>, _>>()?;

        let owner = MemberOwner::Record(name.clone());
        let methods = {
            let mut body = scope.enter_scope();
            body.bind_fields(&self_type);
            def.methods
                .iter()
                .map(|method| body.check_method(&owner, &self_type, method))
                .collect::<Result<Vec<_>, _>>()?
        };

        for (iface, texpr) in implements.iter().zip(&def.implements) {
            scope
                .types
                .check_conformance(&self_type, iface, texpr.span())?;
            scope.record_implementation(&name, &self_type, !type_params.is_empty(), iface.clone());
        }

        debug!(
            "checked record {} ({} fields, {} methods)",
            self_type,
            fields.len(),
            methods.len()
        );
        Ok(tast::Record {
            name,
            type_params,
            fields,
            methods,
            implements,
            self_type,
            variant_of: None,
        })
    }

    /// Register a record (or variant) type globally and return it as seen
    /// from inside its own declaration.
    fn declare_record_type(
        &mut self,
        name: &str,
        type_params: &[TypeParameter],
        variant_of: Option<String>,
    ) -> Type {
        let mut info = RecordInfo::new(name, type_params.to_vec());
        info.variant_of = variant_of;
        self.types.declare_record(info);

        if type_params.is_empty() {
            let ty = Type::record(name);
            self.env.add_global_type(name, ty.clone());
            return ty;
        }
        let generics = GenericsType {
            params: type_params.to_vec(),
            kind: GenericKind::Record(name.to_string()),
        };
        let self_type = Type::Record(NominalType::instance(name, generics.param_types()));
        self.env.add_global_type(name, Type::Generics(generics));
        self.types.ensure_instances(&self_type);
        self_type
    }

    fn declare_fields(
        &mut self,
        raw: &str,
        self_type: &Type,
        fields: &[FieldDef],
    ) -> Result<Vec<tast::Field>, TypeError> {
        let mut declared = Vec::with_capacity(fields.len());
        for field in fields {
            if self.types.own_member(self_type, &field.name.text).is_some() {
                return Err(TypeError::DuplicateMember {
                    ty: self_type.clone(),
                    member: field.name.text.clone(),
                    span: field.name.span,
                });
            }
            let ty = self.resolve_type(&field.ty)?;
            let name = field.name.text.clone();
            let ident = if field.mutable {
                Identifier::mutable(name.clone(), ty.clone(), Origin::Field)
            } else {
                Identifier::new(name.clone(), ty.clone(), Origin::Field)
            };
            self.types.add_record_member(raw, name.clone(), Member::field(ident));
            declared.push(tast::Field {
                name,
                ty,
                mutable: field.mutable,
            });
        }
        Ok(declared)
    }

    fn declare_constructor(
        &mut self,
        name: &Name,
        type_params: &[TypeParameter],
        fields: &[tast::Field],
        self_type: &Type,
    ) {
        let signature = FunctionType::new(
            fields.iter().map(|field| field.ty.clone()).collect(),
            self_type.clone(),
        );
        let ty = if type_params.is_empty() {
            Type::Function(signature)
        } else {
            Type::Generics(GenericsType {
                params: type_params.to_vec(),
                kind: GenericKind::Function(signature),
            })
        };
        self.env.add_global_identifier(Identifier::new(
            name.text.clone(),
            ty,
            Origin::Constructor,
        ));
    }

    /// Make a record's fields visible by bare name.
    fn bind_fields(&mut self, record: &Type) {
        for field in self.types.record_fields(record) {
            self.env.add_identifier(field.ident);
        }
    }

    fn record_implementation(&mut self, raw: &str, self_type: &Type, generic: bool, iface: Type) {
        if generic {
            self.types.add_generic_implementation(raw, iface);
        } else {
            self.types.add_implementation(self_type, iface);
        }
    }

    // ── Methods ────────────────────────────────────────────────────────

    fn check_method(
        &mut self,
        owner: &MemberOwner,
        self_type: &Type,
        def: &FnDef,
    ) -> Result<tast::Function, TypeError> {
        if let Some(param) = def.type_params.first() {
            return Err(TypeError::GenericMethod {
                name: def.name.text.clone(),
                span: param.span,
            });
        }
        if self.types.own_member(self_type, &def.name.text).is_some() {
            return Err(TypeError::DuplicateMember {
                ty: self_type.clone(),
                member: def.name.text.clone(),
                span: def.name.span,
            });
        }

        let saved = self.this_type.replace(self_type.clone());
        let result = self.check_method_body(owner, def);
        self.this_type = saved;
        result
    }

    fn check_method_body(
        &mut self,
        owner: &MemberOwner,
        def: &FnDef,
    ) -> Result<tast::Function, TypeError> {
        let mut scope = self.enter_scope();
        let params = scope.declare_params(&def.params)?;
        let declared = def
            .ret
            .as_ref()
            .map(|ret| scope.resolve_type(ret))
            .transpose()?;
        let registered_early = declared.is_some();
        if let Some(ret) = &declared {
            scope.add_method(owner, &def.name.text, function_type(&[], &params, ret));
        }

        let body = scope.check_expr(&def.body)?;
        let (ret, body) = scope.check_return(body, declared, def.span)?;
        if !registered_early {
            scope.add_method(owner, &def.name.text, function_type(&[], &params, &ret));
        }
        Ok(tast::Function {
            name: def.name.text.clone(),
            type_params: Vec::new(),
            params,
            ret,
            body,
        })
    }

    fn add_method(&mut self, owner: &MemberOwner, name: &str, ty: Type) {
        let member = Member::method(Identifier::new(name, ty, Origin::Function));
        match owner {
            MemberOwner::Record(raw) => self.types.add_record_member(raw, name, member),
            MemberOwner::Primitive(prim) => self.types.add_primitive_member(*prim, name, member),
        }
    }

    // ── Interfaces ─────────────────────────────────────────────────────

    fn check_interface(&mut self, def: &InterfaceDef) -> Result<tast::Interface, TypeError> {
        self.check_type_redefinition(&def.name)?;
        let name = def.name.text.clone();

        let mut scope = self.enter_scope();
        let type_params = scope.declare_type_params(&def.type_params)?;
        scope.types.declare_interface(InterfaceInfo {
            name: name.clone(),
            type_params: type_params.clone(),
            members: IndexMap::new(),
        });
        let self_type = if type_params.is_empty() {
            let ty = Type::interface(&name);
            scope.env.add_global_type(name.clone(), ty.clone());
            ty
        } else {
            let generics = GenericsType {
                params: type_params.clone(),
                kind: GenericKind::Interface(name.clone()),
            };
            let ty = Type::Interface(NominalType::instance(name.clone(), generics.param_types()));
            scope.env.add_global_type(name.clone(), Type::Generics(generics));
            scope.types.ensure_instances(&ty);
            ty
        };

        // Every signature is known before any default body is checked, so
        // defaults may call each other through `this`.
        let mut signatures = Vec::with_capacity(def.methods.len());
        for method in &def.methods {
            let declared = scope
                .types
                .interface(&name)
                .is_some_and(|info| info.members.contains_key(&method.name.text));
            if declared {
                return Err(TypeError::DuplicateMember {
                    ty: self_type.clone(),
                    member: method.name.text.clone(),
                    span: method.name.span,
                });
            }
            let params = method
                .params
                .iter()
                .map(|param| {
                    Ok(tast::Param {
                        name: param.name.text.clone(),
                        ty: scope.resolve_type(&param.ty)?,
                    })
                })
                .collect::<Result<Vec<_>, TypeError>>()?;
            let ret = scope.resolve_type(&method.ret)?;
            let ty = function_type(&[], &params, &ret);
            scope.types.add_interface_member(
                &name,
                method.name.text.clone(),
                VirtualIdentifier {
                    ident: Identifier::new(method.name.text.clone(), ty, Origin::Function),
                    has_default: method.default_body.is_some(),
                },
            );
            signatures.push((params, ret));
        }

        let saved = scope.this_type.replace(self_type.clone());
        let methods = scope.check_interface_methods(def, signatures);
        scope.this_type = saved;
        let methods = methods?;

        debug!("checked interface {} ({} members)", self_type, methods.len());
        Ok(tast::Interface {
            name,
            type_params,
            methods,
            self_type,
        })
    }

    fn check_interface_methods(
        &mut self,
        def: &InterfaceDef,
        signatures: Vec<(Vec<tast::Param>, Type)>,
    ) -> Result<Vec<tast::InterfaceMethod>, TypeError> {
        let mut methods = Vec::with_capacity(def.methods.len());
        for (method, (params, ret)) in def.methods.iter().zip(signatures) {
            let default_body = match &method.default_body {
                Some(body) => {
                    let mut scope = self.enter_scope();
                    scope.declare_params(&method.params)?;
                    let body = scope.check_expr(body)?;
                    let (_, body) = scope.check_return(body, Some(ret.clone()), method.span)?;
                    Some(body)
                }
                None => None,
            };
            methods.push(tast::InterfaceMethod {
                name: method.name.text.clone(),
                params,
                ret,
                default_body,
            });
        }
        Ok(methods)
    }

    // ── Extensions ─────────────────────────────────────────────────────

    fn check_extension(&mut self, def: &ExtensionDef) -> Result<tast::Extension, TypeError> {
        let declared = self
            .env
            .get_type(&def.target.text)
            .cloned()
            .ok_or_else(|| TypeError::UndefinedType {
                name: def.target.text.clone(),
                span: def.target.span,
            })?;
        let invalid = || TypeError::InvalidExtension {
            name: def.target.text.clone(),
            span: def.target.span,
        };

        let mut scope = self.enter_scope();
        let (owner, target, type_params) = match declared {
            Type::Primitive(Primitive::Void) => return Err(invalid()),
            Type::Primitive(prim) => (MemberOwner::Primitive(prim), Type::Primitive(prim), Vec::new()),
            Type::Record(nominal) if nominal.origin.is_none() => {
                let raw = nominal.name.clone();
                (MemberOwner::Record(raw), Type::Record(nominal), Vec::new())
            }
            Type::Generics(GenericsType {
                params,
                kind: GenericKind::Record(raw),
            }) => {
                for param in &params {
                    scope
                        .env
                        .add_type(param.name.clone(), Type::Param(param.clone()));
                }
                let generics = GenericsType {
                    params: params.clone(),
                    kind: GenericKind::Record(raw.clone()),
                };
                let target = Type::Record(NominalType::instance(raw.clone(), generics.param_types()));
                (MemberOwner::Record(raw), target, params)
            }
            _ => return Err(invalid()),
        };

        let implements = def
            .implements
            .iter()
            .map(|iface| scope.resolve_interface(iface))
            .collect::<Result<Vec<_>, _>>()?;

        let methods = {
            let mut body = scope.enter_scope();
            body.bind_fields(&target);
            def.methods
                .iter()
                .map(|method| body.check_method(&owner, &target, method))
                .collect::<Result<Vec<_>, _>>()?
        };

        for (iface, texpr) in implements.iter().zip(&def.implements) {
            scope.types.check_conformance(&target, iface, texpr.span())?;
            match &owner {
                MemberOwner::Record(raw) => {
                    scope.record_implementation(raw, &target, !type_params.is_empty(), iface.clone())
                }
                MemberOwner::Primitive(_) => scope.types.add_implementation(&target, iface.clone()),
            }
        }

        debug!(
            "checked extension of {} ({} methods, {} interfaces)",
            target,
            methods.len(),
            implements.len()
        );
        Ok(tast::Extension {
            target,
            type_params,
            methods,
            implements,
        })
    }

    // ── Sum types ──────────────────────────────────────────────────────

    fn check_sum(&mut self, def: &SumTypeDef) -> Result<tast::Sum, TypeError> {
        self.check_type_redefinition(&def.name)?;
        let mut seen = FxHashSet::default();
        seen.insert(def.name.text.as_str());
        for variant in &def.variants {
            self.check_type_redefinition(&variant.name)?;
            self.check_identifier_redefinition(&variant.name)?;
            if !seen.insert(variant.name.text.as_str()) {
                return Err(TypeError::Redefinition {
                    name: variant.name.text.clone(),
                    is_type: true,
                    span: variant.name.span,
                });
            }
        }
        let name = def.name.text.clone();

        let mut scope = self.enter_scope();
        let type_params = scope.declare_type_params(&def.type_params)?;
        scope.types.declare_sum(SumInfo {
            name: name.clone(),
            type_params: type_params.clone(),
            variants: def.variants.iter().map(|v| v.name.text.clone()).collect(),
        });
        let self_type = if type_params.is_empty() {
            let ty = Type::Sum(NominalType::plain(name.clone()));
            scope.env.add_global_type(name.clone(), ty.clone());
            ty
        } else {
            let generics = GenericsType {
                params: type_params.clone(),
                kind: GenericKind::Sum(name.clone()),
            };
            let ty = Type::Sum(NominalType::instance(name.clone(), generics.param_types()));
            scope.env.add_global_type(name.clone(), Type::Generics(generics));
            scope.types.ensure_instances(&ty);
            ty
        };

        let mut variants = Vec::with_capacity(def.variants.len());
        for variant in &def.variants {
            let raw = variant.name.text.clone();
            let variant_type = scope.declare_record_type(&raw, &type_params, Some(name.clone()));
            let fields = scope.declare_fields(&raw, &variant_type, &variant.fields)?;
            scope.declare_constructor(&variant.name, &type_params, &fields, &variant_type);
            scope.record_implementation(
                &raw,
                &variant_type,
                !type_params.is_empty(),
                self_type.clone(),
            );
            variants.push(tast::Record {
                name: raw,
                type_params: type_params.clone(),
                fields,
                methods: Vec::new(),
                implements: vec![self_type.clone()],
                self_type: variant_type,
                variant_of: Some(self_type.clone()),
            });
        }

        debug!("checked sum type {} ({} variants)", self_type, variants.len());
        Ok(tast::Sum {
            name,
            type_params,
            variants,
            self_type,
        })
    }
}

/// The identifier type of a function: a plain signature, or a generic
/// constructor over it.
fn function_type(type_params: &[TypeParameter], params: &[tast::Param], ret: &Type) -> Type {
    let signature = FunctionType::new(params.iter().map(|p| p.ty.clone()).collect(), ret.clone());
    if type_params.is_empty() {
        Type::Function(signature)
    } else {
        Type::Generics(GenericsType {
            params: type_params.to_vec(),
            kind: GenericKind::Function(signature),
        })
    }
}
