//! Type registry: member maps, generic instances and conformance.
//!
//! Records, interfaces and sum types are registered here under their raw
//! (declared) name together with their type parameters and template members.
//! Members of a generic instance such as `Box<Int>` are never stored; they are
//! computed on lookup by substituting the instance's arguments into the
//! template.
//!
//! The registry also owns the [`ImplementationRelation`]. Implementations
//! declared on a generic constructor are remembered as templates so that every
//! instance, whether created before or after the declaration, receives a
//! substituted copy.

use indexmap::IndexMap;
use log::trace;
use rustc_hash::FxHashMap;
use tern_common::Span;

use crate::env::{Identifier, Origin, VirtualIdentifier};
use crate::error::TypeError;
use crate::relation::{cannot_assign, ImplementationRelation};
use crate::ty::{NominalType, Primitive, Type, TypeParameter};

/// What kind of member a lookup found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// A record field.
    Field,
    /// A method declared in a record body or added by an extension.
    Method,
    /// An interface member without a default body.
    Required,
    /// An interface member with a default body, also found on implementers
    /// that do not override it.
    Default,
}

#[derive(Clone, Debug)]
pub struct Member {
    pub ident: Identifier,
    pub kind: MemberKind,
}

impl Member {
    pub fn field(ident: Identifier) -> Self {
        Member {
            ident,
            kind: MemberKind::Field,
        }
    }

    pub fn method(ident: Identifier) -> Self {
        Member {
            ident,
            kind: MemberKind::Method,
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ident.ty
    }

    fn substitute(&self, map: &FxHashMap<String, Type>) -> Member {
        let mut member = self.clone();
        member.ident.ty = self.ident.ty.substitute(map);
        member
    }
}

/// A declared record or sum variant.
#[derive(Clone, Debug)]
pub struct RecordInfo {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    /// Fields first, in constructor order, then methods in declaration order.
    pub members: IndexMap<String, Member>,
    /// The parent sum type, for variants.
    pub variant_of: Option<String>,
}

impl RecordInfo {
    pub fn new(name: impl Into<String>, type_params: Vec<TypeParameter>) -> Self {
        RecordInfo {
            name: name.into(),
            type_params,
            members: IndexMap::new(),
            variant_of: None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &Member> {
        self.members
            .values()
            .filter(|member| member.kind == MemberKind::Field)
    }
}

#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub members: IndexMap<String, VirtualIdentifier>,
}

#[derive(Clone, Debug)]
pub struct SumInfo {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub variants: Vec<String>,
}

/// Name of the built-in array length member.
pub const ARRAY_SIZE: &str = "size";

#[derive(Default, Debug)]
pub struct TypeRegistry {
    records: FxHashMap<String, RecordInfo>,
    interfaces: FxHashMap<String, InterfaceInfo>,
    sums: FxHashMap<String, SumInfo>,
    /// Methods added to primitives by extensions.
    primitive_members: FxHashMap<Primitive, IndexMap<String, Member>>,
    relation: ImplementationRelation,
    /// Implementations declared on generic constructors, over their own
    /// type parameters, keyed by raw name.
    generic_impls: FxHashMap<String, Vec<Type>>,
    /// Every generic instance seen so far, keyed by unique name.
    instances: IndexMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Declarations ───────────────────────────────────────────────────

    pub fn declare_record(&mut self, info: RecordInfo) {
        self.records.insert(info.name.clone(), info);
    }

    pub fn declare_interface(&mut self, info: InterfaceInfo) {
        self.interfaces.insert(info.name.clone(), info);
    }

    pub fn declare_sum(&mut self, info: SumInfo) {
        self.sums.insert(info.name.clone(), info);
    }

    pub fn record(&self, raw: &str) -> Option<&RecordInfo> {
        self.records.get(raw)
    }

    pub fn interface(&self, raw: &str) -> Option<&InterfaceInfo> {
        self.interfaces.get(raw)
    }

    pub fn sum(&self, raw: &str) -> Option<&SumInfo> {
        self.sums.get(raw)
    }

    pub fn relation(&self) -> &ImplementationRelation {
        &self.relation
    }

    /// Every generic instance created while checking, in creation order.
    pub fn instances(&self) -> impl Iterator<Item = &Type> {
        self.instances.values()
    }

    /// Append a member to a record's live member map.
    pub fn add_record_member(&mut self, raw: &str, name: impl Into<String>, member: Member) {
        if let Some(info) = self.records.get_mut(raw) {
            info.members.insert(name.into(), member);
        }
    }

    pub fn add_primitive_member(&mut self, prim: Primitive, name: impl Into<String>, member: Member) {
        self.primitive_members
            .entry(prim)
            .or_default()
            .insert(name.into(), member);
    }

    pub fn primitive_members(&self, prim: Primitive) -> impl Iterator<Item = (&String, &Member)> {
        self.primitive_members
            .get(&prim)
            .into_iter()
            .flat_map(|members| members.iter())
    }

    pub fn add_interface_member(&mut self, raw: &str, name: impl Into<String>, member: VirtualIdentifier) {
        if let Some(info) = self.interfaces.get_mut(raw) {
            info.members.insert(name.into(), member);
        }
    }

    fn type_params_of(&self, raw: &str) -> Option<&[TypeParameter]> {
        if let Some(info) = self.records.get(raw) {
            return Some(&info.type_params);
        }
        if let Some(info) = self.interfaces.get(raw) {
            return Some(&info.type_params);
        }
        self.sums.get(raw).map(|info| info.type_params.as_slice())
    }

    fn instance_substitution(&self, nominal: &NominalType) -> FxHashMap<String, Type> {
        match self.type_params_of(nominal.raw_name()) {
            Some(params) => params
                .iter()
                .zip(nominal.args())
                .map(|(param, arg)| (param.name.clone(), arg.clone()))
                .collect(),
            None => FxHashMap::default(),
        }
    }

    // ── Instances and the implementation relation ──────────────────────

    /// Register a generic instance the first time it is seen, copying the
    /// constructor's known implementations forward with the same arguments.
    pub fn ensure_instance(&mut self, ty: &Type) {
        let Some(nominal) = ty.as_nominal() else {
            return;
        };
        if nominal.origin.is_none() || self.instances.contains_key(&nominal.name) {
            return;
        }
        trace!("new generic instance {}", nominal.name);
        self.instances.insert(nominal.name.clone(), ty.clone());

        let map = self.instance_substitution(nominal);
        let inherited: Vec<Type> = self
            .generic_impls
            .get(nominal.raw_name())
            .map(|impls| impls.iter().map(|target| target.substitute(&map)).collect())
            .unwrap_or_default();
        for target in inherited {
            self.add_implementation(ty, target);
        }
    }

    /// [`ensure_instance`](Self::ensure_instance) for every generic instance
    /// occurring anywhere inside `ty`.
    pub fn ensure_instances(&mut self, ty: &Type) {
        match ty {
            Type::Array(elem) => self.ensure_instances(elem),
            Type::Function(func) => {
                for param in &func.params {
                    self.ensure_instances(param);
                }
                self.ensure_instances(&func.ret);
            }
            Type::Record(nominal) | Type::Interface(nominal) | Type::Sum(nominal) => {
                for arg in nominal.args() {
                    self.ensure_instances(arg);
                }
                self.ensure_instance(ty);
            }
            Type::Primitive(_) | Type::Generics(_) | Type::Param(_) => {}
        }
    }

    /// Record that `source` implements `target`.
    pub fn add_implementation(&mut self, source: &Type, target: Type) {
        self.ensure_instance(&target);
        trace!("{} implements {}", source, target);
        self.relation.add(source, target);
    }

    /// Record an implementation declared on the generic constructor `raw`,
    /// where `target` is written over the constructor's own parameters.
    /// Instances created earlier receive it immediately.
    pub fn add_generic_implementation(&mut self, raw: &str, target: Type) {
        self.generic_impls
            .entry(raw.to_string())
            .or_default()
            .push(target.clone());

        let existing: Vec<Type> = self
            .instances
            .values()
            .filter(|inst| inst.as_nominal().is_some_and(|n| n.raw_name() == raw))
            .cloned()
            .collect();
        for instance in existing {
            let Some(nominal) = instance.as_nominal() else {
                continue;
            };
            let map = self.instance_substitution(nominal);
            self.add_implementation(&instance, target.substitute(&map));
        }
    }

    pub fn cannot_assign(&self, source: &Type, target: &Type) -> bool {
        cannot_assign(&self.relation, source, target)
    }

    // ── Member lookup ──────────────────────────────────────────────────

    /// Members declared directly on a record or primitive (fields, body
    /// methods and extension methods), with instance arguments substituted.
    pub fn own_member(&self, ty: &Type, name: &str) -> Option<Member> {
        match ty {
            Type::Record(nominal) => {
                let info = self.records.get(nominal.raw_name())?;
                let member = info.members.get(name)?;
                Some(member.substitute(&self.instance_substitution(nominal)))
            }
            Type::Primitive(prim) => self.primitive_members.get(prim)?.get(name).cloned(),
            _ => None,
        }
    }

    /// The fields of a record type in constructor order, with instance
    /// arguments substituted.
    pub fn record_fields(&self, ty: &Type) -> Vec<Member> {
        let Type::Record(nominal) = ty else {
            return Vec::new();
        };
        let Some(info) = self.records.get(nominal.raw_name()) else {
            return Vec::new();
        };
        let map = self.instance_substitution(nominal);
        info.fields().map(|field| field.substitute(&map)).collect()
    }

    /// Resolve `name` on a value of type `ty`.
    ///
    /// Records and primitives see their own members first, then default
    /// members of the interfaces they implement. Interfaces see their
    /// declared members. A type parameter sees the members of its bound.
    pub fn lookup_member(&self, ty: &Type, name: &str) -> Option<Member> {
        match ty {
            Type::Record(_) | Type::Primitive(_) => self
                .own_member(ty, name)
                .or_else(|| self.inherited_default(ty, name)),
            Type::Interface(nominal) => {
                let info = self.interfaces.get(nominal.raw_name())?;
                let member = info.members.get(name)?;
                let kind = if member.has_default {
                    MemberKind::Default
                } else {
                    MemberKind::Required
                };
                let member = Member {
                    ident: member.ident.clone(),
                    kind,
                };
                Some(member.substitute(&self.instance_substitution(nominal)))
            }
            Type::Param(param) => self.lookup_member(param.constraint()?, name),
            Type::Array(_) if name == ARRAY_SIZE => Some(Member::field(Identifier::new(
                ARRAY_SIZE,
                Type::int(),
                Origin::Field,
            ))),
            Type::Sum(_) | Type::Array(_) | Type::Function(_) | Type::Generics(_) => None,
        }
    }

    fn inherited_default(&self, ty: &Type, name: &str) -> Option<Member> {
        self.relation
            .implemented_by(ty)
            .iter()
            .filter(|target| matches!(target, Type::Interface(_)))
            .find_map(|iface| {
                self.lookup_member(iface, name)
                    .filter(|member| member.kind == MemberKind::Default)
            })
    }

    /// The members of an interface type with its arguments substituted, in
    /// declaration order.
    pub fn interface_members(&self, iface: &Type) -> Vec<(String, VirtualIdentifier)> {
        let Type::Interface(nominal) = iface else {
            return Vec::new();
        };
        let Some(info) = self.interfaces.get(nominal.raw_name()) else {
            return Vec::new();
        };
        let map = self.instance_substitution(nominal);
        info.members
            .iter()
            .map(|(name, member)| {
                let mut member = member.clone();
                member.ident.ty = member.ident.ty.substitute(&map);
                (name.clone(), member)
            })
            .collect()
    }

    /// Check that `ty` provides every member `iface` requires.
    ///
    /// A required member must be present as a method of exactly the
    /// interface's member type. Members with a default body may be omitted;
    /// when provided, they must match too.
    pub fn check_conformance(&self, ty: &Type, iface: &Type, span: Span) -> Result<(), TypeError> {
        for (name, expected) in self.interface_members(iface) {
            match self.own_member(ty, &name) {
                Some(found) if found.kind == MemberKind::Method => {
                    if found.ident.ty != expected.ident.ty {
                        return Err(TypeError::SignatureMismatch {
                            interface: iface.clone(),
                            member: name,
                            expected: expected.ident.ty,
                            found: found.ident.ty,
                            span,
                        });
                    }
                }
                _ if expected.has_default => {}
                _ => {
                    return Err(TypeError::MissingMember {
                        ty: ty.clone(),
                        interface: iface.clone(),
                        member: name,
                        span,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::NominalType;

    fn show_interface(registry: &mut TypeRegistry) -> Type {
        let mut info = InterfaceInfo {
            name: "Show".into(),
            type_params: Vec::new(),
            members: IndexMap::new(),
        };
        info.members.insert(
            "show".into(),
            VirtualIdentifier {
                ident: Identifier::new("show", Type::function(vec![], Type::string()), Origin::Function),
                has_default: false,
            },
        );
        info.members.insert(
            "describe".into(),
            VirtualIdentifier {
                ident: Identifier::new(
                    "describe",
                    Type::function(vec![], Type::string()),
                    Origin::Function,
                ),
                has_default: true,
            },
        );
        registry.declare_interface(info);
        Type::interface("Show")
    }

    fn generic_box(registry: &mut TypeRegistry) -> TypeParameter {
        let t = TypeParameter::new("T", Type::any());
        let mut info = RecordInfo::new("Box", vec![t.clone()]);
        info.members.insert(
            "value".into(),
            Member::field(Identifier::new("value", Type::Param(t.clone()), Origin::Field)),
        );
        registry.declare_record(info);
        t
    }

    fn box_of(arg: Type) -> Type {
        Type::Record(NominalType::instance("Box", vec![arg]))
    }

    #[test]
    fn instance_members_are_substituted() {
        let mut registry = TypeRegistry::new();
        generic_box(&mut registry);
        let member = registry.lookup_member(&box_of(Type::int()), "value").unwrap();
        assert_eq!(member.kind, MemberKind::Field);
        assert_eq!(*member.ty(), Type::int());
    }

    #[test]
    fn generic_implementation_reaches_old_and_new_instances() {
        let mut registry = TypeRegistry::new();
        let show = show_interface(&mut registry);
        generic_box(&mut registry);

        let early = box_of(Type::int());
        registry.ensure_instance(&early);
        registry.add_generic_implementation("Box", show.clone());

        let late = box_of(Type::string());
        registry.ensure_instance(&late);

        assert!(!registry.cannot_assign(&early, &show));
        assert!(!registry.cannot_assign(&late, &show));
    }

    #[test]
    fn conformance_requires_non_default_members() {
        let mut registry = TypeRegistry::new();
        let show = show_interface(&mut registry);
        registry.declare_record(RecordInfo::new("Point", Vec::new()));
        let point = Type::record("Point");

        let err = registry
            .check_conformance(&point, &show, Span::dummy())
            .unwrap_err();
        assert!(matches!(err, TypeError::MissingMember { ref member, .. } if member == "show"));

        registry.add_record_member(
            "Point",
            "show",
            Member::method(Identifier::new(
                "show",
                Type::function(vec![], Type::string()),
                Origin::Function,
            )),
        );
        assert!(registry.check_conformance(&point, &show, Span::dummy()).is_ok());
    }

    #[test]
    fn defaults_are_inherited_by_implementers() {
        let mut registry = TypeRegistry::new();
        let show = show_interface(&mut registry);
        registry.add_implementation(&Type::int(), show);

        let member = registry.lookup_member(&Type::int(), "describe").unwrap();
        assert_eq!(member.kind, MemberKind::Default);
        assert!(registry.lookup_member(&Type::int(), "show").is_none());
    }

    #[test]
    fn array_size_member() {
        let registry = TypeRegistry::new();
        let member = registry
            .lookup_member(&Type::array(Type::bool()), ARRAY_SIZE)
            .unwrap();
        assert_eq!(*member.ty(), Type::int());
    }
}
