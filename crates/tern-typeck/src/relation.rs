//! The implementation relation and the assignability check built on it.
//!
//! The relation records, for each type (by unique name), the interfaces and
//! sum types it implements. It is program-global and only ever grows: entries
//! are added when a record, sum variant or extension declares an
//! implementation, and when a generic instance inherits one from its
//! constructor.

use rustc_hash::FxHashMap;

use crate::ty::Type;

#[derive(Default, Debug, Clone)]
pub struct ImplementationRelation {
    entries: FxHashMap<String, Vec<Type>>,
}

impl ImplementationRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `source` implements `target`. Returns `false` when the
    /// pair was already known.
    pub fn add(&mut self, source: &Type, target: Type) -> bool {
        let targets = self.entries.entry(source.name()).or_default();
        if targets.contains(&target) {
            return false;
        }
        targets.push(target);
        true
    }

    /// Whether `source` was registered as implementing `target`. Only direct
    /// registrations count; the relation is not transitively closed.
    pub fn implements(&self, source: &Type, target: &Type) -> bool {
        self.implemented_by(source).contains(target)
    }

    /// Everything `source` implements, in registration order.
    pub fn implemented_by(&self, source: &Type) -> &[Type] {
        self.entries
            .get(&source.name())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a value of type `source` can NOT flow into a slot of type `target`.
///
/// Assignable when the unique names are equal, when `target` is `Any`, when
/// `target` is an interface or sum type recorded for `source` in the
/// relation, or when `source` is a type parameter whose bound is exactly
/// `target`.
pub fn cannot_assign(relation: &ImplementationRelation, source: &Type, target: &Type) -> bool {
    if source == target || target.is_any() {
        return false;
    }
    match target {
        Type::Interface(_) | Type::Sum(_) if relation.implements(source, target) => return false,
        _ => {}
    }
    if let Type::Param(param) = source {
        if param.constraint() == Some(target) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeParameter;

    #[test]
    fn equal_types_are_assignable() {
        let relation = ImplementationRelation::new();
        assert!(!cannot_assign(&relation, &Type::int(), &Type::int()));
        assert!(cannot_assign(&relation, &Type::int(), &Type::float()));
    }

    #[test]
    fn everything_fits_any() {
        let relation = ImplementationRelation::new();
        assert!(!cannot_assign(&relation, &Type::record("Point"), &Type::any()));
        assert!(!cannot_assign(&relation, &Type::array(Type::int()), &Type::any()));
    }

    #[test]
    fn registered_interface_is_assignable() {
        let mut relation = ImplementationRelation::new();
        let point = Type::record("Point");
        let show = Type::interface("Show");
        assert!(cannot_assign(&relation, &point, &show));

        assert!(relation.add(&point, show.clone()));
        assert!(!relation.add(&point, show.clone()));
        assert!(!cannot_assign(&relation, &point, &show));
        // The relation is directional.
        assert!(cannot_assign(&relation, &show, &point));
    }

    #[test]
    fn relation_is_not_transitive() {
        let mut relation = ImplementationRelation::new();
        let a = Type::record("A");
        let b = Type::interface("B");
        let c = Type::interface("C");
        relation.add(&a, b.clone());
        relation.add(&b, c.clone());

        assert!(!cannot_assign(&relation, &a, &b));
        assert!(!cannot_assign(&relation, &b, &c));
        assert!(cannot_assign(&relation, &a, &c));
    }

    #[test]
    fn param_fits_its_bound() {
        let relation = ImplementationRelation::new();
        let show = Type::interface("Show");
        let t = Type::Param(TypeParameter::new("T", show.clone()));
        assert!(!cannot_assign(&relation, &t, &show));
        assert!(cannot_assign(&relation, &t, &Type::interface("Eq")));
    }
}
