//! Built-in types.
//!
//! Registers the primitive types, the generic `Array<T>` constructor and the
//! top interface `Any` into the global scope before a module is checked.

use indexmap::IndexMap;

use crate::env::TypeEnv;
use crate::registry::{InterfaceInfo, TypeRegistry};
use crate::ty::{GenericKind, GenericsType, Primitive, Type, TypeParameter, ANY};

pub fn register_builtins(env: &mut TypeEnv, types: &mut TypeRegistry) {
    for prim in Primitive::ALL {
        env.add_type(prim.name(), Type::Primitive(prim));
    }

    env.add_type(
        "Array",
        Type::Generics(GenericsType {
            params: vec![TypeParameter::new("T", Type::any())],
            kind: GenericKind::Array,
        }),
    );

    env.add_type(ANY, Type::any());
    types.declare_interface(InterfaceInfo {
        name: ANY.to_string(),
        type_params: Vec::new(),
        members: IndexMap::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_are_in_scope() {
        let mut env = TypeEnv::new();
        let mut types = TypeRegistry::new();
        register_builtins(&mut env, &mut types);

        for name in ["Int", "Float", "Bool", "Char", "String", "Void", "Any"] {
            assert!(env.has_type(name), "missing builtin type {}", name);
        }
        assert!(matches!(
            env.get_type("Array"),
            Some(Type::Generics(GenericsType {
                kind: GenericKind::Array,
                ..
            }))
        ));
        assert!(types.interface(ANY).is_some());
    }
}
