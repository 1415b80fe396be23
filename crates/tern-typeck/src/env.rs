//! Lexical scopes and the symbols they hold.
//!
//! The environment is a stack of scopes. Each scope maps identifier names to
//! [`Identifier`]s and type names to [`Type`]s. Lookups search from the
//! innermost scope outward; insertions always go into the innermost scope,
//! except for the few declarations (global functions registered early,
//! record constructors) that target the global scope explicitly.
//!
//! The table itself never rejects an insertion. Callers check
//! [`TypeEnv::is_redefine_identifier`] / [`TypeEnv::is_redefine_type`] first
//! and report a redefinition error.

use rustc_hash::FxHashMap;

use crate::ty::Type;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    Mutable,
}

/// How a name was bound, which decides how generated code refers to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Function parameter, block `val`/`var`, pattern binding, lambda parameter.
    Local,
    /// Module-level `val`/`var`.
    Global,
    /// Module-level function, or a method reached through a receiver.
    Function,
    /// A record field, referenced by its bare name inside a method or
    /// through a receiver.
    Field,
    /// A record or sum variant constructor.
    Constructor,
}

/// A named, typed binding.
#[derive(Clone, Debug)]
pub struct Identifier {
    pub name: String,
    pub ty: Type,
    pub mutability: Mutability,
    pub origin: Origin,
}

impl Identifier {
    pub fn new(name: impl Into<String>, ty: Type, origin: Origin) -> Self {
        Identifier {
            name: name.into(),
            ty,
            mutability: Mutability::Immutable,
            origin,
        }
    }

    pub fn mutable(name: impl Into<String>, ty: Type, origin: Origin) -> Self {
        Identifier {
            mutability: Mutability::Mutable,
            ..Identifier::new(name, ty, origin)
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mutable
    }
}

/// An interface member. Members without a default body must be provided by
/// every implementer.
#[derive(Clone, Debug)]
pub struct VirtualIdentifier {
    pub ident: Identifier,
    pub has_default: bool,
}

/// One level of the scope stack.
#[derive(Default, Debug)]
pub struct Scope {
    identifiers: FxHashMap<String, Identifier>,
    types: FxHashMap<String, Type>,
}

/// The scope stack. Index 0 is the global scope.
#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    /// Create an environment with one empty global scope.
    pub fn new() -> Self {
        TypeEnv {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics if only the global scope remains.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    fn innermost(&mut self) -> &mut Scope {
        self.scopes
            .last_mut()
            .expect("scope stack should never be empty")
    }

    pub fn add_identifier(&mut self, ident: Identifier) {
        self.innermost()
            .identifiers
            .insert(ident.name.clone(), ident);
    }

    pub fn add_type(&mut self, name: impl Into<String>, ty: Type) {
        self.innermost().types.insert(name.into(), ty);
    }

    pub fn add_global_identifier(&mut self, ident: Identifier) {
        self.scopes[0].identifiers.insert(ident.name.clone(), ident);
    }

    pub fn add_global_type(&mut self, name: impl Into<String>, ty: Type) {
        self.scopes[0].types.insert(name.into(), ty);
    }

    pub fn get_identifier(&self, name: &str) -> Option<&Identifier> {
        self.lookup_identifier(name).map(|(_, ident)| ident)
    }

    /// Like [`get_identifier`](Self::get_identifier), also returning the
    /// depth of the scope that holds the binding.
    pub fn lookup_identifier(&self, name: &str) -> Option<(usize, &Identifier)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.identifiers.get(name).map(|ident| (depth, ident)))
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.types.get(name))
    }

    pub fn has_identifier(&self, name: &str) -> bool {
        self.get_identifier(name).is_some()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.get_type(name).is_some()
    }

    /// Whether `name` is already bound in the innermost scope.
    pub fn is_redefine_identifier(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.identifiers.contains_key(name))
    }

    pub fn is_redefine_type(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.types.contains_key(name))
    }

    /// Number of scopes on the stack.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}
