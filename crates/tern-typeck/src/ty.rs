//! Type representation for the Tern type system.
//!
//! Tern types are nominal for records, interfaces and sum types and
//! structural for arrays and functions. Every type has a canonical unique
//! name (`Int`, `Array<Int>`, `(Int) -> Bool`, `Box<Int>`) and two types are
//! the same type exactly when their unique names are equal. Member maps do not
//! live here; they are kept by the [`TypeRegistry`](crate::registry::TypeRegistry)
//! keyed by raw name, so a `Type` is a cheap, self-describing value.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

/// The built-in scalar types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Float,
    Bool,
    Char,
    String,
    Void,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Primitive::Int,
        Primitive::Float,
        Primitive::Bool,
        Primitive::Char,
        Primitive::String,
        Primitive::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "Int",
            Primitive::Float => "Float",
            Primitive::Bool => "Bool",
            Primitive::Char => "Char",
            Primitive::String => "String",
            Primitive::Void => "Void",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Primitive::Int | Primitive::Float)
    }

    /// Types that `==` and `!=` accept.
    pub fn is_equatable(self) -> bool {
        !matches!(self, Primitive::Void)
    }
}

/// Where a generic instance came from: `Box<Int>` has origin `Box` + `[Int]`.
#[derive(Clone, Debug)]
pub struct GenericOrigin {
    pub name: String,
    pub args: Vec<Type>,
}

/// A record, interface or sum type, identified by its unique name.
#[derive(Clone, Debug)]
pub struct NominalType {
    pub name: String,
    pub origin: Option<GenericOrigin>,
}

impl NominalType {
    pub fn plain(name: impl Into<String>) -> Self {
        NominalType {
            name: name.into(),
            origin: None,
        }
    }

    /// An instance of the generic `raw` applied to `args`. The unique name is
    /// computed from the arguments, so equal arguments give equal instances.
    pub fn instance(raw: impl Into<String>, args: Vec<Type>) -> Self {
        let raw = raw.into();
        let name = format!("{}<{}>", raw, join(&args, ", "));
        NominalType {
            name,
            origin: Some(GenericOrigin { name: raw, args }),
        }
    }

    /// The declared name, without type arguments.
    pub fn raw_name(&self) -> &str {
        match &self.origin {
            Some(origin) => &origin.name,
            None => &self.name,
        }
    }

    pub fn args(&self) -> &[Type] {
        match &self.origin {
            Some(origin) => &origin.args,
            None => &[],
        }
    }

    fn substitute(&self, map: &FxHashMap<String, Type>) -> NominalType {
        match &self.origin {
            Some(origin) => NominalType::instance(
                origin.name.clone(),
                origin.args.iter().map(|arg| arg.substitute(map)).collect(),
            ),
            None => self.clone(),
        }
    }
}

/// `(P1, ..., Pn) -> R`
#[derive(Clone, Debug)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        FunctionType {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn substitute(&self, map: &FxHashMap<String, Type>) -> FunctionType {
        FunctionType {
            params: self.params.iter().map(|p| p.substitute(map)).collect(),
            ret: Box::new(self.ret.substitute(map)),
        }
    }
}

/// A bound type variable.
///
/// `constraint` is the materialized interface bound. It is `None` only for
/// occurrences of a parameter inside its own bound (`T` in
/// `T: Comparable<T>`), where the enclosing parameter already carries it.
#[derive(Clone, Debug)]
pub struct TypeParameter {
    pub name: String,
    pub constraint: Option<Box<Type>>,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>, constraint: Type) -> Self {
        TypeParameter {
            name: name.into(),
            constraint: Some(Box::new(constraint)),
        }
    }

    /// A parameter occurrence that does not carry its bound.
    pub fn unbounded(name: impl Into<String>) -> Self {
        TypeParameter {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn constraint(&self) -> Option<&Type> {
        self.constraint.as_deref()
    }

    /// Name of the synthesized constraint-object type for this parameter's
    /// bound, e.g. `Comparable$Constraint`.
    pub fn constraint_object(&self) -> Option<String> {
        match self.constraint()? {
            Type::Interface(nominal) => Some(format!("{}$Constraint", nominal.raw_name())),
            _ => None,
        }
    }
}

/// What a [`GenericsType`] produces when instantiated.
#[derive(Clone, Debug)]
pub enum GenericKind {
    /// A generic function; the template is its signature over the parameters.
    Function(FunctionType),
    /// A generic record; the template members live in the registry.
    Record(String),
    Interface(String),
    Sum(String),
    /// The built-in `Array<T>`.
    Array,
}

/// A type constructor closed over a list of type parameters.
#[derive(Clone, Debug)]
pub struct GenericsType {
    pub params: Vec<TypeParameter>,
    pub kind: GenericKind,
}

impl GenericsType {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Map each parameter name to the argument at the same position.
    pub fn substitution(&self, args: &[Type]) -> FxHashMap<String, Type> {
        self.params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect()
    }

    /// The parameters as types, for building the "self" instance of a
    /// generic declaration (`Box<T>` inside `record Box<T>`).
    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().cloned().map(Type::Param).collect()
    }
}

/// A Tern type.
///
/// Equality and hashing use the unique name only.
#[derive(Clone, Debug)]
pub enum Type {
    Primitive(Primitive),
    /// `Array<T>`.
    Array(Box<Type>),
    Function(FunctionType),
    Record(NominalType),
    Interface(NominalType),
    Sum(NominalType),
    Generics(GenericsType),
    Param(TypeParameter),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl Type {
    pub fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }

    pub fn float() -> Type {
        Type::Primitive(Primitive::Float)
    }

    pub fn bool() -> Type {
        Type::Primitive(Primitive::Bool)
    }

    pub fn char() -> Type {
        Type::Primitive(Primitive::Char)
    }

    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }

    pub fn void() -> Type {
        Type::Primitive(Primitive::Void)
    }

    /// The built-in interface every type satisfies.
    pub fn any() -> Type {
        Type::Interface(NominalType::plain(ANY))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function(FunctionType::new(params, ret))
    }

    pub fn record(name: &str) -> Type {
        Type::Record(NominalType::plain(name))
    }

    pub fn interface(name: &str) -> Type {
        Type::Interface(NominalType::plain(name))
    }

    /// The canonical unique name.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive().is_some_and(Primitive::is_numeric)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Interface(nominal) if nominal.name == ANY)
    }

    pub fn as_nominal(&self) -> Option<&NominalType> {
        match self {
            Type::Record(n) | Type::Interface(n) | Type::Sum(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether any type parameter occurs in this type.
    pub fn has_params(&self) -> bool {
        match self {
            Type::Param(_) => true,
            Type::Primitive(_) => false,
            Type::Array(elem) => elem.has_params(),
            Type::Function(f) => f.params.iter().any(Type::has_params) || f.ret.has_params(),
            Type::Record(n) | Type::Interface(n) | Type::Sum(n) => {
                n.args().iter().any(Type::has_params)
            }
            Type::Generics(_) => false,
        }
    }

    /// Rewrite every occurrence of a mapped type parameter with its argument.
    ///
    /// Generic instances nested anywhere in the type are rebuilt, so their
    /// unique names reflect the substituted arguments. Parameters absent from
    /// `map` are left as they are.
    pub fn substitute(&self, map: &FxHashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::Primitive(_) => self.clone(),
            Type::Array(elem) => Type::Array(Box::new(elem.substitute(map))),
            Type::Function(f) => Type::Function(f.substitute(map)),
            Type::Record(n) => Type::Record(n.substitute(map)),
            Type::Interface(n) => Type::Interface(n.substitute(map)),
            Type::Sum(n) => Type::Sum(n.substitute(map)),
            Type::Param(param) => match map.get(&param.name) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            Type::Generics(generics) => {
                // The constructor's own parameters shadow outer ones.
                let mut inner = map.clone();
                for param in &generics.params {
                    inner.remove(&param.name);
                }
                let kind = match &generics.kind {
                    GenericKind::Function(f) => GenericKind::Function(f.substitute(&inner)),
                    other => other.clone(),
                };
                Type::Generics(GenericsType {
                    params: generics.params.clone(),
                    kind,
                })
            }
        }
    }
}

/// Name of the built-in top interface.
pub const ANY: &str = "Any";

fn join(types: &[Type], sep: &str) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", join(&self.params, ", "), self.ret)
    }
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::Array(elem) => write!(f, "Array<{}>", elem),
            Type::Function(func) => write!(f, "{}", func),
            Type::Record(n) | Type::Interface(n) | Type::Sum(n) => write!(f, "{}", n.name),
            Type::Param(param) => write!(f, "{}", param.name),
            Type::Generics(generics) => {
                let params: Vec<String> = generics
                    .params
                    .iter()
                    .map(|p| match p.constraint() {
                        Some(bound) => format!("{}: {}", p.name, bound),
                        None => p.name.clone(),
                    })
                    .collect();
                match &generics.kind {
                    GenericKind::Function(func) => write!(f, "<{}>{}", params.join(", "), func),
                    GenericKind::Record(name)
                    | GenericKind::Interface(name)
                    | GenericKind::Sum(name) => write!(f, "{}", name),
                    GenericKind::Array => write!(f, "Array"),
                }
            }
        }
    }
}
