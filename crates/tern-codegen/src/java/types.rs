//! Tern type to Java type mapping, and Java-safe names.
//!
//! Every Tern value is a Java reference, so generics, interfaces and the
//! constraint objects all work over one representation:
//!
//! | Tern              | Java                          |
//! |-------------------|-------------------------------|
//! | Int               | Integer                       |
//! | Float             | Double                        |
//! | Bool              | Boolean                       |
//! | Char              | Character                     |
//! | String            | String                        |
//! | Void              | Void (always `null`)          |
//! | Array<T>          | java.util.List<T>             |
//! | (A, B) -> R       | Fn2<A, B, R>                  |
//! | Any               | Object                        |
//! | Box<Int>          | Box<Integer>                  |
//! | T                 | T                             |
//!
//! Generated names always contain a `$`, which Tern identifiers cannot, so
//! they never collide with user names.

use tern_typeck::ty::{Primitive, Type};

use crate::error::CodegenError;

/// The largest arity with a prelude `Fn` interface.
pub const MAX_FN_ARITY: usize = 4;

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null", "var", "record",
    "yield", "sealed", "permits", "java",
];

/// `Object` methods a generated member would clash with.
const OBJECT_METHODS: &[&str] = &[
    "clone", "equals", "finalize", "getClass", "hashCode", "notify", "notifyAll", "toString",
    "wait",
];

/// Type names the generated code refers to unqualified.
const RESERVED_TYPES: &[&str] = &[
    "Object", "Integer", "Double", "Boolean", "Character", "Void", "Class", "Override",
    "SuppressWarnings", "SafeVarargs", "FunctionalInterface", "Math", "System", "Fn0", "Fn1",
    "Fn2", "Fn3", "Fn4", "Dictionaries", "ThisConstraint",
];

/// Type names a local variable must not obscure.
pub fn reserved_types() -> &'static [&'static str] {
    RESERVED_TYPES
}

/// A Tern value name (local, global, field, method) as a Java identifier.
pub fn value_name(name: &str) -> String {
    if JAVA_KEYWORDS.contains(&name) || OBJECT_METHODS.contains(&name) {
        format!("{}$", name)
    } else {
        name.to_string()
    }
}

/// A Tern type name as a Java type name. `module` is the enclosing class,
/// which a nested type may not share its name with.
pub fn type_name(name: &str, module: &str) -> String {
    if JAVA_KEYWORDS.contains(&name) || RESERVED_TYPES.contains(&name) || name == module {
        format!("{}$", name)
    } else {
        name.to_string()
    }
}

/// The class name for a module.
pub fn class_name(module: &str) -> String {
    let name = mangle(module);
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("${}", name),
        None => "Module$".to_string(),
        _ if JAVA_KEYWORDS.contains(&name.as_str()) || RESERVED_TYPES.contains(&name.as_str()) => {
            format!("{}$", name)
        }
        _ => name,
    }
}

/// Squash a unique type name into an identifier fragment:
/// `Comparable<Int>` becomes `Comparable$Int`, `(Int) -> Bool` becomes
/// `$Int$Bool`.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('$');
            in_run = true;
        }
    }
    while out.ends_with('$') {
        out.pop();
    }
    out
}

pub fn boxed(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Int => "Integer",
        Primitive::Float => "Double",
        Primitive::Bool => "Boolean",
        Primitive::Char => "Character",
        Primitive::String => "String",
        Primitive::Void => "Void",
    }
}

/// The unboxed Java spelling, for numeric casts.
pub fn unboxed(prim: Primitive) -> Option<&'static str> {
    match prim {
        Primitive::Int => Some("int"),
        Primitive::Float => Some("double"),
        Primitive::Char => Some("char"),
        Primitive::Bool | Primitive::String | Primitive::Void => None,
    }
}

/// The Java spelling of a Tern type.
pub fn java_type(ty: &Type, module: &str) -> Result<String, CodegenError> {
    match ty {
        Type::Primitive(prim) => Ok(boxed(*prim).to_string()),
        Type::Array(elem) => Ok(format!("java.util.List<{}>", java_type(elem, module)?)),
        Type::Function(func) => {
            if func.params.len() > MAX_FN_ARITY {
                return Err(CodegenError::TooManyParameters {
                    count: func.params.len(),
                    max: MAX_FN_ARITY,
                });
            }
            let mut args = func
                .params
                .iter()
                .map(|p| java_type(p, module))
                .collect::<Result<Vec<_>, _>>()?;
            args.push(java_type(&func.ret, module)?);
            Ok(format!("Fn{}<{}>", func.params.len(), args.join(", ")))
        }
        Type::Record(_) | Type::Interface(_) | Type::Sum(_) if ty.is_any() => Ok("Object".to_string()),
        Type::Record(nominal) | Type::Interface(nominal) | Type::Sum(nominal) => {
            let raw = type_name(nominal.raw_name(), module);
            if nominal.args().is_empty() {
                return Ok(raw);
            }
            let args = nominal
                .args()
                .iter()
                .map(|arg| java_type(arg, module))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{}<{}>", raw, args.join(", ")))
        }
        Type::Param(param) => Ok(type_name(&param.name, module)),
        Type::Generics(_) => Err(CodegenError::Unsupported {
            backend: "java",
            what: format!("the uninstantiated generic `{}`", ty),
            span: None,
        }),
    }
}

/// The class literal used for a runtime type test: generic arguments are
/// erased.
pub fn class_literal(ty: &Type, module: &str) -> String {
    match ty.as_nominal() {
        Some(nominal) => format!("{}.class", type_name(nominal.raw_name(), module)),
        None => "Object.class".to_string(),
    }
}

/// `<T, U>` for a declaration's type parameters, or nothing.
pub fn type_params_decl(names: &[String], module: &str) -> String {
    if names.is_empty() {
        return String::new();
    }
    let names: Vec<String> = names.iter().map(|n| type_name(n, module)).collect();
    format!("<{}>", names.join(", "))
}

/// A Java string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for unit in value.encode_utf16() {
        push_escaped(&mut out, unit, '"');
    }
    out.push('"');
    out
}

/// A Java char literal, or `None` when the character needs two UTF-16 units.
pub fn char_literal(value: char) -> Option<String> {
    let mut units = [0u16; 2];
    let encoded = value.encode_utf16(&mut units);
    if encoded.len() != 1 {
        return None;
    }
    let mut out = String::from("'");
    push_escaped(&mut out, encoded[0], '\'');
    out.push('\'');
    Some(out)
}

fn push_escaped(out: &mut String, unit: u16, quote: char) {
    match unit {
        0x5C => out.push_str("\\\\"),
        0x0A => out.push_str("\\n"),
        0x0D => out.push_str("\\r"),
        0x09 => out.push_str("\\t"),
        u if u == quote as u16 => {
            out.push('\\');
            out.push(quote);
        }
        0x20..=0x7E => out.push(unit as u8 as char),
        _ => out.push_str(&format!("\\u{:04x}", unit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_typeck::ty::{NominalType, TypeParameter};

    #[test]
    fn primitive_and_structural_spelling() {
        assert_eq!(java_type(&Type::int(), "Main").unwrap(), "Integer");
        assert_eq!(java_type(&Type::any(), "Main").unwrap(), "Object");
        let func = Type::function(
            vec![Type::int(), Type::array(Type::float())],
            Type::bool(),
        );
        insta::assert_snapshot!(
            java_type(&func, "Main").unwrap(),
            @"Fn2<Integer, java.util.List<Double>, Boolean>"
        );
    }

    #[test]
    fn generic_instances_spell_their_arguments() {
        let t = Type::Param(TypeParameter::new("T", Type::any()));
        let pair = Type::Record(NominalType::instance("Pair", vec![Type::string(), t]));
        assert_eq!(java_type(&pair, "Main").unwrap(), "Pair<String, T>");
        assert_eq!(class_literal(&pair, "Main"), "Pair.class");
    }

    #[test]
    fn wide_function_types_are_rejected() {
        let func = Type::function(vec![Type::int(); 5], Type::void());
        assert_eq!(
            java_type(&func, "Main"),
            Err(CodegenError::TooManyParameters { count: 5, max: 4 })
        );
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(value_name("class"), "class$");
        assert_eq!(value_name("hashCode"), "hashCode$");
        assert_eq!(value_name("total"), "total");
        assert_eq!(type_name("Integer", "Main"), "Integer$");
        assert_eq!(type_name("Main", "Main"), "Main$");
        assert_eq!(type_name("Point", "Main"), "Point");
        assert_eq!(class_name("my-module"), "my$module");
    }

    #[test]
    fn mangled_names() {
        assert_eq!(mangle("Comparable<Int>"), "Comparable$Int");
        assert_eq!(mangle("Pair<Int, Box<String>>"), "Pair$Int$Box$String");
        assert_eq!(mangle("(Int) -> Bool"), "$Int$Bool");
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(string_literal("a\"b\\n"), "\"a\\\"b\\\\n\"");
        assert_eq!(string_literal("tab\there"), "\"tab\\there\"");
        assert_eq!(string_literal("é"), "\"\\u00e9\"");
        assert_eq!(char_literal('\''), Some("'\\''".to_string()));
        assert_eq!(char_literal('x'), Some("'x'".to_string()));
        assert_eq!(char_literal('\u{1F600}'), None);
    }
}
