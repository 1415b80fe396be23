//! Direct class file generation.
//!
//! A partial backend: the module becomes one class whose static fields are
//! the globals and whose static methods are the functions. Only `Int`,
//! `Float` and `Bool` values are representable (as `int`, `double` and
//! `boolean`), and only non-generic functions. Records, interfaces, sum
//! types, extensions, strings, characters, lambdas, arrays, patterns, casts
//! and member access are rejected with [`CodegenError::Unsupported`].
//!
//! ## Architecture
//!
//! - [`pool`]: the constant pool
//! - [`code`]: opcodes and the method body assembler
//! - [`class`]: the class file writer
//! - [`lower`]: typed AST to instructions

pub(crate) mod class;
pub(crate) mod code;
mod lower;
pub(crate) mod pool;

use tern_common::Span;
use tern_typeck::ty::{Primitive, Type};
use tern_typeck::CheckedProgram;

use crate::error::CodegenError;
use crate::java::types::class_name;
use crate::{Artifact, Backend, EmitOptions};

use self::code::Kind;

const BACKEND: &str = "class";

#[derive(Clone, Debug, Default)]
pub struct ClassFileBackend {
    options: EmitOptions,
}

impl ClassFileBackend {
    pub fn new(options: EmitOptions) -> Self {
        ClassFileBackend { options }
    }
}

impl Backend for ClassFileBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn emit(&self, program: &CheckedProgram) -> Result<Artifact, CodegenError> {
        let class = class_name(&program.module.name);
        let internal = match &self.options.package {
            Some(package) => format!("{}/{}", package.replace('.', "/"), class),
            None => class.clone(),
        };
        let contents = lower::ClassGen::new(program, &internal).generate()?;
        Ok(Artifact {
            file_name: format!("{}.class", class),
            contents,
        })
    }
}

pub(crate) fn unsupported(what: impl Into<String>, span: Option<Span>) -> CodegenError {
    CodegenError::Unsupported {
        backend: BACKEND,
        what: what.into(),
        span,
    }
}

/// The stack category of a representable type.
pub(crate) fn kind_of(ty: &Type, span: Option<Span>) -> Result<Kind, CodegenError> {
    match ty {
        Type::Primitive(Primitive::Int | Primitive::Bool) => Ok(Kind::Int),
        Type::Primitive(Primitive::Float) => Ok(Kind::Double),
        Type::Primitive(Primitive::Void) => Ok(Kind::Void),
        _ => Err(unsupported(format!("values of type `{}`", ty), span)),
    }
}

/// The JVM field descriptor of a representable type.
pub(crate) fn descriptor(ty: &Type, span: Option<Span>) -> Result<&'static str, CodegenError> {
    match ty {
        Type::Primitive(Primitive::Int) => Ok("I"),
        Type::Primitive(Primitive::Bool) => Ok("Z"),
        Type::Primitive(Primitive::Float) => Ok("D"),
        Type::Primitive(Primitive::Void) => Ok("V"),
        _ => Err(unsupported(format!("values of type `{}`", ty), span)),
    }
}

/// `(ID)Z`
pub(crate) fn method_descriptor(params: &[Type], ret: &Type) -> Result<String, CodegenError> {
    let mut out = String::from("(");
    for param in params {
        if param.is_void() {
            return Err(unsupported("`Void` parameters", None));
        }
        out.push_str(descriptor(param, None)?);
    }
    out.push(')');
    out.push_str(descriptor(ret, None)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors() {
        assert_eq!(
            method_descriptor(&[Type::int(), Type::float()], &Type::bool()).unwrap(),
            "(ID)Z"
        );
        assert_eq!(method_descriptor(&[], &Type::void()).unwrap(), "()V");
        let err = method_descriptor(&[Type::string()], &Type::void()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the class backend does not support values of type `String`"
        );
    }
}
