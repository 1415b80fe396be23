//! Code generation errors.
//!
//! A checked program is always well typed, so these only report what a
//! backend cannot express: node kinds the class file backend does not cover,
//! and values the JVM cannot represent.

use std::fmt;

use tern_common::Span;

#[derive(Clone, Debug, PartialEq)]
pub enum CodegenError {
    /// The backend has no lowering for this construct.
    Unsupported {
        backend: &'static str,
        what: String,
        span: Option<Span>,
    },
    /// An `Int` literal outside the 32-bit range of a JVM `int`.
    IntegerOutOfRange { value: i64, span: Span },
    /// A `Char` literal outside the Basic Multilingual Plane.
    CharOutOfRange { value: char, span: Span },
    /// A function type with more parameters than the `Fn` interfaces cover.
    TooManyParameters { count: usize, max: usize },
    /// A method whose bytecode is too large for 16-bit branch offsets.
    CodeTooLarge { method: String },
    /// A class whose constant pool does not fit the class file's 16-bit
    /// indices and lengths.
    ClassTooLarge { class: String, reason: &'static str },
}

impl CodegenError {
    pub(crate) fn unsupported(backend: &'static str, what: impl Into<String>, span: Span) -> Self {
        CodegenError::Unsupported {
            backend,
            what: what.into(),
            span: Some(span),
        }
    }

    /// The source location the error refers to, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::Unsupported { span, .. } => *span,
            CodegenError::IntegerOutOfRange { span, .. }
            | CodegenError::CharOutOfRange { span, .. } => Some(*span),
            CodegenError::TooManyParameters { .. }
            | CodegenError::CodeTooLarge { .. }
            | CodegenError::ClassTooLarge { .. } => None,
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::Unsupported { backend, what, .. } => {
                write!(f, "the {} backend does not support {}", backend, what)
            }
            CodegenError::IntegerOutOfRange { value, .. } => {
                write!(f, "integer literal {} does not fit in 32 bits", value)
            }
            CodegenError::CharOutOfRange { value, .. } => write!(
                f,
                "character U+{:04X} cannot be represented as a JVM char",
                *value as u32
            ),
            CodegenError::TooManyParameters { count, max } => write!(
                f,
                "function types take at most {} parameters, found {}",
                max, count
            ),
            CodegenError::CodeTooLarge { method } => {
                write!(f, "method `{}` is too large for a class file", method)
            }
            CodegenError::ClassTooLarge { class, reason } => {
                write!(f, "class `{}` is too large for a class file: {}", class, reason)
            }
        }
    }
}

impl std::error::Error for CodegenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = CodegenError::unsupported("class", "records", Span::new(0, 3));
        assert_eq!(err.to_string(), "the class backend does not support records");
        assert_eq!(err.span(), Some(Span::new(0, 3)));

        let err = CodegenError::CharOutOfRange {
            value: '\u{1F600}',
            span: Span::new(1, 2),
        };
        insta::assert_snapshot!(err.to_string(), @"character U+1F600 cannot be represented as a JVM char");
    }
}
