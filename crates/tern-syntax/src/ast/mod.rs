//! Syntax tree node definitions.
//!
//! Every node carries the [`Span`] it was parsed from. Nodes built in code
//! (tests, synthesized trees) use [`Span::dummy`], which is also the value
//! serde fills in when a span is missing from the JSON input.

pub mod expr;
pub mod item;
pub mod pat;
pub mod ty;

use serde::{Deserialize, Serialize};
use tern_common::Span;

/// An identifier occurrence: a declared name or a reference to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub text: String,
    #[serde(default)]
    pub span: Span,
}

impl Name {
    pub fn new(text: impl Into<String>) -> Self {
        Name {
            text: text.into(),
            span: Span::dummy(),
        }
    }

    pub fn at(text: impl Into<String>, span: Span) -> Self {
        Name {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}
