//! Shared types for the Tern compiler.

pub mod span;

pub use span::{LineIndex, Span};
