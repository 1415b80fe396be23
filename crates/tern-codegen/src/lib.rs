//! Code generation for the Tern compiler.
//!
//! This crate turns a [`CheckedProgram`] into a file for the JVM. Two
//! backends share the [`Backend`] trait:
//!
//! - [`java`]: the complete backend. Emits one Java source file holding the
//!   whole module as a final class with nested types.
//! - [`bytecode`]: a partial backend that assembles a class file directly. It
//!   covers primitive globals and non-generic functions over `Int`, `Float`
//!   and `Bool`; everything else is reported as
//!   [`CodegenError::Unsupported`].
//!
//! ## Pipeline
//!
//! ```text
//! CheckedProgram -> pass 1 (collect records) -> pass 2 (emit) -> Artifact
//! ```

pub mod bytecode;
pub mod error;
pub mod java;

pub use bytecode::ClassFileBackend;
pub use error::CodegenError;
pub use java::JavaBackend;

use tern_typeck::CheckedProgram;

/// Options shared by the backends.
#[derive(Clone, Debug, Default)]
pub struct EmitOptions {
    /// Java package for the generated class. `None` uses the default package.
    pub package: Option<String>,
}

/// A generated output file.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// File name derived from the module name, e.g. `Main.java`.
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    /// The contents as text, for source backends.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}

/// A code generator for one output format.
pub trait Backend {
    /// Short name used on the command line (`java`, `class`).
    fn name(&self) -> &'static str;

    /// Generate the artifact for a checked program.
    fn emit(&self, program: &CheckedProgram) -> Result<Artifact, CodegenError>;
}

/// Emit Java source for a checked program.
pub fn emit_java(program: &CheckedProgram, options: &EmitOptions) -> Result<String, CodegenError> {
    let artifact = JavaBackend::new(options.clone()).emit(program)?;
    Ok(artifact.text())
}

/// Assemble a class file for a checked program.
pub fn emit_class(program: &CheckedProgram, options: &EmitOptions) -> Result<Vec<u8>, CodegenError> {
    let artifact = ClassFileBackend::new(options.clone()).emit(program)?;
    Ok(artifact.contents)
}
