//! The Tern compiler CLI.
//!
//! Provides the `ternc` command:
//!
//! - `ternc build [INPUT]` - Check a syntax tree and generate code for it
//!
//! `INPUT` is the JSON tree written by the Tern parser, `main.tern.json` by
//! default. Options:
//! - `--backend` - `java` (source, the default) or `class` (bytecode)
//! - `--out-dir` - Directory for the generated file (default: current)
//! - `--source` - The Tern source the tree came from, for diagnostics
//! - `--package` - Java package of the generated class
//! - `--json` - Output diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized output
//! - `-v` - Log progress (`-vv` for more)

mod logging;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use tern_codegen::{Backend, ClassFileBackend, CodegenError, EmitOptions, JavaBackend};
use tern_typeck::diagnostics::{error_code, render_diagnostic, DiagnosticOptions};

#[derive(Parser)]
#[command(name = "ternc", version, about = "The Tern compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Java source, one `.java` file per module
    Java,
    /// A JVM class file (primitive globals and functions only)
    Class,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check a Tern syntax tree and generate code for the JVM
    Build {
        /// The syntax tree as JSON
        #[arg(default_value = "main.tern.json")]
        input: PathBuf,

        /// Code generator to run
        #[arg(long, value_enum, default_value = "java")]
        backend: BackendKind,

        /// Directory for the generated file
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// The Tern source the tree was parsed from, used to render diagnostics
        #[arg(long)]
        source: Option<PathBuf>,

        /// Java package for the generated class
        #[arg(long)]
        package: Option<String>,

        /// Output diagnostics as JSON (one object per line) instead of human-readable format
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,

        /// Log progress to stderr; repeat for more detail
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

/// Everything `build` needs from the command line.
struct BuildOptions {
    input: PathBuf,
    backend: BackendKind,
    out_dir: PathBuf,
    source: Option<PathBuf>,
    emit: EmitOptions,
    diagnostics: DiagnosticOptions,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            backend,
            out_dir,
            source,
            package,
            json,
            no_color,
            verbose,
        } => {
            // JSON diagnostics keep stderr machine-readable unless -v asks
            // for more.
            match logging::level_for(verbose) {
                Some(level) => logging::init_with_level(level),
                None if json => logging::init(),
                None => logging::init_from_env(),
            }
            let options = BuildOptions {
                input,
                backend,
                out_dir: out_dir.unwrap_or_else(|| PathBuf::from(".")),
                source,
                emit: EmitOptions { package },
                diagnostics: DiagnosticOptions {
                    color: !no_color && !json,
                    json,
                },
            };
            if let Err(e) = build(&options) {
                if json {
                    let msg = serde_json::json!({
                        "code": "C0001",
                        "severity": "error",
                        "message": e,
                        "file": options.input.display().to_string(),
                        "spans": [],
                        "fix": null
                    });
                    eprintln!("{}", msg);
                } else {
                    eprintln!("error: {}", e);
                }
                process::exit(1);
            }
        }
    }
}

/// Read the tree, check it, run the backend and write the artifact.
fn build(options: &BuildOptions) -> Result<(), String> {
    let input = &options.input;
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()));
    }
    let text = std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;
    let module = tern_syntax::from_json(&text)
        .map_err(|e| format!("'{}' is not a valid syntax tree: {}", input.display(), e))?;
    let source = match &options.source {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?,
        ),
        None => None,
    };
    let file_name = options
        .source
        .as_deref()
        .unwrap_or(input.as_path())
        .display()
        .to_string();

    info!("checking module {}", module.name.as_str());
    let program = match tern_typeck::check(&module) {
        Ok(program) => program,
        Err(err) => {
            report_type_error(&err, source.as_deref(), &file_name, &options.diagnostics);
            return Err("Compilation failed due to errors above.".to_string());
        }
    };

    let artifact = match options.backend {
        BackendKind::Java => JavaBackend::new(options.emit.clone()).emit(&program),
        BackendKind::Class => ClassFileBackend::new(options.emit.clone()).emit(&program),
    };
    let artifact = match artifact {
        Ok(artifact) => artifact,
        Err(err) => match source.as_deref() {
            Some(source) if err.span().is_some() && !options.diagnostics.json => {
                report_codegen_error(&err, source, &options.diagnostics);
                return Err("Code generation failed.".to_string());
            }
            _ => return Err(err.to_string()),
        },
    };

    write_artifact(&options.out_dir, &artifact.file_name, &artifact.contents)
}

fn write_artifact(out_dir: &Path, file_name: &str, contents: &[u8]) -> Result<(), String> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;
    let path = out_dir.join(file_name);
    std::fs::write(&path, contents).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    eprintln!("  Compiled: {}", path.display());
    Ok(())
}

/// Without the source text there is nothing to point into, so the error is
/// reported on one line.
fn report_type_error(
    err: &tern_typeck::error::TypeError,
    source: Option<&str>,
    file_name: &str,
    options: &DiagnosticOptions,
) {
    match source {
        Some(source) => eprintln!("{}", render_diagnostic(err, source, file_name, options)),
        None if options.json => eprintln!("{}", render_diagnostic(err, "", file_name, options)),
        None => eprintln!("error[{}]: {}", error_code(err), err),
    }
}

fn report_codegen_error(err: &CodegenError, source: &str, options: &DiagnosticOptions) {
    eprint!("{}", render_codegen_error(err, source, options));
}

/// Render a code generation error against the source, falling back to a
/// one-line message when it has no span or ariadne cannot write it.
fn render_codegen_error(err: &CodegenError, source: &str, options: &DiagnosticOptions) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let plain = format!("error: {}\n", err);
    let Some(span) = err.span() else {
        return plain;
    };
    // Clamp to the source; ariadne needs at least one character.
    let start = (span.start as usize).min(source.len().saturating_sub(1));
    let end = (span.end as usize).max(start + 1).min(source.len());
    let mut buf = Vec::new();
    let written = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_message(err.to_string())
        .with_config(Config::default().with_color(options.color))
        .with_label(Label::new(start..end).with_message("not supported here"))
        .finish()
        .write(Source::from(source), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => plain,
    }
}
