//! Ariadne-based diagnostic rendering for type errors.
//!
//! Renders a [`TypeError`] against the source text it came from: an error
//! code, a terse message, labelled spans (two of them when the error has a
//! second location, such as the other branch of an `if`), and a help line
//! when a plausible fix exists. With [`DiagnosticOptions::json`] set the same
//! information is emitted as a single-line JSON object instead.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use tern_common::{LineIndex, Span};

use crate::error::{ConstraintOrigin, TypeError};
use crate::ty::Type;

/// Rendering options.
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without ANSI colours, for logs and snapshots.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// A stable code for each error variant.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::OperandMismatch { .. } => "E0002",
        TypeError::ArityMismatch { .. } => "E0003",
        TypeError::UndefinedIdentifier { .. } => "E0004",
        TypeError::UndefinedType { .. } => "E0005",
        TypeError::Redefinition { .. } => "E0006",
        TypeError::DuplicateMember { .. } => "E0007",
        TypeError::NotAFunction { .. } => "E0008",
        TypeError::NoSuchMember { .. } => "E0009",
        TypeError::ConstraintNotSatisfied { .. } => "E0010",
        TypeError::InvalidConstraint { .. } => "E0011",
        TypeError::MissingMember { .. } => "E0012",
        TypeError::SignatureMismatch { .. } => "E0013",
        TypeError::Immutable { .. } => "E0014",
        TypeError::InvalidAssignTarget { .. } => "E0015",
        TypeError::TypePatternOnNonInterface { .. } => "E0016",
        TypeError::PatternInDisjunction { .. } => "E0017",
        TypeError::PatternFieldCount { .. } => "E0018",
        TypeError::InvalidPatternType { .. } => "E0019",
        TypeError::CannotInferTypeArgument { .. } => "E0020",
        TypeError::InvalidExtension { .. } => "E0021",
        TypeError::NotAnInterface { .. } => "E0022",
        TypeError::EmptyArrayLiteral { .. } => "E0023",
        TypeError::UninstantiatedGeneric { .. } => "E0024",
        TypeError::ThisOutsideMethod { .. } => "E0025",
        TypeError::CapturedMutable { .. } => "E0026",
        TypeError::GenericMethod { .. } => "E0027",
    }
}

// ── Labels ─────────────────────────────────────────────────────────────

fn to_range(span: Span) -> Range<usize> {
    span.to_range()
}

/// The labelled spans of an error, primary first.
fn labels(err: &TypeError) -> Vec<(Range<usize>, String)> {
    match err {
        TypeError::Mismatch {
            expected,
            found,
            origin,
        } => match origin {
            ConstraintOrigin::IfBranches {
                then_span,
                else_span,
                ..
            } => vec![
                (to_range(*else_span), format!("found {}", found)),
                (to_range(*then_span), format!("expected {} from this branch", expected)),
            ],
            ConstraintOrigin::Annotation { annotation_span } => vec![(
                to_range(*annotation_span),
                format!("expected {} from annotation, found {}", expected, found),
            )],
            ConstraintOrigin::Return { body_span, fn_span } => vec![
                (to_range(*body_span), format!("found {}", found)),
                (to_range(*fn_span), format!("declared to return {}", expected)),
            ],
            ConstraintOrigin::Assignment { lhs_span, rhs_span } => vec![
                (to_range(*rhs_span), format!("found {}", found)),
                (to_range(*lhs_span), format!("has type {}", expected)),
            ],
            ConstraintOrigin::FnArg { param_idx, .. } => vec![(
                to_range(origin.span()),
                format!("argument {} expected {}, found {}", param_idx + 1, expected, found),
            )],
            _ => vec![(
                to_range(origin.span()),
                format!("expected {}, found {}", expected, found),
            )],
        },
        TypeError::ArityMismatch {
            expected, origin, ..
        } => vec![(to_range(origin.span()), format!("expected {}", expected))],
        TypeError::MissingMember { member, .. } => {
            vec![(to_range(err.span()), format!("`{}` is not provided", member))]
        }
        TypeError::ConstraintNotSatisfied { ty, constraint, .. } => vec![(
            to_range(err.span()),
            format!("{} does not implement {}", ty, constraint),
        )],
        TypeError::PatternInDisjunction { .. } => {
            vec![(to_range(err.span()), "pattern used under `||`".to_string())]
        }
        _ => vec![(to_range(err.span()), err.to_string())],
    }
}

// ── Fix Suggestions ────────────────────────────────────────────────────

fn fix_suggestion(err: &TypeError) -> Option<String> {
    match err {
        TypeError::Mismatch {
            expected, found, ..
        } => conversion_hint(expected, found),
        TypeError::MissingMember {
            interface, member, ..
        } => Some(format!(
            "add a method `{}` with the type `{}` declares",
            member, interface
        )),
        TypeError::Immutable { name, .. } => {
            Some(format!("declare `{}` with `var` to allow assignment", name))
        }
        TypeError::PatternInDisjunction { .. } => {
            Some("split the condition into separate `if` expressions".to_string())
        }
        TypeError::CannotInferTypeArgument { param, .. } => {
            Some(format!("pass `{}` explicitly: `f<...>(...)`", param))
        }
        TypeError::UninstantiatedGeneric { name, .. } => {
            Some(format!("call `{}` or wrap it in a lambda", name))
        }
        TypeError::CapturedMutable { name, .. } => Some(format!(
            "copy `{}` into a `val` before the lambda",
            name
        )),
        TypeError::TypePatternOnNonInterface { .. } => {
            Some("type patterns test values of interface or sum type".to_string())
        }
        _ => None,
    }
}

fn conversion_hint(expected: &Type, found: &Type) -> Option<String> {
    match (expected.name().as_str(), found.name().as_str()) {
        ("Float", "Int") => Some("convert with `as Float`".to_string()),
        ("Int", "Float") => Some("convert with `as Int`".to_string()),
        ("Bool", _) => Some("expected a boolean expression".to_string()),
        _ => None,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render a type error to a string.
///
/// In JSON mode the result is one line with `code`, `severity`, `message`,
/// `file`, `spans` and `fix` fields. Each span carries its byte range and the
/// 1-based line and column it starts at.
pub fn render_diagnostic(
    err: &TypeError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let source_len = source.len();
    // Clamp to the source; ariadne needs at least one character.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let code = error_code(err);
    let labels: Vec<(Range<usize>, String)> = labels(err)
        .into_iter()
        .map(|(range, message)| (clamp(range), message))
        .collect();
    let fix = fix_suggestion(err);

    if options.json {
        let lines = LineIndex::new(source);
        let spans: Vec<serde_json::Value> = labels
            .iter()
            .map(|(range, label)| {
                let (line, column) = lines.position(range.start as u32);
                serde_json::json!({
                    "start": range.start,
                    "end": range.end,
                    "line": line,
                    "column": column,
                    "label": label,
                })
            })
            .collect();
        return serde_json::json!({
            "code": code,
            "severity": "error",
            "message": err.to_string(),
            "file": filename,
            "spans": spans,
            "fix": fix,
        })
        .to_string();
    }

    let primary = labels
        .first()
        .map(|(range, _)| range.clone())
        .unwrap_or(0..source_len.min(1));
    let mut builder = Report::build(ReportKind::Error, primary)
        .with_code(code)
        .with_message(err.to_string())
        .with_config(Config::default().with_color(options.color));
    for (i, (range, message)) in labels.into_iter().enumerate() {
        let color = if i == 0 { Color::Red } else { Color::Blue };
        builder = builder.with_label(Label::new(range).with_message(message).with_color(color));
    }
    if let Some(fix) = fix {
        builder = builder.with_help(fix);
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}", code, err);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
