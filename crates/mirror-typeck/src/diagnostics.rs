//! Ariadne-based diagnostic rendering for type errors.
//!
//! Two renderings are offered: a labeled ariadne report with an error code,
//! and a compact `file:line: message` form followed by the offending source
//! line and a caret, the shape command-line drivers print.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use mirror_common::LineIndex;

use crate::error::TypeError;

// ── Error Codes ────────────────────────────────────────────────────────

fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::UnresolvedType { .. } => "E0101",
        TypeError::NoApplicableMethod { .. } => "E0102",
        TypeError::AmbiguousMethod { .. } => "E0103",
        TypeError::IncompatibleAssignment { .. } => "E0104",
        TypeError::NonTerminating { .. } => "E0105",
        TypeError::Uninferred { .. } => "E0106",
        TypeError::InconsistentResolution { .. } => "E0107",
        TypeError::NoSuperclass { .. } => "E0108",
        TypeError::UntypedParameter { .. } => "E0109",
    }
}

/// Label text under the primary span, and an optional help note.
fn annotations(err: &TypeError) -> (String, Option<String>) {
    match err {
        TypeError::UnresolvedType { name, .. } => (
            "not found in this scope".to_string(),
            Some(format!("import `{}` or qualify it with its package", name)),
        ),
        TypeError::NoApplicableMethod { args, .. } if args.is_empty() => {
            ("no method or field of this name".to_string(), None)
        }
        TypeError::NoApplicableMethod { args, .. } => (
            format!("called with ({})", args.join(", ")),
            Some("check the argument types against the declared overloads".to_string()),
        ),
        TypeError::AmbiguousMethod { candidates, .. } => (
            "more than one overload applies".to_string(),
            Some(format!("candidates are {}", candidates.join(", "))),
        ),
        TypeError::IncompatibleAssignment { expected, found, .. } => (
            format!("expected {}, found {}", expected, found),
            None,
        ),
        TypeError::NonTerminating { .. } => (
            "inference started here".to_string(),
            Some("a chain of inferred return types may depend on itself".to_string()),
        ),
        TypeError::Uninferred { .. } => (
            "type unknown".to_string(),
            Some("add a type annotation".to_string()),
        ),
        TypeError::InconsistentResolution { .. } => ("resolved twice".to_string(), None),
        TypeError::NoSuperclass { .. } => ("no superclass here".to_string(), None),
        TypeError::UntypedParameter { .. } => (
            "parameter without a type".to_string(),
            Some("parameter types are never inferred".to_string()),
        ),
    }
}

fn text_range_to_range(range: rowan::TextRange) -> Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    start..end
}

/// Render a type error into a formatted diagnostic string using ariadne.
///
/// The output is colorless for consistent test snapshots. Errors without a
/// position point at the start of the file.
pub fn render_diagnostic(error: &TypeError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let span = clamp(error.span().map(text_range_to_range).unwrap_or(0..1));
    let (label, help) = annotations(error);

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_config(config)
        .with_label(Label::new(span).with_message(label).with_color(Color::Red));
    if let Some(help) = help {
        builder.set_help(help);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    let cache = Source::from(source);
    report.write(cache, &mut buf).expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

/// `file:line: message`, then the source line and a caret under the error's
/// column. Errors without a position are just `file: message`.
pub fn render_plain(error: &TypeError, source: &str, filename: &str, index: &LineIndex) -> String {
    let Some(span) = error.span() else {
        return format!("{}: {}", filename, error);
    };
    let position = index.line_col(span.start().into());
    let mut out = format!("{}:{}: {}", filename, position.line, error);
    if let Some(line) = index.line_text(source, position.line) {
        let indent: String = line
            .chars()
            .take(position.col.saturating_sub(1) as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push('\n');
        out.push_str(line);
        out.push('\n');
        out.push_str(&indent);
        out.push('^');
    }
    out
}
