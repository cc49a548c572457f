//! Diagnostics
//!
//! Problems found in Elm sources: a stable code, a severity, a message
//! and the range it points at, with optional notes and fixes. The CLI
//! prints them as JSON lines or as an underlined source excerpt.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub mod error_codes;

/// A 1-indexed line and column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A byte range of one file, with its line/column ends precomputed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub uri: String,
    /// Byte offsets, end exclusive
    pub start: usize,
    pub end: usize,
    pub from: Position,
    pub to: Position,
}

impl Span {
    pub fn new(uri: impl Into<String>, start: usize, end: usize, from: Position, to: Position) -> Self {
        Self {
            uri: uri.into(),
            start,
            end,
            from,
            to,
        }
    }

    /// Covers both operands of an infix application
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            uri: self.uri.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

/// Errors fail a check, warnings only under `--strict`, hints never
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        })
    }
}

/// Extra context, such as a record's inferred shape or a missing field
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Note {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A fix an editor can apply, e.g. inserting an inferred annotation
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub edits: Vec<Edit>,
}

impl Suggestion {
    /// Insert `text` at the start of `at`
    pub fn insert(title: impl Into<String>, at: Span, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            edits: vec![Edit {
                span: at,
                replacement: text.into(),
            }],
        }
    }
}

/// Replace `span` with `replacement`; an empty span inserts
#[derive(Debug, Clone, Serialize)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// See [`error_codes`]
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    pub fn error(code: &str) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error)
    }

    pub fn warning(code: &str) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning)
    }

    pub fn hint(code: &str) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Hint)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn uri(&self) -> &str {
        &self.span.uri
    }

    /// One JSON object, no trailing newline
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// `uri:line:col: severity CODE: message`, then the first line of the
    /// range with carets under it, then notes and fixes
    pub fn to_human_readable(&self, source: &str) -> String {
        let Span { uri, from, to, .. } = &self.span;
        let mut out = format!(
            "{}:{}:{}: {} {}: {}\n",
            uri, from.line, from.column, self.severity, self.code, self.message
        );
        let pad = " ".repeat(from.line.to_string().len());

        if let Some(text) = source.lines().nth(from.line.wrapping_sub(1)) {
            let indent = from.column.saturating_sub(1);
            let carets = if to.line == from.line {
                to.column.saturating_sub(from.column)
            } else {
                text.len().saturating_sub(indent)
            };
            out.push_str(&format!("{} |\n{} | {}\n", pad, from.line, text));
            out.push_str(&format!("{} | {}{}\n", pad, " ".repeat(indent), "^".repeat(carets.max(1))));
        }

        let notes = self.notes.iter().map(|n| ("note", n.message.as_str()));
        let fixes = self.suggestions.iter().map(|s| ("help", s.title.as_str()));
        for (label, text) in notes.chain(fixes) {
            out.push_str(&format!("{} = {}: {}\n", pad, label, text));
        }
        out
    }
}

pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn new(code: &str, severity: Severity) -> Self {
        let origin = Position::new(1, 1);
        Self {
            diagnostic: Diagnostic {
                code: code.to_string(),
                severity,
                message: String::new(),
                span: Span::new("", 0, 0, origin, origin),
                notes: Vec::new(),
                suggestions: Vec::new(),
            },
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.diagnostic.message = message.into();
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.diagnostic.span = span;
        self
    }

    pub fn note(mut self, note: Note) -> Self {
        self.diagnostic.notes.push(note);
        self
    }

    pub fn suggestion(mut self, suggestion: Suggestion) -> Self {
        self.diagnostic.suggestions.push(suggestion);
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Diagnostics of one file, gathered across its top-level declarations
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Drop later copies of a report with the same code, message and
    /// range. A declaration is reached through both its annotation and
    /// its definition and may report twice.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.diagnostics.retain(|d| {
            seen.insert((
                d.code.clone(),
                d.message.clone(),
                d.span.uri.clone(),
                d.span.start,
                d.span.end,
            ))
        });
    }

    pub fn take(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests;
