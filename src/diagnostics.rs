//! Diagnostics sink shared by the harvesting pass and the transformer
//!
//! Reports accumulate here and never influence control flow: a file with any
//! number of diagnostics still produces a best-effort output tree.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// Where a report points back into the source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
    /// The offending word inside the node, when one can be singled out
    pub word: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        };
        write!(f, "{}:{}: {}: {}", self.location.file, self.location.line, kind, self.message)?;
        if let Some(word) = &self.word {
            write!(f, " (\"{}\")", word)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub reports: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: SourceLocation, message: impl Into<String>, word: Option<&str>) {
        self.report(DiagnosticKind::Error, location, message.into(), word);
    }

    pub fn warn(&mut self, location: SourceLocation, message: impl Into<String>, word: Option<&str>) {
        self.report(DiagnosticKind::Warning, location, message.into(), word);
    }

    fn report(&mut self, kind: DiagnosticKind, location: SourceLocation, message: String, word: Option<&str>) {
        log::debug!("{}:{}: {}", location.file, location.line, message);
        self.reports.push(Diagnostic {
            kind,
            message,
            location,
            word: word.map(str::to_string),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.kind == DiagnosticKind::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Reports whose message contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<&Diagnostic> {
        self.reports.iter().filter(|r| r.message.contains(needle)).collect()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.reports.extend(other.reports);
    }
}
