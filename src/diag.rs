use crate::atoms::FourCC;
use std::fmt;

/// Severity of a recorded diagnostic. Debug-level events go to the `log`
/// facade only and are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One reader/writer event: where it happened, which atom kind was being
/// handled (if known), and what went wrong.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub offset: u64,
    pub scope: Option<FourCC>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{:<10} | [{:<4}] {}",
            self.offset,
            scope_label(self.scope),
            self.message
        )
    }
}

/// Diagnostics sink threaded through the reader and writer.
///
/// Malformed input never fails a read outright; warnings and errors land here
/// and the caller decides how strict to be. An empty sink after a read means
/// the input parsed cleanly.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn debug(&self, offset: u64, scope: Option<FourCC>, message: impl fmt::Display) {
        log::debug!("@{:<10} | [{:<4}] {}", offset, scope_label(scope), message);
    }

    pub fn warning(&mut self, offset: u64, scope: Option<FourCC>, message: impl Into<String>) {
        let d = Diagnostic {
            severity: Severity::Warning,
            offset,
            scope,
            message: message.into(),
        };
        log::warn!("{d}");
        self.entries.push(d);
    }

    pub fn error(&mut self, offset: u64, scope: Option<FourCC>, message: impl Into<String>) {
        let d = Diagnostic {
            severity: Severity::Error,
            offset,
            scope,
            message: message.into(),
        };
        log::error!("{d}");
        self.entries.push(d);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn scope_label(scope: Option<FourCC>) -> String {
    match scope {
        Some(kind) => kind.as_str_lossy(),
        None => "?".to_string(),
    }
}
