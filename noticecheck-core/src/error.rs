use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the validation engine.
///
/// Only `Configuration` and `ValidationFailure` are meant to interrupt a
/// caller's control flow. `Extraction` is produced per document and is
/// converted into a failed result by the processor.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Invalid validation configuration: {0}")]
    Configuration(String),

    #[error("Could not extract {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("Identity artifact error: {0}")]
    Identity(String),

    #[error("Failed to persist validation report: {0}")]
    Report(String),

    #[error("{}", format_failures(.0))]
    ValidationFailure(Vec<RuleFailure>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

/// An `error`-severity rule that failed on at least one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule_name: String,
    pub failed_count: usize,
}

impl std::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = if self.failed_count == 1 { "PDF" } else { "PDFs" };
        write!(
            f,
            "{}: {} {} failed validation",
            self.rule_name, self.failed_count, label
        )
    }
}

/// Human-readable halt message naming every failing rule.
pub fn format_failures(failures: &[RuleFailure]) -> String {
    let lines: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!("PDF validation failed with errors:\n  {}", lines.join("\n  "))
}

impl ValidatorError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ValidatorError::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
