use crate::error::{Result, ValidatorError};
use crate::report::{report_path, ValidationReport};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for persisting the run's validation report
pub trait ReportStore: Send + Sync {
    /// Persist the report, returning where it was written (if anywhere)
    fn store(&self, report: &ValidationReport) -> Result<Option<PathBuf>>;
}

/// Writes `<language>_validation_<run_id>.json` into an output directory
pub struct FileReportStore {
    output_dir: PathBuf,
}

impl FileReportStore {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).map_err(|e| {
            ValidatorError::Report(format!("cannot create {}: {e}", output_dir.display()))
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportStore for FileReportStore {
    fn store(&self, report: &ValidationReport) -> Result<Option<PathBuf>> {
        let path = report_path(&self.output_dir, report.language.as_deref(), &report.run_id);
        let json_str = report.to_json()?;
        fs::write(&path, json_str)
            .map_err(|e| ValidatorError::Report(format!("cannot write {}: {e}", path.display())))?;
        Ok(Some(path))
    }
}

/// No-op store for callers that only want the in-memory report
pub struct NoOpReportStore;

impl Default for NoOpReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpReportStore {
    pub fn new() -> Self {
        Self
    }
}

impl ReportStore for NoOpReportStore {
    fn store(&self, _report: &ValidationReport) -> Result<Option<PathBuf>> {
        Ok(None) // Nothing persisted
    }
}
