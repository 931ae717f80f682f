// Noticecheck Core Library
//
// Post-compilation validation of per-client notice PDFs: extracts hidden
// markers, embedded codes and link targets, applies the configured rule
// policy, and decides whether the pipeline may continue.

pub mod codes;
pub mod config;
pub mod error;
pub mod extraction;
pub mod identity;
pub mod markers;
pub mod measurements;
pub mod processor;
pub mod report;
pub mod rules;
pub mod storage;
pub mod types;

// Re-export main types and functions for easy use
pub use codes::{CodeDecoder, CodeEvidence, CodeStatus, QrDecoder};
pub use config::{RulePolicy, ValidationConfig};
pub use error::{Result, RuleFailure, ValidatorError};
pub use extraction::{DocumentExtractor, ExtractedDocument, LopdfExtractor};
pub use identity::{IdentityMap, IdentityRecord};
pub use processor::{filter_by_language, BatchResults, ValidationProcessor, ValidationRun};
pub use report::{render_console_summary, report_path, RuleTally, ValidationOutcome, ValidationReport};
pub use rules::RuleEngine;
pub use storage::{FileReportStore, NoOpReportStore, ReportStore};
pub use types::*;
