use crate::config::ValidationConfig;
use crate::error::{Result, ValidatorError};
use crate::extraction::{DocumentExtractor, LopdfExtractor};
use crate::identity::IdentityMap;
use crate::report::{render_console_summary, RuleTally, ValidationOutcome, ValidationReport};
use crate::rules::RuleEngine;
use crate::storage::{FileReportStore, NoOpReportStore, ReportStore};
use crate::types::{RuleName, ValidationResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-document results and merged rule tallies for one batch
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    /// Sorted by filename
    pub results: Vec<ValidationResult>,
    pub tally: RuleTally,
}

/// Everything a completed run hands back to its caller
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub report: ValidationReport,
    pub outcome: ValidationOutcome,
    pub report_path: Option<PathBuf>,
}

pub struct ValidationProcessor {
    extractor: Arc<dyn DocumentExtractor>,
    engine: Arc<RuleEngine>,
    identity: Option<Arc<IdentityMap>>,
    store: Box<dyn ReportStore>,
}

impl ValidationProcessor {
    /// Create ValidationProcessor with full dependency injection.
    ///
    /// Fails before any document is touched if `client_id_presence` is
    /// enabled without an identity artifact.
    pub fn new_with_dependencies(
        extractor: Arc<dyn DocumentExtractor>,
        engine: RuleEngine,
        identity: Option<IdentityMap>,
        store: Box<dyn ReportStore>,
    ) -> Result<Self> {
        if engine.config().rules.is_enabled(RuleName::ClientIdPresence) && identity.is_none() {
            return Err(ValidatorError::Configuration(format!(
                "{} is enabled but no identity artifact was supplied",
                RuleName::ClientIdPresence
            )));
        }
        Ok(Self {
            extractor,
            engine: Arc::new(engine),
            identity: identity.map(Arc::new),
            store,
        })
    }

    /// Convenience constructor for CLI usage: lopdf extraction, QR decoding,
    /// reports written to `output_dir`
    pub fn new_cli(
        config: ValidationConfig,
        identity: Option<IdentityMap>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new_with_dependencies(
            Arc::new(LopdfExtractor::new()),
            RuleEngine::new(config)?,
            identity,
            Box::new(FileReportStore::new(output_dir)?),
        )
    }

    /// In-memory variant: nothing is persisted
    pub fn new_in_memory(config: ValidationConfig, identity: Option<IdentityMap>) -> Result<Self> {
        Self::new_with_dependencies(
            Arc::new(LopdfExtractor::new()),
            RuleEngine::new(config)?,
            identity,
            Box::new(NoOpReportStore::new()),
        )
    }

    pub fn config(&self) -> &ValidationConfig {
        self.engine.config()
    }

    /// Validate every document with a bounded pool of workers.
    ///
    /// Workers pull the next index from a shared cursor and keep their own
    /// tallies; the partial tallies are merged once all workers are done.
    pub async fn validate_batch(&self, inputs: &[PathBuf]) -> Result<BatchResults> {
        let inputs: Arc<Vec<PathBuf>> = Arc::new(inputs.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let timeout = Duration::from_secs(self.config().execution.document_timeout_secs);
        let workers = self.config().execution.jobs.min(inputs.len()).max(1);

        info!(
            "🚀 Validating {} document(s) with {} worker(s) using {}",
            inputs.len(),
            workers,
            self.extractor.name()
        );

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let inputs = Arc::clone(&inputs);
            let cursor = Arc::clone(&cursor);
            let extractor = Arc::clone(&self.extractor);
            let engine = Arc::clone(&self.engine);
            let identity = self.identity.clone();

            handles.push(tokio::spawn(async move {
                let mut results = Vec::new();
                let mut tally = RuleTally::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = inputs.get(index) else {
                        break;
                    };
                    let result = validate_document(
                        path.clone(),
                        Arc::clone(&extractor),
                        Arc::clone(&engine),
                        identity.clone(),
                        timeout,
                    )
                    .await;
                    tally.record(&result);
                    results.push((index, result));
                }
                (results, tally)
            }));
        }

        let mut indexed = Vec::with_capacity(inputs.len());
        let mut tally = RuleTally::new();
        for handle in handles {
            let (results, partial) = handle
                .await
                .map_err(|e| ValidatorError::Report(format!("validation worker failed: {e}")))?;
            indexed.extend(results);
            tally.merge(partial);
        }
        // Same file name from different directories: keep input order
        indexed.sort_by(|(ia, a), (ib, b)| a.filename.cmp(&b.filename).then(ia.cmp(ib)));

        Ok(BatchResults {
            results: indexed.into_iter().map(|(_, result)| result).collect(),
            tally,
        })
    }

    /// Validate, aggregate, print the summary, persist the report, and
    /// decide whether the pipeline may continue.
    pub async fn run(
        &self,
        run_id: &str,
        language: Option<&str>,
        inputs: &[PathBuf],
    ) -> Result<ValidationRun> {
        let start = Instant::now();
        let batch = self.validate_batch(inputs).await?;

        let report = ValidationReport::build(
            run_id,
            language.map(str::to_string),
            batch.results,
            &batch.tally,
            &self.config().rules,
        );
        let outcome = ValidationOutcome::from_report(&report);

        println!("{}", render_console_summary(&report));

        let report_path = self.store.store(&report)?;
        if let Some(path) = &report_path {
            info!("💾 Validation report written to {}", path.display());
        }
        info!(
            "✅ Validation finished in {}ms ({} passed, {} with warnings)",
            start.elapsed().as_millis(),
            report.passed_count,
            report.failed_count
        );

        Ok(ValidationRun {
            report,
            outcome,
            report_path,
        })
    }
}

/// Keep only inputs whose file name starts with `<language>_`
pub fn filter_by_language(inputs: &[PathBuf], language: &str) -> Vec<PathBuf> {
    let prefix = format!("{language}_");
    inputs
        .iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract and evaluate one document on the blocking pool, bounded by `timeout`.
/// Every failure mode becomes a failed result; nothing escapes.
async fn validate_document(
    path: PathBuf,
    extractor: Arc<dyn DocumentExtractor>,
    engine: Arc<RuleEngine>,
    identity: Option<Arc<IdentityMap>>,
    timeout: Duration,
) -> ValidationResult {
    let filename = document_name(&path);

    let task = tokio::task::spawn_blocking({
        let filename = filename.clone();
        let engine = Arc::clone(&engine);
        move || -> Result<ValidationResult> {
            let document = extractor.extract(&path)?;
            let record = identity.as_deref().and_then(|map| map.get(&filename));
            Ok(engine.evaluate(&filename, &document, record))
        }
    });

    let reason = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(result))) => {
            debug!("📄 {}: {} warning(s)", filename, result.warnings.len());
            return result;
        }
        Ok(Ok(Err(ValidatorError::Extraction { reason, .. }))) => reason,
        Ok(Ok(Err(e))) => e.to_string(),
        Ok(Err(e)) => format!("extraction task failed: {e}"),
        Err(_) => format!("timed out after {}s", timeout.as_secs()),
    };

    warn!("⚠️  {}: {}", filename, reason);
    engine.failed_extraction(&filename, &reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulePolicy;
    use crate::extraction::ExtractedDocument;
    use crate::types::{PageText, Severity};

    /// Page count encoded in the filename: `<n>p_<anything>.pdf`
    struct FakeExtractor;

    impl DocumentExtractor for FakeExtractor {
        fn extract_bytes(&self, _: &Path, _: &[u8]) -> Result<ExtractedDocument> {
            unreachable!("extract is overridden")
        }

        fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
            let name = document_name(path);
            if name.starts_with("corrupt") {
                return Err(ValidatorError::extraction(path, "invalid file header"));
            }
            if name.starts_with("slow") {
                std::thread::sleep(Duration::from_millis(1500));
            }
            let mut pages: usize = name
                .split('p')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(2);
            // Documents under `long/` have an extra page
            if path.parent().is_some_and(|dir| dir.ends_with("long")) {
                pages += 1;
            }
            Ok(ExtractedDocument {
                page_text: PageText::new(vec!["text".to_string(); pages]),
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "FakeExtractor"
        }
    }

    fn processor(rules: RulePolicy, jobs: usize) -> ValidationProcessor {
        let mut config = ValidationConfig {
            rules,
            ..Default::default()
        };
        config.execution.jobs = jobs;
        config.execution.document_timeout_secs = 1;
        ValidationProcessor::new_with_dependencies(
            Arc::new(FakeExtractor),
            RuleEngine::new(config).unwrap(),
            None,
            Box::new(NoOpReportStore::new()),
        )
        .unwrap()
    }

    fn pages_only(severity: Severity) -> RulePolicy {
        RulePolicy::uniform(Severity::Disabled).with(RuleName::ExactlyTwoPages, severity)
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_results_sorted_regardless_of_worker_count() {
        let inputs = paths(&["2p_e.pdf", "3p_d.pdf", "2p_a.pdf", "1p_c.pdf", "2p_b.pdf"]);
        let serial = processor(pages_only(Severity::Warn), 1)
            .validate_batch(&inputs)
            .await
            .unwrap();
        let parallel = processor(pages_only(Severity::Warn), 4)
            .validate_batch(&inputs)
            .await
            .unwrap();

        let names: Vec<&str> = parallel.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["1p_c.pdf", "2p_a.pdf", "2p_b.pdf", "2p_e.pdf", "3p_d.pdf"]);
        assert_eq!(serial.results, parallel.results);
        assert_eq!(serial.tally, parallel.tally);
        assert_eq!(parallel.tally.counts(RuleName::ExactlyTwoPages), (3, 2));
    }

    #[tokio::test]
    async fn test_same_file_name_keeps_input_order() {
        let forward = paths(&["long/2p_x.pdf", "short/2p_x.pdf", "2p_a.pdf"]);
        let backward = paths(&["short/2p_x.pdf", "long/2p_x.pdf", "2p_a.pdf"]);

        for _ in 0..5 {
            let batch = processor(pages_only(Severity::Warn), 3)
                .validate_batch(&forward)
                .await
                .unwrap();
            let passed: Vec<(&str, bool)> = batch
                .results
                .iter()
                .map(|r| (r.filename.as_str(), r.passed))
                .collect();
            assert_eq!(passed, vec![("2p_a.pdf", true), ("2p_x.pdf", false), ("2p_x.pdf", true)]);

            let batch = processor(pages_only(Severity::Warn), 3)
                .validate_batch(&backward)
                .await
                .unwrap();
            assert!(batch.results[1].passed);
            assert!(!batch.results[2].passed);
        }
    }

    #[tokio::test]
    async fn test_corrupt_document_does_not_abort_batch() {
        let inputs = paths(&["2p_ok.pdf", "corrupt.pdf"]);
        let batch = processor(pages_only(Severity::Error), 2)
            .validate_batch(&inputs)
            .await
            .unwrap();

        assert_eq!(batch.results.len(), 2);
        let corrupt = &batch.results[1];
        assert_eq!(corrupt.filename, "corrupt.pdf");
        assert!(!corrupt.passed);
        assert_eq!(corrupt.warnings, vec!["extraction: invalid file header"]);
        assert_eq!(batch.tally.counts(RuleName::ExactlyTwoPages), (1, 1));
    }

    #[tokio::test]
    async fn test_slow_document_times_out() {
        let inputs = paths(&["slow.pdf", "2p_ok.pdf"]);
        let batch = processor(pages_only(Severity::Warn), 2)
            .validate_batch(&inputs)
            .await
            .unwrap();

        let slow = batch.results.iter().find(|r| r.filename == "slow.pdf").unwrap();
        assert_eq!(slow.warnings, vec!["extraction: timed out after 1s"]);
        assert!(batch.results.iter().any(|r| r.filename == "2p_ok.pdf" && r.passed));
    }

    #[tokio::test]
    async fn test_error_rule_halts_run() {
        let inputs = paths(&["2p_a.pdf", "3p_b.pdf"]);
        let run = processor(pages_only(Severity::Error), 2)
            .run("run1", None, &inputs)
            .await
            .unwrap();

        assert!(!run.outcome.should_continue);
        assert_eq!(run.report_path, None);
        assert!(run
            .outcome
            .message()
            .unwrap()
            .contains("exactly_two_pages: 1 PDF failed validation"));
    }

    #[test]
    fn test_client_id_rule_requires_identity() {
        let config = ValidationConfig::default();
        let result = ValidationProcessor::new_with_dependencies(
            Arc::new(FakeExtractor),
            RuleEngine::new(config).unwrap(),
            None,
            Box::new(NoOpReportStore::new()),
        );
        assert!(matches!(result, Err(ValidatorError::Configuration(_))));
    }

    #[test]
    fn test_in_memory_processor_rejects_invalid_config() {
        let mut config = ValidationConfig {
            rules: RulePolicy::uniform(Severity::Disabled),
            ..Default::default()
        };
        config.execution.document_timeout_secs = 0;
        assert!(matches!(
            ValidationProcessor::new_in_memory(config, None),
            Err(ValidatorError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_codes_disabled_applies_without_explicit_validation() {
        let mut config = ValidationConfig {
            rules: pages_only(Severity::Warn).with(RuleName::QrMatchesLink, Severity::Error),
            ..Default::default()
        };
        config.codes.enabled = false;
        let processor = ValidationProcessor::new_with_dependencies(
            Arc::new(FakeExtractor),
            RuleEngine::new(config).unwrap(),
            None,
            Box::new(NoOpReportStore::new()),
        )
        .unwrap();
        assert_eq!(
            processor.config().rules.severity(RuleName::QrMatchesLink),
            Severity::Disabled
        );

        let run = processor.run("run1", None, &paths(&["2p_a.pdf"])).await.unwrap();
        assert!(run.outcome.should_continue);
        assert!(run.report.results[0].passed);
    }

    #[test]
    fn test_filter_by_language_uses_prefix() {
        let inputs = paths(&[
            "out/en_notice_00001_1.pdf",
            "out/fr_notice_00002_2.pdf",
            "out/english.pdf",
        ]);
        assert_eq!(
            filter_by_language(&inputs, "en"),
            paths(&["out/en_notice_00001_1.pdf"])
        );
    }
}
