//! Run-level aggregation
//!
//! Reduces per-document results into rule tallies, the persisted report,
//! the console summary, and the continue/halt decision.

use crate::config::RulePolicy;
use crate::error::{Result, RuleFailure, ValidatorError};
use crate::types::{RuleName, RuleResult, Severity, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Partial pass/fail sums per rule.
///
/// Each worker owns one; partial tallies are merged once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTally {
    counts: BTreeMap<RuleName, (usize, usize)>,
}

impl RuleTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &ValidationResult) {
        for (rule, passed) in &result.rule_outcomes {
            let entry = self.counts.entry(*rule).or_default();
            if *passed {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }

    pub fn merge(&mut self, other: RuleTally) {
        for (rule, (passed, failed)) in other.counts {
            let entry = self.counts.entry(rule).or_default();
            entry.0 += passed;
            entry.1 += failed;
        }
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ValidationResult>) -> Self {
        let mut tally = Self::new();
        for result in results {
            tally.record(result);
        }
        tally
    }

    /// `(passed, failed)` for one rule
    pub fn counts(&self, rule: RuleName) -> (usize, usize) {
        self.counts.get(&rule).copied().unwrap_or_default()
    }

    /// One `RuleResult` per catalog rule. Disabled rules always report zero.
    pub fn rule_results(&self, policy: &RulePolicy) -> Vec<RuleResult> {
        policy
            .iter()
            .map(|(rule_name, severity)| {
                let (passed_count, failed_count) = if severity.is_enabled() {
                    self.counts(rule_name)
                } else {
                    (0, 0)
                };
                RuleResult {
                    rule_name,
                    severity,
                    passed_count,
                    failed_count,
                }
            })
            .collect()
    }
}

/// The persisted artifact for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    pub total_pdfs: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    /// page count -> number of documents with that many pages
    pub page_count_distribution: BTreeMap<i64, usize>,
    /// warning prefix (rule name or `extraction`) -> number of warnings
    pub warning_types: BTreeMap<String, usize>,
    pub rule_results: Vec<RuleResult>,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// Assemble the report. Results are sorted by filename here so the
    /// artifact never depends on evaluation order.
    pub fn build(
        run_id: impl Into<String>,
        language: Option<String>,
        mut results: Vec<ValidationResult>,
        tally: &RuleTally,
        policy: &RulePolicy,
    ) -> Self {
        results.sort_by(|a, b| a.filename.cmp(&b.filename));

        let passed_count = results.iter().filter(|r| r.passed).count();

        let mut page_count_distribution = BTreeMap::new();
        let mut warning_types = BTreeMap::new();
        for result in &results {
            if let Some(pages) = result.page_count() {
                *page_count_distribution.entry(pages).or_insert(0) += 1;
            }
            for warning in &result.warnings {
                let kind = match warning.split_once(':') {
                    Some((prefix, _)) => prefix.to_string(),
                    None => "other".to_string(),
                };
                *warning_types.entry(kind).or_insert(0) += 1;
            }
        }

        Self {
            run_id: run_id.into(),
            language,
            total_pdfs: results.len(),
            passed_count,
            failed_count: results.len() - passed_count,
            page_count_distribution,
            warning_types,
            rule_results: tally.rule_results(policy),
            results,
        }
    }

    /// Convenience for callers that did not tally while evaluating
    pub fn from_results(
        run_id: impl Into<String>,
        language: Option<String>,
        results: Vec<ValidationResult>,
        policy: &RulePolicy,
    ) -> Self {
        let tally = RuleTally::from_results(&results);
        Self::build(run_id, language, results, &tally, policy)
    }

    pub fn rule_result(&self, rule: RuleName) -> Option<&RuleResult> {
        self.rule_results.iter().find(|r| r.rule_name == rule)
    }

    pub fn result(&self, filename: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.filename == filename)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ValidatorError::Report(format!("cannot serialize report: {e}")))
    }
}

/// `<output_dir>/<language>_validation_<run_id>.json`
pub fn report_path(output_dir: &Path, language: Option<&str>, run_id: &str) -> PathBuf {
    let name = match language {
        Some(language) => format!("{language}_validation_{run_id}.json"),
        None => format!("validation_{run_id}.json"),
    };
    output_dir.join(name)
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "PDF"
    } else {
        "PDFs"
    }
}

/// Human-readable run summary, one line per rule
pub fn render_console_summary(report: &ValidationReport) -> String {
    let mut out = String::new();
    let scope = report
        .language
        .as_deref()
        .map(|l| format!("'{l}' "))
        .unwrap_or_default();

    let _ = writeln!(out, "📊 Validated {} {}PDF(s):", report.total_pdfs, scope);
    let _ = writeln!(
        out,
        "  ✅ {} {} passed",
        report.passed_count,
        plural(report.passed_count)
    );
    if report.failed_count > 0 {
        let _ = writeln!(
            out,
            "  ⚠️  {} {} with warnings",
            report.failed_count,
            plural(report.failed_count)
        );
    }

    let _ = writeln!(out, "\nValidation rules:");
    for rule in &report.rule_results {
        let _ = writeln!(
            out,
            "  {} [{}]: {}/{} passed",
            rule.rule_name,
            rule.severity,
            rule.passed_count,
            rule.evaluated()
        );
    }

    if !report.warning_types.is_empty() {
        let _ = writeln!(out, "\nValidation warnings by rule:");
        for (kind, count) in &report.warning_types {
            let _ = writeln!(out, "  - {kind}: {count} {}", plural(*count));
        }
    }
    out
}

/// Continue/halt decision for the orchestrating caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub should_continue: bool,
    /// Every `error`-severity rule with at least one failing document
    pub failures: Vec<RuleFailure>,
}

impl ValidationOutcome {
    pub fn from_report(report: &ValidationReport) -> Self {
        let failures: Vec<RuleFailure> = report
            .rule_results
            .iter()
            .filter(|r| r.severity == Severity::Error && r.failed_count > 0)
            .map(|r| RuleFailure {
                rule_name: r.rule_name.to_string(),
                failed_count: r.failed_count,
            })
            .collect();
        Self {
            should_continue: failures.is_empty(),
            failures,
        }
    }

    /// Halt explanation, `None` when the run may continue
    pub fn message(&self) -> Option<String> {
        (!self.should_continue).then(|| crate::error::format_failures(&self.failures))
    }

    /// Convert a halt into `ValidatorError::ValidationFailure`
    pub fn ensure_continue(&self) -> Result<()> {
        if self.should_continue {
            Ok(())
        } else {
            Err(ValidatorError::ValidationFailure(self.failures.clone()))
        }
    }
}
