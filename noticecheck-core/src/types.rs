use crate::error::ValidatorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ===== RULE POLICY TYPES =====

/// The fixed catalog of validation rules.
///
/// Declaration order is the catalog order used in reports and console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    ExactlyTwoPages,
    SignatureOverflow,
    EnvelopeWindow,
    ClientIdPresence,
    QrMatchesLink,
}

impl RuleName {
    pub const ALL: [RuleName; 5] = [
        RuleName::ExactlyTwoPages,
        RuleName::SignatureOverflow,
        RuleName::EnvelopeWindow,
        RuleName::ClientIdPresence,
        RuleName::QrMatchesLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::ExactlyTwoPages => "exactly_two_pages",
            RuleName::SignatureOverflow => "signature_overflow",
            RuleName::EnvelopeWindow => "envelope_window",
            RuleName::ClientIdPresence => "client_id_presence",
            RuleName::QrMatchesLink => "qr_matches_link",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleName {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "exactly_two_pages" => Ok(RuleName::ExactlyTwoPages),
            "signature_overflow" => Ok(RuleName::SignatureOverflow),
            // Older configs name the rule after its 1.125in limit
            "envelope_window" | "envelope_window_1_125" => Ok(RuleName::EnvelopeWindow),
            "client_id_presence" => Ok(RuleName::ClientIdPresence),
            "qr_matches_link" => Ok(RuleName::QrMatchesLink),
            other => Err(ValidatorError::Configuration(format!(
                "unknown rule '{}' (expected one of: {})",
                other,
                RuleName::ALL.map(|r| r.as_str()).join(", ")
            ))),
        }
    }
}

/// Policy level controlling what a rule failure means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Not evaluated, not counted
    Disabled,
    /// Failures are recorded on the document but never halt the run
    Warn,
    /// Any failing document halts the run after the batch completes
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Disabled => "disabled",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Severity::Disabled)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(Severity::Disabled),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            other => Err(ValidatorError::Configuration(format!(
                "invalid severity '{other}' (expected disabled, warn or error)"
            ))),
        }
    }
}

// ===== DOCUMENT EVIDENCE TYPES =====

/// Extracted text of one document, one entry per page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pages: Vec<String>,
}

impl PageText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of a page by 1-based index
    pub fn page(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(String::as_str)
    }

    /// Pages paired with their 1-based index
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &str)> {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, text)| (i + 1, text.as_str()))
    }

    pub fn concatenated(&self) -> String {
        self.pages.join("\n")
    }
}

impl From<Vec<String>> for PageText {
    fn from(pages: Vec<String>) -> Self {
        Self::new(pages)
    }
}

/// A single entry in a document's open measurement map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasurementValue::Integer(v) => Some(*v as f64),
            MeasurementValue::Number(v) => Some(*v),
            MeasurementValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MeasurementValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MeasurementValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for MeasurementValue {
    fn from(value: i64) -> Self {
        MeasurementValue::Integer(value)
    }
}

impl From<usize> for MeasurementValue {
    fn from(value: usize) -> Self {
        MeasurementValue::Integer(value as i64)
    }
}

impl From<f64> for MeasurementValue {
    fn from(value: f64) -> Self {
        MeasurementValue::Number(value)
    }
}

impl From<String> for MeasurementValue {
    fn from(value: String) -> Self {
        MeasurementValue::Text(value)
    }
}

impl From<&str> for MeasurementValue {
    fn from(value: &str) -> Self {
        MeasurementValue::Text(value.to_string())
    }
}

/// Measurement name -> value, unique per document. Unknown names pass through.
pub type Measurements = BTreeMap<String, MeasurementValue>;

// ===== RESULT TYPES =====

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub filename: String,
    pub warnings: Vec<String>,
    pub passed: bool,
    pub measurements: Measurements,
    /// Pass (`true`) or fail (`false`) for each rule evaluated on this
    /// document. Rules that were disabled or not applicable are absent.
    #[serde(skip)]
    pub rule_outcomes: BTreeMap<RuleName, bool>,
}

impl ValidationResult {
    pub fn page_count(&self) -> Option<i64> {
        self.measurements.get("page_count").and_then(|v| v.as_i64())
    }
}

/// Run-level tally for a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_name: RuleName,
    pub severity: Severity,
    pub passed_count: usize,
    pub failed_count: usize,
}

impl RuleResult {
    pub fn evaluated(&self) -> usize {
        self.passed_count + self.failed_count
    }
}
