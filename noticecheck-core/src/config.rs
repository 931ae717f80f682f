use crate::error::{Result, ValidatorError};
use crate::types::{RuleName, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_signature_marker() -> String {
    "MARK_END_SIGNATURE_BLOCK".to_string()
}

fn default_contact_height_name() -> String {
    "CONTACT_HEIGHT".to_string()
}

fn default_expected_pages() -> usize {
    2
}

fn default_envelope_window_max_inches() -> f64 {
    1.125 // standard #10 window envelope
}

fn default_client_id_digits() -> usize {
    10
}

fn default_expected_size_px() -> u32 {
    330 // 29-module code at 10px/module with a 4-module quiet zone
}

fn default_size_tolerance_px() -> u32 {
    120
}

fn default_jobs() -> usize {
    4
}

fn default_document_timeout_secs() -> u64 {
    30
}

/// Complete configuration for one validation run.
///
/// Every section has serde defaults so an empty YAML document (or no file at
/// all) yields a usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Severity per rule; rules left out default to `warn`
    #[serde(default)]
    pub rules: RulePolicy,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub client_id: ClientIdConfig,
    #[serde(default)]
    pub codes: CodeConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Immutable rule name -> severity mapping handed to the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct RulePolicy {
    severities: BTreeMap<RuleName, Severity>,
}

impl RulePolicy {
    /// Every rule at the same severity
    pub fn uniform(severity: Severity) -> Self {
        Self {
            severities: RuleName::ALL.iter().map(|r| (*r, severity)).collect(),
        }
    }

    /// Build a policy from raw name/severity pairs, rejecting unknown values.
    /// Rules that are not mentioned keep the `warn` default.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut policy = Self::default();
        for (name, severity) in pairs {
            let rule: RuleName = name.parse()?;
            let severity: Severity = severity.parse().map_err(|_| {
                ValidatorError::Configuration(format!(
                    "invalid severity '{severity}' for rule '{name}' (expected disabled, warn or error)"
                ))
            })?;
            policy.severities.insert(rule, severity);
        }
        Ok(policy)
    }

    pub fn severity(&self, rule: RuleName) -> Severity {
        self.severities
            .get(&rule)
            .copied()
            .unwrap_or(Severity::Warn)
    }

    pub fn is_enabled(&self, rule: RuleName) -> bool {
        self.severity(rule).is_enabled()
    }

    pub fn with(mut self, rule: RuleName, severity: Severity) -> Self {
        self.severities.insert(rule, severity);
        self
    }

    /// All rules in catalog order with their effective severity
    pub fn iter(&self) -> impl Iterator<Item = (RuleName, Severity)> + '_ {
        RuleName::ALL.iter().map(move |r| (*r, self.severity(*r)))
    }
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self::uniform(Severity::Warn)
    }
}

impl TryFrom<BTreeMap<String, String>> for RulePolicy {
    type Error = ValidatorError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self> {
        Self::from_pairs(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl From<RulePolicy> for BTreeMap<String, String> {
    fn from(policy: RulePolicy) -> Self {
        policy
            .iter()
            .map(|(rule, severity)| (rule.to_string(), severity.to_string()))
            .collect()
    }
}

/// Names of the invisible tokens the notice template renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Positional marker rendered right after the signature block
    #[serde(default = "default_signature_marker")]
    pub signature_end: String,
    /// Measurement (in points) of the contact block, read from page 1
    #[serde(default = "default_contact_height_name")]
    pub contact_height: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            signature_end: default_signature_marker(),
            contact_height: default_contact_height_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_expected_pages")]
    pub expected_pages: usize,
    /// Maximum contact block height that still shows through the envelope window
    #[serde(default = "default_envelope_window_max_inches")]
    pub envelope_window_max_inches: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            expected_pages: default_expected_pages(),
            envelope_window_max_inches: default_envelope_window_max_inches(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientIdConfig {
    /// Length of the digit token that identifies a client
    #[serde(default = "default_client_id_digits")]
    pub digits: usize,
}

impl Default for ClientIdConfig {
    fn default() -> Self {
        Self {
            digits: default_client_id_digits(),
        }
    }
}

/// Machine-readable code detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Whether the renderer embeds codes at all. `false` disables
    /// `qr_matches_link` regardless of its configured severity.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Expected edge length of a code image in pixels
    #[serde(default = "default_expected_size_px")]
    pub expected_size_px: u32,
    /// Accepted deviation from `expected_size_px`, also the max width/height skew
    #[serde(default = "default_size_tolerance_px")]
    pub size_tolerance_px: u32,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expected_size_px: default_expected_size_px(),
            size_tolerance_px: default_size_tolerance_px(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of concurrent document workers
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Per-document limit for extraction and evaluation
    #[serde(default = "default_document_timeout_secs")]
    pub document_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            document_timeout_secs: default_document_timeout_secs(),
        }
    }
}

impl ValidationConfig {
    /// Load config from a YAML file and validate it
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes as null; treat it as all defaults
        let config: ValidationConfig = if content.trim().is_empty() {
            ValidationConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| ValidatorError::Configuration(e.to_string()))?
        };
        config.validated()
    }

    /// Load from an optional path, using defaults when none is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Self::default().validated(),
        }
    }

    /// Check value ranges and fold `codes.enabled` into the rule policy
    pub fn validated(mut self) -> Result<Self> {
        if self.execution.jobs == 0 {
            return Err(ValidatorError::Configuration(
                "execution.jobs must be at least 1".to_string(),
            ));
        }
        if self.execution.document_timeout_secs == 0 {
            return Err(ValidatorError::Configuration(
                "execution.document_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.client_id.digits == 0 {
            return Err(ValidatorError::Configuration(
                "client_id.digits must be at least 1".to_string(),
            ));
        }
        if !(self.layout.envelope_window_max_inches > 0.0) {
            return Err(ValidatorError::Configuration(
                "layout.envelope_window_max_inches must be positive".to_string(),
            ));
        }
        if self.markers.signature_end.trim().is_empty() {
            return Err(ValidatorError::Configuration(
                "markers.signature_end must not be empty".to_string(),
            ));
        }
        if !self.codes.enabled {
            self.rules = self.rules.with(RuleName::QrMatchesLink, Severity::Disabled);
        }
        Ok(self)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ValidatorError::Configuration(e.to_string()))
    }
}
