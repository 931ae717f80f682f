use super::client_id::ClientIdPresenceRule;
use super::code_link::CodeLinkRule;
use super::layout::{EnvelopeWindowRule, PageCountRule, SignatureOverflowRule};
use crate::codes::{CodeDecoder, CodeEvidence, QrDecoder};
use crate::config::ValidationConfig;
use crate::error::Result;
use crate::extraction::ExtractedDocument;
use crate::identity::IdentityRecord;
use crate::measurements::LayoutFacts;
use crate::types::{Measurements, RuleName, Severity, ValidationResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Result of one rule on one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    /// Failure description, without the rule-name prefix
    Fail(String),
    /// The evidence the rule needs is absent; counted neither way
    NotApplicable,
}

/// Everything a rule may look at for one document.
pub struct DocumentEvidence<'a> {
    pub filename: &'a str,
    pub document: &'a ExtractedDocument,
    pub facts: &'a LayoutFacts,
    pub codes: Option<&'a CodeEvidence>,
    pub identity: Option<&'a IdentityRecord>,
}

pub struct RuleEngine {
    config: ValidationConfig,
    decoder: Arc<dyn CodeDecoder>,
    rules: Vec<(Box<dyn DocumentRule>, Severity)>,
}

impl RuleEngine {
    /// Engine with the default QR decoder
    pub fn new(config: ValidationConfig) -> Result<Self> {
        Self::with_decoder(config, Arc::new(QrDecoder))
    }

    /// Engine with a custom decoder. The config goes through the same
    /// checks as a loaded file, so `codes.enabled: false` always disables
    /// `qr_matches_link`.
    pub fn with_decoder(config: ValidationConfig, decoder: Arc<dyn CodeDecoder>) -> Result<Self> {
        let config = config.validated()?;
        let mut rules = Vec::new();
        for (name, severity) in config.rules.iter() {
            if !severity.is_enabled() {
                debug!("⏭️  Skipping disabled rule: {name}");
                continue;
            }
            rules.push((Self::build_rule(name, &config)?, severity));
        }
        Ok(Self {
            config,
            decoder,
            rules,
        })
    }

    fn build_rule(name: RuleName, config: &ValidationConfig) -> Result<Box<dyn DocumentRule>> {
        Ok(match name {
            RuleName::ExactlyTwoPages => Box::new(PageCountRule::new(&config.layout)),
            RuleName::SignatureOverflow => Box::new(SignatureOverflowRule),
            RuleName::EnvelopeWindow => Box::new(EnvelopeWindowRule::new(&config.layout)),
            RuleName::ClientIdPresence => Box::new(ClientIdPresenceRule::new(&config.client_id)?),
            RuleName::QrMatchesLink => Box::new(CodeLinkRule),
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Rules that will be evaluated, in catalog order
    pub fn enabled_rules(&self) -> impl Iterator<Item = (RuleName, Severity)> + '_ {
        self.rules.iter().map(|(rule, severity)| (rule.rule_name(), *severity))
    }

    /// Evaluate every enabled rule against one document.
    ///
    /// No rule short-circuits another; the warning list is exhaustive.
    pub fn evaluate(
        &self,
        filename: &str,
        document: &ExtractedDocument,
        identity: Option<&IdentityRecord>,
    ) -> ValidationResult {
        let mut measurements = Measurements::new();

        let facts = LayoutFacts::interpret(&document.page_text, &self.config.markers);
        facts.record(&mut measurements);

        let codes = self
            .config
            .rules
            .is_enabled(RuleName::QrMatchesLink)
            .then(|| CodeEvidence::gather(document, &self.config.codes, self.decoder.as_ref()));
        if let Some(codes) = &codes {
            codes.record(&mut measurements);
        }

        let evidence = DocumentEvidence {
            filename,
            document,
            facts: &facts,
            codes: codes.as_ref(),
            identity,
        };

        let mut warnings = Vec::new();
        let mut rule_outcomes = BTreeMap::new();
        for (rule, _) in &self.rules {
            match rule.check(&evidence, &mut measurements) {
                Outcome::Pass => {
                    rule_outcomes.insert(rule.rule_name(), true);
                }
                Outcome::Fail(message) => {
                    warnings.push(format!("{}: {}", rule.rule_name(), message));
                    rule_outcomes.insert(rule.rule_name(), false);
                }
                Outcome::NotApplicable => {}
            }
        }

        ValidationResult {
            filename: filename.to_string(),
            passed: warnings.is_empty(),
            warnings,
            measurements,
            rule_outcomes,
        }
    }

    /// Result for a document that could not be read: one synthetic warning,
    /// and a failure for every enabled rule.
    pub fn failed_extraction(&self, filename: &str, reason: &str) -> ValidationResult {
        ValidationResult {
            filename: filename.to_string(),
            warnings: vec![format!("extraction: {reason}")],
            passed: false,
            measurements: Measurements::new(),
            rule_outcomes: self
                .rules
                .iter()
                .map(|(rule, _)| (rule.rule_name(), false))
                .collect(),
        }
    }
}

/// One named check over a document's evidence.
///
/// Rules may add their own measurements but must not depend on anything
/// outside the evidence and their construction-time configuration.
pub trait DocumentRule: Send + Sync {
    fn rule_name(&self) -> RuleName;
    fn check(&self, evidence: &DocumentEvidence, measurements: &mut Measurements) -> Outcome;
}
