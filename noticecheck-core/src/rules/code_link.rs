use super::engine::{DocumentEvidence, DocumentRule, Outcome};
use crate::types::{Measurements, RuleName};

/// `qr_matches_link`: a decoded code payload must equal a link annotation target
pub struct CodeLinkRule;

impl DocumentRule for CodeLinkRule {
    fn rule_name(&self) -> RuleName {
        RuleName::QrMatchesLink
    }

    fn check(&self, evidence: &DocumentEvidence, _: &mut Measurements) -> Outcome {
        // Evidence is only gathered while the rule is enabled
        let Some(codes) = evidence.codes else {
            return Outcome::NotApplicable;
        };
        match codes.failure_message() {
            None => Outcome::Pass,
            Some(message) => Outcome::Fail(message),
        }
    }
}
