use super::engine::{DocumentEvidence, DocumentRule, Outcome};
use crate::config::LayoutConfig;
use crate::types::{Measurements, RuleName};

/// `exactly_two_pages`: the notice must have the expected page count
pub struct PageCountRule {
    expected: usize,
}

impl PageCountRule {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            expected: config.expected_pages,
        }
    }
}

impl DocumentRule for PageCountRule {
    fn rule_name(&self) -> RuleName {
        RuleName::ExactlyTwoPages
    }

    fn check(&self, evidence: &DocumentEvidence, _: &mut Measurements) -> Outcome {
        let pages = evidence.facts.page_count;
        if pages == self.expected {
            Outcome::Pass
        } else {
            Outcome::Fail(format!("has {pages} pages (expected {})", self.expected))
        }
    }
}

/// `signature_overflow`: the signature block must end on page 1
pub struct SignatureOverflowRule;

impl DocumentRule for SignatureOverflowRule {
    fn rule_name(&self) -> RuleName {
        RuleName::SignatureOverflow
    }

    fn check(&self, evidence: &DocumentEvidence, _: &mut Measurements) -> Outcome {
        match evidence.facts.signature_page {
            None => Outcome::NotApplicable,
            Some(1) => Outcome::Pass,
            Some(page) => Outcome::Fail(format!(
                "Signature block ends on page {page} (expected page 1)"
            )),
        }
    }
}

/// `envelope_window`: the contact block must fit the envelope window
pub struct EnvelopeWindowRule {
    max_inches: f64,
}

impl EnvelopeWindowRule {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            max_inches: config.envelope_window_max_inches,
        }
    }
}

impl DocumentRule for EnvelopeWindowRule {
    fn rule_name(&self) -> RuleName {
        RuleName::EnvelopeWindow
    }

    fn check(&self, evidence: &DocumentEvidence, _: &mut Measurements) -> Outcome {
        match evidence.facts.contact_height_inches {
            None => Outcome::NotApplicable,
            Some(height) if height <= self.max_inches => Outcome::Pass,
            Some(height) => Outcome::Fail(format!(
                "Contact information height {height:.2}in exceeds envelope window (max {}in)",
                self.max_inches
            )),
        }
    }
}
