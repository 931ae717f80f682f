use super::engine::{DocumentEvidence, DocumentRule, Outcome};
use crate::config::ClientIdConfig;
use crate::error::{Result, ValidatorError};
use crate::types::{Measurements, PageText, RuleName};
use regex::Regex;

/// `client_id_presence`: the expected identifier from the identity artifact
/// must appear in the text as a standalone fixed-length digit token.
pub struct ClientIdPresenceRule {
    token: Regex,
}

impl ClientIdPresenceRule {
    pub fn new(config: &ClientIdConfig) -> Result<Self> {
        let token = Regex::new(&format!(r"\b[0-9]{{{}}}\b", config.digits))
            .map_err(|e| ValidatorError::Configuration(format!("client_id.digits: {e}")))?;
        Ok(Self { token })
    }

    /// Every identifier-shaped token as `(page, token)`, in reading order
    pub fn tokens<'a>(&'a self, pages: &'a PageText) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        pages.numbered().flat_map(move |(page, text)| {
            self.token
                .find_iter(text)
                .map(move |m| (page, m.as_str()))
        })
    }
}

impl DocumentRule for ClientIdPresenceRule {
    fn rule_name(&self) -> RuleName {
        RuleName::ClientIdPresence
    }

    fn check(&self, evidence: &DocumentEvidence, measurements: &mut Measurements) -> Outcome {
        let Some(identity) = evidence.identity else {
            return Outcome::Fail(format!(
                "No identity record for {} in identity artifact",
                evidence.filename
            ));
        };
        let expected = identity.client_id.as_str();
        let pages = &evidence.document.page_text;

        let found: Vec<(usize, &str)> = self.tokens(pages).collect();
        let hit = found
            .iter()
            .find(|(_, token)| *token == expected)
            .or_else(|| found.first());

        if let Some((page, token)) = hit {
            measurements.insert("client_id_found_value".to_string(), (*token).into());
            measurements.insert("client_id_found_page".to_string(), (*page).into());
        }

        match hit {
            Some((_, token)) if *token == expected => Outcome::Pass,
            Some((page, token)) => Outcome::Fail(format!(
                "Found client ID {token} on page {page} but expected {expected}"
            )),
            None => Outcome::Fail(format!("Client ID {expected} not found in document text")),
        }
    }
}
