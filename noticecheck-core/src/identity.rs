//! Identity artifact loading
//!
//! The identity artifact is the only source of truth for which client a
//! compiled document belongs to. Two shapes are accepted:
//!
//! - the preprocessing artifact: `{ "run_id", "language", "clients": [...] }`
//!   where each client carries `sequence`, `client_id` and optionally its own
//!   `language` or an explicit `filename`
//! - a plain object mapping filename to client id
//!
//! Filenames are never parsed to recover identifiers.

use crate::error::{Result, ValidatorError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Expected identity of one compiled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub filename: String,
    pub client_id: String,
    pub language: Option<String>,
    pub sequence: Option<String>,
}

/// Filename → expected identity, for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityMap {
    records: BTreeMap<String, IdentityRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactFile {
    Preprocessed(PreprocessedArtifact),
    Plain(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize)]
struct PreprocessedArtifact {
    #[serde(default)]
    language: Option<String>,
    clients: Vec<ClientEntry>,
}

#[derive(Debug, Deserialize)]
struct ClientEntry {
    sequence: Sequence,
    client_id: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sequence {
    Text(String),
    Number(u64),
}

impl Sequence {
    fn render(&self) -> String {
        match self {
            Sequence::Text(text) => text.clone(),
            Sequence::Number(n) => format!("{n:05}"),
        }
    }
}

/// `<language>_notice_<sequence>_<client_id>.pdf`
pub fn notice_filename(language: &str, sequence: &str, client_id: &str) -> String {
    format!("{language}_notice_{sequence}_{client_id}.pdf")
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::Identity(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let artifact: ArtifactFile = serde_json::from_str(content)
            .map_err(|e| ValidatorError::Identity(format!("unrecognised artifact format: {e}")))?;

        let mut map = Self::new();
        match artifact {
            ArtifactFile::Plain(entries) => {
                for (filename, client_id) in entries {
                    map.insert(IdentityRecord {
                        filename,
                        client_id,
                        language: None,
                        sequence: None,
                    })?;
                }
            }
            ArtifactFile::Preprocessed(artifact) => {
                for client in artifact.clients {
                    let sequence = client.sequence.render();
                    let language = client.language.or_else(|| artifact.language.clone());
                    let filename = match (client.filename, &language) {
                        (Some(filename), _) => filename,
                        (None, Some(language)) => notice_filename(language, &sequence, &client.client_id),
                        (None, None) => {
                            return Err(ValidatorError::Identity(format!(
                                "client {} has neither a filename nor a language",
                                client.client_id
                            )))
                        }
                    };
                    map.insert(IdentityRecord {
                        filename,
                        client_id: client.client_id,
                        language,
                        sequence: Some(sequence),
                    })?;
                }
            }
        }
        Ok(map)
    }

    /// Build a map directly from `(filename, client_id)` pairs
    pub fn from_pairs<I, F, C>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, C)>,
        F: Into<String>,
        C: Into<String>,
    {
        let mut map = Self::new();
        for (filename, client_id) in pairs {
            map.insert(IdentityRecord {
                filename: filename.into(),
                client_id: client_id.into(),
                language: None,
                sequence: None,
            })?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, record: IdentityRecord) -> Result<()> {
        if self.records.contains_key(&record.filename) {
            return Err(ValidatorError::Identity(format!(
                "duplicate filename in identity artifact: {}",
                record.filename
            )));
        }
        self.records.insert(record.filename.clone(), record);
        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<&IdentityRecord> {
        self.records.get(filename)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
