//! Image/link cross-validation
//!
//! Finds square-ish embedded images that look like machine-readable codes,
//! decodes them, and checks that at least one decoded payload is exactly one
//! of the document's link annotation targets.

use crate::config::CodeConfig;
use crate::extraction::ExtractedDocument;
use crate::types::Measurements;
use image::GrayImage;

/// Decodes the text payload of a machine-readable code in a greyscale image.
pub trait CodeDecoder: Send + Sync {
    /// Every payload found in the image, in detection order
    fn decode(&self, image: &GrayImage) -> Vec<String>;

    fn name(&self) -> &str;
}

/// QR decoder backed by `rqrr`
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl CodeDecoder for QrDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            image.width() as usize,
            image.height() as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );
        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| grid.decode().ok())
            .map(|(_, content)| content)
            .collect()
    }

    fn name(&self) -> &str {
        "QrDecoder"
    }
}

/// Why a document's codes and links do or don't correspond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeStatus {
    Matched,
    /// No image inside the size band
    NoCandidate,
    /// Candidates exist but none decoded
    Undecodable,
    /// Payload decoded, document has no link annotations
    NoLinks,
    /// Payload decoded, no link equals it
    Mismatch,
}

/// Evidence gathered for `qr_matches_link` on one document.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeEvidence {
    pub qr_candidates_found: usize,
    pub qr_codes_found: usize,
    /// First decoded payload, empty if none
    pub qr_code_payload: String,
    pub link_urls_found: usize,
    /// First link URL equal to a decoded payload, empty if none
    pub link_url: String,
    pub status: CodeStatus,
}

impl CodeEvidence {
    pub fn gather(document: &ExtractedDocument, config: &CodeConfig, decoder: &dyn CodeDecoder) -> Self {
        let candidates: Vec<_> = document
            .images
            .iter()
            .filter(|image| image.is_code_candidate(config.expected_size_px, config.size_tolerance_px))
            .collect();

        let payloads: Vec<String> = candidates
            .iter()
            .filter_map(|image| image.to_luma())
            .flat_map(|luma| decoder.decode(&luma))
            .collect();

        let links = &document.link_urls;
        let link_url = links
            .iter()
            .find(|url| payloads.iter().any(|payload| payload == *url))
            .cloned()
            .unwrap_or_default();

        let status = if candidates.is_empty() {
            CodeStatus::NoCandidate
        } else if payloads.is_empty() {
            CodeStatus::Undecodable
        } else if !link_url.is_empty() {
            CodeStatus::Matched
        } else if links.is_empty() {
            CodeStatus::NoLinks
        } else {
            CodeStatus::Mismatch
        };

        Self {
            qr_candidates_found: candidates.len(),
            qr_codes_found: payloads.len(),
            qr_code_payload: payloads.into_iter().next().unwrap_or_default(),
            link_urls_found: links.len(),
            link_url,
            status,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CodeStatus::Matched
    }

    /// Failure description without the rule prefix; `None` when matched
    pub fn failure_message(&self) -> Option<String> {
        match self.status {
            CodeStatus::Matched => None,
            CodeStatus::NoCandidate => Some("No QR code image found in document".to_string()),
            CodeStatus::Undecodable => Some(format!(
                "Found {} QR code candidate image(s) but none could be decoded",
                self.qr_candidates_found
            )),
            CodeStatus::NoLinks => Some(format!(
                "QR code decodes to '{}' but no link URLs found in document",
                self.qr_code_payload
            )),
            CodeStatus::Mismatch => Some(format!(
                "QR code payload '{}' does not match any link URL ({} found)",
                self.qr_code_payload, self.link_urls_found
            )),
        }
    }

    pub fn record(&self, measurements: &mut Measurements) {
        measurements.insert("qr_candidates_found".to_string(), self.qr_candidates_found.into());
        measurements.insert("qr_codes_found".to_string(), self.qr_codes_found.into());
        measurements.insert("qr_code_payload".to_string(), self.qr_code_payload.clone().into());
        measurements.insert("link_urls_found".to_string(), self.link_urls_found.into());
        measurements.insert("link_url".to_string(), self.link_url.clone().into());
    }
}
