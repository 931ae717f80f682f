//! Measurement interpretation
//!
//! Turns raw marker evidence into the per-document facts the layout rules
//! consume. Absent markers produce absent measurements; nothing is defaulted.

use crate::config::MarkerConfig;
use crate::markers::{extract_document_measurements, extract_measurements, find_marker_page};
use crate::types::{Measurements, PageText};

pub const POINTS_PER_INCH: f64 = 72.0;

pub fn points_to_inches(points: f64) -> f64 {
    points / POINTS_PER_INCH
}

pub fn inches_to_points(inches: f64) -> f64 {
    inches * POINTS_PER_INCH
}

/// Layout facts derived from one document's text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutFacts {
    pub page_count: usize,
    /// Page on which the end-of-signature marker appears
    pub signature_page: Option<usize>,
    /// Contact block height from page 1, in inches
    pub contact_height_inches: Option<f64>,
    /// Every raw `MEASURE_*` token, for pass-through into the report
    pub raw: Vec<(String, f64)>,
}

impl LayoutFacts {
    pub fn interpret(pages: &PageText, markers: &MarkerConfig) -> Self {
        let contact_height_inches = pages
            .page(1)
            .map(extract_measurements)
            .and_then(|m| m.get(&markers.contact_height).copied())
            .map(points_to_inches);

        Self {
            page_count: pages.page_count(),
            signature_page: find_marker_page(pages, &markers.signature_end),
            contact_height_inches,
            raw: extract_document_measurements(pages).into_iter().collect(),
        }
    }

    /// Write the facts into a document's measurement map.
    ///
    /// Raw tokens are stored as `measure_<name>` in lowercase.
    pub fn record(&self, measurements: &mut Measurements) {
        measurements.insert("page_count".to_string(), self.page_count.into());
        if let Some(page) = self.signature_page {
            measurements.insert("signature_page".to_string(), page.into());
        }
        if let Some(height) = self.contact_height_inches {
            measurements.insert("contact_height_inches".to_string(), height.into());
        }
        for (name, value) in &self.raw {
            measurements.insert(format!("measure_{}", name.to_lowercase()), (*value).into());
        }
    }
}
