//! Invisible marker extraction
//!
//! The notice template renders two kinds of zero-footprint tokens into the
//! text stream of each page:
//!
//! - positional markers: a bare literal such as `MARK_END_SIGNATURE_BLOCK`
//! - measurements: `MEASURE_<NAME>:<value>` where value is in points (1/72 in)
//!
//! Nothing here decides whether a missing marker matters; callers do.

use crate::types::PageText;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Raw measurement values of one page, keyed by the `<NAME>` part of the token
pub type PageMeasurements = BTreeMap<String, f64>;

fn measurement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"MEASURE_([A-Z0-9_]+):\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)")
            .expect("measurement pattern is valid")
    })
}

/// Scan one page's text for measurement tokens.
///
/// If a name occurs more than once on the page the later occurrence wins.
pub fn extract_measurements(page_text: &str) -> PageMeasurements {
    let mut measurements = PageMeasurements::new();
    for caps in measurement_pattern().captures_iter(page_text) {
        // Overflowing values parse as infinity, which JSON cannot carry
        match caps[2].parse::<f64>() {
            Ok(value) if value.is_finite() => {
                measurements.insert(caps[1].to_string(), value);
            }
            _ => {}
        }
    }
    measurements
}

/// 1-based index of the first page containing `marker`, if any
pub fn find_marker_page(pages: &PageText, marker: &str) -> Option<usize> {
    pages
        .numbered()
        .find(|(_, text)| text.contains(marker))
        .map(|(number, _)| number)
}

/// Measurements from every page, the earliest page winning per name
pub fn extract_document_measurements(pages: &PageText) -> PageMeasurements {
    let mut merged = PageMeasurements::new();
    for (_, text) in pages.numbered() {
        for (name, value) in extract_measurements(text) {
            merged.entry(name).or_insert(value);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_measurements_from_markers() {
        let text = "Dear parent,\nMEASURE_CONTACT_HEIGHT:214.62692913385834\nMore text";
        let measurements = extract_measurements(text);
        assert_eq!(measurements.get("CONTACT_HEIGHT"), Some(&214.62692913385834));
    }

    #[test]
    fn test_extract_measurements_no_markers() {
        assert!(extract_measurements("Plain notice text without markers").is_empty());
    }

    #[test]
    fn test_extract_measurements_inline_and_multiple() {
        let text = "Some text MEASURE_CONTACT_HEIGHT:123.45 more\nMEASURE_ANOTHER_DIMENSION:678.90";
        let measurements = extract_measurements(text);
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements["CONTACT_HEIGHT"], 123.45);
        assert_eq!(measurements["ANOTHER_DIMENSION"], 678.90);
    }

    #[test]
    fn test_duplicate_measurement_last_occurrence_wins() {
        let text = "MEASURE_CONTACT_HEIGHT:10\nMEASURE_CONTACT_HEIGHT:20.5";
        assert_eq!(extract_measurements(text)["CONTACT_HEIGHT"], 20.5);
    }

    #[test]
    fn test_malformed_measurement_is_ignored() {
        let text = "MEASURE_CONTACT_HEIGHT:abc MEASURE_lower:1.0";
        assert!(extract_measurements(text).is_empty());
    }

    #[test]
    fn test_overflowing_measurement_is_ignored() {
        let text = "MEASURE_CONTACT_HEIGHT:1e999 MEASURE_FOOTER:-1e400 MEASURE_OK:3";
        let measurements = extract_measurements(text);
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements["OK"], 3.0);
    }

    #[test]
    fn test_find_marker_page_is_one_based() {
        let pages = PageText::new(vec![
            "page one".to_string(),
            "page two MARK_END_SIGNATURE_BLOCK".to_string(),
            "page three MARK_END_SIGNATURE_BLOCK".to_string(),
        ]);
        assert_eq!(find_marker_page(&pages, "MARK_END_SIGNATURE_BLOCK"), Some(2));
        assert_eq!(find_marker_page(&pages, "MARK_MISSING"), None);
    }

    #[test]
    fn test_document_measurements_prefer_earliest_page() {
        let pages = PageText::new(vec![
            "MEASURE_CONTACT_HEIGHT:50".to_string(),
            "MEASURE_CONTACT_HEIGHT:90 MEASURE_FOOTER:12".to_string(),
        ]);
        let merged = extract_document_measurements(&pages);
        assert_eq!(merged["CONTACT_HEIGHT"], 50.0);
        assert_eq!(merged["FOOTER"], 12.0);
    }
}
