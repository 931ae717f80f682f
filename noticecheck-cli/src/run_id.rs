use chrono::{DateTime, Local, TimeZone};

/// Run identifier format shared with the rest of the notice pipeline
pub const RUN_ID_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Run id for the current local time, e.g. `20251017T143005`
pub fn default_run_id() -> String {
    run_id_at(&Local::now())
}

pub fn run_id_at<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(RUN_ID_FORMAT).to_string()
}

/// Run ids end up in file names; keep them to a safe alphabet
pub fn is_valid_run_id(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && run_id != "."
        && run_id != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_run_id_format() {
        let time = Utc.with_ymd_and_hms(2025, 10, 17, 14, 30, 5).unwrap();
        assert_eq!(run_id_at(&time), "20251017T143005");
    }

    #[test]
    fn test_run_id_validation() {
        assert!(is_valid_run_id("20251017T143005"));
        assert!(is_valid_run_id("nightly-2"));
        assert!(!is_valid_run_id(""));
        assert!(!is_valid_run_id("../escape"));
        assert!(!is_valid_run_id("a b"));
    }
}
