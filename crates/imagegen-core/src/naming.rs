//! Artifact naming
//!
//! Base names look like `generated_image_20240131_235959_1a2b3c4d`: the
//! timestamp keeps names time-sortable and the random suffix breaks ties
//! within a second. The gallery reads the timestamp back as a fallback.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

pub const BASE_NAME_PREFIX: &str = "generated_image";

/// chrono format of the timestamp embedded in base names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SUFFIX_LEN: usize = 8;

static FILENAME_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{8}_\d{6}").expect("valid timestamp regex"));

/// Eight random lowercase hex characters
pub fn random_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(SUFFIX_LEN);
    id
}

pub fn base_name(at: NaiveDateTime, suffix: &str) -> String {
    format!("{}_{}_{}", BASE_NAME_PREFIX, at.format(TIMESTAMP_FORMAT), suffix)
}

/// Fresh base name for an artifact created at `at`
pub fn new_base_name(at: NaiveDateTime) -> String {
    base_name(at, &random_suffix())
}

/// Timestamp embedded in a file name, if there is one and it is a real date
pub fn parse_filename_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let found = FILENAME_TIMESTAMP.find(file_name)?;
    NaiveDateTime::parse_from_str(found.as_str(), TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_base_name_layout() {
        let name = base_name(at(7, 5, 3), "deadbeef");
        assert_eq!(name, "generated_image_20240309_070503_deadbeef");
    }

    #[test]
    fn test_random_suffix_is_hex() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(random_suffix(), random_suffix());
    }

    #[test]
    fn test_names_sort_chronologically() {
        let earlier = base_name(at(9, 59, 59), "ffffffff");
        let later = base_name(at(10, 0, 0), "00000000");
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_round_trip() {
        let name = format!("{}.webp", new_base_name(at(23, 1, 2)));
        assert_eq!(parse_filename_timestamp(&name), Some(at(23, 1, 2)));
    }

    #[test]
    fn test_parse_missing_or_malformed() {
        assert_eq!(parse_filename_timestamp("holiday.png"), None);
        // matches the pattern but month 13 does not exist
        assert_eq!(parse_filename_timestamp("generated_image_20241399_250000_abcd.png"), None);
    }
}
