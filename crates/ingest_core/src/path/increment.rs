//! Deterministic slug increment.
//!
//! # Invariants
//! - `increment_segment` is total: every input yields a new, longer-or-equal
//!   candidate that has never been produced earlier in the same sequence.
//! - The same input always yields the same output.

use crate::path::resolver::{final_segment, replace_final_segment};
use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between a slug and its numeric suffix.
pub const SUFFIX_SEPARATOR: char = '-';

static NUMERIC_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+)-(?P<number>[0-9]+)$").expect("valid suffix regex"));

/// `report` -> `report-1`, `report-1` -> `report-2`, `report-9` -> `report-10`.
///
/// Suffixes too large to bump get a fresh `-1` appended instead.
pub fn increment_segment(segment: &str) -> String {
    if let Some(captures) = NUMERIC_SUFFIX_RE.captures(segment) {
        let bumped = captures["number"]
            .parse::<u64>()
            .ok()
            .and_then(|number| number.checked_add(1));
        if let Some(next) = bumped {
            return format!("{}{SUFFIX_SEPARATOR}{next}", &captures["base"]);
        }
    }
    format!("{segment}{SUFFIX_SEPARATOR}1")
}

/// Increments the final segment of `path`.
pub fn increment_path(path: &str) -> String {
    replace_final_segment(path, &increment_segment(final_segment(path)))
}

#[cfg(test)]
mod tests {
    use super::{increment_path, increment_segment};
    use std::collections::HashSet;

    #[test]
    fn appends_then_bumps_numeric_suffix() {
        assert_eq!(increment_segment("report"), "report-1");
        assert_eq!(increment_segment("report-1"), "report-2");
        assert_eq!(increment_segment("report-9"), "report-10");
        assert_eq!(increment_segment("2024"), "2024-1");
        assert_eq!(increment_segment("a-b"), "a-b-1");
    }

    #[test]
    fn overflowing_suffix_falls_back_to_append() {
        let max = format!("x-{}", u64::MAX);
        assert_eq!(increment_segment(&max), format!("{max}-1"));
    }

    #[test]
    fn increment_path_only_touches_final_segment() {
        assert_eq!(increment_path("/unit/report-3"), "/unit/report-4");
        assert_eq!(increment_path("/unit-2/report"), "/unit-2/report-1");
    }

    #[test]
    fn sequence_never_repeats_a_candidate() {
        let mut seen = HashSet::new();
        let mut current = "report".to_string();
        for _ in 0..500 {
            assert!(seen.insert(current.clone()));
            current = increment_segment(&current);
        }
    }
}
