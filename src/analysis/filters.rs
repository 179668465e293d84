//! In-memory record filters
//!
//! These complement server-side `$where` narrowing: some conditions (fuzzy
//! status matching, substring search) are easier to apply after the fetch.

use crate::{field_str, Record};

/// Status fragments that mark a request as denied or otherwise unfunded
pub const DENIED_MARKERS: [&str; 4] = ["denied", "not funded", "rejected", "cancelled"];

/// Keep records whose `form_471_frn_status_name` equals `status`
/// (case-insensitive).
pub fn with_status(records: Vec<Record>, status: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| field_str(r, "form_471_frn_status_name").eq_ignore_ascii_case(status))
        .collect()
}

/// Keep records whose status contains any denied/unfunded marker.
pub fn denied_or_unfunded(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| {
            let status = field_str(r, "form_471_frn_status_name").to_lowercase();
            DENIED_MARKERS.iter().any(|m| status.contains(m))
        })
        .collect()
}

/// Keep records whose organization name contains `fragment`
/// (case-insensitive substring).
pub fn matching_organization(records: Vec<Record>, fragment: &str) -> Vec<Record> {
    let needle = fragment.to_lowercase();
    records
        .into_iter()
        .filter(|r| {
            field_str(r, "organization_name")
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}

/// Keep records from one state (case-insensitive exact match).
pub fn in_state(records: Vec<Record>, state: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| field_str(r, "state").eq_ignore_ascii_case(state))
        .collect()
}
