//! Summary statistics over a record set

use super::filters::DENIED_MARKERS;
use super::format_amount;
use crate::{field_f64, field_str, Record};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// How many states the [`Statistics::top_states`] list keeps
const TOP_STATES: usize = 10;

/// Aggregate view of a set of funding-request records
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    /// Records in the set
    pub total_records: usize,
    /// Records whose status is `Funded`
    pub funded: usize,
    /// Records whose status marks them denied or unfunded
    pub denied: usize,
    /// Sum of `funding_commitment_request` across all records
    pub total_funding: f64,
    /// Distinct non-empty organization names
    pub unique_organizations: usize,
    /// Distinct non-empty state codes
    pub unique_states: usize,
    /// Record counts keyed by status
    pub by_status: BTreeMap<String, usize>,
    /// Record counts keyed by funding year
    pub by_year: BTreeMap<String, usize>,
    /// Record counts keyed by organization entity type
    pub by_entity_type: BTreeMap<String, usize>,
    /// Up to ten states with the most records, descending
    pub top_states: Vec<(String, usize)>,
}

impl Statistics {
    /// Compute statistics for `records`.
    ///
    /// Records missing a field are counted in `total_records` but skipped in
    /// that field's breakdown.
    pub fn from_records(records: &[Record]) -> Self {
        let mut stats = Statistics {
            total_records: records.len(),
            ..Default::default()
        };
        let mut organizations = BTreeSet::new();
        let mut state_counts: BTreeMap<String, usize> = BTreeMap::new();

        for record in records {
            let status = field_str(record, "form_471_frn_status_name");
            if status.eq_ignore_ascii_case("funded") {
                stats.funded += 1;
            }
            let lowered = status.to_lowercase();
            if DENIED_MARKERS.iter().any(|m| lowered.contains(m)) {
                stats.denied += 1;
            }
            if !status.is_empty() {
                *stats.by_status.entry(status).or_default() += 1;
            }

            stats.total_funding += field_f64(record, "funding_commitment_request");

            let year = field_str(record, "funding_year");
            if !year.is_empty() {
                *stats.by_year.entry(year).or_default() += 1;
            }

            let entity_type = field_str(record, "organization_entity_type_name");
            if !entity_type.is_empty() {
                *stats.by_entity_type.entry(entity_type).or_default() += 1;
            }

            let organization = field_str(record, "organization_name");
            if !organization.is_empty() {
                organizations.insert(organization);
            }

            let state = field_str(record, "state");
            if !state.is_empty() {
                *state_counts.entry(state).or_default() += 1;
            }
        }

        stats.unique_organizations = organizations.len();
        stats.unique_states = state_counts.len();

        let mut states: Vec<(String, usize)> = state_counts.into_iter().collect();
        states.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        states.truncate(TOP_STATES);
        stats.top_states = states;

        stats
    }

    /// Render a human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Records:              {}", self.total_records);
        let _ = writeln!(out, "Funded:               {}", self.funded);
        let _ = writeln!(out, "Denied/unfunded:      {}", self.denied);
        let _ = writeln!(
            out,
            "Total requested:      {}",
            format_amount(self.total_funding)
        );
        let _ = writeln!(out, "Unique organizations: {}", self.unique_organizations);
        let _ = writeln!(out, "Unique states:        {}", self.unique_states);

        if !self.by_status.is_empty() {
            let _ = writeln!(out, "\nBy status:");
            for (status, count) in &self.by_status {
                let _ = writeln!(out, "  {status:<40} {count:>8}");
            }
        }
        if !self.by_year.is_empty() {
            let _ = writeln!(out, "\nBy funding year:");
            for (year, count) in &self.by_year {
                let _ = writeln!(out, "  {year:<40} {count:>8}");
            }
        }
        if !self.by_entity_type.is_empty() {
            let _ = writeln!(out, "\nBy entity type:");
            for (entity_type, count) in &self.by_entity_type {
                let _ = writeln!(out, "  {entity_type:<40} {count:>8}");
            }
        }
        if !self.top_states.is_empty() {
            let _ = writeln!(out, "\nTop states:");
            for (state, count) in &self.top_states {
                let _ = writeln!(out, "  {state:<40} {count:>8}");
            }
        }
        out
    }
}
