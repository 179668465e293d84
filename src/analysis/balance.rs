//! Commitment-versus-disbursement balance for one billed entity

use super::format_amount;
use crate::{field_f64, field_str, Record};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Funding position of a single billed entity.
///
/// Built from two record sets: Form 471 funding requests (what was
/// committed) and Form 472 invoice lines (what was actually paid out).
/// Only requests with status `Funded` count toward the committed total;
/// the per-status breakdown keeps the requested amounts of every status so
/// denied and pending dollars stay visible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FundingBalance {
    /// Billed entity number this balance describes
    pub ben: String,
    /// Sum of `funding_commitment_request` over `Funded` requests
    pub total_committed: f64,
    /// Sum of `approved_inv_line_amt` over all invoice lines
    pub total_disbursed: f64,
    /// Committed minus disbursed (negative when over-disbursed)
    pub remaining: f64,
    /// Committed dollars keyed by funding year
    pub committed_by_year: BTreeMap<String, f64>,
    /// Requested dollars keyed by request status
    pub requested_by_status: BTreeMap<String, f64>,
    /// Form 471 records considered
    pub commitments: usize,
    /// Form 472 invoice lines considered
    pub disbursement_lines: usize,
}

impl FundingBalance {
    /// Reconcile `form_471` requests against `form_472` invoice lines.
    pub fn from_records(ben: &str, form_471: &[Record], form_472: &[Record]) -> Self {
        let mut balance = FundingBalance {
            ben: ben.to_string(),
            commitments: form_471.len(),
            disbursement_lines: form_472.len(),
            ..Default::default()
        };

        for record in form_471 {
            let amount = field_f64(record, "funding_commitment_request");
            let status = field_str(record, "form_471_frn_status_name");
            let status_key = if status.is_empty() {
                "(unknown)".to_string()
            } else {
                status.clone()
            };
            *balance.requested_by_status.entry(status_key).or_default() += amount;

            if status.eq_ignore_ascii_case("funded") {
                balance.total_committed += amount;
                let year = field_str(record, "funding_year");
                if !year.is_empty() {
                    *balance.committed_by_year.entry(year).or_default() += amount;
                }
            }
        }

        for line in form_472 {
            balance.total_disbursed += field_f64(line, "approved_inv_line_amt");
        }

        balance.remaining = balance.total_committed - balance.total_disbursed;
        balance
    }

    /// Render a human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Billed entity:     {}", self.ben);
        let _ = writeln!(
            out,
            "Committed:         {}  ({} requests)",
            format_amount(self.total_committed),
            self.commitments
        );
        let _ = writeln!(
            out,
            "Disbursed:         {}  ({} invoice lines)",
            format_amount(self.total_disbursed),
            self.disbursement_lines
        );
        let _ = writeln!(out, "Remaining:         {}", format_amount(self.remaining));

        if !self.committed_by_year.is_empty() {
            let _ = writeln!(out, "\nCommitted by funding year:");
            for (year, amount) in &self.committed_by_year {
                let _ = writeln!(out, "  {year:<10} {:>18}", format_amount(*amount));
            }
        }
        if !self.requested_by_status.is_empty() {
            let _ = writeln!(out, "\nRequested by status:");
            for (status, amount) in &self.requested_by_status {
                let _ = writeln!(out, "  {status:<30} {:>18}", format_amount(*amount));
            }
        }
        out
    }
}
