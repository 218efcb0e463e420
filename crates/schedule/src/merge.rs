// ABOUTME: Merges per-source results into one arrival-time-sorted sequence.
// ABOUTME: Applies the terminal inclusion set and the unparsable-date sort policy.

//! Aggregation of per-source results.
//!
//! The merge concatenates included sources in report order, then stable
//! sorts ascending by parsed arrival time. Arrival strings that no pattern
//! can parse sort last (far-future key) and are counted on the result so
//! consumers can surface them; they are never dropped.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{SourceReport, Terminal, VesselSchedule};

/// Source-local arrival formats observed across the six terminals, tried
/// before falling back to loose parsing.
const ARRIVAL_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M",
];

/// Parses an arrival string to a sortable epoch-second key.
///
/// Returns None when no pattern (or the loose fallback) matches; callers
/// decide the policy for those entries.
pub fn parse_arrival_epoch(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for pat in ARRIVAL_PATTERNS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, pat) {
            return Some(dt.and_utc().timestamp());
        }
    }

    // Date-only forms sort at local midnight of that day.
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }

    // Loose fallback for anything a terminal decides to emit next week.
    dateparser::parse(trimmed).ok().map(|dt| dt.timestamp())
}

/// The merged, sorted output of one aggregation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSchedules {
    pub vessels: Vec<VesselSchedule>,
    /// Entries whose arrival time no pattern could parse. They are kept,
    /// sorted after all parsable entries.
    pub unparsable_arrivals: usize,
}

/// Unions the included sources' vessels and sorts ascending by parsed
/// arrival time. An empty inclusion set yields an empty sequence no matter
/// what the reports contain. The sort is stable: ties and unparsable runs
/// keep concatenation order, so per-source relative order is preserved.
pub fn merge_schedules(reports: &[SourceReport], included: &HashSet<Terminal>) -> MergedSchedules {
    let mut vessels: Vec<VesselSchedule> = reports
        .iter()
        .filter(|r| included.contains(&r.terminal))
        .flat_map(|r| r.outcome.vessels().iter().cloned())
        .collect();

    let mut unparsable = 0usize;
    let mut keyed: Vec<(i64, VesselSchedule)> = vessels
        .drain(..)
        .map(|v| {
            let key = match parse_arrival_epoch(&v.arrival_time) {
                Some(epoch) => epoch,
                None => {
                    unparsable += 1;
                    i64::MAX
                }
            };
            (key, v)
        })
        .collect();

    keyed.sort_by_key(|(key, _)| *key);

    MergedSchedules {
        vessels: keyed.into_iter().map(|(_, v)| v).collect(),
        unparsable_arrivals: unparsable,
    }
}
