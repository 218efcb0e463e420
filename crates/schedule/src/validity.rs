// ABOUTME: Validity filter guarding the aggregate against parsed garbage rows.
// ABOUTME: Enforces the strict vessel-name pattern plus an optional per-source completeness rule.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::VesselSchedule;

/// Names surfaced to the aggregate contain only letters, spaces, hyphens,
/// and dots. Anything else (numerals, Hangul, placeholder glyphs) marks a
/// header, spacer, or garbage row and the entry is discarded, not repaired.
static VESSEL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z \-\.]+$").expect("vessel name pattern"));

/// Returns true when the name satisfies the strict vessel-name pattern.
pub fn is_valid_vessel_name(name: &str) -> bool {
    !name.is_empty() && VESSEL_NAME_RE.is_match(name)
}

/// Per-source validity configuration.
///
/// The name pattern is always enforced. `require_complete` additionally
/// discards entries with any empty canonical field; it is enabled for
/// sources whose markup reliably produces spurious all-empty rows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityRule {
    #[serde(default)]
    pub require_complete: bool,
}

impl ValidityRule {
    /// Keep/discard decision for one normalized candidate. A discard is an
    /// expected filtering outcome, not an error.
    pub fn keeps(&self, vessel: &VesselSchedule) -> bool {
        if !is_valid_vessel_name(&vessel.vessel_name) {
            return false;
        }
        if self.require_complete {
            let route_ok = vessel
                .route_code
                .as_deref()
                .map(|r| !r.is_empty())
                .unwrap_or(false);
            if !route_ok
                || vessel.carrier.is_empty()
                || vessel.port_info.is_empty()
                || vessel.arrival_time.is_empty()
                || vessel.departure_time.is_empty()
            {
                return false;
            }
        }
        true
    }
}
