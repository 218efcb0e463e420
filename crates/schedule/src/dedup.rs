// ABOUTME: Stable within-source deduplication on a configurable identity key.
// ABOUTME: First occurrence wins; relative order of kept entries is preserved.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::VesselSchedule;

/// The field pair that identifies a duplicate row within one source.
///
/// Browser-rendered grids re-emit rows on re-render, so those sources key
/// on the (name, route) pair. Sources whose markup never duplicates use
/// `None` and skip the pass entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    #[default]
    None,
    NameRoute,
}

/// Removes entries identical on the identity key, keeping the first
/// occurrence. Stable: the surviving entries keep their relative order.
pub fn dedupe(vessels: Vec<VesselSchedule>, key: IdentityKey) -> Vec<VesselSchedule> {
    match key {
        IdentityKey::None => vessels,
        IdentityKey::NameRoute => {
            let mut seen: HashSet<(String, String)> = HashSet::new();
            vessels
                .into_iter()
                .filter(|v| {
                    seen.insert((
                        v.vessel_name.clone(),
                        v.route_code.clone().unwrap_or_default(),
                    ))
                })
                .collect()
        }
    }
}
