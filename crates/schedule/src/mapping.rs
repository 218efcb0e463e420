// ABOUTME: Table-driven field mapping from positional raw rows to the canonical schema.
// ABOUTME: FieldSource covers plain indices, joined cell pairs, and regex-captured groups.

//! Positional field mapping.
//!
//! Each source describes its column layout as a `FieldMap`: canonical field
//! to `FieldSource`. The map is data, not control flow; adding a source
//! means adding a mapping table. Out-of-range indices resolve to the empty
//! string so rows shorter than expected never fail.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{RawRow, Terminal, VesselSchedule};

/// Where one canonical field's value comes from within a raw row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSource {
    /// A single cell index, e.g. `4`.
    Index(usize),
    /// Two cells joined with a separator, e.g. `{"join": [4, 5, "/"]}`.
    Join { join: (usize, usize, String) },
    /// A regex capture group over one cell,
    /// e.g. `{"pattern": {"index": 3, "regex": "\\((.*?)\\)", "group": 1}}`.
    Pattern { pattern: PatternSource },
}

/// Regex capture applied to a single cell's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSource {
    pub index: usize,
    pub regex: String,
    #[serde(default = "default_group")]
    pub group: usize,
}

fn default_group() -> usize {
    1
}

/// Canonical field to raw-index mapping for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMap {
    pub vessel_name: FieldSource,
    #[serde(default)]
    pub route_code: Option<FieldSource>,
    pub carrier: FieldSource,
    pub port_info: FieldSource,
    pub arrival_time: FieldSource,
    pub departure_time: FieldSource,
}

/// Thread-safe cache of compiled mapping regexes.
///
/// Invalid patterns are cached as None so a bad config entry degrades to an
/// empty field instead of recompiling (and failing) on every row.
static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn get_or_compile(pattern: &str) -> Option<Regex> {
    {
        let cache = PATTERN_CACHE.read().unwrap();
        if let Some(cached) = cache.get(pattern) {
            return cached.clone();
        }
    }

    let compiled = Regex::new(pattern).ok();
    let mut cache = PATTERN_CACHE.write().unwrap();
    if let Some(cached) = cache.get(pattern) {
        return cached.clone();
    }
    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

fn cell(row: &RawRow, index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

impl FieldSource {
    /// Resolves this source against a raw row. Missing cells, non-matching
    /// patterns, and invalid regexes all resolve to the empty string.
    pub fn resolve(&self, row: &RawRow) -> String {
        match self {
            FieldSource::Index(i) => cell(row, *i).trim().to_string(),
            FieldSource::Join {
                join: (first, second, sep),
            } => format!("{}{}{}", cell(row, *first).trim(), sep, cell(row, *second).trim()),
            FieldSource::Pattern { pattern } => {
                let text = cell(row, pattern.index);
                match get_or_compile(&pattern.regex) {
                    Some(re) => re
                        .captures(text)
                        .and_then(|c| c.get(pattern.group))
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Maps one raw row into the canonical schema using the source's mapping
/// table. This is a pure positional lookup; validity is judged separately.
pub fn normalize_row(terminal: Terminal, row: &RawRow, map: &FieldMap) -> VesselSchedule {
    VesselSchedule {
        terminal,
        vessel_name: map.vessel_name.resolve(row),
        route_code: map.route_code.as_ref().map(|src| src.resolve(row)),
        carrier: map.carrier.resolve(row),
        port_info: map.port_info.resolve(row),
        arrival_time: map.arrival_time.resolve(row),
        departure_time: map.departure_time.resolve(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn index_source_resolves_and_trims() {
        let src = FieldSource::Index(1);
        assert_eq!(src.resolve(&row(&["a", "  MSC  "])), "MSC");
    }

    #[test]
    fn index_out_of_range_is_empty_not_panic() {
        let src = FieldSource::Index(9);
        assert_eq!(src.resolve(&row(&["only"])), "");
    }

    #[test]
    fn join_source_concatenates_with_separator() {
        let src = FieldSource::Join {
            join: (0, 1, "/".to_string()),
        };
        assert_eq!(src.resolve(&row(&["QM516A", "QM516A"])), "QM516A/QM516A");
        // A missing second cell still yields the separator, same as the
        // upstream grid's always-two-part short name.
        assert_eq!(src.resolve(&row(&["QM516A"])), "QM516A/");
    }

    #[test]
    fn pattern_source_extracts_group() {
        let src = FieldSource::Pattern {
            pattern: PatternSource {
                index: 0,
                regex: r"\((.*?)\)".to_string(),
                group: 1,
            },
        };
        assert_eq!(src.resolve(&row(&["KCS Service (0412W)"])), "0412W");
        assert_eq!(src.resolve(&row(&["no parens here"])), "");
    }

    #[test]
    fn invalid_pattern_degrades_to_empty() {
        let src = FieldSource::Pattern {
            pattern: PatternSource {
                index: 0,
                regex: "(unclosed".to_string(),
                group: 1,
            },
        };
        assert_eq!(src.resolve(&row(&["anything"])), "");
    }

    #[test]
    fn field_map_deserializes_from_json_shapes() {
        let json = r#"{
            "vesselName": 12,
            "routeCode": {"join": [4, 5, "/"]},
            "carrier": 2,
            "portInfo": 13,
            "arrivalTime": 7,
            "departureTime": {"pattern": {"index": 8, "regex": "(.+)"}}
        }"#;
        let map: FieldMap = serde_json::from_str(json).expect("deserialize");
        assert!(matches!(map.vessel_name, FieldSource::Index(12)));
        assert!(matches!(map.route_code, Some(FieldSource::Join { .. })));
        match &map.departure_time {
            FieldSource::Pattern { pattern } => assert_eq!(pattern.group, 1),
            other => panic!("expected pattern source, got {:?}", other),
        }
    }

    #[test]
    fn normalize_row_maps_all_fields() {
        let map = FieldMap {
            vessel_name: FieldSource::Index(0),
            route_code: None,
            carrier: FieldSource::Index(1),
            port_info: FieldSource::Index(4),
            arrival_time: FieldSource::Index(2),
            departure_time: FieldSource::Index(3),
        };
        let vessel = normalize_row(
            Terminal::Gwct,
            &row(&["MSC CAMEROON", "MSC", "2025-05-09 22:00", "2025-05-11 17:00"]),
            &map,
        );
        assert_eq!(vessel.terminal, Terminal::Gwct);
        assert_eq!(vessel.vessel_name, "MSC CAMEROON");
        assert_eq!(vessel.route_code, None);
        assert_eq!(vessel.carrier, "MSC");
        // port_info index beyond the row resolves to empty, not a panic
        assert_eq!(vessel.port_info, "");
        assert_eq!(vessel.arrival_time, "2025-05-09 22:00");
        assert_eq!(vessel.departure_time, "2025-05-11 17:00");
    }
}
