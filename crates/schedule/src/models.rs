// ABOUTME: Canonical data model for normalized berth-schedule entries.
// ABOUTME: Defines Terminal, VesselSchedule, RawRow, and the per-source result envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// The six terminal systems schedule data is aggregated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Terminal {
    #[default]
    Pnc,
    Gwct,
    Ict,
    Pnit,
    Bct,
    Hjnc,
}

impl Terminal {
    /// All terminals in the order they appear in the merged output.
    pub const ALL: [Terminal; 6] = [
        Terminal::Pnc,
        Terminal::Gwct,
        Terminal::Ict,
        Terminal::Pnit,
        Terminal::Bct,
        Terminal::Hjnc,
    ];

    /// Upper-case display name, matching the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::Pnc => "PNC",
            Terminal::Gwct => "GWCT",
            Terminal::Ict => "ICT",
            Terminal::Pnit => "PNIT",
            Terminal::Bct => "BCT",
            Terminal::Hjnc => "HJNC",
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Terminal {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PNC" => Ok(Terminal::Pnc),
            "GWCT" => Ok(Terminal::Gwct),
            "ICT" => Ok(Terminal::Ict),
            "PNIT" => Ok(Terminal::Pnit),
            "BCT" => Ok(Terminal::Bct),
            "HJNC" => Ok(Terminal::Hjnc),
            other => Err(ScheduleError::unknown_terminal(other)),
        }
    }
}

/// One positional row of cell text as extracted from a source document.
///
/// Indices are meaningful only within the source's own extraction rule.
/// Rows are consumed by the normalizer and discarded; they are never
/// persisted or compared across sources.
pub type RawRow = Vec<String>;

/// A normalized berth-schedule entry in the canonical shape shared by all
/// sources. Arrival and departure stay in the source-local textual form;
/// they are parsed only for sorting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselSchedule {
    #[serde(default)]
    pub terminal: Terminal,
    pub vessel_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    pub carrier: String,
    pub port_info: String,
    pub arrival_time: String,
    pub departure_time: String,
}

/// Outcome of one source's fetch-and-extract pipeline for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The source was fetched and parsed in full.
    Loaded { vessels: Vec<VesselSchedule> },
    /// The page was reached but the data grid could not be fully revealed
    /// (dynamic source whose control was not clickable). Not a failure.
    Partial {
        vessels: Vec<VesselSchedule>,
        note: String,
    },
    /// Fetch or render failed. Carries the upstream HTTP status when known.
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl SourceOutcome {
    /// Vessels surfaced by this outcome, empty for failures.
    pub fn vessels(&self) -> &[VesselSchedule] {
        match self {
            SourceOutcome::Loaded { vessels } | SourceOutcome::Partial { vessels, .. } => vessels,
            SourceOutcome::Failed { .. } => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

/// Per-source result envelope handed to the merge step and to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub terminal: Terminal,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}
