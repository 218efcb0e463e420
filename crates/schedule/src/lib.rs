// ABOUTME: Core data layer for berthline: canonical model, mapping, validity, dedup, merge.
// ABOUTME: Pure and I/O-free; fetching and extraction live in berthline-harbor.

//! Berthline schedule data layer.
//!
//! This crate holds everything about berth schedules that does not touch
//! the network: the canonical `VesselSchedule` model, the table-driven
//! positional field mapping, the vessel-name validity filter, the stable
//! within-source deduplicator, and the inclusion-filtered merge/sort.

pub mod dedup;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod models;
pub mod validity;

pub use dedup::{dedupe, IdentityKey};
pub use error::ScheduleError;
pub use mapping::{normalize_row, FieldMap, FieldSource, PatternSource};
pub use merge::{merge_schedules, parse_arrival_epoch, MergedSchedules};
pub use models::{RawRow, SourceOutcome, SourceReport, Terminal, VesselSchedule};
pub use validity::{is_valid_vessel_name, ValidityRule};
