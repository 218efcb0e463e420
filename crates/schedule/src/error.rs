// ABOUTME: Error types for the schedule data layer.
// ABOUTME: Provides ScheduleError with UnknownTerminal and Mapping variants.

use thiserror::Error;

/// Errors that can occur in the pure data layer.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A terminal name did not match any of the six known sources.
    #[error("unknown terminal: {0}")]
    UnknownTerminal(String),

    /// A field-mapping table is internally inconsistent.
    #[error("invalid field mapping: {0}")]
    Mapping(String),
}

impl ScheduleError {
    pub fn unknown_terminal(name: impl Into<String>) -> Self {
        ScheduleError::UnknownTerminal(name.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        ScheduleError::Mapping(msg.into())
    }
}
