// ABOUTME: Per-source declarative configuration and the registry that holds all six terminals.
// ABOUTME: A SourceSpec bundles fetch strategy, row rule, field map, validity rule, and identity key.

//! Source configuration.
//!
//! Everything source-specific is data: the fetch strategy, the row
//! extraction rule, the field-index mapping, the validity rule, and the
//! dedup identity key. The six builtin specs are embedded JSON; adding a
//! terminal means adding one record there, not a new code path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use berthline_schedule::{FieldMap, IdentityKey, Terminal, ValidityRule};

use crate::extract::RowRule;

/// How a source's document is retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Plain GET with spoofed browser headers. `date_params` appends the
    /// STARTDATE/ENDDATE query pair for sources that accept a range.
    StaticGet {
        url: String,
        #[serde(default)]
        date_params: bool,
    },
    /// Form-encoded POST. `form` carries the source's fixed fields;
    /// `date_params` injects STARTDATE/ENDDATE alongside them.
    StaticPost {
        url: String,
        #[serde(default)]
        form: HashMap<String, String>,
        #[serde(default)]
        date_params: bool,
    },
    /// Full browser render: navigate, wait out client-side script, click
    /// the control that reveals the data grid, scrape the rendered DOM.
    ///
    /// The settle delays are empirically tuned against an upstream with no
    /// reliable load-completion signal. They are named and per-source on
    /// purpose; do not fold them into fetch logic or assume they can be
    /// shortened.
    Browser {
        url: String,
        control: String,
        settle_after_load_ms: u64,
        settle_after_click_ms: u64,
    },
}

impl FetchStrategy {
    /// The target URL of this strategy.
    pub fn url(&self) -> &str {
        match self {
            FetchStrategy::StaticGet { url, .. }
            | FetchStrategy::StaticPost { url, .. }
            | FetchStrategy::Browser { url, .. } => url,
        }
    }

    pub fn is_browser(&self) -> bool {
        matches!(self, FetchStrategy::Browser { .. })
    }
}

/// The complete declarative pipeline configuration for one terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub terminal: Terminal,
    pub strategy: FetchStrategy,
    pub rule: RowRule,
    pub map: FieldMap,
    #[serde(default)]
    pub validity: ValidityRule,
    #[serde(default)]
    pub identity: IdentityKey,
}

/// Ordered registry of source specs. Registry order is the concatenation
/// order of the merged output, so it is part of the observable contract.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    specs: Vec<SourceSpec>,
}

impl SourceRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec, replacing any existing spec for the same terminal.
    pub fn register(&mut self, spec: SourceSpec) {
        if let Some(existing) = self
            .specs
            .iter_mut()
            .find(|s| s.terminal == spec.terminal)
        {
            *existing = spec;
        } else {
            self.specs.push(spec);
        }
    }

    /// Looks up a spec by terminal.
    pub fn get(&self, terminal: Terminal) -> Option<&SourceSpec> {
        self.specs.iter().find(|s| s.terminal == terminal)
    }

    /// Iterates specs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceSpec> {
        self.specs.iter()
    }

    /// Returns the number of registered specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if no specs are registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Embedded JSON containing the six terminal configurations.
const BUILTIN_SOURCES_JSON: &str = include_str!("../data/sources.json");

/// Loads the builtin source registry from embedded JSON.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed or cannot be deserialized.
pub fn load_builtin_registry() -> SourceRegistry {
    let specs: Vec<SourceSpec> =
        serde_json::from_str(BUILTIN_SOURCES_JSON).expect("failed to parse builtin sources");

    let mut registry = SourceRegistry::new();
    for spec in specs {
        registry.register(spec);
    }
    registry
}
