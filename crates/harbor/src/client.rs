// ABOUTME: The harbor Client running per-source pipelines and the concurrent aggregation cycle.
// ABOUTME: Each source is fetched, extracted, normalized, filtered, and deduped in isolation.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use berthline_schedule::{
    dedupe, merge_schedules, normalize_row, SourceOutcome, SourceReport, Terminal, VesselSchedule,
};

use crate::browser::{capture_rendered, DynamicCapture};
use crate::extract::extract_rows;
use crate::fetch::{fetch_static, FetchOptions};
use crate::options::{ClientBuilder, Options};
use crate::sources::{load_builtin_registry, FetchStrategy, SourceRegistry, SourceSpec};

/// Caller-supplied parameters for one aggregation cycle. There is no
/// process-global state; every cycle carries its own date range and
/// terminal inclusion set.
#[derive(Debug, Clone)]
pub struct CycleQuery {
    /// `YYYYMMDD`, passed through to upstreams that accept a range.
    pub start_date: String,
    /// `YYYYMMDD`, same.
    pub end_date: String,
    /// Terminals included in the merged output. All configured sources are
    /// still fetched and reported; inclusion is a display/query concern.
    pub terminals: HashSet<Terminal>,
}

impl CycleQuery {
    /// A query over the given date range including all six terminals.
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            terminals: Terminal::ALL.into_iter().collect(),
        }
    }

    /// Restrict the merged output to the given terminals.
    pub fn with_terminals(mut self, terminals: impl IntoIterator<Item = Terminal>) -> Self {
        self.terminals = terminals.into_iter().collect();
        self
    }
}

/// The envelope of one aggregation cycle: the merged, sorted sequence plus
/// the raw per-source reports so consumers can render failure indicators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub vessels: Vec<VesselSchedule>,
    /// Entries kept in `vessels` whose arrival time no pattern could parse
    /// (they sort last).
    pub unparsable_arrivals: usize,
    pub reports: Vec<SourceReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Terminals whose pipeline failed this cycle.
    pub fn failed_terminals(&self) -> Vec<Terminal> {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_failed())
            .map(|r| r.terminal)
            .collect()
    }
}

/// The main harbor client driving all six source pipelines.
pub struct Client {
    opts: Options,
    http_client: reqwest::Client,
    registry: SourceRegistry,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let http_client = opts.http_client.clone().unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .timeout(opts.timeout)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .expect("failed to build HTTP client")
        });

        let registry = opts.registry.clone().unwrap_or_else(load_builtin_registry);

        Self {
            opts,
            http_client,
            registry,
        }
    }

    /// The registry this client fetches from.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run one source's whole pipeline: fetch, extract, normalize, filter,
    /// dedup. Never errors; failures become a `Failed` outcome so one
    /// broken terminal cannot take down the aggregation.
    pub async fn fetch_source(&self, spec: &SourceSpec, query: &CycleQuery) -> SourceReport {
        let outcome = match &spec.strategy {
            FetchStrategy::Browser {
                url,
                control,
                settle_after_load_ms,
                settle_after_click_ms,
            } => {
                match capture_rendered(
                    url,
                    control,
                    Duration::from_millis(*settle_after_load_ms),
                    Duration::from_millis(*settle_after_click_ms),
                    self.opts.nav_timeout,
                )
                .await
                {
                    Ok(capture) => outcome_from_capture(spec, capture),
                    Err(e) => {
                        warn!(terminal = %spec.terminal, error = %e, "dynamic fetch failed");
                        SourceOutcome::Failed {
                            error: e.to_string(),
                            status: e.status,
                        }
                    }
                }
            }
            _static => {
                let fetch_opts = FetchOptions {
                    headers: self.opts.headers.clone(),
                    allow_private_networks: self.opts.allow_private_networks,
                };
                match fetch_static(
                    &self.http_client,
                    &spec.strategy,
                    (query.start_date.as_str(), query.end_date.as_str()),
                    &fetch_opts,
                )
                .await
                {
                    Ok(result) => {
                        let body = result.text();
                        SourceOutcome::Loaded {
                            vessels: refine(spec, &body),
                        }
                    }
                    Err(e) => {
                        warn!(terminal = %spec.terminal, error = %e, "static fetch failed");
                        SourceOutcome::Failed {
                            error: e.to_string(),
                            status: e.status,
                        }
                    }
                }
            }
        };

        SourceReport {
            terminal: spec.terminal,
            outcome,
        }
    }

    /// Run one full aggregation cycle.
    ///
    /// All source pipelines run concurrently; a suspension in one never
    /// delays another. The merge is a barrier: it waits for every source
    /// to reach an outcome before producing the cycle's output.
    pub async fn aggregate(&self, query: &CycleQuery) -> AggregateResult {
        let started_at = Utc::now();

        let reports = futures::future::join_all(
            self.registry
                .iter()
                .map(|spec| self.fetch_source(spec, query)),
        )
        .await;

        let merged = merge_schedules(&reports, &query.terminals);
        debug!(
            vessels = merged.vessels.len(),
            failed = reports.iter().filter(|r| r.outcome.is_failed()).count(),
            "aggregation cycle complete"
        );

        AggregateResult {
            vessels: merged.vessels,
            unparsable_arrivals: merged.unparsable_arrivals,
            reports,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Extract, normalize, filter, and dedup one fetched document.
fn refine(spec: &SourceSpec, body: &str) -> Vec<VesselSchedule> {
    let rows = extract_rows(body, &spec.rule);
    let total = rows.len();

    let vessels: Vec<VesselSchedule> = rows
        .iter()
        .map(|row| normalize_row(spec.terminal, row, &spec.map))
        .filter(|v| spec.validity.keeps(v))
        .collect();
    let rejected = total - vessels.len();

    let deduped = dedupe(vessels, spec.identity);
    debug!(
        terminal = %spec.terminal,
        rows = total,
        rejected,
        kept = deduped.len(),
        "source refined"
    );
    deduped
}

/// Convert a dynamic capture into a source outcome. A capture that never
/// reached the grid is a partial result with no rows, not a failure.
fn outcome_from_capture(spec: &SourceSpec, capture: DynamicCapture) -> SourceOutcome {
    if capture.click_success {
        SourceOutcome::Loaded {
            vessels: refine(spec, &capture.html),
        }
    } else {
        SourceOutcome::Partial {
            vessels: Vec::new(),
            note: capture
                .note
                .unwrap_or_else(|| "control not visible".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berthline_schedule::IdentityKey;
    use pretty_assertions::assert_eq;

    fn bct_like_spec() -> SourceSpec {
        let json = r#"{
            "terminal": "BCT",
            "strategy": {
                "type": "browser",
                "url": "https://example.invalid/index.html",
                "control": "#menu div",
                "settle_after_load_ms": 1,
                "settle_after_click_ms": 1
            },
            "rule": {
                "rows": "div[id^=\"grid_body_gridrow_\"]",
                "cells": "div[id$=\"GridCellTextContainerElement\"] div",
                "min_cells": 14
            },
            "map": {
                "vesselName": 12,
                "routeCode": { "join": [4, 5, "/"] },
                "carrier": 2,
                "portInfo": 13,
                "arrivalTime": 7,
                "departureTime": 8
            },
            "identity": "name_route"
        }"#;
        serde_json::from_str(json).expect("spec json")
    }

    fn grid_row(idx: usize, cells: [&str; 17]) -> String {
        let inner: String = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    r#"<div id="cell_{idx}_{i}GridCellTextContainerElement"><div>{c}</div></div>"#
                )
            })
            .collect();
        format!(r#"<div id="grid_body_gridrow_{idx}">{inner}</div>"#)
    }

    fn rendered_grid() -> String {
        let row = [
            "1", "1(S)", "MSC", "MSCA001", "QM516A", "QM516A", "", "2025-05-09 22:00",
            "2025-05-11 17:00", "", "", "", "MSC CAMEROON", "MEXICA", "", "", "Working",
        ];
        // The grid re-emits the same row on re-render.
        format!(
            "<html><body>{}{}{}</body></html>",
            grid_row(0, row),
            grid_row(1, row),
            grid_row(
                2,
                [
                    "2", "2(N)", "MAE", "MAEA002", "ME001", "ME001", "", "2025-05-10 04:00",
                    "2025-05-12 09:00", "", "", "", "MAERSK EDMONTON", "ASIA", "", "", "Planned",
                ]
            )
        )
    }

    #[test]
    fn refine_maps_grid_rows_and_dedupes_rerenders() {
        let spec = bct_like_spec();
        assert_eq!(spec.identity, IdentityKey::NameRoute);

        let vessels = refine(&spec, &rendered_grid());
        assert_eq!(vessels.len(), 2);
        assert_eq!(vessels[0].vessel_name, "MSC CAMEROON");
        assert_eq!(vessels[0].route_code.as_deref(), Some("QM516A/QM516A"));
        assert_eq!(vessels[0].carrier, "MSC");
        assert_eq!(vessels[0].port_info, "MEXICA");
        assert_eq!(vessels[0].arrival_time, "2025-05-09 22:00");
        assert_eq!(vessels[1].vessel_name, "MAERSK EDMONTON");
    }

    #[test]
    fn capture_without_click_is_partial_with_no_rows() {
        let spec = bct_like_spec();
        let capture = DynamicCapture {
            click_success: false,
            html: rendered_grid(),
            note: Some("control not visible".to_string()),
        };

        let outcome = outcome_from_capture(&spec, capture);
        match outcome {
            SourceOutcome::Partial { vessels, note } => {
                assert!(vessels.is_empty());
                assert_eq!(note, "control not visible");
            }
            other => panic!("expected partial outcome, got {:?}", other),
        }
    }

    #[test]
    fn successful_capture_loads_grid_rows() {
        let spec = bct_like_spec();
        let capture = DynamicCapture {
            click_success: true,
            html: rendered_grid(),
            note: None,
        };

        let outcome = outcome_from_capture(&spec, capture);
        match outcome {
            SourceOutcome::Loaded { vessels } => assert_eq!(vessels.len(), 2),
            other => panic!("expected loaded outcome, got {:?}", other),
        }
    }
}
