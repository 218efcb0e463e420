// ABOUTME: Main library entry point for the berthline harbor client.
// ABOUTME: Re-exports Client, builder, errors, source registry, scheduler, and fetch types.

//! Berthline harbor - the fetch-and-extract client for terminal sources.
//!
//! This crate drives the six terminal pipelines: static HTTP fetches with
//! browser headers, browser-rendered captures, declarative row extraction,
//! normalization into the canonical schema, and the concurrent aggregation
//! cycle with per-source failure isolation.
//!
//! # Example
//!
//! ```no_run
//! use berthline_harbor::{Client, CycleQuery};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::builder().build();
//!     let query = CycleQuery::new("20250504", "20250511");
//!     let result = client.aggregate(&query).await;
//!     println!("{} vessels", result.vessels.len());
//! }
//! ```

pub mod browser;
pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod options;
pub mod scheduler;
pub mod sources;

pub use crate::browser::DynamicCapture;
pub use crate::client::{AggregateResult, Client, CycleQuery};
pub use crate::error::{ErrorCode, HarborError};
pub use crate::extract::{extract_rows, RowRule};
pub use crate::fetch::{FetchOptions, FetchResult, BROWSER_USER_AGENT};
pub use crate::options::{ClientBuilder, Options};
pub use crate::scheduler::{
    RefreshHandle, Scheduler, DEFAULT_REFRESH_SECS, REFRESH_INTERVALS_SECS,
};
pub use crate::sources::{load_builtin_registry, FetchStrategy, SourceRegistry, SourceSpec};
