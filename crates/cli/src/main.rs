// ABOUTME: CLI for running berth-schedule aggregation cycles and printing JSON.
// ABOUTME: Supports one-shot cycles and watch mode on the fixed refresh cadences.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{Days, Local};
use clap::Parser;
use serde_json::json;

use berthline_harbor::{
    AggregateResult, Client, CycleQuery, Scheduler, REFRESH_INTERVALS_SECS,
};
use berthline_schedule::Terminal;

/// Aggregate vessel berth schedules from the six terminal systems.
#[derive(Parser, Debug)]
#[command(name = "berthline")]
#[command(about = "Fetch, normalize, and merge terminal berth schedules", long_about = None)]
struct Args {
    /// Range start in YYYYMMDD form. Defaults to today.
    #[arg(long)]
    start_date: Option<String>,

    /// Range end in YYYYMMDD form. Defaults to a week from today.
    #[arg(long)]
    end_date: Option<String>,

    /// Terminal to include in the merged output (repeatable). All six when omitted.
    #[arg(long = "terminal", value_name = "NAME")]
    terminals: Vec<String>,

    /// Keep refreshing on this interval in seconds (30, 60, 600, 1800, or 3600).
    #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "600")]
    watch: Option<u64>,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn valid_date(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

fn print_cycle(result: &AggregateResult, compact: bool) {
    let output = json!({
        "vessels": result.vessels,
        "sources": result.reports,
        "total": result.vessels.len(),
        "failed": result.failed_terminals(),
        "unparsableArrivals": result.unparsable_arrivals,
        "startedAt": result.started_at,
        "finishedAt": result.finished_at,
    });

    let rendered = if compact {
        serde_json::to_string(&output)
    } else {
        serde_json::to_string_pretty(&output)
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(err) => eprintln!("failed to serialize cycle output: {}", err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let today = Local::now().date_naive();
    let start_date = args
        .start_date
        .unwrap_or_else(|| today.format("%Y%m%d").to_string());
    let end_date = args.end_date.unwrap_or_else(|| {
        today
            .checked_add_days(Days::new(7))
            .unwrap_or(today)
            .format("%Y%m%d")
            .to_string()
    });
    if !valid_date(&start_date) || !valid_date(&end_date) {
        bail!("dates must be in YYYYMMDD form, e.g. 20250504");
    }

    let mut query = CycleQuery::new(start_date, end_date);
    if !args.terminals.is_empty() {
        let mut included = Vec::new();
        for name in &args.terminals {
            included.push(name.parse::<Terminal>()?);
        }
        query = query.with_terminals(included);
    }

    let client = Client::builder().build();

    match args.watch {
        None => {
            let result = client.aggregate(&query).await;
            print_cycle(&result, args.compact);
        }
        Some(secs) => {
            if !REFRESH_INTERVALS_SECS.contains(&secs) {
                bail!(
                    "watch interval must be one of {:?} seconds",
                    REFRESH_INTERVALS_SECS
                );
            }
            let compact = args.compact;
            let (scheduler, _handle) = Scheduler::new(Arc::new(client), Duration::from_secs(secs));
            scheduler
                .run(query, move |result| print_cycle(&result, compact))
                .await;
        }
    }

    Ok(())
}
