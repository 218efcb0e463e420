// ABOUTME: Fixed-interval refresh scheduler with a manual-refresh handle.
// ABOUTME: Cycles run sequentially; a tick or manual request never preempts an in-flight cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{AggregateResult, Client, CycleQuery};

/// Refresh cadences offered by the original operator UI, in seconds.
pub const REFRESH_INTERVALS_SECS: [u64; 5] = [30, 60, 600, 1800, 3600];

/// Default refresh cadence (ten minutes).
pub const DEFAULT_REFRESH_SECS: u64 = 600;

/// Handle for requesting an out-of-band refresh.
///
/// Requests are queued behind any in-flight cycle; rapid successive
/// requests are not coalesced here, so interactive callers should
/// debounce.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Request a refresh. Returns false if the scheduler has stopped.
    pub fn refresh(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Drives aggregation cycles on a fixed interval plus manual requests.
pub struct Scheduler {
    client: Arc<Client>,
    interval: Duration,
    rx: mpsc::Receiver<()>,
    // Held so the channel never closes while the scheduler lives.
    _tx: mpsc::Sender<()>,
}

impl Scheduler {
    /// Create a scheduler and the handle used to trigger manual refreshes.
    pub fn new(client: Arc<Client>, interval: Duration) -> (Self, RefreshHandle) {
        let (tx, rx) = mpsc::channel(1);
        let handle = RefreshHandle { tx: tx.clone() };
        (
            Self {
                client,
                interval,
                rx,
                _tx: tx,
            },
            handle,
        )
    }

    /// Run cycles forever, handing each result to `on_cycle`.
    ///
    /// The first cycle runs immediately. Cycles are sequential: a tick that
    /// fires while a cycle is in flight waits for it, so overlapping
    /// cycles cannot publish out of order.
    pub async fn run<F>(mut self, query: CycleQuery, mut on_cycle: F)
    where
        F: FnMut(AggregateResult),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("interval tick");
                }
                Some(()) = self.rx.recv() => {
                    debug!("manual refresh requested");
                }
            }

            let result = self.client.aggregate(&query).await;
            on_cycle(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refresh_handle_reports_liveness() {
        let client = Arc::new(Client::builder().build());
        let (scheduler, handle) = Scheduler::new(client, Duration::from_secs(600));

        assert!(handle.refresh());
        drop(scheduler);
        assert!(!handle.refresh());
    }

    #[test]
    fn cadence_constants_match_the_operator_choices() {
        assert!(REFRESH_INTERVALS_SECS.contains(&DEFAULT_REFRESH_SECS));
        assert_eq!(REFRESH_INTERVALS_SECS[0], 30);
        assert_eq!(REFRESH_INTERVALS_SECS[4], 3600);
    }
}
