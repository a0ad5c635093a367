use crate::metrics::{InFlightGauge, RequestCounter};
use crate::stats::PostStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

/// Periodic read-only view of the aggregate and the shared counters.
pub struct StatReporter {
    stats: Arc<PostStats>,
    requests: RequestCounter,
    in_flight: InFlightGauge,
    period: Duration,
}

impl StatReporter {
    pub fn new(
        stats: Arc<PostStats>,
        requests: RequestCounter,
        in_flight: InFlightGauge,
        period: Duration,
    ) -> Self {
        Self {
            stats,
            requests,
            in_flight,
            period,
        }
    }

    /// Logs a stat line every period until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(self.period);
            tick.tick().await; // first report lands one period in
            loop {
                tick.tick().await;
                let snapshot = self.stats.snapshot().await;
                match &snapshot.top_scored {
                    Some(top) => info!(
                        total_requests = self.requests.get(),
                        in_flight = self.in_flight.get(),
                        total_posts = snapshot.total_posts,
                        top_author = snapshot.top_author.as_deref().unwrap_or("-"),
                        top_post = %top.title,
                        top_ups = top.ups,
                        "stats"
                    ),
                    None => info!(
                        total_requests = self.requests.get(),
                        in_flight = self.in_flight.get(),
                        total_posts = snapshot.total_posts,
                        "stats"
                    ),
                }
            }
        })
    }
}
