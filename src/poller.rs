use crate::metrics::InFlightGauge;
use crate::stats::PostStats;
use crate::traits::ListingSource;
use crate::types::Listing;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Capacity of the pending-continuation queue.
    pub queue_capacity: usize,
    pub retry_initial_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            retry_initial_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
        }
    }
}

/// Timestamp boundary below which every post is considered already delivered.
/// Advanced only through `advance_to`, under the lock, so racing detection
/// cycles cannot both claim the same activity window.
#[derive(Clone, Default)]
pub struct Watermark {
    inner: Arc<RwLock<Option<f64>>>,
}

/// Outcome of a compare-and-advance on the watermark.
pub(crate) enum WindowClaim {
    /// No watermark existed; this timestamp becomes the baseline and nothing
    /// is delivered.
    Baseline,
    /// The newest visible post is at or below the watermark.
    AlreadySeen,
    /// A new window was claimed; drain down to (exclusive) `until`.
    Window { until: f64 },
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<f64> {
        *self.inner.read().await
    }

    pub(crate) async fn advance_to(&self, start: f64) -> WindowClaim {
        let mut current = self.inner.write().await;
        match *current {
            None => {
                *current = Some(start);
                WindowClaim::Baseline
            }
            Some(value) if start <= value => WindowClaim::AlreadySeen,
            Some(value) => {
                *current = Some(start);
                WindowClaim::Window { until: value }
            }
        }
    }
}

/// Pending page of a claimed activity window.
///
/// Carries the window's lower bound alongside the cursor: the shared watermark
/// has already advanced past it, so each in-flight chain drains against its
/// own captured bound.
#[derive(Debug)]
struct Continuation {
    after: String,
    until: f64,
}

/// The aggregation core: detects new activity past the watermark and drains
/// each claimed window into the aggregate exactly once.
pub struct WatermarkPoller {
    shared: Arc<PollerShared>,
    continuations: mpsc::Receiver<Continuation>,
}

struct PollerShared {
    source: Arc<dyn ListingSource>,
    stats: Arc<PostStats>,
    in_flight: InFlightGauge,
    config: PollerConfig,
    watermark: Watermark,
    pending: mpsc::Sender<Continuation>,
}

impl WatermarkPoller {
    pub fn new(source: Arc<dyn ListingSource>, stats: Arc<PostStats>, in_flight: InFlightGauge) -> Self {
        Self::with_config(source, stats, in_flight, PollerConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn ListingSource>,
        stats: Arc<PostStats>,
        in_flight: InFlightGauge,
        config: PollerConfig,
    ) -> Self {
        let (pending, continuations) = mpsc::channel(config.queue_capacity);
        Self {
            shared: Arc::new(PollerShared {
                source,
                stats,
                in_flight,
                config,
                watermark: Watermark::new(),
                pending,
            }),
            continuations,
        }
    }

    /// Handle onto the shared watermark, readable while the poller runs.
    pub fn watermark(&self) -> Watermark {
        self.shared.watermark.clone()
    }

    /// Runs forever: one bootstrap, then detection cycles interleaved with
    /// continuation drains. Pending continuations take priority over fresh
    /// detection so claimed windows drain before new ones are probed; the
    /// loop is paced naturally because every fetch blocks on the pacer.
    pub async fn run(mut self) {
        self.shared.bootstrap().await;
        loop {
            match self.continuations.try_recv() {
                Ok(continuation) => {
                    let shared = self.shared.clone();
                    tokio::spawn(async move {
                        shared.drain_continuation(continuation).await;
                    });
                }
                Err(TryRecvError::Empty) => self.shared.detect_cycle().await,
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

impl PollerShared {
    /// One-time baseline: the newest visible post's timestamp becomes the
    /// watermark, and nothing at or before it is delivered. A failed or empty
    /// bootstrap leaves the watermark unset; the first successful detection
    /// establishes the baseline instead.
    async fn bootstrap(&self) {
        let _guard = self.in_flight.enter();
        match self.source.fetch_new(None).await {
            Ok((listing, _)) => match listing.posts.first() {
                Some(first) => {
                    self.watermark.advance_to(first.created).await;
                    info!("baseline watermark set to {}", first.created);
                }
                None => debug!("empty listing at startup, baseline deferred"),
            },
            Err(e) => warn!("bootstrap fetch failed, baseline deferred: {}", e),
        }
    }

    /// One no-cursor probe: claims and drains a new activity window when the
    /// newest visible post is past the watermark. Fetch errors abandon the
    /// cycle; the next loop iteration retries.
    async fn detect_cycle(&self) {
        let _guard = self.in_flight.enter();
        let listing = match self.source.fetch_new(None).await {
            Ok((listing, _)) => listing,
            Err(e) => {
                warn!("detection fetch failed, cycle abandoned: {}", e);
                return;
            }
        };
        let start = match listing.posts.first() {
            Some(first) => first.created,
            None => return,
        };

        match self.watermark.advance_to(start).await {
            WindowClaim::Baseline => {
                info!("baseline watermark set to {}", start);
            }
            WindowClaim::AlreadySeen => {}
            WindowClaim::Window { until } => {
                debug!("claimed activity window from {} down to {}", start, until);
                self.drain_page(listing, until).await;
            }
        }
    }

    /// Scans one page newest-first, delivering every post above `until`.
    /// Stops at the bound, or queues the next page when the window continues
    /// past this one.
    async fn drain_page(&self, listing: Listing, until: f64) {
        for (idx, post) in listing.posts.iter().enumerate() {
            if post.created <= until {
                self.stats.upsert_all(&listing.posts[..idx]).await;
                self.stats.recompute().await;
                return;
            }
        }
        self.stats.upsert_all(&listing.posts).await;

        match listing.after {
            Some(after) => {
                if let Err(e) = self.pending.send(Continuation { after, until }).await {
                    // the receiver lives as long as the poller; only reachable
                    // during teardown
                    warn!("continuation queue closed, window truncated: {}", e);
                }
            }
            None => {
                // no further pages: the window is drained by exhaustion
                self.stats.recompute().await;
            }
        }
    }

    /// Fetches and drains one queued continuation page. Fetch failures retry
    /// with the same cursor until they succeed: giving up mid-window would
    /// silently drop posts the watermark already counts as delivered.
    async fn drain_continuation(&self, continuation: Continuation) {
        let _guard = self.in_flight.enter();
        let mut backoff = self.retry_backoff();
        let listing = loop {
            match self.source.fetch_new(Some(&continuation.after)).await {
                Ok((listing, _)) => break listing,
                Err(e) => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.retry_max_delay);
                    warn!(
                        "continuation fetch failed, retrying in {:?}: {}",
                        delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };
        self.drain_page(listing, continuation.until).await;
    }

    fn retry_backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: self.config.retry_initial_delay,
            initial_interval: self.config.retry_initial_delay,
            max_interval: self.config.retry_max_delay,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watermark_compare_and_advance() {
        let watermark = Watermark::new();
        assert_eq!(watermark.get().await, None);

        assert!(matches!(
            watermark.advance_to(100.0).await,
            WindowClaim::Baseline
        ));
        assert_eq!(watermark.get().await, Some(100.0));

        // at or below the boundary is already seen
        assert!(matches!(
            watermark.advance_to(100.0).await,
            WindowClaim::AlreadySeen
        ));
        assert!(matches!(
            watermark.advance_to(90.0).await,
            WindowClaim::AlreadySeen
        ));
        assert_eq!(watermark.get().await, Some(100.0));

        match watermark.advance_to(150.0).await {
            WindowClaim::Window { until } => assert_eq!(until, 100.0),
            _ => panic!("expected a claimed window"),
        }
        assert_eq!(watermark.get().await, Some(150.0));

        // a racing cycle that lost the claim sees the advanced value
        assert!(matches!(
            watermark.advance_to(150.0).await,
            WindowClaim::AlreadySeen
        ));
    }
}
