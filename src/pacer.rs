use crate::traits::ListingSource;
use crate::types::{Listing, RateLimitInfo, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Platform quota assumed when the calibration probe cannot report one.
pub const DEFAULT_QUOTA: u32 = 600;
/// The platform's published quota-refresh window.
pub const QUOTA_WINDOW: Duration = Duration::from_secs(600);
/// Stretch added to the window so the paced rate lands under the quota rather
/// than on its boundary.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy)]
pub struct PacerConfig {
    pub window: Duration,
    pub safety_margin: Duration,
    pub default_quota: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            window: QUOTA_WINDOW,
            safety_margin: SAFETY_MARGIN,
            default_quota: DEFAULT_QUOTA,
        }
    }
}

/// Per-request pacing derived from the quota window.
pub fn pacing_interval(config: &PacerConfig, quota: u32) -> Duration {
    (config.window + config.safety_margin) / quota.max(1)
}

/// Quota-paced wrapper around a listing source.
///
/// A background task probes the inner source once for rate-limit telemetry,
/// derives the pacing interval, then feeds a token semaphore: one token
/// immediately, one per interval after that. Every paced call consumes one
/// token before delegating, so any number of concurrent callers block until
/// a release unblocks exactly one of them.
pub struct PacedSource {
    source: Arc<dyn ListingSource>,
    tokens: Arc<Semaphore>,
}

impl PacedSource {
    pub fn new(source: Arc<dyn ListingSource>, config: PacerConfig) -> Self {
        let tokens = Arc::new(Semaphore::new(0));
        tokio::spawn(release_tokens(source.clone(), tokens.clone(), config));
        Self { source, tokens }
    }

    async fn wait_for_token(&self) {
        // the semaphore is never closed while the source is alive
        let permit = self
            .tokens
            .acquire()
            .await
            .expect("pacing semaphore closed");
        permit.forget();
    }
}

#[async_trait]
impl ListingSource for PacedSource {
    async fn fetch_new(&self, after: Option<&str>) -> Result<(Listing, RateLimitInfo)> {
        self.wait_for_token().await;
        self.source.fetch_new(after).await
    }

    async fn probe(&self) -> Result<(Listing, RateLimitInfo)> {
        self.wait_for_token().await;
        self.source.probe().await
    }
}

async fn release_tokens(source: Arc<dyn ListingSource>, tokens: Arc<Semaphore>, config: PacerConfig) {
    let quota = match source.probe().await {
        Ok((_, limits)) => {
            let reported = limits.used + limits.remaining;
            if reported == 0 {
                warn!(
                    "calibration probe reported no quota, assuming {} requests per window",
                    config.default_quota
                );
                config.default_quota
            } else {
                reported
            }
        }
        Err(e) => {
            warn!(
                "calibration probe failed ({}), assuming {} requests per window",
                e, config.default_quota
            );
            config.default_quota
        }
    };

    let interval = pacing_interval(&config, quota);
    info!(
        "request pacer calibrated: {} requests per {:?}, one token every {:?}",
        quota, config.window, interval
    );

    // the first request after calibration goes out without waiting
    tokens.add_permits(1);

    let mut tick = tokio::time::interval(interval);
    tick.tick().await; // consume the immediate tick; releases start one interval out
    loop {
        tick.tick().await;
        // at most one token queued: an unclaimed token means the consumers are
        // idle, and idle time must not accumulate into a burst over quota
        if tokens.available_permits() == 0 {
            tokens.add_permits(1);
        }
    }
}
