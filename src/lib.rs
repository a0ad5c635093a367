pub mod client;
pub mod config;
pub mod metrics;
pub mod pacer;
pub mod poller;
pub mod reporter;
pub mod stats;
pub mod traits;
pub mod types;

pub use client::RedditClient;
pub use config::{ClientConfig, Config};
pub use metrics::{InFlightGauge, RequestCounter};
pub use pacer::{pacing_interval, PacedSource, PacerConfig};
pub use poller::{PollerConfig, Watermark, WatermarkPoller};
pub use reporter::StatReporter;
pub use stats::PostStats;
pub use traits::ListingSource;
pub use types::{AggregatorError, Listing, Post, RateLimitInfo, Result, StatsSnapshot};
