use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One submission as delivered by the new-listing endpoint.
///
/// The platform's `name` field is the stable unique id; everything else may be
/// mutated server-side, so an upsert always overwrites with the latest copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "name")]
    pub id: String,
    pub title: String,
    pub ups: i64,
    pub author: String,
    pub created: f64,
}

/// One page of the new-submissions listing, newest first.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub posts: Vec<Post>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// Rate-quota telemetry reported in the listing response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitInfo {
    pub used: u32,
    pub remaining: u32,
    /// Seconds until the quota window resets.
    pub reset: u32,
}

/// Point-in-time view of the aggregate for the reporter.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub total_posts: usize,
    pub top_scored: Option<Post>,
    pub top_author: Option<String>,
    pub taken_at: DateTime<Utc>,
}

/// Wire envelope of the listing endpoint: `data.children[].data` carries the
/// posts, `data.after`/`data.before` the pagination cursors.
#[derive(Debug, Deserialize)]
pub struct ListingEnvelope {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    pub after: Option<String>,
    pub before: Option<String>,
    #[serde(default)]
    pub dist: u32,
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
pub struct ListingChild {
    pub data: Post,
}

impl From<ListingEnvelope> for Listing {
    fn from(envelope: ListingEnvelope) -> Self {
        let data = envelope.data;
        Self {
            posts: data.children.into_iter().map(|child| child.data).collect(),
            // the platform reports exhausted cursors as null or ""
            after: data.after.filter(|cursor| !cursor.is_empty()),
            before: data.before.filter(|cursor| !cursor.is_empty()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authorization rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("error response (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
