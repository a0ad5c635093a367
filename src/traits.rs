use crate::types::{Listing, RateLimitInfo, Result};
use async_trait::async_trait;

/// The paginated new-submissions endpoint, abstracted so the pacer can wrap
/// any transport and tests can script pages.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of new submissions, optionally continuing after a
    /// pagination cursor. Exactly one outbound request per call; retry policy
    /// belongs to the caller.
    async fn fetch_new(&self, after: Option<&str>) -> Result<(Listing, RateLimitInfo)>;

    /// Minimal request (smallest page) used only to read the current
    /// rate-quota telemetry.
    async fn probe(&self) -> Result<(Listing, RateLimitInfo)>;
}
