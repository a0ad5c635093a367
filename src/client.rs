use crate::config::ClientConfig;
use crate::metrics::RequestCounter;
use crate::traits::ListingSource;
use crate::types::{AggregatorError, Listing, ListingEnvelope, RateLimitInfo, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

const LISTING_PAGE_SIZE: u32 = 100;
const PROBE_PAGE_SIZE: u32 = 1;
/// How much of an error payload is kept for diagnostics.
const ERROR_BODY_EXCERPT: usize = 256;

/// Thin wrapper around the platform's /r/{subreddit}/new listing. One outbound
/// request per call, no retries, rate-limit headers read on every response.
pub struct RedditClient {
    client: reqwest::Client,
    listing_url: Url,
    token: String,
    requests: RequestCounter,
}

impl RedditClient {
    pub fn new(config: ClientConfig, requests: RequestCounter) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        let listing_url = Url::parse(&format!(
            "https://oauth.reddit.com/r/{}/new",
            config.subreddit
        ))?;

        Ok(Self {
            client,
            listing_url,
            token: config.token,
            requests,
        })
    }

    async fn listing(
        &self,
        after: Option<&str>,
        before: Option<&str>,
        limit: u32,
    ) -> Result<(Listing, RateLimitInfo)> {
        let mut url = self.listing_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(after) = after {
                query.append_pair("after", after);
            }
            if let Some(before) = before {
                query.append_pair("before", before);
            }
            query.append_pair("limit", &limit.to_string());
        }

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("bearer {}", self.token))
            .send()
            .await?;
        self.requests.increment();

        let status = response.status();
        let limits = rate_limits(response.headers());

        if !status.is_success() {
            let body = excerpt(&response.text().await.unwrap_or_default());
            let error = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AggregatorError::Auth {
                    status: status.as_u16(),
                    body,
                },
                _ => AggregatorError::Api {
                    status: status.as_u16(),
                    body,
                },
            };
            return Err(error);
        }

        let body = response.text().await?;
        let listing = decode_listing(&body)?;
        Ok((listing, limits))
    }
}

#[async_trait]
impl ListingSource for RedditClient {
    async fn fetch_new(&self, after: Option<&str>) -> Result<(Listing, RateLimitInfo)> {
        self.listing(after, None, LISTING_PAGE_SIZE).await
    }

    async fn probe(&self) -> Result<(Listing, RateLimitInfo)> {
        self.listing(None, None, PROBE_PAGE_SIZE).await
    }
}

pub(crate) fn decode_listing(body: &str) -> Result<Listing> {
    let envelope: ListingEnvelope = serde_json::from_str(body)?;
    Ok(envelope.into())
}

/// The platform reports these as numbers that are sometimes fractional;
/// absent or malformed values read as 0.
fn rate_limits(headers: &HeaderMap) -> RateLimitInfo {
    RateLimitInfo {
        used: header_number(headers, "x-ratelimit-used"),
        remaining: header_number(headers, "x-ratelimit-remaining"),
        reset: header_number(headers, "x-ratelimit-reset"),
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> u32 {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .map(|value| value.max(0.0) as u32)
        .unwrap_or(0)
}

fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_EXCERPT {
        return body.to_string();
    }
    let mut cut = ERROR_BODY_EXCERPT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    const SAMPLE_LISTING: &str = r#"{
        "data": {
            "after": "t3_abc",
            "dist": 2,
            "children": [
                {"data": {"title": "first", "name": "t3_one", "ups": 12, "author": "alice", "created": 1700000100.0}},
                {"data": {"title": "second", "name": "t3_two", "ups": 3, "author": "bob", "created": 1700000050.0}}
            ],
            "before": null
        }
    }"#;

    #[test]
    fn decodes_listing_envelope() {
        let listing = decode_listing(SAMPLE_LISTING).expect("valid payload");
        assert_eq!(listing.posts.len(), 2);
        assert_eq!(listing.posts[0].id, "t3_one");
        assert_eq!(listing.posts[0].author, "alice");
        assert_eq!(listing.posts[0].created, 1700000100.0);
        assert_eq!(listing.after.as_deref(), Some("t3_abc"));
        assert_eq!(listing.before, None);
    }

    #[test]
    fn empty_cursor_reads_as_none() {
        let body = r#"{"data": {"after": "", "dist": 0, "children": [], "before": ""}}"#;
        let listing = decode_listing(body).expect("valid payload");
        assert!(listing.posts.is_empty());
        assert_eq!(listing.after, None);
        assert_eq!(listing.before, None);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let result = decode_listing("{\"data\": 42}");
        assert!(matches!(result, Err(AggregatorError::Decode(_))));
    }

    #[test]
    fn rate_limit_headers_parse_leniently() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-used", HeaderValue::from_static("34"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("566.0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("not-a-number"));

        let limits = rate_limits(&headers);
        assert_eq!(limits.used, 34);
        assert_eq!(limits.remaining, 566);
        assert_eq!(limits.reset, 0);
    }

    #[test]
    fn error_body_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), 256);
        assert_eq!(excerpt("short"), "short");
    }
}
