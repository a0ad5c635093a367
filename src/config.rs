use crate::types::{AggregatorError, Result};
use std::env;
use std::time::Duration;

pub const TOKEN_VAR: &str = "REDDIT_TOKEN";
pub const SUBREDDIT_VAR: &str = "REDDIT_SUBREDDIT";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth access token sent as the bearer credential.
    pub token: String,
    /// Target subreddit whose /new listing is polled.
    pub subreddit: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub report_interval: Duration,
}

impl Config {
    /// Reads the two required environment variables. Either one missing or
    /// empty is a startup error; nothing else is configurable from outside.
    pub fn from_env() -> Result<Self> {
        let token = require_var(TOKEN_VAR)?;
        let subreddit = require_var(SUBREDDIT_VAR)?;

        Ok(Self {
            client: ClientConfig {
                token,
                subreddit,
                user_agent: "reddit-aggregator/0.1".to_string(),
                timeout_seconds: 5,
            },
            report_interval: Duration::from_secs(5),
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AggregatorError::Config(format!("missing required environment variable {}", name))
        })
}
