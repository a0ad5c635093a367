use anyhow::Context;
use reddit_aggregator::{
    Config, InFlightGauge, PacedSource, PacerConfig, PostStats, RedditClient, RequestCounter,
    StatReporter, WatermarkPoller,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("loading configuration")?;
    info!("watching r/{} for new submissions", config.client.subreddit);

    let requests = RequestCounter::new();
    let client = Arc::new(
        RedditClient::new(config.client.clone(), requests.clone()).context("building client")?,
    );
    let source = Arc::new(PacedSource::new(client, PacerConfig::default()));

    let stats = Arc::new(PostStats::new());
    let in_flight = InFlightGauge::new();

    StatReporter::new(
        stats.clone(),
        requests,
        in_flight.clone(),
        config.report_interval,
    )
    .spawn();

    WatermarkPoller::new(source, stats, in_flight).run().await;
    Ok(())
}
