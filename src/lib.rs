// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod config;
pub mod dedup;
pub mod group_weights;
pub mod ingest;
pub mod output;
pub mod scoring;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{rank, Aggregator, PlatformBucket, RankedBuckets, RunReport};
pub use crate::config::TrendsConfig;
pub use crate::ingest::types::{CandidateItem, FeedSource, Platform, PlatformDetail};
pub use crate::output::{JsonFileSink, OutputSink, TrendRecord};

use std::time::Duration;

/// Shared HTTP client for every source in a run: explicit timeout, descriptive user agent.
pub fn build_http_client(cfg: &TrendsConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.http_timeout_secs.max(1)))
        .user_agent(cfg.user_agent.as_str())
        .build()?;
    Ok(client)
}
