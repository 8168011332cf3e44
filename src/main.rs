//! Rising trends — run-once entrypoint.
//! Fetches every configured feed, ranks per platform, and overwrites the trends document.

use anyhow::Context;
use rising_trends::{build_http_client, Aggregator, JsonFileSink, TrendsConfig};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; TRENDS_LOG_FORMAT=json for machine-readable output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rising_trends=info,warn"));

    let json = std::env::var("TRENDS_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TrendsConfig::from_env().context("loading trends config")?;
    info!(
        discussion_feeds = cfg.discussion_feeds.len(),
        video_enabled = cfg.video.api_key.is_some(),
        limit = cfg.per_platform_limit,
        "config loaded"
    );

    let client = build_http_client(&cfg).context("building http client")?;
    let aggregator = Aggregator::from_config(&cfg, client);
    let sink = JsonFileSink::new(cfg.output_path.clone());

    // The only fatal error: failing to write the output document.
    let report = aggregator
        .publish(&sink)
        .await
        .with_context(|| format!("writing {}", sink.path().display()))?;

    if report.source_errors > 0 {
        warn!(failed = report.source_errors, "some sources were skipped");
    }
    info!(
        records = report.ranked.total(),
        dedup_removed = report.dedup_removed,
        "run complete"
    );
    Ok(())
}
