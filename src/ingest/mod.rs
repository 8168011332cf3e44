// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{CandidateItem, FeedSource, SkipReason};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

/// Titles longer than this are cut (chars, not bytes).
const TITLE_MAX_CHARS: usize = 300;

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "trends_items_parsed_total",
            "Entries kept by a provider parse step."
        );
        describe_counter!(
            "trends_items_skipped_total",
            "Entries skipped at parse time (missing fields, stale, duplicate id)."
        );
        describe_counter!(
            "trends_dedup_total",
            "Items removed by per-platform deduplication."
        );
        describe_counter!(
            "trends_source_errors_total",
            "Whole-source fetch/parse failures."
        );
        describe_histogram!("trends_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!("trends_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Normalize an already-unescaped plain-text title: collapse whitespace, cap length.
/// Angle brackets and ampersands are literal text here and are kept.
pub fn normalize_title(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let mut out = re_ws.replace_all(s, " ").trim().to_string();

    if out.chars().count() > TITLE_MAX_CHARS {
        out = out.chars().take(TITLE_MAX_CHARS).collect();
    }
    out
}

/// Normalize a title whose unescaped text is HTML markup (Atom `type="html"`):
/// strip tags, then decode the HTML entities left in the text.
pub fn normalize_html_title(s: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    let stripped = re_tags.replace_all(s, "");
    normalize_title(&html_escape::decode_html_entities(&stripped))
}

/// Parse a feed timestamp to unix seconds. RFC 3339 (Atom, JSON APIs) first, then RFC 2822 (RSS).
pub fn parse_timestamp(ts: &str) -> Option<i64> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()
        .map(|dt| dt.unix_timestamp())
}

/// Age in whole minutes, floored at 1. A missing timestamp counts as brand new.
pub fn age_minutes(now: i64, published_at: Option<i64>) -> u64 {
    match published_at {
        Some(ts) => {
            let mins = now.saturating_sub(ts) / 60;
            u64::try_from(mins).unwrap_or(0).max(1)
        }
        None => 1,
    }
}

/// Single staleness cutoff shared by every provider. `None` or 0 disables it.
pub fn check_horizon(age_minutes: u64, horizon_minutes: Option<u64>) -> Result<(), SkipReason> {
    match horizon_minutes {
        Some(h) if h > 0 && age_minutes > h => Err(SkipReason::Stale {
            age_minutes,
            horizon_minutes: h,
        }),
        _ => Ok(()),
    }
}

/// Run every source once, in order. A failing source is logged and contributes nothing.
/// Returns (items, number of failed sources).
pub async fn collect(sources: &[Box<dyn FeedSource>], now: i64) -> (Vec<CandidateItem>, usize) {
    ensure_metrics_described();

    let mut items = Vec::new();
    let mut failed = 0usize;
    for src in sources {
        match src.fetch_latest(now).await {
            Ok(batch) => {
                for reason in &batch.skipped {
                    tracing::debug!(source = src.name(), %reason, "entry skipped");
                }
                counter!("trends_items_parsed_total").increment(batch.items.len() as u64);
                counter!("trends_items_skipped_total").increment(batch.skipped.len() as u64);
                tracing::info!(
                    source = src.name(),
                    platform = src.platform().id(),
                    kept = batch.items.len(),
                    skipped = batch.skipped.len(),
                    "source fetched"
                );
                items.extend(batch.items);
            }
            Err(e) => {
                tracing::warn!(error = %e, source = src.name(), "source failed, skipping");
                counter!("trends_source_errors_total").increment(1);
                failed += 1;
            }
        }
    }
    (items, failed)
}
