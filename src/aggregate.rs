// src/aggregate.rs
//! Orchestrates one run: collect → per-platform dedupe → score → stable sort → truncate → concat.

use anyhow::Result;
use metrics::{counter, gauge};
use std::collections::HashMap;

use crate::config::TrendsConfig;
use crate::dedup::dedupe;
use crate::ingest::providers::{DiscussionFeedSource, VideoFeedSource, VideoQuery};
use crate::ingest::types::{CandidateItem, FeedSource, Platform};
use crate::ingest::{collect, ensure_metrics_described};
use crate::output::{OutputSink, TrendRecord};
use crate::scoring::ScoringPolicy;

pub const DEFAULT_PER_PLATFORM_LIMIT: usize = 20;

/// Ranked, truncated items of one platform (possibly empty).
#[derive(Debug, Clone)]
pub struct PlatformBucket {
    pub platform: Platform,
    pub items: Vec<CandidateItem>,
}

/// One bucket per platform, in configured order.
#[derive(Debug, Clone, Default)]
pub struct RankedBuckets {
    pub buckets: Vec<PlatformBucket>,
}

impl RankedBuckets {
    pub fn bucket(&self, platform: Platform) -> Option<&PlatformBucket> {
        self.buckets.iter().find(|b| b.platform == platform)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.items.len()).sum()
    }

    /// Concatenate buckets into output records; scores are dropped here.
    pub fn into_records(self) -> Vec<TrendRecord> {
        self.buckets
            .into_iter()
            .flat_map(|b| b.items)
            .map(TrendRecord::from)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub ranked: RankedBuckets,
    pub source_errors: usize,
    pub dedup_removed: usize,
}

/// Pure ranking step. Items from one platform never compete with another platform's items.
/// Returns (buckets, items removed by dedupe).
pub fn rank(
    items: Vec<CandidateItem>,
    policy: &ScoringPolicy,
    limit: usize,
    order: &[Platform],
) -> (RankedBuckets, usize) {
    let mut by_platform: HashMap<Platform, Vec<CandidateItem>> = HashMap::new();
    for it in items {
        by_platform.entry(it.platform()).or_default().push(it);
    }

    let mut dedup_removed = 0usize;
    let mut buckets = Vec::with_capacity(order.len());
    for &platform in order {
        let raw = by_platform.remove(&platform).unwrap_or_default();
        let (mut kept, removed) = dedupe(raw);
        dedup_removed += removed;

        policy.apply(&mut kept);
        // sort_by is stable: equal scores keep encounter order
        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        kept.truncate(limit);

        buckets.push(PlatformBucket {
            platform,
            items: kept,
        });
    }

    (RankedBuckets { buckets }, dedup_removed)
}

pub struct Aggregator {
    sources: Vec<Box<dyn FeedSource>>,
    policy: ScoringPolicy,
    limit: usize,
    order: Vec<Platform>,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn FeedSource>>, policy: ScoringPolicy) -> Self {
        Self {
            sources,
            policy,
            limit: DEFAULT_PER_PLATFORM_LIMIT,
            order: Platform::ALL.to_vec(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fixed bucket order in the output. Missing platforms are appended, repeats dropped.
    pub fn with_platform_order(mut self, order: &[Platform]) -> Self {
        self.order = normalize_order(order);
        self
    }

    /// Build every configured source: one discussion source per endpoint plus the video source.
    pub fn from_config(cfg: &TrendsConfig, client: reqwest::Client) -> Self {
        let horizon = cfg.stale_after();
        let mut sources: Vec<Box<dyn FeedSource>> = Vec::new();
        for url in &cfg.discussion_feeds {
            sources.push(Box::new(
                DiscussionFeedSource::from_url(url.clone(), client.clone()).with_stale_after(horizon),
            ));
        }
        let query = VideoQuery {
            region: cfg.video.region.clone(),
            max_results: cfg.video.max_results,
        };
        sources.push(Box::new(
            VideoFeedSource::from_key(cfg.video.api_key.as_deref(), query, client)
                .with_stale_after(horizon),
        ));

        Self::new(sources, ScoringPolicy::new(cfg.group_weights.clone()))
            .with_limit(cfg.per_platform_limit)
            .with_platform_order(&cfg.platform_order)
    }

    pub async fn run_at(&self, now: i64) -> RunReport {
        ensure_metrics_described();

        let (items, source_errors) = collect(&self.sources, now).await;
        let (ranked, dedup_removed) = rank(items, &self.policy, self.limit, &self.order);

        counter!("trends_dedup_total").increment(dedup_removed as u64);
        gauge!("trends_last_run_ts").set(now as f64);
        for b in &ranked.buckets {
            tracing::info!(
                platform = b.platform.id(),
                items = b.items.len(),
                "bucket ranked"
            );
        }

        RunReport {
            ranked,
            source_errors,
            dedup_removed,
        }
    }

    pub async fn run_once(&self) -> RunReport {
        self.run_at(chrono::Utc::now().timestamp()).await
    }

    /// Run and hand the records to `sink`. Only the write can fail.
    pub async fn publish<S: OutputSink + ?Sized>(&self, sink: &S) -> Result<RunReport> {
        let report = self.run_once().await;
        let records = report.ranked.clone().into_records();
        sink.write(&records).await?;
        Ok(report)
    }
}

fn normalize_order(order: &[Platform]) -> Vec<Platform> {
    let mut out: Vec<Platform> = Vec::with_capacity(Platform::ALL.len());
    for &p in order.iter().chain(Platform::ALL.iter()) {
        if !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_completed_and_deduped() {
        assert_eq!(
            normalize_order(&[Platform::Video, Platform::Video]),
            vec![Platform::Video, Platform::Discussion]
        );
        assert_eq!(normalize_order(&[]), Platform::ALL.to_vec());
    }

    #[test]
    fn empty_input_still_yields_every_bucket() {
        let (ranked, removed) = rank(
            vec![],
            &ScoringPolicy::default(),
            DEFAULT_PER_PLATFORM_LIMIT,
            &Platform::ALL,
        );
        assert_eq!(removed, 0);
        assert_eq!(ranked.buckets.len(), 2);
        assert!(ranked.buckets.iter().all(|b| b.items.is_empty()));
    }
}
