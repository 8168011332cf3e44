// tests/aggregate_pipeline.rs
use async_trait::async_trait;
use rising_trends::aggregate::{rank, Aggregator};
use rising_trends::dedup::dedupe_key;
use rising_trends::ingest::providers::{DiscussionFeedSource, VideoFeedSource};
use rising_trends::ingest::types::{
    CandidateItem, FeedSource, ParsedBatch, Platform, PlatformDetail, SourceError,
};
use rising_trends::output::MemorySink;
use rising_trends::scoring::ScoringPolicy;
use std::collections::HashSet;
use std::fs;

const T0: i64 = 1_735_732_800; // 2025-01-01T12:00:00Z

/// Serves canned items, or fails like an unreachable endpoint.
struct StubSource {
    name: &'static str,
    platform: Platform,
    items: Option<Vec<CandidateItem>>,
}

#[async_trait]
impl FeedSource for StubSource {
    async fn fetch_latest(&self, _now: i64) -> Result<ParsedBatch, SourceError> {
        match &self.items {
            Some(items) => Ok(ParsedBatch {
                items: items.clone(),
                skipped: vec![],
            }),
            None => Err(SourceError::unavailable(self.name, "connection timed out")),
        }
    }
    fn name(&self) -> &str {
        self.name
    }
    fn platform(&self) -> Platform {
        self.platform
    }
}

fn discussion(topic: &str, url: &str, group: &str, age: u64) -> CandidateItem {
    CandidateItem {
        topic: topic.into(),
        url: Some(url.into()),
        why: format!("Rising in r/{group}, updated {age} min ago"),
        published_at: None,
        age_minutes: age,
        score: 0.0,
        detail: PlatformDetail::Discussion {
            group: group.into(),
        },
    }
}

fn video(id: &str, views: u64, age: u64) -> CandidateItem {
    CandidateItem {
        topic: format!("Video {id}"),
        url: Some(format!("https://www.youtube.com/watch?v={id}")),
        why: format!("{views} views, published {age} min ago"),
        published_at: None,
        age_minutes: age,
        score: 0.0,
        detail: PlatformDetail::Video {
            video_id: id.into(),
            channel: None,
            view_count: views,
        },
    }
}

fn assert_sorted_desc(items: &[CandidateItem]) {
    for w in items.windows(2) {
        assert!(w[0].score >= w[1].score, "{} < {}", w[0].score, w[1].score);
    }
}

#[tokio::test]
async fn fixtures_end_to_end_scores_per_platform() {
    let reddit = fs::read_to_string("tests/fixtures/reddit_atom.xml").expect("fixture");
    let yt = fs::read_to_string("tests/fixtures/youtube_popular.json").expect("fixture");
    let sources: Vec<Box<dyn FeedSource>> = vec![
        Box::new(DiscussionFeedSource::from_fixture(&reddit).with_stale_after(Some(720))),
        Box::new(VideoFeedSource::from_fixture(&yt).with_stale_after(Some(720))),
    ];
    let agg = Aggregator::new(sources, ScoringPolicy::default());

    // 12:05: "Foo" was updated 5 minutes earlier
    let report = agg.run_at(T0 + 300).await;
    assert_eq!(report.source_errors, 0);
    assert_eq!(report.dedup_removed, 1);

    let disc = report.ranked.bucket(Platform::Discussion).expect("bucket");
    let topics: Vec<&str> = disc.items.iter().map(|i| i.topic.as_str()).collect();
    // technology (1.3 / 1 min) > funny (1.6 / 5 min) > aww (1.0 / 30 min)
    assert_eq!(
        topics,
        vec![
            "Mystery timestamp",
            "Foo",
            "Cat learns to open fridge & eats the ham"
        ]
    );
    assert!((disc.items[1].score - 0.32).abs() < 1e-9);
    assert!(!topics.contains(&"Foo (repost)"));
    assert_sorted_desc(&disc.items);

    let vids = report.ranked.bucket(Platform::Video).expect("bucket");
    assert_sorted_desc(&vids.items);
    assert_eq!(vids.items.len(), 3);
}

#[tokio::test]
async fn video_velocity_is_views_per_minute() {
    let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(StubSource {
        name: "yt",
        platform: Platform::Video,
        items: Some(vec![video("a", 10_000, 20), video("b", 300_000, 1_000)]),
    })];
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .run_at(T0)
        .await;
    let vids = &report.ranked.bucket(Platform::Video).expect("bucket").items;
    assert_eq!(vids[0].topic, "Video a");
    assert_eq!(vids[0].score, 500.0);
    assert_eq!(vids[1].score, 300.0);
}

#[tokio::test]
async fn same_link_keeps_first_encountered() {
    let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(StubSource {
        name: "r",
        platform: Platform::Discussion,
        items: Some(vec![
            discussion("Original title", "https://www.reddit.com/r/x/1", "x", 10),
            // fresher, so it would win on score if it survived dedupe
            discussion("Edited title", "https://www.reddit.com/r/x/1", "x", 1),
        ]),
    })];
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .run_at(T0)
        .await;
    let disc = &report.ranked.bucket(Platform::Discussion).expect("bucket").items;
    assert_eq!(disc.len(), 1);
    assert_eq!(disc[0].topic, "Original title");
}

#[tokio::test]
async fn thirty_entries_truncate_to_top_twenty() {
    let items: Vec<CandidateItem> = (1..=30u64)
        .rev()
        .map(|age| discussion(&format!("t{age}"), &format!("https://r/{age}"), "misc", age))
        .collect();
    let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(StubSource {
        name: "r",
        platform: Platform::Discussion,
        items: Some(items),
    })];
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .run_at(T0)
        .await;
    let disc = &report.ranked.bucket(Platform::Discussion).expect("bucket").items;
    assert_eq!(disc.len(), 20);
    let ages: Vec<u64> = disc.iter().map(|i| i.age_minutes).collect();
    assert_eq!(ages, (1..=20).collect::<Vec<_>>());
    assert_sorted_desc(disc);
}

#[tokio::test]
async fn failing_source_does_not_abort_others() {
    let sources: Vec<Box<dyn FeedSource>> = vec![
        Box::new(StubSource {
            name: "down",
            platform: Platform::Discussion,
            items: None,
        }),
        Box::new(StubSource {
            name: "up",
            platform: Platform::Discussion,
            items: Some(vec![discussion("Alive", "https://r/alive", "x", 3)]),
        }),
    ];
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .run_at(T0)
        .await;
    assert_eq!(report.source_errors, 1);
    assert_eq!(report.ranked.total(), 1);
    // video platform had no source at all: present but empty
    let vids = report.ranked.bucket(Platform::Video).expect("bucket");
    assert!(vids.items.is_empty());
}

#[tokio::test]
async fn equal_scores_keep_encounter_order() {
    let sources: Vec<Box<dyn FeedSource>> = vec![Box::new(StubSource {
        name: "r",
        platform: Platform::Discussion,
        items: Some(vec![
            discussion("first", "https://r/1", "misc", 4),
            discussion("second", "https://r/2", "misc", 4),
            discussion("third", "https://r/3", "misc", 4),
        ]),
    })];
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .run_at(T0)
        .await;
    let topics: Vec<String> = report
        .ranked
        .bucket(Platform::Discussion)
        .expect("bucket")
        .items
        .iter()
        .map(|i| i.topic.clone())
        .collect();
    assert_eq!(topics, vec!["first", "second", "third"]);
}

#[test]
fn buckets_follow_configured_order_and_never_mix() {
    let items = vec![
        video("v", 1_000_000, 1),
        discussion("d", "https://r/d", "funny", 1),
    ];
    let (ranked, _) = rank(
        items,
        &ScoringPolicy::default(),
        20,
        &[Platform::Video, Platform::Discussion],
    );
    assert_eq!(ranked.buckets[0].platform, Platform::Video);
    assert_eq!(ranked.buckets[1].platform, Platform::Discussion);

    let records = ranked.into_records();
    assert_eq!(records[0].sources, vec!["youtube".to_string()]);
    assert_eq!(records[1].sources, vec!["reddit".to_string()]);
}

#[test]
fn no_duplicate_keys_within_a_bucket() {
    let items = vec![
        discussion("A", "https://r/1", "x", 1),
        discussion("B", "https://r/2", "x", 2),
        discussion("A again", "https://r/1", "x", 3),
        discussion("B again", "https://r/2", "x", 1),
    ];
    let (ranked, removed) = rank(items, &ScoringPolicy::default(), 20, &Platform::ALL);
    assert_eq!(removed, 2);
    let disc = &ranked.bucket(Platform::Discussion).expect("bucket").items;
    let keys: HashSet<String> = disc.iter().filter_map(dedupe_key).collect();
    assert_eq!(keys.len(), disc.len());
}

#[tokio::test]
async fn published_records_have_no_score_field() {
    let sources: Vec<Box<dyn FeedSource>> = vec![
        Box::new(StubSource {
            name: "r",
            platform: Platform::Discussion,
            items: Some(vec![discussion("Foo", "https://r/foo", "funny", 5)]),
        }),
        Box::new(StubSource {
            name: "yt",
            platform: Platform::Video,
            items: Some(vec![video("z", 50, 5)]),
        }),
    ];
    let sink = MemorySink::new();
    let report = Aggregator::new(sources, ScoringPolicy::default())
        .publish(&sink)
        .await
        .expect("memory sink never fails");
    assert_eq!(report.ranked.total(), 2);

    let written = sink.last().expect("one write");
    let json = serde_json::to_value(&written).expect("serialize");
    for rec in json.as_array().expect("array") {
        assert!(rec.get("score").is_none());
        assert_eq!(rec["sources"].as_array().map(Vec::len), Some(1));
    }
    assert_eq!(json[0]["group"], "funny");
}

#[tokio::test]
async fn zero_sources_still_publishes_an_empty_document() {
    let sink = MemorySink::new();
    let report = Aggregator::new(vec![], ScoringPolicy::default())
        .publish(&sink)
        .await
        .expect("ok");
    assert_eq!(report.ranked.buckets.len(), 2);
    assert_eq!(sink.last(), Some(vec![]));
}
