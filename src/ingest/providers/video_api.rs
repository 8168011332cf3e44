// src/ingest/providers/video_api.rs
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;
use std::collections::HashSet;

use crate::ingest::types::{
    CandidateItem, FeedSource, ParsedBatch, Platform, PlatformDetail, SkipReason, SourceError,
};
use crate::ingest::{age_minutes, check_horizon, normalize_title, parse_timestamp};

pub const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
const MAX_RESULTS_CAP: u32 = 50;

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: Option<String>,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    published_at: Option<String>,
    channel_title: Option<String>,
}

// The API encodes counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

fn build_item(
    v: VideoResource,
    now: i64,
    horizon_minutes: Option<u64>,
    seen: &mut HashSet<String>,
) -> Result<CandidateItem, SkipReason> {
    let topic = v
        .snippet
        .title
        .as_deref()
        .map(normalize_title)
        .unwrap_or_default();
    if topic.is_empty() {
        return Err(SkipReason::MissingTitle);
    }
    let raw_published = v
        .snippet
        .published_at
        .filter(|p| !p.trim().is_empty())
        .ok_or(SkipReason::MissingPublishedAt)?;
    let video_id = v
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(SkipReason::MissingId)?;

    let published_at = parse_timestamp(&raw_published);
    let age = age_minutes(now, published_at);
    check_horizon(age, horizon_minutes)?;

    if !seen.insert(video_id.clone()) {
        return Err(SkipReason::DuplicateId(video_id));
    }

    let view_count = v
        .statistics
        .view_count
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(CandidateItem {
        why: format!("{view_count} views, published {age} min ago"),
        topic,
        url: Some(format!("{WATCH_URL_PREFIX}{video_id}")),
        published_at,
        age_minutes: age,
        score: 0.0,
        detail: PlatformDetail::Video {
            video_id,
            channel: v.snippet.channel_title.filter(|c| !c.trim().is_empty()),
            view_count,
        },
    })
}

/// Parse a "list videos" JSON response into video candidates.
pub fn parse_response(
    source_name: &str,
    body: &str,
    now: i64,
    horizon_minutes: Option<u64>,
) -> Result<ParsedBatch, SourceError> {
    let t0 = std::time::Instant::now();
    let resp: VideoListResponse =
        serde_json::from_str(body).map_err(|e| SourceError::parse(source_name, e))?;

    let mut seen = HashSet::new();
    let mut batch = ParsedBatch::default();
    for v in resp.items {
        batch.push(build_item(v, now, horizon_minutes, &mut seen));
    }

    histogram!("trends_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(batch)
}

/// Query parameters for the most-popular chart.
#[derive(Debug, Clone)]
pub struct VideoQuery {
    pub region: String,
    pub max_results: u32,
}

enum Mode {
    /// No credential configured: the source is optional and yields nothing.
    Disabled,
    Fixture(String),
    Http {
        endpoint: String,
        api_key: String,
        query: VideoQuery,
        client: reqwest::Client,
    },
}

pub struct VideoFeedSource {
    mode: Mode,
    stale_after_minutes: Option<u64>,
}

impl VideoFeedSource {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            stale_after_minutes: None,
        }
    }

    /// Build an HTTP source; a missing or blank key yields a disabled source.
    pub fn from_key(api_key: Option<&str>, query: VideoQuery, client: reqwest::Client) -> Self {
        let mode = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Mode::Http {
                endpoint: VIDEOS_ENDPOINT.to_string(),
                api_key: key.to_string(),
                query,
                client,
            },
            None => Mode::Disabled,
        };
        Self {
            mode,
            stale_after_minutes: None,
        }
    }

    pub fn with_stale_after(mut self, minutes: Option<u64>) -> Self {
        self.stale_after_minutes = minutes;
        self
    }

    /// Point an HTTP source at a different endpoint (e.g. a local mock).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        if let Mode::Http { endpoint, .. } = &mut self.mode {
            *endpoint = url.into();
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, Mode::Disabled)
    }
}

#[async_trait]
impl FeedSource for VideoFeedSource {
    async fn fetch_latest(&self, now: i64) -> Result<ParsedBatch, SourceError> {
        match &self.mode {
            Mode::Disabled => {
                tracing::debug!(source = self.name(), "no api key configured, skipping");
                Ok(ParsedBatch::default())
            }
            Mode::Fixture(body) => parse_response(self.name(), body, now, self.stale_after_minutes),
            Mode::Http {
                endpoint,
                api_key,
                query,
                client,
            } => {
                let max_results = query.max_results.clamp(1, MAX_RESULTS_CAP).to_string();
                let resp = client
                    .get(endpoint.as_str())
                    .query(&[
                        ("part", "snippet,statistics"),
                        ("chart", "mostPopular"),
                        ("regionCode", query.region.as_str()),
                        ("maxResults", max_results.as_str()),
                        ("key", api_key.as_str()),
                    ])
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    // reqwest errors carry the full URL; keep the key out of logs
                    .map_err(|e| SourceError::unavailable(self.name(), e.without_url()))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| SourceError::unavailable(self.name(), e.without_url()))?;
                parse_response(self.name(), &body, now, self.stale_after_minutes)
            }
        }
    }

    fn name(&self) -> &str {
        "youtube"
    }

    fn platform(&self) -> Platform {
        Platform::Video
    }
}
