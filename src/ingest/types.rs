// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// Which feed variant produced an item. Scores are only comparable within one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discussion,
    Video,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Discussion, Platform::Video];

    /// Identifier written into the `sources` array of the output document.
    pub fn id(self) -> &'static str {
        match self {
            Platform::Discussion => "reddit",
            Platform::Video => "youtube",
        }
    }
}

/// Platform-specific part of a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformDetail {
    Discussion {
        group: String,
    },
    Video {
        video_id: String,
        channel: Option<String>,
        view_count: u64,
    },
}

/// One discovered piece of content, normalized across platforms.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub topic: String,
    pub url: Option<String>,
    pub why: String,
    pub published_at: Option<i64>, // unix seconds, None if missing/unparseable
    pub age_minutes: u64,          // always >= 1
    pub score: f64,                // ranking only, never persisted
    pub detail: PlatformDetail,
}

impl CandidateItem {
    pub fn platform(&self) -> Platform {
        match self.detail {
            PlatformDetail::Discussion { .. } => Platform::Discussion,
            PlatformDetail::Video { .. } => Platform::Video,
        }
    }

    /// Discussion community or video channel, if known.
    pub fn group(&self) -> Option<&str> {
        match &self.detail {
            PlatformDetail::Discussion { group } => Some(group.as_str()),
            PlatformDetail::Video { channel, .. } => channel.as_deref(),
        }
    }
}

/// Why a single entry was left out of a parsed batch. Expected and common; not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("entry has no title")]
    MissingTitle,
    #[error("entry has no publish timestamp")]
    MissingPublishedAt,
    #[error("entry has no content id")]
    MissingId,
    #[error("entry is {age_minutes} min old, horizon is {horizon_minutes} min")]
    Stale {
        age_minutes: u64,
        horizon_minutes: u64,
    },
    #[error("content id {0} already seen in this result set")]
    DuplicateId(String),
}

/// Failure of one whole source. Recovered by the aggregator: the source contributes nothing.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("{source_name} returned an unparseable document: {reason}")]
    Parse { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: &str, reason: impl ToString) -> Self {
        Self::Unavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: &str, reason: impl ToString) -> Self {
        Self::Parse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result of parsing one document: the kept items plus an audit trail of skipped entries.
#[derive(Debug, Default, Clone)]
pub struct ParsedBatch {
    pub items: Vec<CandidateItem>,
    pub skipped: Vec<SkipReason>,
}

impl ParsedBatch {
    pub fn push(&mut self, entry: Result<CandidateItem, SkipReason>) {
        match entry {
            Ok(item) => self.items.push(item),
            Err(reason) => self.skipped.push(reason),
        }
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the source. `now` is unix seconds, shared by every source in a run.
    async fn fetch_latest(&self, now: i64) -> Result<ParsedBatch, SourceError>;
    fn name(&self) -> &str;
    fn platform(&self) -> Platform;
}
