// src/ingest/providers/discussion_rss.rs
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{
    CandidateItem, FeedSource, ParsedBatch, Platform, PlatformDetail, SkipReason, SourceError,
};
use crate::ingest::{
    age_minutes, check_horizon, normalize_html_title, normalize_title, parse_timestamp,
};

/// Path segment that precedes the community name in a discussion link (`/r/<group>/`).
const GROUP_PATH_SEGMENT: &str = "r";
pub const UNKNOWN_GROUP: &str = "unknown";

// --- Atom (what discussion sites serve for `.rss` endpoints) ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default, rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    // `link` may repeat anywhere in the entry (self, title, alternate); needs `overlapped-lists`
    #[serde(default, rename = "link")]
    links: Vec<AtomLink>,
    updated: Option<String>,
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

// Atom text constructs: `type` is "text" (default), "html" or "xhtml".
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

impl Text {
    fn is_markup(&self) -> bool {
        matches!(self.kind.as_deref(), Some("html") | Some("xhtml"))
    }
}

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Format-independent view of one feed entry.
struct RawEntry {
    title: Option<String>,
    title_is_html: bool,
    link: Option<String>,
    updated: Option<String>,
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        // Prefer rel="alternate" (or no rel), fall back to the first link with an href.
        let link = e
            .links
            .iter()
            .find(|l| l.href.is_some() && matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.links.iter().find(|l| l.href.is_some()))
            .and_then(|l| l.href.clone());
        let title_is_html = e.title.as_ref().is_some_and(Text::is_markup);
        Self {
            title: e.title.map(|t| t.value),
            title_is_html,
            link,
            updated: e.updated.or(e.published),
        }
    }
}

impl From<RssItem> for RawEntry {
    fn from(i: RssItem) -> Self {
        Self {
            title: i.title,
            title_is_html: false,
            link: i.link,
            updated: i.pub_date,
        }
    }
}

/// Community name following the `/r/` segment of a link, if any.
pub fn group_from_link(link: &str) -> Option<String> {
    let mut segments = link.split('/');
    segments.find(|s| *s == GROUP_PATH_SEGMENT)?;
    let group = segments.next()?;
    let group = group.split(['?', '#']).next().unwrap_or_default().trim();
    if group.is_empty() {
        None
    } else {
        Some(group.to_string())
    }
}

fn build_item(
    raw: RawEntry,
    now: i64,
    horizon_minutes: Option<u64>,
) -> Result<CandidateItem, SkipReason> {
    // quick-xml has already unescaped the text once; only markup titles get a second pass.
    let clean: fn(&str) -> String = if raw.title_is_html {
        normalize_html_title
    } else {
        normalize_title
    };
    let topic = raw.title.as_deref().map(clean).unwrap_or_default();
    if topic.is_empty() {
        return Err(SkipReason::MissingTitle);
    }

    // Unparseable timestamps degrade to "just happened" instead of dropping the entry.
    let published_at = raw.updated.as_deref().and_then(parse_timestamp);
    let age = age_minutes(now, published_at);
    check_horizon(age, horizon_minutes)?;

    let url = raw
        .link
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    let group = url
        .as_deref()
        .and_then(group_from_link)
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string());

    Ok(CandidateItem {
        why: format!("Rising in r/{group}, updated {age} min ago"),
        topic,
        url,
        published_at,
        age_minutes: age,
        score: 0.0,
        detail: PlatformDetail::Discussion { group },
    })
}

fn looks_like_rss2(doc: &str) -> bool {
    doc.contains("<rss")
}

/// Parse an Atom or RSS 2.0 document into discussion candidates.
pub fn parse_feed(
    source_name: &str,
    doc: &str,
    now: i64,
    horizon_minutes: Option<u64>,
) -> Result<ParsedBatch, SourceError> {
    let t0 = std::time::Instant::now();
    let doc = scrub_html_entities_for_xml(doc);

    let raw: Vec<RawEntry> = if looks_like_rss2(&doc) {
        let rss: Rss = from_str(&doc).map_err(|e| SourceError::parse(source_name, e))?;
        rss.channel.items.into_iter().map(RawEntry::from).collect()
    } else {
        let feed: AtomFeed = from_str(&doc).map_err(|e| SourceError::parse(source_name, e))?;
        feed.entries.into_iter().map(RawEntry::from).collect()
    };

    let mut batch = ParsedBatch::default();
    for entry in raw {
        batch.push(build_item(entry, now, horizon_minutes));
    }

    histogram!("trends_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(batch)
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// Discussion feed endpoint. One instance per configured URL so failures stay isolated.
pub struct DiscussionFeedSource {
    name: String,
    mode: Mode,
    stale_after_minutes: Option<u64>,
}

impl DiscussionFeedSource {
    pub fn from_fixture(doc: &str) -> Self {
        Self {
            name: "reddit:fixture".to_string(),
            mode: Mode::Fixture(doc.to_string()),
            stale_after_minutes: None,
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        let url = url.into();
        Self {
            name: format!("reddit:{url}"),
            mode: Mode::Http { url, client },
            stale_after_minutes: None,
        }
    }

    pub fn with_stale_after(mut self, minutes: Option<u64>) -> Self {
        self.stale_after_minutes = minutes;
        self
    }
}

#[async_trait]
impl FeedSource for DiscussionFeedSource {
    async fn fetch_latest(&self, now: i64) -> Result<ParsedBatch, SourceError> {
        match &self.mode {
            Mode::Fixture(doc) => parse_feed(&self.name, doc, now, self.stale_after_minutes),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| SourceError::unavailable(&self.name, e))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| SourceError::unavailable(&self.name, e))?;
                parse_feed(&self.name, &body, now, self.stale_after_minutes)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> Platform {
        Platform::Discussion
    }
}

// HTML entities are not valid XML; feeds leak them into titles anyway.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
