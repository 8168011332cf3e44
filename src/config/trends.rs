// src/config/trends.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::DEFAULT_PER_PLATFORM_LIMIT;
use crate::group_weights::GroupWeights;
use crate::ingest::types::Platform;

pub const ENV_CONFIG_PATH: &str = "TRENDS_CONFIG_PATH";
pub const ENV_VIDEO_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_DISCUSSION_FEEDS: &str = "REDDIT_FEEDS";
pub const ENV_OUTPUT_PATH: &str = "TRENDS_OUTPUT_PATH";
pub const ENV_LIMIT: &str = "TRENDS_LIMIT";

pub const DEFAULT_DISCUSSION_FEED: &str = "https://www.reddit.com/r/all/rising/.rss";
pub const DEFAULT_OUTPUT_PATH: &str = "data/trends.json";
pub const DEFAULT_STALE_AFTER_MINUTES: u64 = 12 * 60;

fn default_region() -> String {
    "US".to_string()
}
fn default_max_results() -> u32 {
    25
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    /// Optional; without it the video platform contributes an empty bucket.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            region: default_region(),
            max_results: default_max_results(),
        }
    }
}

/// Immutable run configuration, resolved once and passed into the aggregator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub discussion_feeds: Vec<String>,
    pub video: VideoConfig,
    pub per_platform_limit: usize,
    /// Staleness cutoff shared by all sources; `None` or 0 keeps everything.
    pub stale_after_minutes: Option<u64>,
    pub platform_order: Vec<Platform>,
    pub group_weights: GroupWeights,
    pub output_path: PathBuf,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            discussion_feeds: vec![DEFAULT_DISCUSSION_FEED.to_string()],
            video: VideoConfig::default(),
            per_platform_limit: DEFAULT_PER_PLATFORM_LIMIT,
            stale_after_minutes: Some(DEFAULT_STALE_AFTER_MINUTES),
            platform_order: Platform::ALL.to_vec(),
            group_weights: GroupWeights::default_seed(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            http_timeout_secs: 10,
            user_agent: concat!("rising-trends/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TrendsConfig {
    pub fn stale_after(&self) -> Option<u64> {
        self.stale_after_minutes.filter(|m| *m > 0)
    }

    /// Load from an explicit path. Supports TOML or JSON (by extension, JSON otherwise tried first).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading trends config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, &ext)
    }

    /// Load using env var + fallbacks:
    /// 1) $TRENDS_CONFIG_PATH (must exist)
    /// 2) config/trends.toml
    /// 3) config/trends.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        for candidate in ["config/trends.toml", "config/trends.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }

    /// File config with environment overrides applied on top.
    pub fn from_env() -> Result<Self> {
        Ok(Self::load_default()?.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = env_non_empty(ENV_VIDEO_API_KEY) {
            self.video.api_key = Some(key);
        }
        if let Some(feeds) = env_non_empty(ENV_DISCUSSION_FEEDS) {
            self.discussion_feeds = split_list(&feeds);
        }
        if let Some(p) = env_non_empty(ENV_OUTPUT_PATH) {
            self.output_path = PathBuf::from(p);
        }
        if let Some(n) = env_non_empty(ENV_LIMIT).and_then(|s| s.parse::<usize>().ok()) {
            self.per_platform_limit = n;
        }
        self
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|o| o == part) {
            out.push(part.to_string());
        }
    }
    out
}

fn parse_config(s: &str, hint_ext: &str) -> Result<TrendsConfig> {
    match hint_ext {
        "toml" => toml::from_str(s).context("parsing trends config as TOML"),
        "json" => serde_json::from_str(s).context("parsing trends config as JSON"),
        _ => serde_json::from_str(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|e| anyhow!("unsupported trends config format: {e}")),
    }
}
