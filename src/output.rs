// src/output.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ingest::types::CandidateItem;

/// Externally visible record. Carries no score: ranking data never leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub topic: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group: Option<String>,
    pub why: String,
    #[serde(
        rename = "exampleUrl",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub example_url: Option<String>,
}

impl From<CandidateItem> for TrendRecord {
    fn from(it: CandidateItem) -> Self {
        let platform = it.platform();
        let group = it.group().map(str::to_string);
        Self {
            topic: it.topic,
            sources: vec![platform.id().to_string()],
            group,
            why: it.why,
            example_url: it.url,
        }
    }
}

#[async_trait::async_trait]
pub trait OutputSink: Send + Sync {
    /// Replace the persisted document with `records`.
    async fn write(&self, records: &[TrendRecord]) -> Result<()>;
}

/// Writes a pretty-printed JSON array, fully overwriting the previous run.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl OutputSink for JsonFileSink {
    async fn write(&self, records: &[TrendRecord]) -> Result<()> {
        let body = serde_json::to_string_pretty(records).context("serializing trends")?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        // Write next to the target, then rename, so readers never see a half-written file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;

        tracing::info!(path = %self.path.display(), records = records.len(), "trends written");
        Ok(())
    }
}

// --- Test helper ---
pub struct MemorySink {
    pub calls: std::sync::Mutex<Vec<Vec<TrendRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn last(&self) -> Option<Vec<TrendRecord>> {
        self.calls.lock().ok()?.last().cloned()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OutputSink for MemorySink {
    async fn write(&self, records: &[TrendRecord]) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink mutex poisoned"))?
            .push(records.to_vec());
        Ok(())
    }
}
