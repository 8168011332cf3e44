//! Collapse candidates that point at the same content, keeping the first occurrence.

use crate::ingest::types::CandidateItem;
use std::collections::HashSet;

/// Dedupe key: the URL when present and non-empty, else the lower-cased topic.
/// `None` means the item cannot be keyed at all.
pub fn dedupe_key(item: &CandidateItem) -> Option<String> {
    if let Some(url) = item.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    let topic = item.topic.trim();
    if topic.is_empty() {
        None
    } else {
        Some(topic.to_lowercase())
    }
}

/// Order-preserving, idempotent dedupe. Returns (kept, removed_count).
pub fn dedupe(items: Vec<CandidateItem>) -> (Vec<CandidateItem>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut removed = 0usize;

    for it in items {
        match dedupe_key(&it) {
            Some(key) => {
                if seen.insert(key) {
                    keep.push(it)
                } else {
                    removed += 1
                }
            }
            None => removed += 1,
        }
    }
    (keep, removed)
}
