//! Velocity scores: attention accrued per minute of age.
//!
//! - discussion: `group_weight / age_minutes` (recency-dominant)
//! - video:      `view_count / age_minutes`  (views per minute)
//!
//! The two scales are unrelated; only compare scores within one platform.

use crate::group_weights::GroupWeights;
use crate::ingest::types::{CandidateItem, PlatformDetail};

#[derive(Debug, Clone, Default)]
pub struct ScoringPolicy {
    pub group_weights: GroupWeights,
}

impl ScoringPolicy {
    pub fn new(group_weights: GroupWeights) -> Self {
        Self { group_weights }
    }

    pub fn score(&self, item: &CandidateItem) -> f64 {
        match &item.detail {
            PlatformDetail::Discussion { group } => {
                discussion_score(self.group_weights.weight_for(group), item.age_minutes)
            }
            PlatformDetail::Video { view_count, .. } => video_score(*view_count, item.age_minutes),
        }
    }

    /// Fill in `score` for every item.
    pub fn apply(&self, items: &mut [CandidateItem]) {
        for it in items.iter_mut() {
            it.score = self.score(it);
        }
    }
}

pub fn discussion_score(group_weight: f64, age_minutes: u64) -> f64 {
    group_weight.max(0.0) / age_minutes.max(1) as f64
}

pub fn video_score(view_count: u64, age_minutes: u64) -> f64 {
    view_count as f64 / age_minutes.max(1) as f64
}
