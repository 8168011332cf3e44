//! # Group Weights
//!
//! Fixed multipliers applied to discussion scores per community ("group").
//!
//! - Case-insensitive lookup; a leading `r/` is ignored.
//! - Unlisted groups (including `unknown`) get `default_weight` (1.0 unless configured).
//! - Weights are non-negative; negative configured values are treated as 0.
//!
//! Loaded as part of `TrendsConfig`; `default_seed()` is used when nothing is configured.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupWeights {
    /// Weight for groups without an explicit entry.
    pub default_weight: f64,
    /// Explicit weights keyed by group name.
    pub weights: HashMap<String, f64>,
}

impl Default for GroupWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl GroupWeights {
    pub fn new(default_weight: f64, weights: HashMap<String, f64>) -> Self {
        let weights = weights
            .into_iter()
            .map(|(k, v)| (normalize(&k), v))
            .collect();
        Self {
            default_weight,
            weights,
        }
    }

    pub fn weight_for(&self, group: &str) -> f64 {
        let g = normalize(group);
        // Config files may use any casing, so fall back to a normalized scan.
        let w = self.weights.get(&g).copied().or_else(|| {
            self.weights
                .iter()
                .find(|(k, _)| normalize(k) == g)
                .map(|(_, &w)| w)
        });
        w.unwrap_or(self.default_weight).max(0.0)
    }

    /// Built-in table favouring fast-moving, broadly shared communities.
    pub fn default_seed() -> Self {
        let weights = [
            ("funny", 1.6),
            ("videos", 1.5),
            ("memes", 1.5),
            ("gaming", 1.4),
            ("technology", 1.3),
            ("movies", 1.3),
            ("worldnews", 1.2),
            ("news", 1.2),
            ("music", 1.1),
            ("sports", 1.1),
            ("askreddit", 1.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            default_weight: 1.0,
            weights,
        }
    }
}

fn normalize(s: &str) -> String {
    let s = s.trim().to_ascii_lowercase();
    s.strip_prefix("r/").map(str::to_string).unwrap_or(s)
}
