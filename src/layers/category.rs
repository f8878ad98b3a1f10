//! Heuristic detection of a property worth splitting a bucket on

use crate::core::config::CategoryConfig;
use crate::core::constants::CATEGORY_CANDIDATES;
use crate::data::geojson::{category_value, Feature};
use crate::prelude::HashSet;
use once_cell::sync::Lazy;

#[cfg(feature = "debug")]
use log::debug;

/// Lowercased key patterns in match order: each candidate expands to
/// `{name}`, `{name}_name` and `poi_{name}` before the next candidate.
static KEY_PATTERNS: Lazy<Vec<String>> = Lazy::new(|| {
    CATEGORY_CANDIDATES
        .iter()
        .flat_map(|name| [name.to_string(), format!("{name}_name"), format!("poi_{name}")])
        .collect()
});

#[derive(Debug, Clone, Default)]
pub struct CategoryDetector {
    config: CategoryConfig,
}

impl CategoryDetector {
    pub fn new(config: CategoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// Returns the property key to split `features` on, if any.
    ///
    /// Only the first key matching a pattern is evaluated. If its values do
    /// not look like a category the bucket stays unsplit.
    pub fn detect(&self, features: &[Feature]) -> Option<String> {
        if features.len() < self.config.min_features {
            return None;
        }

        let key = self.matching_key(features)?;
        let distinct = Self::distinct_count(features, &key);
        let total = features.len();

        let accepted = (2..=self.config.max_distinct).contains(&distinct)
            && (distinct as f64) < self.config.max_ratio * total as f64;

        #[cfg(feature = "debug")]
        debug!(
            "Category key '{}' has {} distinct values over {} features: {}",
            key,
            distinct,
            total,
            if accepted { "accepted" } else { "rejected" }
        );

        accepted.then_some(key)
    }

    /// First sampled key, in pattern order, that matches a candidate pattern
    fn matching_key(&self, features: &[Feature]) -> Option<String> {
        let mut keys: Vec<&String> = Vec::new();
        for feature in features.iter().take(self.config.key_sample_size) {
            for key in feature.property_keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        KEY_PATTERNS.iter().find_map(|pattern| {
            keys.iter()
                .find(|key| key.to_lowercase() == *pattern)
                .map(|key| key.to_string())
        })
    }

    fn distinct_count(features: &[Feature], key: &str) -> usize {
        features
            .iter()
            .filter_map(|f| f.property(key).and_then(category_value))
            .collect::<HashSet<_>>()
            .len()
    }
}
