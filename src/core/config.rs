//! Configuration for ingestion, layer defaults and color encoding
//!
//! Options are grouped per concern and can be resolved from a preset
//! profile or loaded from JSON overrides.

use crate::core::constants::*;
use crate::{Result, StudioError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum StudioProfile {
    /// Small uploads edited interactively
    Interactive,
    /// Large previews where recomputation must be rare
    LargeDataset,
    Custom(StudioOptions),
}

impl StudioProfile {
    pub fn resolve(&self) -> StudioOptions {
        match self {
            Self::Interactive => StudioOptions::default(),
            Self::LargeDataset => StudioOptions {
                color: ColorConfig {
                    sample_size: 500,
                    cache_size: 1024,
                    ..ColorConfig::default()
                },
                interaction: InteractionConfig {
                    slider_debounce_ms: 300,
                },
                ..StudioOptions::default()
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for StudioProfile {
    fn default() -> Self {
        Self::Interactive
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioOptions {
    pub category: CategoryConfig,
    pub color: ColorConfig,
    pub layer_defaults: LayerDefaults,
    pub ingestion: IngestionConfig,
    pub interaction: InteractionConfig,
}

impl StudioOptions {
    /// Loads options from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: StudioOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |r: f64| r > 0.0 && r <= 1.0;

        if !ratio_ok(self.category.max_ratio) {
            return Err(StudioError::Config(format!(
                "category.max_ratio must be in (0, 1], got {}",
                self.category.max_ratio
            )));
        }
        if !ratio_ok(self.color.numeric_threshold) {
            return Err(StudioError::Config(format!(
                "color.numeric_threshold must be in (0, 1], got {}",
                self.color.numeric_threshold
            )));
        }
        if self.color.max_categories == 0 || self.color.max_categories > LAYER_PALETTE.len() {
            return Err(StudioError::Config(format!(
                "color.max_categories must be in 1..={}, got {}",
                LAYER_PALETTE.len(),
                self.color.max_categories
            )));
        }
        if self.color.sample_size == 0 || self.color.cache_size == 0 {
            return Err(StudioError::Config(
                "color.sample_size and color.cache_size must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.layer_defaults.opacity) {
            return Err(StudioError::Config(format!(
                "layer_defaults.opacity must be in [0, 1], got {}",
                self.layer_defaults.opacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub min_features: usize,
    pub key_sample_size: usize,
    pub max_distinct: usize,
    pub max_ratio: f64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            min_features: CATEGORY_MIN_FEATURES,
            key_sample_size: CATEGORY_KEY_SAMPLE,
            max_distinct: CATEGORY_MAX_DISTINCT,
            max_ratio: CATEGORY_MAX_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Categorical values beyond this many render in the fallback color
    pub max_categories: usize,
    pub numeric_threshold: f64,
    pub sample_size: usize,
    pub cache_size: usize,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            max_categories: DEFAULT_MAX_CATEGORIES,
            numeric_threshold: NUMERIC_THRESHOLD,
            sample_size: CLASSIFY_SAMPLE_SIZE,
            cache_size: DOMAIN_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDefaults {
    pub opacity: f32,
    pub radius: f64,
    pub height: f64,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self {
            opacity: DEFAULT_OPACITY,
            radius: DEFAULT_RADIUS,
            height: DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_features: usize,
    pub max_payload_bytes: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_features: MAX_FEATURES,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub slider_debounce_ms: u64,
}

impl InteractionConfig {
    pub fn slider_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.slider_debounce_ms)
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            slider_debounce_ms: SLIDER_DEBOUNCE_MS,
        }
    }
}
