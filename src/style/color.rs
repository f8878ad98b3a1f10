//! Attribute-driven color encoding
//!
//! An attribute is classified once per layer as numeric or categorical and
//! its domain memoized, so repeated styling passes (slider drags, legend
//! redraws) only do the per-feature lookup.

use crate::{
    core::{
        config::ColorConfig,
        constants::{Rgb, FALLBACK_COLOR, GRADIENT_PALETTE, LAYER_PALETTE},
    },
    data::geojson::{category_value, numeric_value, Feature},
    layers::base::{ColorDomain, ColorEncoding, Layer, LayerId},
};
use lru::LruCache;
use std::num::NonZeroUsize;

#[cfg(feature = "debug")]
use log::{debug, trace};

pub struct ColorEncoder {
    config: ColorConfig,
    cache: LruCache<(LayerId, String), ColorDomain>,
}

impl ColorEncoder {
    pub fn new(config: ColorConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            cache: LruCache::new(capacity),
        }
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    /// Encoding for `attribute` over the layer's features. `None` clears it.
    pub fn classify(&mut self, layer: &Layer, attribute: Option<&str>) -> Option<ColorEncoding> {
        let attribute = attribute?;
        let key = (layer.id.clone(), attribute.to_string());

        let domain = match self.cache.get(&key) {
            Some(domain) => {
                #[cfg(feature = "debug")]
                trace!("Domain cache hit for {}/{}", layer.id, attribute);
                domain.clone()
            }
            None => {
                let domain = Self::compute_domain(&self.config, &layer.data, attribute);
                self.cache.put(key, domain.clone());
                domain
            }
        };

        Some(ColorEncoding {
            attribute: attribute.to_string(),
            domain,
        })
    }

    /// Classifies an attribute and computes its domain without touching the
    /// cache. Runs off the UI thread for large layers.
    pub fn compute_domain(config: &ColorConfig, features: &[Feature], attribute: &str) -> ColorDomain {
        let values = move || features.iter().filter_map(move |f| f.property(attribute));

        let mut sampled = 0usize;
        let mut numeric = 0usize;
        for value in values().take(config.sample_size) {
            sampled += 1;
            if numeric_value(value).is_some() {
                numeric += 1;
            }
        }

        let is_numeric = sampled > 0 && numeric as f64 >= config.numeric_threshold * sampled as f64;

        #[cfg(feature = "debug")]
        debug!(
            "Attribute '{}': {}/{} sampled values numeric, using {}",
            attribute,
            numeric,
            sampled,
            if is_numeric { "numeric" } else { "categorical" }
        );

        if is_numeric {
            let (min, max) = values()
                .filter_map(numeric_value)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            return ColorDomain::Numeric { min, max };
        }

        // Each kept value needs its own palette slot
        let cap = config.max_categories.min(LAYER_PALETTE.len());
        let mut distinct: Vec<String> = Vec::new();
        for value in values().filter_map(category_value) {
            if distinct.len() >= cap {
                break;
            }
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        ColorDomain::Categorical { values: distinct }
    }

    /// Stores a domain computed elsewhere, e.g. by a background job
    pub fn insert_domain(&mut self, layer_id: &str, attribute: &str, domain: ColorDomain) {
        self.cache
            .put((layer_id.to_string(), attribute.to_string()), domain);
    }

    /// Drops every memoized domain belonging to `layer_id`
    pub fn invalidate_layer(&mut self, layer_id: &str) {
        let stale: Vec<_> = self
            .cache
            .iter()
            .filter(|((id, _), _)| id == layer_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.cache.pop(&key);
        }
    }

    pub fn cached_domains(&self) -> usize {
        self.cache.len()
    }

    /// Fill color of one feature: the encoded color when the layer has an
    /// encoding, else the layer's own color
    pub fn color_for(layer: &Layer, feature: &Feature) -> Rgb {
        match &layer.color_by {
            Some(encoding) => Self::feature_color(encoding, feature),
            None => layer.color,
        }
    }

    /// Colors for every feature of a layer, in data order
    pub fn layer_colors(layer: &Layer) -> Vec<Rgb> {
        layer
            .data
            .iter()
            .map(|feature| Self::color_for(layer, feature))
            .collect()
    }

    /// Missing, unparsable, out-of-domain and over-cap values are gray
    pub fn feature_color(encoding: &ColorEncoding, feature: &Feature) -> Rgb {
        let Some(value) = feature.property(&encoding.attribute) else {
            return FALLBACK_COLOR;
        };

        match &encoding.domain {
            ColorDomain::Numeric { min, max } => numeric_value(value)
                .and_then(|v| gradient_index(*min, *max, v))
                .map(|i| GRADIENT_PALETTE[i])
                .unwrap_or(FALLBACK_COLOR),
            ColorDomain::Categorical { values } => category_value(value)
                .and_then(|v| values.iter().position(|d| *d == v))
                .map(category_color)
                .unwrap_or(FALLBACK_COLOR),
        }
    }
}

impl Default for ColorEncoder {
    fn default() -> Self {
        Self::new(ColorConfig::default())
    }
}

/// Gradient stop for `value` in `[min, max]`, or `None` outside the domain.
/// A zero-width domain maps to the first stop.
pub fn gradient_index(min: f64, max: f64, value: f64) -> Option<usize> {
    if !value.is_finite() || value < min || value > max {
        return None;
    }
    let span = max - min;
    if span <= 0.0 {
        return Some(0);
    }
    let t = (value - min) / span;
    let stops = GRADIENT_PALETTE.len();
    Some(((t * stops as f64).floor() as usize).min(stops - 1))
}

/// Palette color of the `index`-th categorical value
pub fn category_color(index: usize) -> Rgb {
    LAYER_PALETTE[index % LAYER_PALETTE.len()]
}
