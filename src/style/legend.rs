//! Legends derived from a layer's color encoding

use crate::{
    core::constants::{Rgb, GRADIENT_PALETTE},
    layers::base::{ColorDomain, Layer},
    style::color::category_color,
};
use serde::Serialize;

/// One categorical swatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub value: String,
    pub color_index: usize,
    pub color: Rgb,
}

/// Legend for a layer's color encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Legend {
    None,
    Gradient {
        attribute: String,
        min: f64,
        max: f64,
        stops: Vec<Rgb>,
    },
    Swatches {
        attribute: String,
        entries: Vec<LegendEntry>,
    },
}

impl Legend {
    pub fn is_none(&self) -> bool {
        matches!(self, Legend::None)
    }
}

pub struct LegendBuilder;

impl LegendBuilder {
    /// Swatch colors use the same index the encoder assigns, so legend and
    /// map agree
    pub fn build(layer: &Layer) -> Legend {
        let Some(encoding) = &layer.color_by else {
            return Legend::None;
        };

        match &encoding.domain {
            ColorDomain::Numeric { min, max } => Legend::Gradient {
                attribute: encoding.attribute.clone(),
                min: *min,
                max: *max,
                stops: GRADIENT_PALETTE.to_vec(),
            },
            ColorDomain::Categorical { values } => Legend::Swatches {
                attribute: encoding.attribute.clone(),
                entries: values
                    .iter()
                    .enumerate()
                    .map(|(color_index, value)| LegendEntry {
                        value: value.clone(),
                        color_index,
                        color: category_color(color_index),
                    })
                    .collect(),
            },
        }
    }
}
