//! Layer model

use crate::{
    core::constants::Rgb,
    data::geojson::{Feature, GeometryKind},
    Result, StudioError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable layer identifier, assigned at creation
pub type LayerId = String;

/// Rendering mode of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VizType {
    Point,
    Heatmap,
    Hexagon,
    Line,
    Fill,
    #[serde(rename = "3d")]
    Extrusion,
}

impl std::fmt::Display for VizType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VizType::Point => write!(f, "point"),
            VizType::Heatmap => write!(f, "heatmap"),
            VizType::Hexagon => write!(f, "hexagon"),
            VizType::Line => write!(f, "line"),
            VizType::Fill => write!(f, "fill"),
            VizType::Extrusion => write!(f, "3d"),
        }
    }
}

impl GeometryKind {
    /// Rendering modes a layer of this geometry may use
    pub fn viz_types(&self) -> &'static [VizType] {
        match self {
            GeometryKind::Point => &[VizType::Point, VizType::Heatmap, VizType::Hexagon],
            GeometryKind::Line => &[VizType::Line],
            GeometryKind::Polygon => &[VizType::Fill, VizType::Extrusion],
        }
    }

    pub fn default_viz(&self) -> VizType {
        self.viz_types()[0]
    }

    pub fn supports(&self, viz: VizType) -> bool {
        self.viz_types().contains(&viz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorType {
    Numeric,
    Categorical,
}

/// Value range an attribute is encoded over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "colorType", rename_all = "lowercase")]
pub enum ColorDomain {
    Numeric { min: f64, max: f64 },
    /// Distinct values in first-seen order, capped
    Categorical { values: Vec<String> },
}

impl ColorDomain {
    pub fn color_type(&self) -> ColorType {
        match self {
            ColorDomain::Numeric { .. } => ColorType::Numeric,
            ColorDomain::Categorical { .. } => ColorType::Categorical,
        }
    }
}

/// Attribute-driven coloring. Holding attribute and domain together keeps
/// `colorBy`, `colorDomain` and `colorType` set or unset as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorEncoding {
    pub attribute: String,
    pub domain: ColorDomain,
}

impl ColorEncoding {
    pub fn color_type(&self) -> ColorType {
        self.domain.color_type()
    }
}

/// A styled, independently controllable set of same-geometry features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub color: Rgb,
    pub opacity: f32,
    pub geometry_type: GeometryKind,
    pub viz_type: VizType,
    pub radius: f64,
    pub height: f64,
    pub color_by: Option<ColorEncoding>,
    pub data: Arc<[Feature]>,
}

impl Layer {
    pub fn feature_count(&self) -> usize {
        self.data.len()
    }

    pub fn color_by_attribute(&self) -> Option<&str> {
        self.color_by.as_ref().map(|e| e.attribute.as_str())
    }

    pub fn color_type(&self) -> Option<ColorType> {
        self.color_by.as_ref().map(ColorEncoding::color_type)
    }

    /// Returns a copy with `patch` applied. Incompatible visualization types
    /// are rejected; numeric fields are clamped.
    pub fn patched(&self, patch: &LayerPatch) -> Result<Layer> {
        if let Some(viz) = patch.viz_type {
            if !self.geometry_type.supports(viz) {
                return Err(StudioError::InvalidVizType {
                    viz,
                    geometry: self.geometry_type,
                });
            }
        }

        let mut layer = self.clone();
        if let Some(name) = &patch.name {
            layer.name = name.clone();
        }
        if let Some(visible) = patch.visible {
            layer.visible = visible;
        }
        if let Some(color) = patch.color {
            layer.color = color;
        }
        if let Some(opacity) = patch.opacity {
            layer.opacity = if opacity.is_finite() {
                opacity.clamp(0.0, 1.0)
            } else {
                layer.opacity
            };
        }
        if let Some(viz) = patch.viz_type {
            layer.viz_type = viz;
        }
        if let Some(radius) = patch.radius {
            layer.radius = sanitize_scale(radius, layer.radius);
        }
        if let Some(height) = patch.height {
            layer.height = sanitize_scale(height, layer.height);
        }
        if let Some(color_by) = &patch.color_by {
            layer.color_by = color_by.clone();
        }
        Ok(layer)
    }
}

fn sanitize_scale(value: f64, current: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        current
    }
}

/// Partial update for the mutable fields of a [`Layer`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub color: Option<Rgb>,
    pub opacity: Option<f32>,
    pub viz_type: Option<VizType>,
    pub radius: Option<f64>,
    pub height: Option<f64>,
    /// `Some(None)` clears the encoding
    pub color_by: Option<Option<ColorEncoding>>,
}

impl LayerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn viz_type(mut self, viz: VizType) -> Self {
        self.viz_type = Some(viz);
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn color_by(mut self, encoding: Option<ColorEncoding>) -> Self {
        self.color_by = Some(encoding);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
