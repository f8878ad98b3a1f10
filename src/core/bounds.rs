//! Bounding boxes over arbitrarily nested coordinate arrays
//!
//! Every entry point returns `None` for "empty" instead of failing: null
//! geometries, empty arrays and non-finite ordinates are all skipped.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::data::geojson::{Feature, Geometry};
use serde_json::Value;

/// Running min/max over the positions seen so far
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsAccumulator {
    bounds: Option<LatLngBounds>,
}

impl BoundsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends by the first two ordinates of a position
    pub fn push_position(&mut self, position: &[f64]) {
        if let Some(point) = LatLng::from_position(position) {
            self.push(point);
        }
    }

    pub fn push(&mut self, point: LatLng) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(&point),
            None => self.bounds = Some(LatLngBounds::from_point(point)),
        }
    }

    pub fn finish(self) -> Option<LatLngBounds> {
        self.bounds
    }
}

/// Computes view-fitting boxes for raw coordinates, geometries and features
pub struct BoundsCalculator;

impl BoundsCalculator {
    /// Recursive descent over raw JSON.
    ///
    /// An array whose first two elements are numbers is a position; any other
    /// array is descended into. Objects are read as geometries through their
    /// `coordinates` or `geometries` members.
    pub fn from_value(value: &Value) -> Option<LatLngBounds> {
        let mut acc = BoundsAccumulator::new();
        Self::visit_value(value, &mut acc);
        acc.finish()
    }

    fn visit_value(value: &Value, acc: &mut BoundsAccumulator) {
        match value {
            Value::Array(items) => match (items.first(), items.get(1)) {
                (Some(Value::Number(lng)), Some(Value::Number(lat))) => {
                    if let (Some(lng), Some(lat)) = (lng.as_f64(), lat.as_f64()) {
                        acc.push_position(&[lng, lat]);
                    }
                }
                _ => {
                    for item in items {
                        Self::visit_value(item, acc);
                    }
                }
            },
            Value::Object(object) => {
                if let Some(coordinates) = object.get("coordinates") {
                    Self::visit_value(coordinates, acc);
                }
                if let Some(geometries) = object.get("geometries") {
                    Self::visit_value(geometries, acc);
                }
                if let Some(geometry) = object.get("geometry") {
                    Self::visit_value(geometry, acc);
                }
                if let Some(features) = object.get("features") {
                    Self::visit_value(features, acc);
                }
            }
            _ => {}
        }
    }

    /// Bounds of a set of features; features without geometry are skipped
    pub fn from_features<'a, I>(features: I) -> Option<LatLngBounds>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let mut acc = BoundsAccumulator::new();
        for geometry in features.into_iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.for_each_position(&mut |position: &[f64]| acc.push_position(position));
        }
        acc.finish()
    }

    /// Whether any coordinate of the geometry falls inside `bounds`
    pub fn touches(geometry: &Geometry, bounds: &LatLngBounds) -> bool {
        let mut hit = false;
        geometry.for_each_position(&mut |position: &[f64]| {
            if !hit {
                hit = LatLng::from_position(position).is_some_and(|p| bounds.contains(&p));
            }
        });
        hit
    }

    /// Keeps features that have at least one coordinate inside `bounds`
    pub fn features_within<'a, I>(features: I, bounds: &LatLngBounds) -> Vec<&'a Feature>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        features
            .into_iter()
            .filter(|f| {
                f.geometry
                    .as_ref()
                    .is_some_and(|geometry| Self::touches(geometry, bounds))
            })
            .collect()
    }
}
