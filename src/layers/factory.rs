//! Turns classified buckets into styled layers, splitting by category
//! where a bucket carries one.

use crate::{
    core::{
        config::LayerDefaults,
        constants::{CATEGORY_OTHER, LAYER_PALETTE, NAME_SEPARATOR},
    },
    data::geojson::{category_value, Feature, GeometryKind},
    layers::{
        base::{Layer, LayerId},
        category::CategoryDetector,
        classify::ClassifiedFeatures,
    },
};

#[cfg(feature = "debug")]
use log::debug;

/// Hands out unique layer ids. The store rejects duplicates, so one generator
/// should serve every factory call that feeds the same store.
#[derive(Debug, Clone, Default)]
pub struct LayerIdGenerator {
    next: u64,
}

impl LayerIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> LayerId {
        self.next += 1;
        format!("layer-{}", self.next)
    }
}

/// Turns classified buckets into layer records with default styling
#[derive(Debug, Clone, Default)]
pub struct LayerFactory {
    detector: CategoryDetector,
    defaults: LayerDefaults,
}

/// One prospective layer before ids and colors are assigned
struct Group {
    kind: GeometryKind,
    suffix: String,
    features: Vec<Feature>,
}

impl LayerFactory {
    pub fn new(detector: CategoryDetector, defaults: LayerDefaults) -> Self {
        Self { detector, defaults }
    }

    /// Builds layers for every non-empty bucket in point, line, polygon order.
    ///
    /// `existing_count` is the number of layers already in the store and
    /// offsets palette assignment so new layers continue the color sequence.
    pub fn build(
        &self,
        base_name: &str,
        classified: ClassifiedFeatures,
        existing_count: usize,
        ids: &mut LayerIdGenerator,
    ) -> Vec<Layer> {
        let mut groups = Vec::new();
        for (kind, features) in classified.into_buckets() {
            match self.detector.detect(&features) {
                Some(key) => groups.extend(Self::split_by(kind, &key, features)),
                None => groups.push(Group {
                    kind,
                    suffix: kind.label().to_string(),
                    features,
                }),
            }
        }

        let named_by_suffix = groups.len() > 1;

        #[cfg(feature = "debug")]
        debug!("Building {} layers for '{}'", groups.len(), base_name);

        groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| {
                let name = if named_by_suffix {
                    format!("{}{}{}", base_name, NAME_SEPARATOR, group.suffix)
                } else {
                    base_name.to_string()
                };
                Layer {
                    id: ids.next_id(),
                    name,
                    visible: true,
                    color: LAYER_PALETTE[(existing_count + index) % LAYER_PALETTE.len()],
                    opacity: self.defaults.opacity,
                    geometry_type: group.kind,
                    viz_type: group.kind.default_viz(),
                    radius: self.defaults.radius,
                    height: self.defaults.height,
                    color_by: None,
                    data: group.features.into(),
                }
            })
            .collect()
    }

    /// Partitions a bucket by the string value of `key`, in first-seen order
    fn split_by(kind: GeometryKind, key: &str, features: Vec<Feature>) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        for feature in features {
            let value = feature
                .property(key)
                .and_then(category_value)
                .unwrap_or_else(|| CATEGORY_OTHER.to_string());

            match groups.iter().position(|g| g.suffix == value) {
                Some(index) => groups[index].features.push(feature),
                None => groups.push(Group {
                    kind,
                    suffix: value,
                    features: vec![feature],
                }),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::geojson::Geometry;

    fn point(category: Option<&str>) -> Feature {
        let feature = Feature::new(Geometry::Point {
            coordinates: vec![1.0, 2.0],
        });
        match category {
            Some(c) => feature.with_property("category", c),
            None => feature,
        }
    }

    fn line() -> Feature {
        Feature::new(Geometry::LineString {
            coordinates: vec![vec![0.0, 0.0], vec![1.0, 1.0]],
        })
    }

    fn polygon() -> Feature {
        Feature::new(Geometry::Polygon {
            coordinates: vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]],
        })
    }

    #[test]
    fn test_single_bucket_keeps_base_name() {
        let classified = ClassifiedFeatures {
            polygons: vec![polygon(), polygon()],
            ..Default::default()
        };
        let layers = LayerFactory::default().build("parks", classified, 0, &mut LayerIdGenerator::new());

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "parks");
        assert_eq!(layers[0].viz_type, crate::layers::base::VizType::Fill);
        assert_eq!(layers[0].opacity, 0.8);
        assert_eq!(layers[0].color, LAYER_PALETTE[0]);
    }

    #[test]
    fn test_mixed_buckets_get_suffixes_and_palette_offset() {
        let classified = ClassifiedFeatures {
            points: vec![point(None)],
            lines: vec![line()],
            polygons: vec![polygon()],
            rejected: 0,
        };
        let mut ids = LayerIdGenerator::new();
        let layers = LayerFactory::default().build("city", classified, 7, &mut ids);

        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["city · Points", "city · Lines", "city · Polygons"]);
        assert_eq!(layers[0].color, LAYER_PALETTE[7]);
        assert_eq!(layers[1].color, LAYER_PALETTE[0]);
        assert_eq!(layers[0].id, "layer-1");
        assert_eq!(layers[2].id, "layer-3");
    }

    #[test]
    fn test_category_split_in_first_seen_order() {
        let mut points = Vec::new();
        for i in 0..30 {
            points.push(point(Some(["b", "a"][i % 2])));
        }
        points.push(point(None));
        let classified = ClassifiedFeatures {
            points,
            ..Default::default()
        };

        let layers = LayerFactory::default().build("poi", classified, 0, &mut LayerIdGenerator::new());
        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["poi · b", "poi · a", "poi · Other"]);
        assert_eq!(layers.iter().map(Layer::feature_count).sum::<usize>(), 31);
        assert!(layers
            .iter()
            .all(|l| l.data.iter().all(|f| f.kind() == Some(GeometryKind::Point))));
    }
}
