//! Splits normalized input into point, line and polygon buckets

use crate::data::geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryKind, Properties};
use serde_json::Value;

#[cfg(feature = "debug")]
use log::debug;

/// Output of [`GeometryClassifier`]: one ordered bucket per geometry class.
/// Every feature in a bucket carries a non-collection geometry of that class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedFeatures {
    pub points: Vec<Feature>,
    pub lines: Vec<Feature>,
    pub polygons: Vec<Feature>,
    /// Features or collection parts dropped for missing or degenerate geometry
    pub rejected: usize,
}

impl ClassifiedFeatures {
    pub fn bucket(&self, kind: GeometryKind) -> &[Feature] {
        match kind {
            GeometryKind::Point => &self.points,
            GeometryKind::Line => &self.lines,
            GeometryKind::Polygon => &self.polygons,
        }
    }

    fn bucket_mut(&mut self, kind: GeometryKind) -> &mut Vec<Feature> {
        match kind {
            GeometryKind::Point => &mut self.points,
            GeometryKind::Line => &mut self.lines,
            GeometryKind::Polygon => &mut self.polygons,
        }
    }

    /// Features that landed in some bucket
    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.polygons.len()
    }

    /// True when no bucket received a feature
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty buckets in point, line, polygon order
    pub fn into_buckets(self) -> Vec<(GeometryKind, Vec<Feature>)> {
        [
            (GeometryKind::Point, self.points),
            (GeometryKind::Line, self.lines),
            (GeometryKind::Polygon, self.polygons),
        ]
        .into_iter()
        .filter(|(_, features)| !features.is_empty())
        .collect()
    }
}

pub struct GeometryClassifier;

impl GeometryClassifier {
    /// Classifies a FeatureCollection, a bare Feature or a bare Geometry
    pub fn classify(input: &GeoJson) -> ClassifiedFeatures {
        let mut out = ClassifiedFeatures::default();
        match input {
            GeoJson::FeatureCollection(collection) => {
                for feature in &collection.features {
                    Self::push_feature(&mut out, feature);
                }
            }
            GeoJson::Feature(feature) => Self::push_feature(&mut out, feature),
            GeoJson::Geometry(geometry) => Self::push_geometry(&mut out, &None, &None, geometry),
        }

        #[cfg(feature = "debug")]
        debug!(
            "Classified {} points, {} lines, {} polygons ({} rejected)",
            out.points.len(),
            out.lines.len(),
            out.polygons.len(),
            out.rejected
        );

        out
    }

    /// Classifies the features of a collection
    pub fn classify_collection(collection: &FeatureCollection) -> ClassifiedFeatures {
        let mut out = ClassifiedFeatures::default();
        for feature in &collection.features {
            Self::push_feature(&mut out, feature);
        }
        out
    }

    fn push_feature(out: &mut ClassifiedFeatures, feature: &Feature) {
        match &feature.geometry {
            Some(geometry) => {
                Self::push_geometry(out, &feature.id, &feature.properties, geometry)
            }
            None => out.rejected += 1,
        }
    }

    /// Collections are decomposed recursively; each part keeps the parent's
    /// id and properties so category splitting still applies to it.
    fn push_geometry(
        out: &mut ClassifiedFeatures,
        id: &Option<Value>,
        properties: &Option<Properties>,
        geometry: &Geometry,
    ) {
        if let Geometry::GeometryCollection { geometries } = geometry {
            if geometries.is_empty() {
                out.rejected += 1;
            }
            for part in geometries {
                Self::push_geometry(out, id, properties, part);
            }
            return;
        }

        match geometry.kind() {
            Some(kind) if !geometry.is_degenerate() => out.bucket_mut(kind).push(Feature {
                id: id.clone(),
                geometry: Some(geometry.clone()),
                properties: properties.clone(),
            }),
            _ => out.rejected += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GeoJson {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mixed_collection() {
        let input = parse(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]]]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]}},
                {"type": "Feature", "properties": {}, "geometry": null},
                {"type": "Feature", "properties": {}, "geometry": {"type": "MultiPoint", "coordinates": [[2, 2], [3, 3]]}}
            ]
        }));

        let out = GeometryClassifier::classify(&input);
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.polygons.len(), 1);
        assert_eq!(out.rejected, 1);
        for kind in GeometryKind::ALL {
            assert!(out.bucket(kind).iter().all(|f| f.kind() == Some(kind)));
        }
    }

    #[test]
    fn test_geometry_collection_parts_inherit_properties() {
        let input = parse(json!({
            "type": "Feature",
            "id": 7,
            "properties": {"category": "a"},
            "geometry": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Point", "coordinates": [1, 2]},
                    {"type": "GeometryCollection", "geometries": [
                        {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}
                    ]}
                ]
            }
        }));

        let out = GeometryClassifier::classify(&input);
        assert_eq!(out.points.len(), 1);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].property("category"), Some(&json!("a")));
        assert_eq!(out.points[0].id, Some(json!(7)));
    }

    #[test]
    fn test_bare_geometry() {
        let input = parse(json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}));
        let out = GeometryClassifier::classify(&input);
        assert_eq!(out.polygons.len(), 1);
        assert!(out.polygons[0].properties.is_none());
    }

    #[test]
    fn test_degenerate_geometry_dropped() {
        let input = parse(json!({"type": "LineString", "coordinates": []}));
        let out = GeometryClassifier::classify(&input);
        assert!(out.is_empty());
        assert_eq!(out.rejected, 1);
    }

    #[test]
    fn test_order_preserved_and_buckets() {
        let features: Vec<Feature> = (0..5)
            .map(|i| {
                Feature::new(Geometry::Point {
                    coordinates: vec![i as f64, 0.0],
                })
                .with_property("i", i)
            })
            .collect();
        let out = GeometryClassifier::classify_collection(&FeatureCollection::new(features));
        let order: Vec<_> = out.points.iter().map(|f| f.property("i").cloned()).collect();
        assert_eq!(order, (0..5).map(|i| Some(json!(i))).collect::<Vec<_>>());

        let buckets = out.into_buckets();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].0, GeometryKind::Point);
    }
}
