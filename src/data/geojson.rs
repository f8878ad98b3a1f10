//! Canonical GeoJSON model
//!
//! Raw payloads are normalized into these types once, at the ingestion
//! boundary (see [`crate::data::normalize`]). Nothing downstream looks at
//! untyped JSON shapes again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON position: `[lng, lat]` with optional extra ordinates
pub type Position = Vec<f64>;

/// Feature property bag
pub type Properties = Map<String, Value>;

/// The three geometry classes a layer can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// All kinds, in bucket order
    pub const ALL: [GeometryKind; 3] = [GeometryKind::Point, GeometryKind::Line, GeometryKind::Polygon];

    /// Plural label used as a layer name suffix
    pub fn label(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Points",
            GeometryKind::Line => "Lines",
            GeometryKind::Polygon => "Polygons",
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "point"),
            GeometryKind::Line => write!(f, "line"),
            GeometryKind::Polygon => write!(f, "polygon"),
        }
    }
}

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Geometry class, or `None` for collections
    pub fn kind(&self) -> Option<GeometryKind> {
        match self {
            Geometry::Point { .. } | Geometry::MultiPoint { .. } => Some(GeometryKind::Point),
            Geometry::LineString { .. } | Geometry::MultiLineString { .. } => {
                Some(GeometryKind::Line)
            }
            Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => Some(GeometryKind::Polygon),
            Geometry::GeometryCollection { .. } => None,
        }
    }

    /// GeoJSON type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Calls `f` for every position in the geometry, descending into collections
    pub fn for_each_position<F>(&self, f: &mut F)
    where
        F: FnMut(&[f64]),
    {
        match self {
            Geometry::Point { coordinates } => f(coordinates.as_slice()),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().for_each(|p| f(p.as_slice()))
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(|p| f(p.as_slice()))
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(|p| f(p.as_slice()))
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position(f);
                }
            }
        }
    }

    /// A geometry without a single usable position cannot be drawn
    pub fn is_degenerate(&self) -> bool {
        let mut usable = false;
        self.for_each_position(&mut |p: &[f64]| {
            if p.len() >= 2 && p[0].is_finite() && p[1].is_finite() {
                usable = true;
            }
        });
        !usable
    }
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: None,
        }
    }

    /// Attaches a property, creating the bag if needed
    pub fn with_property<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    /// Gets a property value; JSON `null` counts as missing
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(key))
            .filter(|value| !value.is_null())
    }

    /// Property keys in document order
    pub fn property_keys(&self) -> impl Iterator<Item = &String> {
        self.properties.iter().flat_map(|props| props.keys())
    }

    /// Geometry class of a non-collection geometry
    pub fn kind(&self) -> Option<GeometryKind> {
        self.geometry.as_ref().and_then(Geometry::kind)
    }
}

/// Collection of features
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
    Geometry(Geometry),
}

impl GeoJson {
    /// Flattens any root shape into a collection; a bare geometry becomes one
    /// feature with no properties
    pub fn into_collection(self) -> FeatureCollection {
        match self {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => FeatureCollection::new(vec![feature]),
            GeoJson::Geometry(geometry) => FeatureCollection::new(vec![Feature::new(geometry)]),
        }
    }
}

/// Parses a property value as a finite number; numeric strings are accepted
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// String form of a property value used for category keys; `null` has none
pub fn category_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_geojson_parsing() {
        let geojson_str = r#"
        {
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "Test Point"},
                    "geometry": {
                        "type": "Point",
                        "coordinates": [-74.0060, 40.7128]
                    }
                }
            ]
        }
        "#;

        let geojson: GeoJson = serde_json::from_str(geojson_str).unwrap();
        let collection = geojson.into_collection();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].kind(), Some(GeometryKind::Point));
    }

    #[test]
    fn test_feature_serializes_type_tag() {
        let feature = Feature::new(Geometry::Point {
            coordinates: vec![1.0, 2.0],
        })
        .with_property("kind", "park");

        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["properties"]["kind"], "park");
    }

    #[test]
    fn test_null_property_is_missing() {
        let feature = Feature::new(Geometry::Point {
            coordinates: vec![0.0, 0.0],
        })
        .with_property("a", Value::Null)
        .with_property("b", 3);

        assert!(feature.property("a").is_none());
        assert_eq!(feature.property("b"), Some(&json!(3)));
    }

    #[test]
    fn test_degenerate_geometry() {
        let empty = Geometry::LineString {
            coordinates: vec![],
        };
        assert!(empty.is_degenerate());

        let collection = Geometry::GeometryCollection {
            geometries: vec![
                empty,
                Geometry::Point {
                    coordinates: vec![3.0, 4.0],
                },
            ],
        };
        assert!(!collection.is_degenerate());
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(numeric_value(&json!(" 4.5 ")), Some(4.5));
        assert_eq!(numeric_value(&json!("abc")), None);
        assert_eq!(numeric_value(&json!(true)), None);
        assert_eq!(category_value(&json!(7)), Some("7".to_string()));
        assert_eq!(category_value(&Value::Null), None);
    }
}
