//! Descriptive metadata for an ingested collection

use crate::{
    core::{bounds::BoundsCalculator, geo::LatLngBounds},
    data::geojson::FeatureCollection,
    prelude::HashSet,
};
use serde::Serialize;
use serde_json::Value;

/// Features inspected when inferring property types
pub const SCHEMA_SAMPLE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    Number,
    String,
}

impl FieldType {
    fn of(value: &Value) -> Option<FieldType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(FieldType::Integer),
            Value::Number(_) => Some(FieldType::Number),
            _ => Some(FieldType::String),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    /// Features actually held
    pub feature_count: usize,
    /// Size of the full dataset when the source reported one
    pub reported_feature_count: Option<u64>,
    /// The source has more features than were delivered
    pub truncated: bool,
    /// Sorted GeoJSON type names
    pub geometry_types: Vec<String>,
    pub bounds: Option<LatLngBounds>,
    /// Property names in first-seen order
    pub properties: Vec<String>,
    /// Share of features with every known property non-null, to 3 decimals
    pub completeness: f64,
    pub schema: Vec<SchemaField>,
}

impl DatasetSummary {
    pub fn from_collection(collection: &FeatureCollection, reported: Option<u64>) -> Self {
        let features = &collection.features;

        let mut geometry_types: Vec<String> = features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(|g| g.type_name().to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        geometry_types.sort();

        let mut properties: Vec<String> = Vec::new();
        for key in features.iter().flat_map(|f| f.property_keys()) {
            if !properties.contains(key) {
                properties.push(key.clone());
            }
        }

        let completeness = if properties.is_empty() || features.is_empty() {
            1.0
        } else {
            let complete = features
                .iter()
                .filter(|f| properties.iter().all(|k| f.property(k).is_some()))
                .count();
            (complete as f64 / features.len() as f64 * 1000.0).round() / 1000.0
        };

        let feature_count = features.len();
        Self {
            feature_count,
            reported_feature_count: reported,
            truncated: reported.map_or(false, |n| n > feature_count as u64),
            geometry_types,
            bounds: BoundsCalculator::from_features(features),
            properties,
            completeness,
            schema: infer_schema(collection),
        }
    }
}

/// Type of each property, taken from its first non-null value among the
/// first [`SCHEMA_SAMPLE_SIZE`] features
pub fn infer_schema(collection: &FeatureCollection) -> Vec<SchemaField> {
    let mut schema: Vec<SchemaField> = Vec::new();
    for feature in collection.features.iter().take(SCHEMA_SAMPLE_SIZE) {
        let Some(props) = &feature.properties else {
            continue;
        };
        for (name, value) in props {
            if schema.iter().any(|field| field.name == *name) {
                continue;
            }
            if let Some(field_type) = FieldType::of(value) {
                schema.push(SchemaField {
                    name: name.clone(),
                    field_type,
                });
            }
        }
    }
    schema
}
