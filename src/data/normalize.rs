//! Ingestion boundary: raw, loosely shaped input to canonical [`GeoJson`]
//!
//! Real uploads are inconsistent. Positions carry strings or NaN, features
//! lack a `type`, properties are `null`. Everything is walked as
//! `serde_json::Value` here and converted leniently, so later stages only
//! see well-formed data.

use crate::{
    core::config::IngestionConfig,
    data::{
        formats::{parse_coordinates, parse_wkt, InputFormat},
        geojson::{Feature, FeatureCollection, GeoJson, Geometry, Position, Properties},
    },
    Result, StudioError,
};
use serde_json::Value;

#[cfg(feature = "debug")]
use log::{debug, warn};

/// Parses a raw text payload in any supported format
pub fn parse_str(data: &str, config: &IngestionConfig) -> Result<GeoJson> {
    if data.len() > config.max_payload_bytes {
        return Err(StudioError::Oversize(format!(
            "payload is {} bytes, limit is {}",
            data.len(),
            config.max_payload_bytes
        )));
    }

    let format = InputFormat::detect(data)
        .ok_or_else(|| StudioError::UnsupportedFormat("could not detect input format".into()))?;

    #[cfg(feature = "debug")]
    debug!("Detected {:?} input ({} bytes)", format, data.len());

    let geojson = match format {
        InputFormat::GeoJson | InputFormat::Coordinates => {
            let value: Value = serde_json::from_str(data)?;
            normalize_value(&value)?
        }
        InputFormat::Wkt => GeoJson::Geometry(parse_wkt(data)?),
    };

    check_feature_limit(&geojson, config)?;
    Ok(geojson)
}

/// Rejects collections with more features than allowed
pub fn check_feature_limit(geojson: &GeoJson, config: &IngestionConfig) -> Result<()> {
    if let GeoJson::FeatureCollection(collection) = geojson {
        if collection.len() > config.max_features {
            return Err(StudioError::Oversize(format!(
                "{} features, limit is {}",
                collection.len(),
                config.max_features
            )));
        }
    }
    Ok(())
}

/// Converts any accepted JSON shape: a FeatureCollection, a Feature, a bare
/// geometry, a coordinate array, or a WKT string
pub fn normalize_value(value: &Value) -> Result<GeoJson> {
    match value {
        Value::Object(object) => {
            let kind = object.get("type").and_then(Value::as_str);
            match kind {
                Some("FeatureCollection") => Ok(GeoJson::FeatureCollection(normalize_collection(value))),
                Some("Feature") => Ok(GeoJson::Feature(normalize_feature(value))),
                Some(_) => parse_geometry(value).map(GeoJson::Geometry).ok_or_else(|| {
                    StudioError::ParseError(format!(
                        "invalid or empty geometry of type {}",
                        kind.unwrap_or_default()
                    ))
                }),
                // Untyped object with a features array
                None if object.get("features").map_or(false, Value::is_array) => {
                    Ok(GeoJson::FeatureCollection(normalize_collection(value)))
                }
                None => Err(StudioError::UnsupportedFormat(
                    "object has no GeoJSON type".into(),
                )),
            }
        }
        Value::Array(coords) => parse_coordinates(coords).map(GeoJson::Geometry),
        Value::String(text) => parse_wkt(text).map(GeoJson::Geometry),
        _ => Err(StudioError::UnsupportedFormat(
            "expected a GeoJSON object, coordinate array or WKT string".into(),
        )),
    }
}

fn normalize_collection(value: &Value) -> FeatureCollection {
    let features: Vec<Feature> = value
        .get("features")
        .and_then(Value::as_array)
        .map(|features| {
            features
                .iter()
                .filter(|f| f.is_object())
                .map(normalize_feature)
                .collect()
        })
        .unwrap_or_default();

    #[cfg(feature = "debug")]
    {
        let skipped = value
            .get("features")
            .and_then(Value::as_array)
            .map_or(0, |all| all.len() - features.len());
        if skipped > 0 {
            warn!("Skipped {} non-object entries in features array", skipped);
        }
    }

    FeatureCollection::new(features)
}

/// A feature whose geometry cannot be used keeps `geometry: None` so the
/// classifier can count it as rejected
fn normalize_feature(value: &Value) -> Feature {
    let properties: Option<Properties> = value.get("properties").and_then(Value::as_object).cloned();
    let id = value.get("id").filter(|id| id.is_string() || id.is_number()).cloned();
    let geometry = value.get("geometry").and_then(parse_geometry);

    Feature {
        id,
        geometry,
        properties,
    }
}

/// Leniently converts a geometry object. Invalid positions are dropped;
/// a geometry left without any position is `None`.
pub fn parse_geometry(value: &Value) -> Option<Geometry> {
    let kind = value.get("type")?.as_str()?;

    if kind == "GeometryCollection" {
        let geometries: Vec<Geometry> = value
            .get("geometries")?
            .as_array()?
            .iter()
            .filter_map(parse_geometry)
            .collect();
        return (!geometries.is_empty()).then_some(Geometry::GeometryCollection { geometries });
    }

    let coords = value.get("coordinates")?;
    let geometry = match kind {
        "Point" => Geometry::Point {
            coordinates: position(coords)?,
        },
        "MultiPoint" => Geometry::MultiPoint {
            coordinates: positions(coords)?,
        },
        "LineString" => Geometry::LineString {
            coordinates: positions(coords)?,
        },
        "MultiLineString" => Geometry::MultiLineString {
            coordinates: nested(coords, positions)?,
        },
        "Polygon" => Geometry::Polygon {
            coordinates: nested(coords, positions)?,
        },
        "MultiPolygon" => Geometry::MultiPolygon {
            coordinates: nested(coords, |ring| nested(ring, positions))?,
        },
        _ => return None,
    };

    (!geometry.is_degenerate()).then_some(geometry)
}

/// `[lng, lat, ...]` with finite numbers; numeric strings are accepted
fn position(value: &Value) -> Option<Position> {
    let items = value.as_array()?;
    if items.len() < 2 {
        return None;
    }
    items
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(|v| v.filter(|n| n.is_finite()))
        .collect()
}

fn positions(value: &Value) -> Option<Vec<Position>> {
    let list: Vec<Position> = value.as_array()?.iter().filter_map(position).collect();
    (!list.is_empty()).then_some(list)
}

fn nested<T, F>(value: &Value, inner: F) -> Option<Vec<T>>
where
    F: Fn(&Value) -> Option<T>,
{
    let list: Vec<T> = value.as_array()?.iter().filter_map(inner).collect();
    (!list.is_empty()).then_some(list)
}
