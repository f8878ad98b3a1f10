//! # mapstudio
//!
//! A layer engine for schema-less geographic data.
//!
//! Raw GeoJSON (or the coordinate-array and WKT shorthands) is normalized
//! once, split into point, line and polygon buckets, optionally sub-split on
//! a detected category column, and turned into styled [`Layer`] records held
//! in an immutable-snapshot [`LayerStateStore`]. Color encodings, legends,
//! view bounds and exports are pure derivations over those records.

pub mod background;
pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod style;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::BoundsCalculator,
    config::{StudioOptions, StudioProfile},
    geo::{LatLng, LatLngBounds},
    studio::{IngestionReport, MapStudio},
};

pub use data::geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryKind};

pub use layers::{
    base::{ColorDomain, ColorEncoding, ColorType, Layer, LayerPatch, VizType},
    category::CategoryDetector,
    classify::{ClassifiedFeatures, GeometryClassifier},
    factory::LayerFactory,
    manager::{LayerSnapshot, LayerStateStore},
};

pub use style::{
    color::ColorEncoder,
    legend::{Legend, LegendBuilder},
};

pub use background::ingest::{AnalysisResponse, DatasetSource, IngestionGuard};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, StudioError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Input too large: {0}")]
    Oversize(String),

    #[error("No valid geometry found")]
    ClassificationEmpty,

    #[error("Another ingestion is already in progress")]
    IngestionBusy,

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Duplicate layer id: {0}")]
    DuplicateLayer(String),

    #[error("'{viz}' is not available for {geometry} layers")]
    InvalidVizType {
        viz: layers::base::VizType,
        geometry: data::geojson::GeometryKind,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task error: {0}")]
    Task(String),
}

impl StudioError {
    /// Failures of a single ingestion attempt. They are reported to the user
    /// and leave existing layers untouched.
    pub fn is_ingestion_error(&self) -> bool {
        matches!(
            self,
            StudioError::Io(_)
                | StudioError::Network(_)
                | StudioError::Serialization(_)
                | StudioError::ParseError(_)
                | StudioError::UnsupportedFormat(_)
                | StudioError::Oversize(_)
                | StudioError::ClassificationEmpty
                | StudioError::IngestionBusy
        )
    }
}

/// Error type alias for convenience
pub type Error = StudioError;

/// Installs `env_logger` once; later calls are no-ops
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("mapstudio=info"),
    )
    .try_init();
}
