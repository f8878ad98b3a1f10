//! Prelude module for common mapstudio types
//!
//! This module re-exports the most commonly used types and functions
//! for easy importing with `use mapstudio::prelude::*;`

pub use crate::core::{
    bounds::BoundsCalculator,
    config::{
        CategoryConfig, ColorConfig, IngestionConfig, InteractionConfig, LayerDefaults,
        StudioOptions, StudioProfile,
    },
    constants::Rgb,
    geo::{LatLng, LatLngBounds},
    studio::{IngestionReport, MapStudio},
};

pub use crate::data::{
    formats::InputFormat,
    geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryKind},
    summary::DatasetSummary,
};

pub use crate::layers::{
    base::{ColorDomain, ColorEncoding, ColorType, Layer, LayerId, LayerPatch, VizType},
    category::CategoryDetector,
    classify::{ClassifiedFeatures, GeometryClassifier},
    factory::{LayerFactory, LayerIdGenerator},
    manager::{LayerSnapshot, LayerStateStore},
};

pub use crate::style::{
    color::ColorEncoder,
    legend::{Legend, LegendBuilder},
};

pub use crate::input::debounce::SliderControl;

pub use crate::background::ingest::{
    AnalysisResponse, DatasetSource, HttpSource, IngestionOutcome, InlineSource,
};

pub use crate::{Error as StudioError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
