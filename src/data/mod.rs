pub mod formats;
pub mod geojson;
pub mod normalize;
pub mod summary;

pub use formats::InputFormat;
pub use geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryKind};
pub use summary::{DatasetSummary, FieldType, SchemaField};
