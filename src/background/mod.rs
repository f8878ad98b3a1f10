pub mod ingest;

pub use ingest::{
    AnalysisResponse, DatasetSource, EncodingJob, HttpSource, IngestionGuard, IngestionOutcome,
    InlineSource, Ingestor,
};
