//! Asynchronous dataset ingestion
//!
//! Sources are fetched and normalized off the UI thread. Outcomes travel back
//! over a crossbeam channel the UI drains once per frame, so the layer store
//! is only ever touched from one thread.

use crate::{
    core::config::{ColorConfig, IngestionConfig},
    data::{
        formats::InputFormat,
        geojson::{Feature, GeoJson},
        normalize::{check_feature_limit, normalize_value},
        summary::DatasetSummary,
    },
    layers::{
        base::{ColorDomain, LayerId},
        classify::{ClassifiedFeatures, GeometryClassifier},
    },
    style::color::ColorEncoder,
    Result, StudioError,
};
use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "debug")]
use log::{info, warn};

/// Shape returned by the dataset analysis endpoint. `feature_count` is the
/// size of the full dataset and may exceed what the preview holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub preview_geojson: Value,
    #[serde(default)]
    pub feature_count: Option<u64>,
}

impl AnalysisResponse {
    /// Wraps plain GeoJSON that carries no separate count
    pub fn from_geojson(preview_geojson: Value) -> Self {
        Self {
            preview_geojson,
            feature_count: None,
        }
    }

    /// Accepts either the analysis shape or a raw GeoJSON document
    pub fn from_value(value: Value) -> Result<Self> {
        if value.get("preview_geojson").is_some() {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(Self::from_geojson(value))
        }
    }
}

/// Something that can produce a dataset to ingest
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Display name, used as the base name of the created layers
    fn name(&self) -> &str;

    /// Fetches the dataset. Sources must fail with `Oversize` instead of
    /// reading more than `limits.max_payload_bytes`.
    async fn fetch(&self, limits: &IngestionConfig) -> Result<AnalysisResponse>;
}

fn check_payload_size(what: &str, len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(StudioError::Oversize(format!(
            "{} is {} bytes, limit is {}",
            what, len, limit
        )));
    }
    Ok(())
}

/// A payload already in memory, e.g. an uploaded file
pub struct InlineSource {
    name: String,
    payload: String,
}

impl InlineSource {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Reads a local file; the path becomes the source name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let payload = std::fs::read_to_string(path)?;
        Ok(Self::new(path.to_string_lossy(), payload))
    }
}

#[async_trait]
impl DatasetSource for InlineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limits: &IngestionConfig) -> Result<AnalysisResponse> {
        check_payload_size("payload", self.payload.len(), limits.max_payload_bytes)?;

        match InputFormat::detect(&self.payload) {
            Some(InputFormat::GeoJson) | Some(InputFormat::Coordinates) => {
                AnalysisResponse::from_value(serde_json::from_str(&self.payload)?)
            }
            Some(InputFormat::Wkt) => Ok(AnalysisResponse::from_geojson(Value::String(
                self.payload.clone(),
            ))),
            None => Err(StudioError::UnsupportedFormat(format!(
                "could not detect the format of '{}'",
                self.name
            ))),
        }
    }
}

/// A sample dataset or analysis result served over HTTP
pub struct HttpSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limits: &IngestionConfig) -> Result<AnalysisResponse> {
        #[cfg(feature = "debug")]
        info!("Fetching dataset '{}' from {}", self.name, self.url);

        let limit = limits.max_payload_bytes;
        let mut response = self.client.get(&self.url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            check_payload_size("response", length, limit)?;
        }

        // Chunked or unsized bodies are bounded while streaming
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            check_payload_size("response", body.len() + chunk.len(), limit)?;
            body.extend_from_slice(&chunk);
        }

        let value: Value = serde_json::from_slice(&body)?;
        AnalysisResponse::from_value(value)
    }
}

/// Busy flag shared by every ingestion path. At most one ingestion runs at
/// a time; the flag is released when the returned ticket is dropped.
#[derive(Debug, Clone, Default)]
pub struct IngestionGuard {
    busy: Arc<AtomicBool>,
}

impl IngestionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Result<IngestionTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StudioError::IngestionBusy)?;
        Ok(IngestionTicket {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the ingestion slot
#[derive(Debug)]
pub struct IngestionTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for IngestionTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A dataset that parsed and classified, ready to become layers
#[derive(Debug, Clone)]
pub struct PreparedIngestion {
    pub base_name: String,
    pub classified: ClassifiedFeatures,
    pub summary: DatasetSummary,
}

/// Normalizes and classifies a fetched dataset. Only the preview is used;
/// a larger reported count is kept as metadata.
pub fn prepare(
    base_name: &str,
    response: AnalysisResponse,
    config: &IngestionConfig,
) -> Result<PreparedIngestion> {
    let geojson = normalize_value(&response.preview_geojson)?;
    prepare_geojson(base_name, geojson, response.feature_count, config)
}

/// Classifies already normalized input. `reported` is the full dataset size
/// when the source knows it.
pub fn prepare_geojson(
    base_name: &str,
    geojson: GeoJson,
    reported: Option<u64>,
    config: &IngestionConfig,
) -> Result<PreparedIngestion> {
    check_feature_limit(&geojson, config)?;

    let classified = GeometryClassifier::classify(&geojson);
    if classified.is_empty() {
        return Err(StudioError::ClassificationEmpty);
    }

    let summary = DatasetSummary::from_collection(&geojson.into_collection(), reported);

    #[cfg(feature = "debug")]
    {
        if summary.truncated {
            info!(
                "'{}' is a preview: {} of {} features",
                base_name,
                summary.feature_count,
                reported.unwrap_or_default()
            );
        }
    }

    Ok(PreparedIngestion {
        base_name: base_name_from_file(base_name),
        classified,
        summary,
    })
}

/// Strips a trailing file extension: `parks.geojson` becomes `parks`
pub fn base_name_from_file(name: &str) -> String {
    let trimmed = name.trim();
    let file = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    match file.rfind('.') {
        Some(dot) if dot > 0 => file[..dot].to_string(),
        _ => file.to_string(),
    }
}

/// Result of one ingestion attempt
#[derive(Debug)]
pub enum IngestionOutcome {
    Ready(PreparedIngestion),
    Failed { source: String, error: StudioError },
}

/// A claimed ingestion waiting to run on an executor
pub struct IngestionJob {
    source: Arc<dyn DatasetSource>,
    config: IngestionConfig,
    result_tx: Sender<IngestionOutcome>,
    _ticket: IngestionTicket,
}

impl IngestionJob {
    /// Fetches and prepares the dataset, then reports the outcome. The
    /// ingestion slot is released once the outcome is queued.
    pub async fn run(self) {
        let name = self.source.name().to_string();

        #[cfg(feature = "debug")]
        info!("Ingesting '{}'", name);

        let outcome = match self.source.fetch(&self.config).await {
            Ok(response) => prepare(&name, response, &self.config),
            Err(error) => Err(error),
        };

        let outcome = match outcome {
            Ok(prepared) => IngestionOutcome::Ready(prepared),
            Err(error) => {
                #[cfg(feature = "debug")]
                warn!("Ingestion of '{}' failed: {}", name, error);
                IngestionOutcome::Failed {
                    source: name,
                    error,
                }
            }
        };

        let _ = self.result_tx.send(outcome);
    }
}

/// Owns the busy guard and the outcome channel
pub struct Ingestor {
    guard: IngestionGuard,
    config: IngestionConfig,
    result_tx: Sender<IngestionOutcome>,
    result_rx: Receiver<IngestionOutcome>,
}

impl Ingestor {
    pub fn new(config: IngestionConfig) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            guard: IngestionGuard::new(),
            config,
            result_tx,
            result_rx,
        }
    }

    pub fn guard(&self) -> &IngestionGuard {
        &self.guard
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Claims the ingestion slot. Fails with `IngestionBusy` while another
    /// ingestion is in flight.
    pub fn begin(&self, source: Arc<dyn DatasetSource>) -> Result<IngestionJob> {
        let ticket = self.guard.try_begin()?;
        Ok(IngestionJob {
            source,
            config: self.config.clone(),
            result_tx: self.result_tx.clone(),
            _ticket: ticket,
        })
    }

    /// Claims the slot and runs the job on the current tokio runtime
    #[cfg(feature = "tokio-runtime")]
    pub fn spawn(&self, source: Arc<dyn DatasetSource>) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| StudioError::Task(e.to_string()))?;
        let job = self.begin(source)?;
        handle.spawn(job.run());
        Ok(())
    }

    /// Completed outcomes (non-blocking)
    pub fn try_recv(&self) -> Vec<IngestionOutcome> {
        self.result_rx.try_iter().collect()
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(IngestionConfig::default())
    }
}

/// Domain computed off the UI thread for a (layer, attribute) pair
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingResult {
    pub layer_id: LayerId,
    pub attribute: String,
    pub domain: ColorDomain,
}

/// Background color-domain computation for large layers
pub struct EncodingJob {
    pub layer_id: LayerId,
    pub attribute: String,
    features: Arc<[Feature]>,
    config: ColorConfig,
}

impl EncodingJob {
    pub fn new(
        layer_id: impl Into<LayerId>,
        attribute: impl Into<String>,
        features: Arc<[Feature]>,
        config: ColorConfig,
    ) -> Self {
        Self {
            layer_id: layer_id.into(),
            attribute: attribute.into(),
            features,
            config,
        }
    }

    pub async fn run(self) -> Result<EncodingResult> {
        let Self {
            layer_id,
            attribute,
            features,
            config,
        } = self;

        let attr = attribute.clone();
        let domain =
            run_blocking(move || ColorEncoder::compute_domain(&config, &features, &attr)).await?;

        Ok(EncodingResult {
            layer_id,
            attribute,
            domain,
        })
    }

    /// Runs the job and queues the result on `tx`
    pub async fn run_into(self, tx: Sender<Result<EncodingResult>>) {
        let _ = tx.send(self.run().await);
    }
}

/// Runs CPU-bound work on tokio's blocking pool when a runtime is present,
/// inline otherwise
async fn run_blocking<F, R>(task: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    #[cfg(feature = "tokio-runtime")]
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return tokio::task::spawn_blocking(task)
                .await
                .map_err(|e| StudioError::Task(format!("Task execution failed: {}", e)));
        }
    }

    Ok(task())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    fn points(n: usize) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": (0..n).map(|i| json!({
                "type": "Feature",
                "properties": {"i": i},
                "geometry": {"type": "Point", "coordinates": [i as f64 * 0.01, 1.0]}
            })).collect::<Vec<_>>()
        })
    }

    #[test]
    fn test_guard_is_exclusive() {
        let guard = IngestionGuard::new();
        let ticket = guard.try_begin().unwrap();
        assert!(guard.is_busy());
        assert!(matches!(guard.try_begin(), Err(StudioError::IngestionBusy)));
        drop(ticket);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_ok());
    }

    #[test]
    fn test_prepare_preview_is_truncated() {
        let response = AnalysisResponse {
            preview_geojson: points(1000),
            feature_count: Some(5000),
        };
        let prepared = prepare("big.geojson", response, &IngestionConfig::default()).unwrap();
        assert_eq!(prepared.base_name, "big");
        assert_eq!(prepared.classified.points.len(), 1000);
        assert_eq!(prepared.summary.feature_count, 1000);
        assert_eq!(prepared.summary.reported_feature_count, Some(5000));
        assert!(prepared.summary.truncated);
    }

    #[test]
    fn test_prepare_rejects_empty() {
        let response = AnalysisResponse::from_geojson(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {}, "geometry": null}]
        }));
        let err = prepare("x", response, &IngestionConfig::default());
        assert!(matches!(err, Err(StudioError::ClassificationEmpty)));
    }

    #[test]
    fn test_job_reports_through_channel() {
        let ingestor = Ingestor::default();
        let source: Arc<dyn DatasetSource> =
            Arc::new(InlineSource::new("roads.json", "LINESTRING (0 0, 1 1)"));

        let job = ingestor.begin(Arc::clone(&source)).unwrap();
        assert!(matches!(
            ingestor.begin(Arc::clone(&source)),
            Err(StudioError::IngestionBusy)
        ));

        block_on(job.run());
        assert!(!ingestor.is_busy());

        let outcomes = ingestor.try_recv();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            IngestionOutcome::Ready(prepared) => {
                assert_eq!(prepared.base_name, "roads");
                assert_eq!(prepared.classified.lines.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_failed_source_reported() {
        let ingestor = Ingestor::default();
        let source = Arc::new(InlineSource::new("bad", "not a dataset"));
        block_on(ingestor.begin(source).unwrap().run());

        let outcomes = ingestor.try_recv();
        assert!(matches!(
            &outcomes[..],
            [IngestionOutcome::Failed { error: StudioError::UnsupportedFormat(_), .. }]
        ));
    }

    #[test]
    fn test_inline_source_accepts_analysis_shape() {
        let payload = json!({"preview_geojson": points(2), "feature_count": 9}).to_string();
        let response =
            block_on(InlineSource::new("a", payload).fetch(&IngestionConfig::default())).unwrap();
        assert_eq!(response.feature_count, Some(9));

        let tight = IngestionConfig {
            max_payload_bytes: 3,
            ..IngestionConfig::default()
        };
        let limited = InlineSource::new("a", "[1, 2]");
        assert!(matches!(block_on(limited.fetch(&tight)), Err(StudioError::Oversize(_))));
    }

    #[test]
    fn test_job_enforces_configured_payload_limit() {
        let ingestor = Ingestor::new(IngestionConfig {
            max_payload_bytes: 64,
            ..IngestionConfig::default()
        });
        let payload = points(10).to_string();
        assert!(payload.len() > 64);

        block_on(ingestor.begin(Arc::new(InlineSource::new("p", payload))).unwrap().run());
        assert!(matches!(
            &ingestor.try_recv()[..],
            [IngestionOutcome::Failed { error: StudioError::Oversize(_), .. }]
        ));
    }

    #[test]
    fn test_inline_source_from_missing_path() {
        let err = InlineSource::from_path("/nonexistent/mapstudio/data.geojson");
        assert!(matches!(err, Err(StudioError::Io(_))));
    }

    #[test]
    fn test_encoding_job_without_runtime() {
        let features: Arc<[Feature]> = match normalize_value(&points(3)).unwrap() {
            crate::data::geojson::GeoJson::FeatureCollection(c) => c.features.into(),
            other => panic!("unexpected {other:?}"),
        };
        let result = block_on(EncodingJob::new("layer-1", "i", features, ColorConfig::default()).run())
            .unwrap();
        assert_eq!(result.domain, ColorDomain::Numeric { min: 0.0, max: 2.0 });
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name_from_file("data/parks.geojson"), "parks");
        assert_eq!(base_name_from_file(".hidden"), ".hidden");
        assert_eq!(base_name_from_file("Sample roads"), "Sample roads");
    }
}
