use crate::{
    background::ingest::{
        prepare, prepare_geojson, AnalysisResponse, DatasetSource, EncodingJob, EncodingResult,
        IngestionJob, IngestionOutcome, Ingestor, PreparedIngestion,
    },
    core::{
        bounds::BoundsCalculator,
        config::{StudioOptions, StudioProfile},
        constants::Rgb,
        geo::LatLngBounds,
    },
    data::{
        geojson::{FeatureCollection, GeoJson},
        normalize::parse_str,
        summary::DatasetSummary,
    },
    input::debounce::{SliderControl, SliderDebouncer},
    layers::{
        base::{ColorEncoding, Layer, LayerId, LayerPatch},
        category::CategoryDetector,
        factory::{LayerFactory, LayerIdGenerator},
        manager::{LayerSnapshot, LayerStateStore},
    },
    prelude::HashMap,
    style::{
        color::ColorEncoder,
        legend::{Legend, LegendBuilder},
    },
    Result, StudioError,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use instant::Instant;
use serde::Serialize;
use std::sync::Arc;

#[cfg(feature = "debug")]
use log::{debug, info};

/// What a successful ingestion added
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub layer_ids: Vec<LayerId>,
    pub summary: DatasetSummary,
    /// Bounds of the new layers; `None` when nothing had usable coordinates
    pub fit_bounds: Option<LatLngBounds>,
}

/// Owns the layer store and everything derived from it. Lives on the UI
/// thread; async work reports back through [`MapStudio::poll_ingestion`]
/// and [`MapStudio::poll_encodings`].
pub struct MapStudio {
    options: StudioOptions,
    store: LayerStateStore,
    factory: LayerFactory,
    ids: LayerIdGenerator,
    encoder: ColorEncoder,
    ingestor: Ingestor,
    sliders: SliderDebouncer,
    encoding_tx: Sender<Result<EncodingResult>>,
    encoding_rx: Receiver<Result<EncodingResult>>,
    /// Attribute of the latest background encoding requested per layer
    pending_encodings: HashMap<LayerId, String>,
    view: LatLngBounds,
}

impl MapStudio {
    pub fn new(options: StudioOptions) -> Result<Self> {
        options.validate()?;

        let (encoding_tx, encoding_rx) = unbounded();
        Ok(Self {
            store: LayerStateStore::new(),
            factory: LayerFactory::new(
                CategoryDetector::new(options.category.clone()),
                options.layer_defaults.clone(),
            ),
            ids: LayerIdGenerator::new(),
            encoder: ColorEncoder::new(options.color.clone()),
            ingestor: Ingestor::new(options.ingestion.clone()),
            sliders: SliderDebouncer::new(options.interaction.slider_debounce()),
            encoding_tx,
            encoding_rx,
            pending_encodings: HashMap::default(),
            view: LatLngBounds::world(),
            options,
        })
    }

    pub fn from_profile(profile: StudioProfile) -> Result<Self> {
        Self::new(profile.resolve())
    }

    pub fn options(&self) -> &StudioOptions {
        &self.options
    }

    // Ingestion

    /// Parses and ingests a raw payload (GeoJSON, coordinate array or WKT)
    pub fn ingest_str(&mut self, name: &str, data: &str) -> Result<IngestionReport> {
        let _ticket = self.ingestor.guard().try_begin()?;
        let geojson = parse_str(data, &self.options.ingestion)?;
        let prepared = prepare_geojson(name, geojson, None, &self.options.ingestion)?;
        self.apply_prepared(prepared)
    }

    /// Ingests already typed GeoJSON
    pub fn ingest_geojson(&mut self, name: &str, geojson: GeoJson) -> Result<IngestionReport> {
        let _ticket = self.ingestor.guard().try_begin()?;
        let prepared = prepare_geojson(name, geojson, None, &self.options.ingestion)?;
        self.apply_prepared(prepared)
    }

    /// Ingests an analysis response whose preview may be a sample of a
    /// larger dataset
    pub fn ingest_response(
        &mut self,
        name: &str,
        response: AnalysisResponse,
    ) -> Result<IngestionReport> {
        let _ticket = self.ingestor.guard().try_begin()?;
        let prepared = prepare(name, response, &self.options.ingestion)?;
        self.apply_prepared(prepared)
    }

    /// Claims the ingestion slot for `source`. The returned job can run on
    /// any executor; its outcome is picked up by [`Self::poll_ingestion`].
    pub fn begin_ingestion(&self, source: Arc<dyn DatasetSource>) -> Result<IngestionJob> {
        self.ingestor.begin(source)
    }

    /// Starts ingesting `source` on the current tokio runtime
    #[cfg(feature = "tokio-runtime")]
    pub fn spawn_ingestion(&self, source: Arc<dyn DatasetSource>) -> Result<()> {
        self.ingestor.spawn(source)
    }

    pub fn is_ingesting(&self) -> bool {
        self.ingestor.is_busy()
    }

    /// Applies finished ingestions. Failures are returned and leave the
    /// store untouched.
    pub fn poll_ingestion(&mut self) -> Vec<Result<IngestionReport>> {
        self.ingestor
            .try_recv()
            .into_iter()
            .map(|outcome| match outcome {
                IngestionOutcome::Ready(prepared) => self.apply_prepared(prepared),
                IngestionOutcome::Failed { error, .. } => Err(error),
            })
            .collect()
    }

    fn apply_prepared(&mut self, prepared: PreparedIngestion) -> Result<IngestionReport> {
        let PreparedIngestion {
            base_name,
            classified,
            summary,
        } = prepared;

        let layers = self
            .factory
            .build(&base_name, classified, self.store.len(), &mut self.ids);
        let layer_ids: Vec<LayerId> = layers.iter().map(|l| l.id.clone()).collect();
        let fit_bounds = BoundsCalculator::from_features(layers.iter().flat_map(|l| l.data.iter()));

        self.store.add(layers)?;
        if let Some(bounds) = fit_bounds {
            self.view = bounds;
        }

        #[cfg(feature = "debug")]
        info!(
            "Ingested '{}': {} features into {} layers",
            base_name,
            summary.feature_count,
            layer_ids.len()
        );

        Ok(IngestionReport {
            layer_ids,
            summary,
            fit_bounds,
        })
    }

    // Layer state

    pub fn snapshot(&self) -> Arc<LayerSnapshot> {
        self.store.snapshot()
    }

    pub fn layer(&self, id: &str) -> Option<Arc<Layer>> {
        self.store.get(id)
    }

    /// Applies `patch`. A patch that sets or clears the color encoding
    /// supersedes any background encoding still running for the layer.
    pub fn update_layer(&mut self, id: &str, patch: &LayerPatch) -> Result<Arc<Layer>> {
        let updated = self.store.update(id, patch)?;
        if patch.color_by.is_some() {
            self.pending_encodings.remove(id);
        }
        Ok(updated)
    }

    /// Removes a layer and forgets everything cached for it
    pub fn remove_layer(&mut self, id: &str) -> Result<Arc<Layer>> {
        let removed = self.store.remove(id)?;
        self.encoder.invalidate_layer(id);
        self.sliders.discard_layer(id);
        self.pending_encodings.remove(id);
        Ok(removed)
    }

    /// Colors a layer by `attribute`, or restores its flat color with `None`
    pub fn set_color_by(&mut self, id: &str, attribute: Option<&str>) -> Result<Arc<Layer>> {
        let layer = self
            .store
            .get(id)
            .ok_or_else(|| StudioError::LayerNotFound(id.to_string()))?;
        let encoding = self.encoder.classify(&layer, attribute);
        self.update_layer(id, &LayerPatch::new().color_by(encoding))
    }

    /// Prepares an off-thread domain computation for a large layer. Run the
    /// job with [`EncodingJob::run_into`] and [`Self::encoding_sender`].
    /// Only the most recent request per layer is applied; it is dropped if
    /// the encoding is changed in the meantime.
    pub fn color_by_job(&mut self, id: &str, attribute: &str) -> Result<EncodingJob> {
        let layer = self
            .store
            .get(id)
            .ok_or_else(|| StudioError::LayerNotFound(id.to_string()))?;
        self.pending_encodings
            .insert(id.to_string(), attribute.to_string());
        Ok(EncodingJob::new(
            id,
            attribute,
            Arc::clone(&layer.data),
            self.options.color.clone(),
        ))
    }

    pub fn encoding_sender(&self) -> Sender<Result<EncodingResult>> {
        self.encoding_tx.clone()
    }

    /// Applies finished encoding jobs. Results for removed layers and
    /// superseded requests are dropped.
    pub fn poll_encodings(&mut self) -> Vec<Result<Arc<Layer>>> {
        let finished: Vec<_> = self.encoding_rx.try_iter().collect();
        let mut applied = Vec::new();
        for result in finished {
            let result = match result {
                Ok(result) => result,
                Err(error) => {
                    applied.push(Err(error));
                    continue;
                }
            };
            if self.pending_encodings.get(&result.layer_id) != Some(&result.attribute) {
                #[cfg(feature = "debug")]
                debug!(
                    "Dropping stale encoding {}/{}",
                    result.layer_id, result.attribute
                );
                continue;
            }
            self.pending_encodings.remove(&result.layer_id);

            self.encoder
                .insert_domain(&result.layer_id, &result.attribute, result.domain.clone());
            let patch = LayerPatch::new().color_by(Some(ColorEncoding {
                attribute: result.attribute,
                domain: result.domain,
            }));
            match self.store.apply_if_present(&result.layer_id, &patch) {
                Ok(Some(layer)) => applied.push(Ok(layer)),
                Ok(None) => {}
                Err(error) => applied.push(Err(error)),
            }
        }
        applied
    }

    // Sliders

    pub fn push_slider(&mut self, id: &str, control: SliderControl, value: f64) {
        self.push_slider_at(id, control, value, Instant::now());
    }

    pub fn push_slider_at(&mut self, id: &str, control: SliderControl, value: f64, now: Instant) {
        self.sliders.push(id, control, value, now);
    }

    /// Applies slider values that have settled by `now`
    pub fn apply_settled_sliders(&mut self, now: Instant) -> Vec<Result<Arc<Layer>>> {
        let patches = self.sliders.drain_settled(now);
        self.apply_slider_patches(patches)
    }

    /// Applies every pending slider value, e.g. on pointer release
    pub fn flush_sliders(&mut self) -> Vec<Result<Arc<Layer>>> {
        let patches = self.sliders.flush();
        self.apply_slider_patches(patches)
    }

    fn apply_slider_patches(&mut self, patches: Vec<(LayerId, LayerPatch)>) -> Vec<Result<Arc<Layer>>> {
        patches
            .into_iter()
            .filter_map(|(id, patch)| self.store.apply_if_present(&id, &patch).transpose())
            .collect()
    }

    // Derived views

    pub fn legend(&self, id: &str) -> Option<Legend> {
        self.store.get(id).map(|layer| LegendBuilder::build(&layer))
    }

    /// Legends of every layer with a color encoding, in z-order
    pub fn legends(&self) -> Vec<(LayerId, Legend)> {
        self.store
            .snapshot()
            .layers()
            .iter()
            .map(|layer| (layer.id.clone(), LegendBuilder::build(layer)))
            .filter(|(_, legend)| !legend.is_none())
            .collect()
    }

    pub fn feature_colors(&self, id: &str) -> Option<Vec<Rgb>> {
        self.store.get(id).map(|layer| ColorEncoder::layer_colors(&layer))
    }

    /// "Zoom to layer"
    pub fn layer_bounds(&self, id: &str) -> Option<LatLngBounds> {
        self.store
            .get(id)
            .and_then(|layer| BoundsCalculator::from_features(layer.data.iter()))
    }

    /// Bounds of all visible layers
    pub fn fit_bounds(&self) -> Option<LatLngBounds> {
        let snapshot = self.store.snapshot();
        BoundsCalculator::from_features(snapshot.visible().flat_map(|layer| layer.data.iter()))
    }

    /// Current view; the world until something fittable was ingested
    pub fn view(&self) -> LatLngBounds {
        self.view
    }

    // Export

    /// Features of all visible layers in z-order, properties preserved
    pub fn export_visible(&self) -> FeatureCollection {
        let snapshot = self.store.snapshot();
        FeatureCollection::new(
            snapshot
                .visible()
                .flat_map(|layer| layer.data.iter().cloned())
                .collect(),
        )
    }

    /// Visible features with at least one position inside `bounds`
    pub fn export_visible_within(&self, bounds: &LatLngBounds) -> FeatureCollection {
        let snapshot = self.store.snapshot();
        let features = BoundsCalculator::features_within(
            snapshot.visible().flat_map(|layer| layer.data.iter()),
            bounds,
        );
        FeatureCollection::new(features.into_iter().cloned().collect())
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_visible())?)
    }
}

impl Default for MapStudio {
    fn default() -> Self {
        let (encoding_tx, encoding_rx) = unbounded();
        let options = StudioOptions::default();
        Self {
            store: LayerStateStore::new(),
            factory: LayerFactory::default(),
            ids: LayerIdGenerator::new(),
            encoder: ColorEncoder::default(),
            ingestor: Ingestor::default(),
            sliders: SliderDebouncer::new(options.interaction.slider_debounce()),
            encoding_tx,
            encoding_rx,
            pending_encodings: HashMap::default(),
            view: LatLngBounds::world(),
            options,
        }
    }
}
