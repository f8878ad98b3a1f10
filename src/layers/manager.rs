//! Copy-on-write layer store.
//!
//! Readers hold an `Arc<LayerSnapshot>` that never changes underneath them;
//! every mutation publishes a new snapshot with a higher revision.

use crate::{
    layers::base::{Layer, LayerId, LayerPatch},
    prelude::{HashMap, HashSet},
    Result, StudioError,
};
use std::sync::Arc;

#[cfg(feature = "debug")]
use log::debug;

/// Immutable view of the store at one revision. Later entries draw on top.
#[derive(Debug, Clone, Default)]
pub struct LayerSnapshot {
    layers: Vec<Arc<Layer>>,
    index: HashMap<LayerId, usize>,
    revision: u64,
}

impl LayerSnapshot {
    fn from_layers(layers: Vec<Arc<Layer>>, revision: u64) -> Self {
        let index = layers
            .iter()
            .enumerate()
            .map(|(i, layer)| (layer.id.clone(), i))
            .collect();
        Self {
            layers,
            index,
            revision,
        }
    }

    /// All layers in render order
    pub fn layers(&self) -> &[Arc<Layer>] {
        &self.layers
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Layer>> {
        self.index.get(id).map(|&i| &self.layers[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Visible layers in render order
    pub fn visible(&self) -> impl Iterator<Item = &Arc<Layer>> {
        self.layers.iter().filter(|layer| layer.visible)
    }

    /// Bumped by every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Ordered, keyed layer collection. Each mutation publishes a fresh
/// [`LayerSnapshot`]; snapshots already handed out are never modified.
#[derive(Debug, Clone, Default)]
pub struct LayerStateStore {
    current: Arc<LayerSnapshot>,
}

impl LayerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; cheap to clone and safe to keep across mutations
    pub fn snapshot(&self) -> Arc<LayerSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Layer>> {
        self.current.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.current.contains(id)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn visible_layers(&self) -> Vec<Arc<Layer>> {
        self.current.visible().cloned().collect()
    }

    /// Appends layers on top of the existing ones. The batch is rejected as a
    /// whole if any id is already present or repeated within it.
    pub fn add(&mut self, layers: Vec<Layer>) -> Result<()> {
        let mut seen = HashSet::default();
        for layer in &layers {
            if self.contains(&layer.id) || !seen.insert(layer.id.as_str()) {
                return Err(StudioError::DuplicateLayer(layer.id.clone()));
            }
        }

        #[cfg(feature = "debug")]
        debug!("Adding {} layers", layers.len());

        let mut next = self.current.layers.clone();
        next.extend(layers.into_iter().map(Arc::new));
        self.publish(next);
        Ok(())
    }

    /// Removes a layer and returns it
    pub fn remove(&mut self, id: &str) -> Result<Arc<Layer>> {
        let position = self
            .current
            .index
            .get(id)
            .copied()
            .ok_or_else(|| StudioError::LayerNotFound(id.to_string()))?;

        #[cfg(feature = "debug")]
        debug!("Removing layer {}", id);

        let mut next = self.current.layers.clone();
        let removed = next.remove(position);
        self.publish(next);
        Ok(removed)
    }

    /// Applies a patch to one layer. On error the store is unchanged.
    pub fn update(&mut self, id: &str, patch: &LayerPatch) -> Result<Arc<Layer>> {
        let position = self
            .current
            .index
            .get(id)
            .copied()
            .ok_or_else(|| StudioError::LayerNotFound(id.to_string()))?;

        let updated = Arc::new(self.current.layers[position].patched(patch)?);

        #[cfg(feature = "debug")]
        debug!("Updated layer {} ({:?})", id, patch);

        let mut next = self.current.layers.clone();
        next[position] = Arc::clone(&updated);
        self.publish(next);
        Ok(updated)
    }

    /// Applies a patch computed off the UI thread. Returns `Ok(None)` when the
    /// target layer was removed in the meantime and the result is dropped.
    pub fn apply_if_present(&mut self, id: &str, patch: &LayerPatch) -> Result<Option<Arc<Layer>>> {
        if !self.contains(id) {
            #[cfg(feature = "debug")]
            debug!("Dropping stale result for removed layer {}", id);
            return Ok(None);
        }
        self.update(id, patch).map(Some)
    }

    fn publish(&mut self, layers: Vec<Arc<Layer>>) {
        let revision = self.current.revision + 1;
        self.current = Arc::new(LayerSnapshot::from_layers(layers, revision));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::base::tests::point_layer;
    use crate::layers::base::VizType;

    #[test]
    fn test_add_preserves_order_and_rejects_duplicates() {
        let mut store = LayerStateStore::new();
        store.add(vec![point_layer("a"), point_layer("b")]).unwrap();
        store.add(vec![point_layer("c")]).unwrap();

        let ids: Vec<_> = store.snapshot().layers().iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let err = store.add(vec![point_layer("d"), point_layer("a")]);
        assert!(matches!(err, Err(StudioError::DuplicateLayer(id)) if id == "a"));
        assert_eq!(store.len(), 3);

        let err = store.add(vec![point_layer("e"), point_layer("e")]);
        assert!(matches!(err, Err(StudioError::DuplicateLayer(_))));
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let mut store = LayerStateStore::new();
        store.add(vec![point_layer("a")]).unwrap();
        let before = store.snapshot();

        store
            .update("a", &LayerPatch::new().opacity(0.3).visible(false))
            .unwrap();
        store.add(vec![point_layer("b")]).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(before.get("a").unwrap().opacity, 0.8);
        assert!(before.get("a").unwrap().visible);

        let after = store.snapshot();
        assert_eq!(after.get("a").unwrap().opacity, 0.3);
        assert!(after.revision() > before.revision());
        assert_eq!(store.visible_layers().len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_store_unchanged() {
        let mut store = LayerStateStore::new();
        store.add(vec![point_layer("a")]).unwrap();
        let revision = store.snapshot().revision();

        let err = store.update("a", &LayerPatch::new().viz_type(VizType::Line));
        assert!(matches!(err, Err(StudioError::InvalidVizType { .. })));
        assert_eq!(store.snapshot().revision(), revision);

        let err = store.update("missing", &LayerPatch::new().visible(false));
        assert!(matches!(err, Err(StudioError::LayerNotFound(_))));
    }

    #[test]
    fn test_remove_and_stale_results() {
        let mut store = LayerStateStore::new();
        store.add(vec![point_layer("a"), point_layer("b")]).unwrap();

        let removed = store.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(!store.contains("a"));
        assert_eq!(store.snapshot().get("b").unwrap().id, "b");
        assert!(matches!(store.remove("a"), Err(StudioError::LayerNotFound(_))));

        let applied = store
            .apply_if_present("a", &LayerPatch::new().visible(false))
            .unwrap();
        assert!(applied.is_none());
    }
}
