//! Coalescing of continuous control input
//!
//! Sliders emit a value per pointer move. Only the value that has been
//! stable for the quiet period is turned into a layer update.

use crate::layers::base::{LayerId, LayerPatch};
use instant::Instant;
use std::time::Duration;

/// Keeps the latest value and releases it once no newer value arrived for
/// `delay`
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Returns the pending value if it has settled
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let settled = matches!(&self.pending, Some((_, at)) if now.duration_since(*at) >= self.delay);
        if settled {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Returns the pending value regardless of age
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Continuous layer controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliderControl {
    Opacity,
    Radius,
    Height,
}

impl SliderControl {
    fn apply(self, patch: LayerPatch, value: f64) -> LayerPatch {
        match self {
            SliderControl::Opacity => patch.opacity(value as f32),
            SliderControl::Radius => patch.radius(value),
            SliderControl::Height => patch.height(value),
        }
    }
}

struct PendingSlider {
    layer_id: LayerId,
    control: SliderControl,
    value: Debouncer<f64>,
}

/// Debounces every (layer, control) pair independently
pub struct SliderDebouncer {
    delay: Duration,
    pending: Vec<PendingSlider>,
}

impl SliderDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, layer_id: &str, control: SliderControl, value: f64, now: Instant) {
        match self
            .pending
            .iter()
            .position(|p| p.layer_id == layer_id && p.control == control)
        {
            Some(index) => self.pending[index].value.push(value, now),
            None => {
                let mut debouncer = Debouncer::new(self.delay);
                debouncer.push(value, now);
                self.pending.push(PendingSlider {
                    layer_id: layer_id.to_string(),
                    control,
                    value: debouncer,
                });
            }
        }
    }

    /// Settled values as one patch per layer, in first-touched order
    pub fn drain_settled(&mut self, now: Instant) -> Vec<(LayerId, LayerPatch)> {
        self.drain_with(|debouncer| debouncer.poll(now))
    }

    /// Every pending value, settled or not
    pub fn flush(&mut self) -> Vec<(LayerId, LayerPatch)> {
        self.drain_with(Debouncer::flush)
    }

    /// Forgets pending input for a removed layer
    pub fn discard_layer(&mut self, layer_id: &str) {
        self.pending.retain(|p| p.layer_id != layer_id);
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    fn drain_with<F>(&mut self, mut take: F) -> Vec<(LayerId, LayerPatch)>
    where
        F: FnMut(&mut Debouncer<f64>) -> Option<f64>,
    {
        let mut patches: Vec<(LayerId, LayerPatch)> = Vec::new();
        for slot in &mut self.pending {
            let Some(value) = take(&mut slot.value) else {
                continue;
            };
            match patches.iter().position(|(id, _)| *id == slot.layer_id) {
                Some(index) => {
                    let patch = std::mem::take(&mut patches[index].1);
                    patches[index].1 = slot.control.apply(patch, value);
                }
                None => patches.push((
                    slot.layer_id.clone(),
                    slot.control.apply(LayerPatch::new(), value),
                )),
            }
        }
        self.pending.retain(|p| p.value.is_pending());
        patches
    }
}
