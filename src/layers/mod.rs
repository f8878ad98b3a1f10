pub mod base;
pub mod category;
pub mod classify;
pub mod factory;
pub mod manager;

pub use base::{ColorDomain, ColorEncoding, ColorType, Layer, LayerId, LayerPatch, VizType};
pub use factory::{LayerFactory, LayerIdGenerator};
pub use manager::{LayerSnapshot, LayerStateStore};
