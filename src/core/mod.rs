pub mod bounds;
pub mod config;
pub mod constants;
pub mod geo;
pub mod studio;

pub use config::{StudioOptions, StudioProfile};
pub use geo::{LatLng, LatLngBounds};
