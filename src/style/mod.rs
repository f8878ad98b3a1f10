pub mod color;
pub mod legend;

pub use color::ColorEncoder;
pub use legend::{Legend, LegendBuilder, LegendEntry};
