pub mod debounce;

pub use debounce::{Debouncer, SliderControl, SliderDebouncer};
