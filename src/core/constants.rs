//! Engine-wide defaults for layer styling, category detection and color encoding.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// RGB color triple
pub type Rgb = [u8; 3];

/// Fixed palette for default layer colors and categorical encodings.
pub const LAYER_PALETTE: [Rgb; 8] = [
    [59, 130, 246],
    [239, 68, 68],
    [16, 185, 129],
    [245, 158, 11],
    [139, 92, 246],
    [236, 72, 153],
    [20, 184, 166],
    [249, 115, 22],
];

/// Low-to-high stops for numeric encodings.
pub const GRADIENT_PALETTE: [Rgb; 6] = [
    [255, 255, 178],
    [254, 217, 118],
    [254, 178, 76],
    [253, 141, 60],
    [240, 59, 32],
    [189, 0, 38],
];

/// Color for missing, non-numeric, out-of-domain and over-cap values.
pub const FALLBACK_COLOR: Rgb = [128, 128, 128];

/// Distinct categorical values that get their own swatch. Sized to the
/// palette; the 9th and later values fall back to gray.
pub const DEFAULT_MAX_CATEGORIES: usize = LAYER_PALETTE.len();

/// Share of sampled values that must parse as numbers for a numeric encoding.
pub const NUMERIC_THRESHOLD: f64 = 0.8;

/// Values inspected when deciding between numeric and categorical.
pub const CLASSIFY_SAMPLE_SIZE: usize = 1000;

/// Property names that usually hold a category.
pub const CATEGORY_CANDIDATES: [&str; 6] =
    ["category", "group", "layer", "class", "kind", "classification"];

/// Features scanned when collecting candidate property keys.
pub const CATEGORY_KEY_SAMPLE: usize = 50;

/// Smallest bucket the category detector will split.
pub const CATEGORY_MIN_FEATURES: usize = 4;

/// Most distinct values a category column may have.
pub const CATEGORY_MAX_DISTINCT: usize = 10;

/// Distinct values must stay under this share of the feature count.
pub const CATEGORY_MAX_RATIO: f64 = 0.4;

/// Label for features with no value in the detected category column.
pub const CATEGORY_OTHER: &str = "Other";

/// Separator between a base name and a layer suffix.
pub const NAME_SEPARATOR: &str = " · ";

/// Initial layer opacity.
pub const DEFAULT_OPACITY: f32 = 0.8;

/// Aggregation radius for heatmap and hexagon layers.
pub const DEFAULT_RADIUS: f64 = 1000.0;

/// Extrusion height for 3d layers.
pub const DEFAULT_HEIGHT: f64 = 1000.0;

/// Largest collection accepted in one ingestion.
pub const MAX_FEATURES: usize = 100_000;

/// Largest raw payload accepted in one ingestion (50 MB).
pub const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Quiet period before a slider value is applied.
pub const SLIDER_DEBOUNCE_MS: u64 = 150;

/// Memoized `(layer, attribute)` domains kept by the color encoder.
pub const DOMAIN_CACHE_SIZE: usize = 256;
