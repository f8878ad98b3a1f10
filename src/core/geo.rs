use serde::{Deserialize, Serialize};

/// Latitude limit used for the world fallback view
const MAX_LATITUDE: f64 = 85.0;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from a GeoJSON position (`[lng, lat, ...]`)
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Some(Self::new(*lat, *lng)),
            _ => None,
        }
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Creates degenerate bounds around a single point
    pub fn from_point(point: LatLng) -> Self {
        Self::new(point, point)
    }

    /// Whole-world view used when nothing can be fitted
    pub fn world() -> Self {
        Self::from_coords(-MAX_LATITUDE, -180.0, MAX_LATITUDE, 180.0)
    }

    pub fn min_lng(&self) -> f64 {
        self.south_west.lng
    }

    pub fn min_lat(&self) -> f64 {
        self.south_west.lat
    }

    pub fn max_lng(&self) -> f64 {
        self.north_east.lng
    }

    pub fn max_lat(&self) -> f64 {
        self.north_east.lat
    }

    /// Returns the box as `[minLng, minLat, maxLng, maxLat]`
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_lng(), self.min_lat(), self.max_lng(), self.max_lat()]
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Gets the span of the bounds
    pub fn span(&self) -> LatLng {
        LatLng::new(
            self.north_east.lat - self.south_west.lat,
            self.north_east.lng - self.south_west.lng,
        )
    }

    /// A single-point box has zero span on both axes
    pub fn is_degenerate(&self) -> bool {
        let span = self.span();
        span.lat == 0.0 && span.lng == 0.0
    }
}
