//! Geographic coordinate types and the fixed grid extent.
//! All coordinate math uses f64 for precision.
use serde::{Deserialize, Serialize};

/// A point in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned lat/lon box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Extent of the groundwater grid. Every rendered cell centre lies inside it.
pub const INDIA_BOUNDS: GeoBounds = GeoBounds {
    min_lat: 6.5,
    max_lat: 37.5,
    min_lon: 68.0,
    max_lon: 97.5,
};

/// Fallback centre for records that arrive without usable coordinates.
pub const DEFAULT_CENTER: LatLon = LatLon { lat: 23.0, lon: 78.0 };

impl GeoBounds {
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, ll: LatLon) -> bool {
        ll.lat >= self.min_lat && ll.lat <= self.max_lat && ll.lon >= self.min_lon && ll.lon <= self.max_lon
    }

    /// Pull a point onto the nearest position inside the box.
    pub fn clamp(&self, ll: LatLon) -> LatLon {
        LatLon::new(
            ll.lat.clamp(self.min_lat, self.max_lat),
            ll.lon.clamp(self.min_lon, self.max_lon),
        )
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        INDIA_BOUNDS
    }
}
