//! Great-circle distance between coordinate pairs.
//!
//! A [`Coordinate`] is a plain latitude/longitude pair. It is not validated on
//! construction because stored salon coordinates may be present but out of
//! range; [`distance_km`] validates both sides and yields `None` when either
//! cannot take part in a distance computation.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Pair up two nullable columns. Returns `None` when either side is missing.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Some(Self::new(latitude?, longitude?))
    }

    /// Both components finite and inside their geographic ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }
}

fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

/// Haversine distance in kilometres, rounded to two decimal places.
///
/// Returns `None` if either coordinate is invalid. Callers must treat `None`
/// as "cannot compare" and leave the pair out, never as zero.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> Option<f64> {
    if !a.is_valid() || !b.is_valid() {
        return None;
    }

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding error can push `h` a hair past 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    Some(round_to_hundredths(EARTH_RADIUS_KM * c))
}

/// [`distance_km`] over nullable coordinates; a missing side is "no distance".
#[must_use]
pub fn distance_between(a: Option<Coordinate>, b: Option<Coordinate>) -> Option<f64> {
    distance_km(a?, b?)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
