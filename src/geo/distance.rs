//! Great-circle distance and the local tangent-plane linearization.

use nalgebra::Vector2;

/// Mean Earth radius used for haversine distances (metres).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Linearization constant of the equirectangular local frame (metres/degree).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Haversine great-circle distance in metres.
pub fn haversine_m(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let d_lat = (lat_b - lat_a).to_radians();
    let d_lng = (lng_b - lng_a).to_radians();
    let sin_lat = (d_lat * 0.5).sin();
    let sin_lng = (d_lng * 0.5).sin();
    let h = sin_lat * sin_lat
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * sin_lng * sin_lng;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Equirectangular tangent plane anchored at a reference position.
///
/// `x` points east and `y` north, both in metres. Accurate to well under a
/// metre over the few hundred metres spanned by one object's panoramas.
#[derive(Clone, Copy, Debug)]
pub struct LocalFrame {
    origin_lat: f64,
    origin_lng: f64,
    cos_lat: f64,
}

impl LocalFrame {
    pub fn new(origin_lat: f64, origin_lng: f64) -> Self {
        Self {
            origin_lat,
            origin_lng,
            cos_lat: origin_lat.to_radians().cos(),
        }
    }

    /// Frame anchored at the mean of the given positions.
    pub fn centered_on<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut n = 0usize;
        let mut sum_lat = 0.0;
        let mut sum_lng = 0.0;
        for (lat, lng) in positions {
            sum_lat += lat;
            sum_lng += lng;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Self::new(sum_lat / n as f64, sum_lng / n as f64))
    }

    pub fn to_local(&self, lat: f64, lng: f64) -> Vector2<f64> {
        Vector2::new(
            (lng - self.origin_lng) * METERS_PER_DEGREE * self.cos_lat,
            (lat - self.origin_lat) * METERS_PER_DEGREE,
        )
    }

    /// Inverse of [`LocalFrame::to_local`], returning `(lat, lng)`.
    pub fn to_geo(&self, p: &Vector2<f64>) -> (f64, f64) {
        let lat = p.y / METERS_PER_DEGREE + self.origin_lat;
        let lng = p.x / (METERS_PER_DEGREE * self.cos_lat) + self.origin_lng;
        (lat, lng)
    }
}
