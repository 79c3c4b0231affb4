//! Compass angle utilities shared by the bearing resolver and the assigners.
//!
//! Bearings are compass degrees: 0 = north, increasing clockwise, in
//! `[0, 360)`. Unlike image-line orientations, bearings are signed directions;
//! a ray and its antipode are distinct.

use nalgebra::Vector2;

/// Wraps an angle into `[0, 360)`.
#[inline]
pub fn normalize_deg(angle: f64) -> f64 {
    let norm = angle.rem_euclid(360.0);
    if norm >= 360.0 {
        0.0
    } else {
        norm
    }
}

/// Smallest absolute difference between two compass angles, in `[0, 180]`.
#[inline]
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    ((a - b + 540.0).rem_euclid(360.0) - 180.0).abs()
}

/// Unit direction of a compass bearing in a local east/north frame.
#[inline]
pub fn bearing_direction(bearing_deg: f64) -> Vector2<f64> {
    let theta = bearing_deg.to_radians();
    Vector2::new(theta.sin(), theta.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_deg_wraps_both_ways() {
        assert!(approx_eq(normalize_deg(370.0), 10.0));
        assert!(approx_eq(normalize_deg(-90.0), 270.0));
        assert!(approx_eq(normalize_deg(360.0), 0.0));
        assert!(approx_eq(normalize_deg(0.0), 0.0));
    }

    #[test]
    fn angle_diff_handles_wrap() {
        assert!(approx_eq(angle_diff_deg(350.0, 10.0), 20.0));
        assert!(approx_eq(angle_diff_deg(10.0, 350.0), 20.0));
        assert!(approx_eq(angle_diff_deg(0.0, 180.0), 180.0));
        assert!(approx_eq(angle_diff_deg(90.0, 90.0), 0.0));
    }

    #[test]
    fn angle_diff_is_symmetric() {
        let a = 12.5;
        let b = 271.0;
        assert!(approx_eq(angle_diff_deg(a, b), angle_diff_deg(b, a)));
    }

    #[test]
    fn bearing_direction_points_north_and_east() {
        let north = bearing_direction(0.0);
        assert!(approx_eq(north.x, 0.0) && approx_eq(north.y, 1.0));
        let east = bearing_direction(90.0);
        assert!(approx_eq(east.x, 1.0) && east.y.abs() < 1e-12);
    }
}
