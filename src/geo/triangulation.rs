//! Least-squares intersection of compass bearing rays.
//!
//! Each observation contributes a line through its panorama position along
//! its bearing. The solver works in a local equirectangular frame centred on
//! the mean panorama position and minimizes the sum of squared perpendicular
//! distances to all lines:
//!
//! `Σ (I − v vᵀ) x = Σ (I − v vᵀ) p`
//!
//! where `v = (sin θ, cos θ)` is the east/north unit direction of a bearing
//! and `p` the panorama position. The 2×2 system is inverted in closed form.
//! Near-parallel bundles make the normal matrix singular; those return `None`
//! ("undetermined"), which callers treat as "no fix yet" rather than an error.

use super::distance::LocalFrame;
use crate::angle::bearing_direction;
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

/// Determinant magnitude below which the bundle is considered degenerate.
const DET_EPS: f64 = 1e-6;

/// One bearing ray: panorama position plus compass bearing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub lat: f64,
    pub lng: f64,
    pub bearing_deg: f64,
}

/// Triangulated position with its residual.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub lat: f64,
    pub lng: f64,
    /// Root-mean-square perpendicular distance to the rays (metres).
    pub rms: f64,
    pub n_obs: usize,
}

/// Intersects `rays` by least squares. Requires at least two rays whose
/// directions are not all parallel.
pub fn triangulate(rays: &[Ray]) -> Option<Fix> {
    if rays.len() < 2 {
        return None;
    }
    let frame = LocalFrame::centered_on(rays.iter().map(|r| (r.lat, r.lng)))?;

    let mut ata = Matrix2::<f64>::zeros();
    let mut atb = Vector2::<f64>::zeros();
    let mut lines = Vec::with_capacity(rays.len());
    for ray in rays {
        let p = frame.to_local(ray.lat, ray.lng);
        let v = bearing_direction(ray.bearing_deg);
        let proj = Matrix2::identity() - v * v.transpose();
        ata += proj;
        atb += proj * p;
        lines.push((p, v));
    }

    let det = ata.determinant();
    if !det.is_finite() || det.abs() < DET_EPS {
        return None;
    }
    let inv = Matrix2::new(ata[(1, 1)], -ata[(0, 1)], -ata[(1, 0)], ata[(0, 0)]) / det;
    let x = inv * atb;

    let sum_sq: f64 = lines
        .iter()
        .map(|(p, v)| perpendicular_sq(&x, p, v))
        .sum();
    let rms = (sum_sq / rays.len() as f64).sqrt();
    let (lat, lng) = frame.to_geo(&x);
    Some(Fix {
        lat,
        lng,
        rms,
        n_obs: rays.len(),
    })
}

/// Squared distance from `x` to the line through `p` along unit `v`.
#[inline]
fn perpendicular_sq(x: &Vector2<f64>, p: &Vector2<f64>, v: &Vector2<f64>) -> f64 {
    let d = x - p;
    let perp = d - v * v.dot(&d);
    perp.norm_squared()
}

/// Perpendicular distance (metres) from a geographic point to a ray's line.
pub fn distance_to_ray(lat: f64, lng: f64, ray: &Ray) -> f64 {
    let frame = LocalFrame::new(ray.lat, ray.lng);
    let x = frame.to_local(lat, lng);
    let v = bearing_direction(ray.bearing_deg);
    perpendicular_sq(&x, &Vector2::zeros(), &v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance::METERS_PER_DEGREE;

    fn ray(lat: f64, lng: f64, bearing_deg: f64) -> Ray {
        Ray {
            lat,
            lng,
            bearing_deg,
        }
    }

    #[test]
    fn two_crossing_rays_meet_exactly() {
        // A looks north-east, B looks north-west; they meet above the midpoint.
        let rays = [ray(0.0, 0.0, 45.0), ray(0.0, 0.002, 315.0)];
        let fix = triangulate(&rays).expect("fix");
        assert!(fix.rms < 1e-6, "rms={}", fix.rms);
        assert!((fix.lng - 0.001).abs() < 1e-9);
        assert!(fix.lat > 0.0);
        for r in &rays {
            assert!(distance_to_ray(fix.lat, fix.lng, r) < 1e-3);
        }
        assert_eq!(fix.n_obs, 2);
    }

    #[test]
    fn parallel_rays_are_undetermined() {
        assert!(triangulate(&[ray(0.0, 0.0, 10.0), ray(0.0, 0.001, 10.0)]).is_none());
        assert!(triangulate(&[ray(0.0, 0.0, 10.0), ray(0.0, 0.001, 190.0)]).is_none());
    }

    #[test]
    fn fewer_than_two_rays_are_undetermined() {
        assert!(triangulate(&[]).is_none());
        assert!(triangulate(&[ray(0.0, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn consistent_third_ray_keeps_rms_near_zero() {
        let target = (0.0005, 0.0005);
        let from = |lat: f64, lng: f64| {
            let dx = (target.1 - lng) * METERS_PER_DEGREE;
            let dy = (target.0 - lat) * METERS_PER_DEGREE;
            ray(lat, lng, dx.atan2(dy).to_degrees().rem_euclid(360.0))
        };
        let two = [from(0.0, 0.0), from(0.0, 0.001)];
        let three = [two[0], two[1], from(0.001, 0.0)];
        let f2 = triangulate(&two).expect("two");
        let f3 = triangulate(&three).expect("three");
        assert!(f2.rms < 1e-3);
        assert!(f3.rms < 0.05, "rms={}", f3.rms);
        assert!((f3.lat - target.0).abs() < 1e-6);
    }

    #[test]
    fn inconsistent_rays_report_residual() {
        let rays = [ray(0.0, 0.0, 0.0), ray(0.0, 0.001, 0.0), ray(0.001, -0.001, 90.0)];
        let fix = triangulate(&rays).expect("fix");
        assert!(fix.rms > 10.0);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let rays = [ray(1.0, 1.0, 30.0), ray(1.0, 1.001, 300.0), ray(1.001, 1.0, 150.0)];
        assert_eq!(triangulate(&rays), triangulate(&rays));
    }
}
