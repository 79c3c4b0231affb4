use crate::angle::normalize_deg;
use crate::types::{BoundingBox, Panorama};
use crate::{Error, Result};
use serde::Serialize;

/// Compass bearing of a detection and the box center it was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bearing {
    pub bearing_deg: f64,
    pub center_x: f64,
}

/// Maps the box center linearly across the equirectangular image width to a
/// relative azimuth in `[-180, 180)` and offsets it by the panorama heading.
pub fn resolve_bearing(bbox: &BoundingBox, pano: &Panorama) -> Result<Bearing> {
    if pano.image_width == 0 {
        return Err(Error::InvalidPanorama {
            id: pano.id.clone(),
            reason: "image width is zero".to_string(),
        });
    }
    if !pano.heading_deg.is_finite() {
        return Err(Error::InvalidPanorama {
            id: pano.id.clone(),
            reason: format!("heading {} is not finite", pano.heading_deg),
        });
    }
    let center_x = bbox.center_x();
    let relative = center_x / f64::from(pano.image_width) * 360.0 - 180.0;
    Ok(Bearing {
        bearing_deg: normalize_deg(pano.heading_deg + relative + 360.0),
        center_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pano(heading_deg: f64) -> Panorama {
        Panorama {
            id: "p".to_string(),
            lat: 0.0,
            lng: 0.0,
            heading_deg,
            image_width: 2000,
            image_height: 1000,
        }
    }

    #[test]
    fn centered_box_looks_along_heading() {
        let b = resolve_bearing(&BoundingBox::new(900.0, 0.0, 1100.0, 10.0), &pano(42.0))
            .expect("bearing");
        assert!((b.bearing_deg - 42.0).abs() < 1e-9);
        assert!((b.center_x - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn left_edge_looks_backwards() {
        let b = resolve_bearing(&BoundingBox::new(0.0, 0.0, 0.0, 10.0), &pano(30.0))
            .expect("bearing");
        assert!((b.bearing_deg - 210.0).abs() < 1e-9);
    }

    #[test]
    fn quarter_width_is_minus_ninety() {
        let b = resolve_bearing(&BoundingBox::new(500.0, 0.0, 500.0, 10.0), &pano(10.0))
            .expect("bearing");
        assert!((b.bearing_deg - 280.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_heading_still_normalizes() {
        let b = resolve_bearing(&BoundingBox::new(1000.0, 0.0, 1000.0, 10.0), &pano(-725.0))
            .expect("bearing");
        assert!((0.0..360.0).contains(&b.bearing_deg));
        assert!((b.bearing_deg - 355.0).abs() < 1e-9);
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut p = pano(0.0);
        p.image_width = 0;
        let err = resolve_bearing(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), &p).unwrap_err();
        assert!(matches!(err, Error::InvalidPanorama { .. }));
    }
}
