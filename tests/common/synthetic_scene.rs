use pano_locate::geo::distance::METERS_PER_DEGREE;
use pano_locate::{BoundingBox, Detection, Panorama};

pub const WIDTH: u32 = 4096;

pub fn pano(id: &str, lat: f64, lng: f64, heading_deg: f64) -> Panorama {
    Panorama {
        id: id.to_string(),
        lat,
        lng,
        heading_deg,
        image_width: WIDTH,
        image_height: WIDTH / 2,
    }
}

/// Detection whose box center maps to `bearing_deg` on `pano`.
pub fn at_bearing(pano: &Panorama, bearing_deg: f64) -> Detection {
    let rel = (bearing_deg - pano.heading_deg + 180.0).rem_euclid(360.0);
    let cx = rel / 360.0 * f64::from(pano.image_width);
    Detection::new(
        pano.id.clone(),
        BoundingBox::new(cx - 8.0, 900.0, cx + 8.0, 1100.0),
        Some(0.9),
    )
}

/// Compass bearing from `pano` to `target` (lat, lng) in the local plane.
pub fn bearing_to(pano: &Panorama, target: (f64, f64)) -> f64 {
    let dx = (target.1 - pano.lng) * METERS_PER_DEGREE * pano.lat.to_radians().cos();
    let dy = (target.0 - pano.lat) * METERS_PER_DEGREE;
    dx.atan2(dy).to_degrees().rem_euclid(360.0)
}

/// Detection on `pano` looking at `target`.
pub fn aimed(pano: &Panorama, target: (f64, f64)) -> Detection {
    at_bearing(pano, bearing_to(pano, target))
}

/// Three panoramas around a street corner, all within 80 m of each other.
pub fn corner_panos() -> Vec<Panorama> {
    vec![
        pano("pano_a", 52.0, 4.0, 10.0),
        pano("pano_b", 52.0, 4.0006, 200.0),
        pano("pano_c", 52.0004, 4.0003, 95.0),
    ]
}

/// Object seen from every corner panorama.
pub const LAMP_POST: (f64, f64) = (52.0002, 4.0003);
