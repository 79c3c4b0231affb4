//! Uniform lat/lng grid over panoramas for proximity queries.
//!
//! Panoramas are bucketed by `(floor(lat/δ), floor(lng/δ))` with a fixed cell
//! size δ. A query scans the ring of cells around the query cell and, for
//! radius queries, verifies the true haversine distance. With δ = 0.001° a
//! 3×3 scan covers radii up to ~111 m of latitude; larger radii (or high
//! latitudes, where a degree of longitude shrinks) widen the ring so no true
//! neighbour is missed.

use crate::geo::distance::{haversine_m, EARTH_RADIUS_M};
use crate::types::{PanoId, Panorama};
use std::collections::HashMap;

/// Default cell size in degrees.
pub const DEFAULT_CELL_DEG: f64 = 0.001;

type CellKey = (i64, i64);

struct Entry {
    id: PanoId,
    lat: f64,
    lng: f64,
}

/// Grid index over panorama positions. Candidates are always reported in the
/// order the panoramas were inserted.
pub struct SpatialIndex {
    cell_deg: f64,
    entries: Vec<Entry>,
    by_id: HashMap<PanoId, usize>,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialIndex {
    pub fn new(panoramas: &[Panorama]) -> Self {
        Self::with_cell_size(panoramas, DEFAULT_CELL_DEG)
    }

    pub fn with_cell_size(panoramas: &[Panorama], cell_deg: f64) -> Self {
        let cell_deg = if cell_deg.is_finite() && cell_deg > 0.0 {
            cell_deg
        } else {
            DEFAULT_CELL_DEG
        };
        let mut index = Self {
            cell_deg,
            entries: Vec::with_capacity(panoramas.len()),
            by_id: HashMap::with_capacity(panoramas.len()),
            cells: HashMap::new(),
        };
        for pano in panoramas {
            if index.by_id.contains_key(&pano.id) {
                continue;
            }
            let idx = index.entries.len();
            index.entries.push(Entry {
                id: pano.id.clone(),
                lat: pano.lat,
                lng: pano.lng,
            });
            index.by_id.insert(pano.id.clone(), idx);
            let key = index.cell_of(pano.lat, pano.lng);
            index.cells.entry(key).or_default().push(idx);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position `(lat, lng)` of an indexed panorama.
    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.by_id
            .get(id)
            .map(|&i| (self.entries[i].lat, self.entries[i].lng))
    }

    /// Panoramas in the 3×3 block of cells around the point (unverified).
    pub fn nearby(&self, lat: f64, lng: f64) -> Vec<&str> {
        self.scan(lat, lng, 1)
            .into_iter()
            .map(|i| self.entries[i].id.as_str())
            .collect()
    }

    /// Panoramas whose great-circle distance to the point is `<= radius_m`.
    pub fn within(&self, lat: f64, lng: f64, radius_m: f64) -> Vec<&str> {
        let ring = self.ring_for(lat, radius_m);
        self.scan(lat, lng, ring)
            .into_iter()
            .filter(|&i| {
                let e = &self.entries[i];
                haversine_m(lat, lng, e.lat, e.lng) <= radius_m
            })
            .map(|i| self.entries[i].id.as_str())
            .collect()
    }

    fn cell_of(&self, lat: f64, lng: f64) -> CellKey {
        (
            (lat / self.cell_deg).floor() as i64,
            (lng / self.cell_deg).floor() as i64,
        )
    }

    /// Number of cells around the query cell needed to cover `radius_m`.
    fn ring_for(&self, lat: f64, radius_m: f64) -> i64 {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return 1;
        }
        let meters_per_deg = EARTH_RADIUS_M.to_radians();
        let radius_deg = radius_m / meters_per_deg;
        // Longitude degrees shrink towards the poles; use the worst latitude
        // the radius can reach.
        let worst_lat = (lat.abs() + radius_deg).min(89.9);
        let cos = worst_lat.to_radians().cos().max(1e-6);
        let lat_cells = (radius_deg / self.cell_deg).ceil();
        let lng_cells = (radius_deg / (self.cell_deg * cos)).ceil();
        // No ring needs to span more than the whole globe.
        let globe_cells = (360.0 / self.cell_deg).ceil();
        (lat_cells.max(lng_cells).min(globe_cells) as i64).max(1)
    }

    fn scan(&self, lat: f64, lng: f64, ring: i64) -> Vec<usize> {
        let (ci, cj) = self.cell_of(lat, lng);
        let mut hits = Vec::new();
        let cells_in_ring = ring
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .and_then(|side| side.checked_mul(side))
            .and_then(|n| usize::try_from(n).ok());
        if cells_in_ring.map_or(true, |n| n > self.cells.len()) {
            // Sparse grid: walking occupied cells is cheaper than the ring.
            for (&(i, j), members) in &self.cells {
                if (i - ci).abs() <= ring && (j - cj).abs() <= ring {
                    hits.extend_from_slice(members);
                }
            }
        } else {
            for di in -ring..=ring {
                for dj in -ring..=ring {
                    if let Some(members) = self.cells.get(&(ci + di, cj + dj)) {
                        hits.extend_from_slice(members);
                    }
                }
            }
        }
        hits.sort_unstable();
        hits
    }
}
