//! Run-scoped memoization caches shared by every object of one run.
//!
//! - Bearings are keyed by detection id: they depend only on the detection
//!   and its panorama, never on which object uses them.
//! - Triangulation results are keyed by the sorted tuple of participating
//!   detection ids. Seed and growth trials re-evaluate the same subsets many
//!   times across seeds and objects.
//!
//! Entries are never evicted; both maps are bounded by the input size. A new
//! run starts from a fresh workspace.

use crate::geo::bearing::{resolve_bearing, Bearing};
use crate::geo::triangulation::{triangulate, Fix};
use crate::types::{Detection, DetectionId, Observation, Panorama};
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;

/// Hit/miss counters exposed in the run report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub bearing_entries: usize,
    pub bearing_hits: usize,
    pub fix_entries: usize,
    pub fix_hits: usize,
    pub fix_misses: usize,
}

#[derive(Default)]
pub struct Workspace {
    bearings: HashMap<DetectionId, Bearing>,
    fixes: HashMap<Vec<DetectionId>, Option<Fix>>,
    bearing_hits: usize,
    fix_hits: usize,
    fix_misses: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearing(&mut self, detection: &Detection, pano: &Panorama) -> Result<Bearing> {
        if let Some(b) = self.bearings.get(&detection.id) {
            self.bearing_hits += 1;
            return Ok(*b);
        }
        let b = resolve_bearing(&detection.bbox, pano)?;
        self.bearings.insert(detection.id.clone(), b);
        Ok(b)
    }

    /// Resolves a detection into an observation for `object_id` through the
    /// bearing cache.
    pub fn observation(
        &mut self,
        object_id: &str,
        detection: &Detection,
        pano: &Panorama,
        created_at_ms: u64,
    ) -> Result<Observation> {
        let bearing = self.bearing(detection, pano)?;
        Ok(Observation::from_bearing(
            object_id,
            detection,
            pano,
            bearing,
            created_at_ms,
        ))
    }

    /// Triangulates the set, solving it in canonical (sorted id) order so the
    /// cached value does not depend on which trial computed it first.
    pub fn triangulate(&mut self, observations: &[Observation]) -> Option<Fix> {
        if observations.len() < 2 {
            return None;
        }
        let mut order: Vec<usize> = (0..observations.len()).collect();
        order.sort_by(|&a, &b| observations[a].detection_id.cmp(&observations[b].detection_id));
        let key: Vec<DetectionId> = order
            .iter()
            .map(|&i| observations[i].detection_id.clone())
            .collect();
        if let Some(fix) = self.fixes.get(&key) {
            self.fix_hits += 1;
            return *fix;
        }
        self.fix_misses += 1;
        let rays: Vec<_> = order.iter().map(|&i| observations[i].ray()).collect();
        let fix = triangulate(&rays);
        self.fixes.insert(key, fix);
        fix
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            bearing_entries: self.bearings.len(),
            bearing_hits: self.bearing_hits,
            fix_entries: self.fixes.len(),
            fix_hits: self.fix_hits,
            fix_misses: self.fix_misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn pano(id: &str, lng: f64, heading_deg: f64) -> Panorama {
        Panorama {
            id: id.to_string(),
            lat: 0.0,
            lng,
            heading_deg,
            image_width: 3600,
            image_height: 1800,
        }
    }

    fn centered(pano_id: &str) -> Detection {
        Detection::new(pano_id, BoundingBox::new(1790.0, 0.0, 1810.0, 10.0), None)
    }

    #[test]
    fn triangulation_is_cached_independent_of_order() {
        let (pa, pb) = (pano("a", 0.0, 45.0), pano("b", 0.002, 315.0));
        let (da, db) = (centered("a"), centered("b"));
        let mut ws = Workspace::new();
        let oa = ws.observation("obj", &da, &pa, 0).expect("obs");
        let ob = ws.observation("obj", &db, &pb, 0).expect("obs");
        let first = ws.triangulate(&[oa.clone(), ob.clone()]).expect("fix");
        let second = ws.triangulate(&[ob, oa]).expect("fix");
        assert_eq!(first, second);
        let stats = ws.stats();
        assert_eq!(stats.fix_misses, 1);
        assert_eq!(stats.fix_hits, 1);
        assert_eq!(stats.fix_entries, 1);
    }

    #[test]
    fn bearing_is_computed_once_per_detection() {
        let pa = pano("a", 0.0, 90.0);
        let da = centered("a");
        let mut ws = Workspace::new();
        let b1 = ws.bearing(&da, &pa).expect("bearing");
        let b2 = ws.bearing(&da, &pa).expect("bearing");
        assert_eq!(b1, b2);
        assert!((b1.bearing_deg - 90.0).abs() < 1e-9);
        assert_eq!(ws.stats().bearing_entries, 1);
        assert_eq!(ws.stats().bearing_hits, 1);
    }
}
