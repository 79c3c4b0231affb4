//! Seed-grow assignment of free detections to one object.
//!
//! Per object the assigner runs a small state machine:
//! - **Extend** (≥2 existing observations): grow the existing set greedily
//!   over every free detection reachable through the current clusters.
//! - **Seed** (<2 existing observations): for every cluster, best score first,
//!   enumerate two-view seeds (first 3 free detections of each panorama ×
//!   first 3 of every later panorama), grow each seed and keep the best result
//!   by (more observations, then lower RMS). An existing single observation
//!   anchors every seed instead: it is paired with the first 3 free
//!   detections of each other panorama in the cluster. The search stops early
//!   once a result reaches the observation cap with RMS ≤ `rms_max / 2`.
//! - **Fallback**: when seeding yields fewer than two observations but the
//!   object already holds exactly one, the nearest free detection from another
//!   panorama is attached unconditionally, even outside every cluster.
//!
//! Growth visits candidates nearest to the current centroid first (ties keep
//! discovery order) and accepts a candidate only if it comes from a new
//! panorama, its bearing differs from every existing bearing by at least
//! `min_angle_diff_deg`, and the re-triangulated set keeps `rms ≤ rms_max`
//! while moving the centroid by at most `max_shift_m`.

use super::params::AssignParams;
use super::registry::DetectionRegistry;
use super::workspace::Workspace;
use crate::angle::angle_diff_deg;
use crate::cluster::{cluster_panoramas, DetectionBuckets, PanoCluster};
use crate::geo::distance::haversine_m;
use crate::geo::triangulation::Fix;
use crate::scene::Scene;
use crate::spatial::SpatialIndex;
use crate::types::{Detection, Observation};
use crate::Result;
use log::debug;
use serde::Serialize;

/// Seeds are drawn from at most this many free detections per panorama.
const SEED_DETECTIONS_PER_PANO: usize = 3;

/// How an object's observation list was produced in one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthMode {
    Unchanged,
    Extended,
    Seeded,
    Fallback,
}

/// Observation list proposed for one object.
#[derive(Clone, Debug)]
pub struct Growth {
    pub observations: Vec<Observation>,
    pub fix: Option<Fix>,
    pub mode: GrowthMode,
}

impl Growth {
    /// RMS of the fix, infinite when undetermined.
    pub fn rms(&self) -> f64 {
        self.fix.map(|f| f.rms).unwrap_or(f64::INFINITY)
    }

    fn len(&self) -> usize {
        self.observations.len()
    }

    fn beats(&self, best_len: usize, best_rms: f64) -> bool {
        self.len() > best_len || (self.len() == best_len && self.rms() < best_rms)
    }
}

/// Seed-grow search over one scene.
pub struct SeedGrow<'s> {
    scene: &'s Scene,
    index: &'s SpatialIndex,
    params: &'s AssignParams,
}

impl<'s> SeedGrow<'s> {
    pub fn new(scene: &'s Scene, index: &'s SpatialIndex, params: &'s AssignParams) -> Self {
        Self {
            scene,
            index,
            params,
        }
    }

    /// Ranked clusters over the detections still free in `registry`.
    pub fn clusters(&self, registry: &DetectionRegistry) -> Vec<PanoCluster> {
        let buckets = DetectionBuckets::build(self.scene, |id| registry.is_free(id));
        cluster_panoramas(&buckets, self.index, self.params.cluster_distance_m)
    }

    /// Proposes the observation list for `object_id`. `existing` is the
    /// object's current list; free detections are read from `registry`.
    pub fn assign(
        &self,
        object_id: &str,
        existing: &[Observation],
        registry: &DetectionRegistry,
        ws: &mut Workspace,
        now_ms: u64,
    ) -> Result<Growth> {
        let buckets = DetectionBuckets::build(self.scene, |id| registry.is_free(id));
        let clusters = cluster_panoramas(&buckets, self.index, self.params.cluster_distance_m);

        if existing.len() >= 2 {
            let candidates: Vec<&Detection> = clusters
                .iter()
                .flat_map(|c| c.detection_ids.iter())
                .filter_map(|id| self.scene.detection(id))
                .collect();
            let mut grown = self.grow(object_id, existing.to_vec(), &candidates, ws, now_ms)?;
            grown.mode = if grown.len() > existing.len() {
                GrowthMode::Extended
            } else {
                GrowthMode::Unchanged
            };
            debug!(
                "seed_grow: object={} extend {} -> {} rms={:.3}",
                object_id,
                existing.len(),
                grown.len(),
                grown.rms()
            );
            return Ok(grown);
        }

        let mut best: Option<Growth> = None;
        let mut best_len = existing.len();
        let mut best_rms = f64::INFINITY;
        for cluster in &clusters {
            let Some(seed) =
                self.best_seed(object_id, cluster, &buckets, existing.first(), ws, now_ms)?
            else {
                continue;
            };
            if seed.beats(best_len, best_rms) {
                best_len = seed.len();
                best_rms = seed.rms();
                best = Some(seed);
            }
            if self.is_good_enough(best_len, best_rms) {
                break;
            }
        }

        if let Some(mut best) = best.filter(|b| b.len() >= 2) {
            debug!(
                "seed_grow: object={} seeded {} observations rms={:.3} clusters={}",
                object_id,
                best.len(),
                best.rms(),
                clusters.len()
            );
            best.mode = GrowthMode::Seeded;
            return Ok(best);
        }

        if existing.len() == 1 {
            // Any free detection qualifies here, clustered or not.
            let free: Vec<&Detection> = self
                .scene
                .detections()
                .iter()
                .filter(|d| registry.is_free(&d.id))
                .collect();
            if let Some(growth) = self.fallback(object_id, &existing[0], &free, ws, now_ms)? {
                debug!(
                    "seed_grow: object={} fallback attached {}",
                    object_id, growth.observations[1].detection_id
                );
                return Ok(growth);
            }
        }

        debug!(
            "seed_grow: object={} unchanged ({} observations, {} clusters)",
            object_id,
            existing.len(),
            clusters.len()
        );
        Ok(Growth {
            observations: existing.to_vec(),
            fix: ws.triangulate(existing),
            mode: GrowthMode::Unchanged,
        })
    }

    fn is_good_enough(&self, len: usize, rms: f64) -> bool {
        len >= self.params.max_obs_per_object && rms <= self.params.good_enough_rms()
    }

    /// Grows every seed pair of `cluster` and returns the best growth. With an
    /// `anchor`, every pair starts from it and takes its second view from
    /// another panorama of the cluster.
    fn best_seed(
        &self,
        object_id: &str,
        cluster: &PanoCluster,
        buckets: &DetectionBuckets<'_>,
        anchor: Option<&Observation>,
        ws: &mut Workspace,
        now_ms: u64,
    ) -> Result<Option<Growth>> {
        let cluster_dets: Vec<&Detection> = cluster
            .detection_ids
            .iter()
            .filter_map(|id| self.scene.detection(id))
            .collect();

        let mut pairs: Vec<(Observation, Observation)> = Vec::new();
        match anchor {
            Some(anchor) => {
                for pano_id in cluster.pano_ids.iter().filter(|p| **p != anchor.pano_id) {
                    for &det in head(buckets.get(pano_id)) {
                        let Some(pano) = self.scene.panorama(&det.pano_id) else {
                            continue;
                        };
                        let ob = ws.observation(object_id, det, pano, now_ms)?;
                        pairs.push((anchor.clone(), ob));
                    }
                }
            }
            None => {
                for (i, pano_a) in cluster.pano_ids.iter().enumerate() {
                    let dets_a = head(buckets.get(pano_a));
                    for pano_b in &cluster.pano_ids[i + 1..] {
                        let dets_b = head(buckets.get(pano_b));
                        for &da in dets_a {
                            for &db in dets_b {
                                let (Some(pa), Some(pb)) = (
                                    self.scene.panorama(&da.pano_id),
                                    self.scene.panorama(&db.pano_id),
                                ) else {
                                    continue;
                                };
                                pairs.push((
                                    ws.observation(object_id, da, pa, now_ms)?,
                                    ws.observation(object_id, db, pb, now_ms)?,
                                ));
                            }
                        }
                    }
                }
            }
        }

        let mut best: Option<Growth> = None;
        let mut best_len = 0usize;
        let mut best_rms = f64::INFINITY;
        let mut tried = 0usize;
        for (oa, ob) in pairs {
            if !bearing_is_distinct(
                std::slice::from_ref(&oa),
                ob.bearing_deg,
                self.params.min_angle_diff_deg,
            ) {
                continue;
            }
            let seed = vec![oa, ob];
            match ws.triangulate(&seed) {
                Some(fix) if fix.rms <= self.params.rms_max => {}
                _ => continue,
            }
            tried += 1;
            let growth = self.grow(object_id, seed, &cluster_dets, ws, now_ms)?;
            if growth.beats(best_len, best_rms) {
                best_len = growth.len();
                best_rms = growth.rms();
                best = Some(growth);
            }
            if self.is_good_enough(best_len, best_rms) {
                break;
            }
        }
        debug!(
            "seed_grow: cluster panos={} seeds tried={} best={} rms={:.3}",
            cluster.pano_ids.len(),
            tried,
            best_len,
            best_rms
        );
        Ok(best)
    }

    /// Greedy growth of `seed` over `candidates`.
    fn grow(
        &self,
        object_id: &str,
        seed: Vec<Observation>,
        candidates: &[&Detection],
        ws: &mut Workspace,
        now_ms: u64,
    ) -> Result<Growth> {
        let mut observations = seed;
        let mut current = ws.triangulate(&observations);
        let ordered = self.order_by_distance(candidates, current.as_ref());

        for det in ordered {
            if observations.len() >= self.params.max_obs_per_object {
                break;
            }
            if observations.iter().any(|o| o.pano_id == det.pano_id) {
                continue;
            }
            let Some(pano) = self.scene.panorama(&det.pano_id) else {
                continue;
            };
            let bearing = ws.bearing(det, pano)?;
            if !bearing_is_distinct(
                &observations,
                bearing.bearing_deg,
                self.params.min_angle_diff_deg,
            ) {
                continue;
            }
            observations.push(Observation::from_bearing(
                object_id, det, pano, bearing, now_ms,
            ));
            let accepted = match ws.triangulate(&observations) {
                Some(trial) => {
                    let shift = current
                        .map(|c| haversine_m(c.lat, c.lng, trial.lat, trial.lng))
                        .unwrap_or(0.0);
                    (trial.rms <= self.params.rms_max && shift <= self.params.max_shift_m)
                        .then_some(trial)
                }
                None => None,
            };
            match accepted {
                Some(trial) => current = Some(trial),
                None => {
                    observations.pop();
                }
            }
        }

        Ok(Growth {
            observations,
            fix: current,
            mode: GrowthMode::Seeded,
        })
    }

    /// Stable sort by panorama distance to the fix; discovery order without one.
    fn order_by_distance<'d>(
        &self,
        candidates: &[&'d Detection],
        fix: Option<&Fix>,
    ) -> Vec<&'d Detection> {
        let mut ordered = candidates.to_vec();
        let Some(fix) = fix else {
            return ordered;
        };
        let mut keyed: Vec<(f64, &Detection)> = ordered
            .drain(..)
            .map(|d| {
                let dist = self
                    .index
                    .position(&d.pano_id)
                    .map(|(lat, lng)| haversine_m(fix.lat, fix.lng, lat, lng))
                    .unwrap_or(f64::INFINITY);
                (dist, d)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        keyed.into_iter().map(|(_, d)| d).collect()
    }

    /// Attaches the free detection whose panorama is nearest to the single
    /// existing observation, ignoring every gate.
    fn fallback(
        &self,
        object_id: &str,
        anchor: &Observation,
        candidates: &[&Detection],
        ws: &mut Workspace,
        now_ms: u64,
    ) -> Result<Option<Growth>> {
        let mut nearest: Option<(f64, &Detection)> = None;
        for &det in candidates {
            if det.pano_id == anchor.pano_id {
                continue;
            }
            let Some((lat, lng)) = self.index.position(&det.pano_id) else {
                continue;
            };
            let dist = haversine_m(anchor.pano_lat, anchor.pano_lng, lat, lng);
            if nearest.map_or(true, |(best, _)| dist < best) {
                nearest = Some((dist, det));
            }
        }
        let Some((_, det)) = nearest else {
            return Ok(None);
        };
        let Some(pano) = self.scene.panorama(&det.pano_id) else {
            return Ok(None);
        };
        let obs = ws.observation(object_id, det, pano, now_ms)?;
        let observations = vec![anchor.clone(), obs];
        let fix = ws.triangulate(&observations);
        Ok(Some(Growth {
            observations,
            fix,
            mode: GrowthMode::Fallback,
        }))
    }
}

fn head<'a, 'd>(dets: &'a [&'d Detection]) -> &'a [&'d Detection] {
    &dets[..dets.len().min(SEED_DETECTIONS_PER_PANO)]
}

/// True when `bearing_deg` is at least `min_diff_deg` away from every
/// existing bearing. A non-positive minimum disables the check.
pub(crate) fn bearing_is_distinct(
    existing: &[Observation],
    bearing_deg: f64,
    min_diff_deg: f64,
) -> bool {
    if min_diff_deg <= 0.0 {
        return true;
    }
    existing
        .iter()
        .all(|o| angle_diff_deg(o.bearing_deg, bearing_deg) >= min_diff_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance::METERS_PER_DEGREE;
    use crate::types::{BoundingBox, Panorama};

    const WIDTH: u32 = 3600;

    fn pano(id: &str, lat: f64, lng: f64) -> Panorama {
        Panorama {
            id: id.to_string(),
            lat,
            lng,
            heading_deg: 0.0,
            image_width: WIDTH,
            image_height: 1800,
        }
    }

    /// Detection on `pano` whose bearing points at `target` (lat, lng).
    fn aimed(pano: &Panorama, target: (f64, f64)) -> Detection {
        let dx = (target.1 - pano.lng) * METERS_PER_DEGREE * pano.lat.to_radians().cos();
        let dy = (target.0 - pano.lat) * METERS_PER_DEGREE;
        let bearing = dx.atan2(dy).to_degrees().rem_euclid(360.0);
        let rel = (bearing - pano.heading_deg + 180.0).rem_euclid(360.0);
        let cx = rel / 360.0 * f64::from(pano.image_width);
        Detection::new(pano.id.clone(), BoundingBox::new(cx - 5.0, 0.0, cx + 5.0, 20.0), None)
    }

    fn setup(dets: impl Fn(&[Panorama]) -> Vec<Detection>) -> Scene {
        let panos = vec![
            pano("a", 0.0, 0.0),
            pano("b", 0.0, 0.0004),
            pano("c", 0.0004, 0.0),
        ];
        let detections = dets(&panos);
        Scene::new(panos, detections).expect("scene")
    }

    #[test]
    fn seeds_an_empty_object_from_scratch() {
        let target = (0.0002, 0.0002);
        let scene = setup(|p| p.iter().map(|p| aimed(p, target)).collect());
        let index = SpatialIndex::new(scene.panoramas());
        let params = AssignParams::default();
        let sg = SeedGrow::new(&scene, &index, &params);
        let mut ws = Workspace::new();
        let growth = sg
            .assign("obj-1", &[], &DetectionRegistry::new(), &mut ws, 0)
            .expect("assign");
        assert_eq!(growth.mode, GrowthMode::Seeded);
        assert_eq!(growth.observations.len(), 3);
        let fix = growth.fix.expect("fix");
        assert!(fix.rms < 0.05);
        assert!(haversine_m(fix.lat, fix.lng, target.0, target.1) < 0.5);
    }

    #[test]
    fn rejects_outlier_that_breaks_rms() {
        let target = (0.0002, 0.0002);
        let scene = setup(|p| {
            vec![
                aimed(&p[0], target),
                aimed(&p[1], target),
                // Due east of c: ~22 m off the common target.
                aimed(&p[2], (0.0004, 0.0015)),
            ]
        });
        let index = SpatialIndex::new(scene.panoramas());
        let params = AssignParams::default();
        let sg = SeedGrow::new(&scene, &index, &params);
        let mut ws = Workspace::new();
        let growth = sg
            .assign("obj-1", &[], &DetectionRegistry::new(), &mut ws, 0)
            .expect("assign");
        assert_eq!(growth.observations.len(), 2);
        assert!(growth.rms() <= params.rms_max);
    }

    #[test]
    fn single_observation_anchors_the_seed() {
        let target = (0.0002, 0.0002);
        let scene = setup(|p| {
            vec![
                aimed(&p[0], target),
                // Listed first on b, pointing well north of the target.
                aimed(&p[1], (0.0010, 0.0006)),
                aimed(&p[1], target),
                aimed(&p[2], target),
            ]
        });
        let ids: Vec<String> = scene.detections().iter().map(|d| d.id.clone()).collect();
        let index = SpatialIndex::new(scene.panoramas());
        let params = AssignParams::default();
        let (det_a, pano_a) = scene.resolve(&ids[0]).expect("resolve");
        let existing = vec![Observation::resolve("obj-1", det_a, pano_a, 0).expect("obs")];
        let mut registry = DetectionRegistry::new();
        registry.consume(&ids[0], "obj-1");

        let sg = SeedGrow::new(&scene, &index, &params);
        let mut ws = Workspace::new();
        let growth = sg.assign("obj-1", &existing, &registry, &mut ws, 0).expect("assign");
        assert_eq!(growth.mode, GrowthMode::Seeded);
        let got: Vec<&str> = growth
            .observations
            .iter()
            .map(|o| o.detection_id.as_str())
            .collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0], ids[0]);
        assert!(got.contains(&ids[2].as_str()));
        assert!(got.contains(&ids[3].as_str()));
        let fix = growth.fix.expect("fix");
        assert!(haversine_m(fix.lat, fix.lng, target.0, target.1) < 0.5);
    }

    #[test]
    fn fallback_reaches_detections_outside_clusters() {
        // b is the only panorama with a free detection, so no cluster forms.
        let scene = Scene::new(
            vec![pano("a", 0.0, 0.0), pano("b", 0.0, 0.00036)],
            vec![
                Detection::new("a", BoundingBox::new(2200.0, 0.0, 2210.0, 1.0), None),
                Detection::new("b", BoundingBox::new(1300.0, 0.0, 1310.0, 1.0), None),
            ],
        )
        .expect("scene");
        let index = SpatialIndex::new(scene.panoramas());
        let params = AssignParams::default();
        let (det_a, pano_a) = scene.resolve(&scene.detections()[0].id).expect("resolve");
        let existing = vec![Observation::resolve("obj-1", det_a, pano_a, 0).expect("obs")];
        let mut registry = DetectionRegistry::new();
        registry.consume(&det_a.id, "obj-1");

        let sg = SeedGrow::new(&scene, &index, &params);
        assert!(sg.clusters(&registry).is_empty());
        let mut ws = Workspace::new();
        let growth = sg.assign("obj-1", &existing, &registry, &mut ws, 0).expect("assign");
        assert_eq!(growth.mode, GrowthMode::Fallback);
        assert_eq!(growth.observations.len(), 2);
        assert_eq!(growth.observations[1].pano_id, "b");
    }

    #[test]
    fn fallback_attaches_nearest_when_no_seed_works() {
        // Every free detection looks due north; with the existing observation
        // also looking north no pair clears the angle gate.
        let scene = Scene::new(
            vec![pano("a", 0.0, 0.0), pano("b", 0.0, 0.0003), pano("c", 0.0, 0.0006)],
            vec![
                Detection::new("a", BoundingBox::new(1795.0, 0.0, 1805.0, 1.0), None),
                Detection::new("b", BoundingBox::new(1795.0, 0.0, 1805.0, 1.0), None),
                Detection::new("c", BoundingBox::new(1795.0, 0.0, 1805.0, 1.0), None),
            ],
        )
        .expect("scene");
        let index = SpatialIndex::new(scene.panoramas());
        let params = AssignParams::default();
        let (det_a, pano_a) = scene.resolve(&scene.detections()[0].id).expect("resolve");
        let existing = vec![Observation::resolve("obj-1", det_a, pano_a, 0).expect("obs")];
        let mut registry = DetectionRegistry::new();
        registry.consume(&det_a.id, "obj-1");
        let sg = SeedGrow::new(&scene, &index, &params);
        let mut ws = Workspace::new();
        let growth = sg.assign("obj-1", &existing, &registry, &mut ws, 0).expect("assign");
        assert_eq!(growth.mode, GrowthMode::Fallback);
        assert_eq!(growth.observations.len(), 2);
        assert_eq!(growth.observations[1].pano_id, "b");
    }

    #[test]
    fn bearing_gate_disabled_by_zero() {
        let scene = setup(|p| p.iter().map(|p| aimed(p, (0.0002, 0.0002))).collect());
        let (d, p) = scene.resolve(&scene.detections()[0].id).expect("resolve");
        let obs = Observation::resolve("o", d, p, 0).expect("obs");
        assert!(!bearing_is_distinct(std::slice::from_ref(&obs), obs.bearing_deg + 1.0, 5.0));
        assert!(bearing_is_distinct(std::slice::from_ref(&obs), obs.bearing_deg, 0.0));
    }
}
