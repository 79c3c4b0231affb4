//! Lowest-RMS-first greedy assignment.
//!
//! Each round scans the free detections in caller order (at most
//! [`CANDIDATE_CAP`] usable candidates), triangulates `current + candidate` and
//! keeps the candidate with the lowest RMS. Trials with fewer than two
//! observations or an undetermined fix count as infinite RMS, so the first
//! usable candidate is taken when the object is empty. Rounds repeat until the
//! observation cap is reached or no candidate qualifies.

use super::params::AssignParams;
use super::registry::DetectionRegistry;
use super::seed_grow::{bearing_is_distinct, Growth, GrowthMode};
use super::workspace::Workspace;
use crate::scene::Scene;
use crate::types::{Detection, Observation};
use crate::Result;
use log::debug;
use std::collections::HashSet;

/// Candidates triangulated per round.
pub const CANDIDATE_CAP: usize = 500;

/// Greedily extends `existing` for `object_id`.
pub fn greedy_assign(
    scene: &Scene,
    params: &AssignParams,
    object_id: &str,
    existing: &[Observation],
    registry: &DetectionRegistry,
    ws: &mut Workspace,
    now_ms: u64,
) -> Result<Growth> {
    let available: Vec<&Detection> = scene
        .detections()
        .iter()
        .filter(|d| registry.is_free(&d.id))
        .collect();
    let mut observations = existing.to_vec();
    let mut taken: HashSet<&str> = HashSet::new();
    let mut rounds = 0usize;

    while observations.len() < params.max_obs_per_object {
        rounds += 1;
        let mut best: Option<(f64, Observation)> = None;
        let mut tested = 0usize;
        for &det in &available {
            if taken.contains(det.id.as_str()) {
                continue;
            }
            if observations.iter().any(|o| o.pano_id == det.pano_id) {
                continue;
            }
            let Some(pano) = scene.panorama(&det.pano_id) else {
                continue;
            };
            let bearing = ws.bearing(det, pano)?;
            if !bearing_is_distinct(&observations, bearing.bearing_deg, params.min_angle_diff_deg)
            {
                continue;
            }
            if tested >= CANDIDATE_CAP {
                break;
            }
            tested += 1;

            let candidate = Observation::from_bearing(object_id, det, pano, bearing, now_ms);
            let mut trial = observations.clone();
            trial.push(candidate.clone());
            let rms = ws
                .triangulate(&trial)
                .map(|f| f.rms)
                .unwrap_or(f64::INFINITY);
            if trial.len() >= 2 && rms > params.rms_max {
                continue;
            }
            if best.as_ref().map_or(true, |(best_rms, _)| rms < *best_rms) {
                best = Some((rms, candidate));
            }
        }
        let Some((_, chosen)) = best else {
            break;
        };
        if let Some(det) = scene.detection(&chosen.detection_id) {
            taken.insert(det.id.as_str());
        }
        observations.push(chosen);
    }

    let grew = observations.len() > existing.len();
    let mode = match (grew, existing.len() >= 2) {
        (false, _) => GrowthMode::Unchanged,
        (true, true) => GrowthMode::Extended,
        (true, false) => GrowthMode::Seeded,
    };
    let fix = ws.triangulate(&observations);
    debug!(
        "greedy: object={} {} -> {} observations in {} rounds",
        object_id,
        existing.len(),
        observations.len(),
        rounds
    );
    Ok(Growth {
        observations,
        fix,
        mode,
    })
}
