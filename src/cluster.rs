//! Proximity clustering of panoramas that still hold free detections.
//!
//! Pipeline
//! - Bucket free detections by panorama, keeping caller order in both the
//!   panorama list and each bucket.
//! - Treat every panorama with at least one free detection as a node and
//!   connect two nodes when their haversine distance is within the cluster
//!   distance. Components are found breadth-first, with neighbour candidates
//!   taken from the [`SpatialIndex`] instead of an all-pairs scan.
//! - Components with a single panorama cannot triangulate and are dropped.
//! - Clusters are scored `free detections + 2·(panoramas with ≥2 free
//!   detections) + panoramas` and returned best first; equal scores keep
//!   discovery order.

use crate::scene::Scene;
use crate::spatial::SpatialIndex;
use crate::types::{Detection, DetectionId, PanoId};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Connected group of panoramas sharing free detections.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoCluster {
    pub pano_ids: Vec<PanoId>,
    pub detection_ids: Vec<DetectionId>,
    pub score: usize,
}

/// Free detections grouped by panorama.
pub struct DetectionBuckets<'a> {
    panos: Vec<&'a str>,
    by_pano: HashMap<&'a str, Vec<&'a Detection>>,
}

impl<'a> DetectionBuckets<'a> {
    /// Buckets the scene's detections accepted by `is_free`.
    pub fn build<F>(scene: &'a Scene, is_free: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mut by_pano: HashMap<&'a str, Vec<&'a Detection>> = HashMap::new();
        for det in scene.detections() {
            if is_free(&det.id) {
                by_pano.entry(det.pano_id.as_str()).or_default().push(det);
            }
        }
        let panos = scene
            .panoramas()
            .iter()
            .map(|p| p.id.as_str())
            .filter(|id| by_pano.contains_key(id))
            .collect();
        Self { panos, by_pano }
    }

    /// Panoramas holding at least one free detection, in caller order.
    pub fn panos(&self) -> &[&'a str] {
        &self.panos
    }

    /// The bucket key for `pano_id`, borrowed for the scene lifetime.
    pub fn key(&self, pano_id: &str) -> Option<&'a str> {
        self.by_pano.get_key_value(pano_id).map(|(&k, _)| k)
    }

    pub fn get(&self, pano_id: &str) -> &[&'a Detection] {
        self.by_pano.get(pano_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn free_count(&self) -> usize {
        self.by_pano.values().map(Vec::len).sum()
    }
}

/// Groups bucketed panoramas into ranked clusters.
pub fn cluster_panoramas(
    buckets: &DetectionBuckets<'_>,
    index: &SpatialIndex,
    distance_m: f64,
) -> Vec<PanoCluster> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();

    for &start in buckets.panos() {
        if visited.contains(start) {
            continue;
        }
        visited.insert(start);
        let mut queue = VecDeque::from([start]);
        let mut members: Vec<&str> = Vec::new();
        while let Some(current) = queue.pop_front() {
            members.push(current);
            let Some((lat, lng)) = index.position(current) else {
                continue;
            };
            for candidate in index.within(lat, lng, distance_m) {
                let Some(id) = buckets.key(candidate) else {
                    continue;
                };
                if visited.insert(id) {
                    queue.push_back(id);
                }
            }
        }
        if members.len() < 2 {
            continue;
        }
        clusters.push(make_cluster(buckets, &members));
    }

    clusters.sort_by(|a, b| b.score.cmp(&a.score));
    debug!(
        "cluster_panoramas: nodes={} clusters={} distance_m={:.1}",
        buckets.panos().len(),
        clusters.len(),
        distance_m
    );
    clusters
}

fn make_cluster(buckets: &DetectionBuckets<'_>, members: &[&str]) -> PanoCluster {
    let mut detection_ids = Vec::new();
    let mut multi = 0usize;
    for &pano in members {
        let dets = buckets.get(pano);
        if dets.len() >= 2 {
            multi += 1;
        }
        detection_ids.extend(dets.iter().map(|d| d.id.clone()));
    }
    let score = detection_ids.len() + 2 * multi + members.len();
    PanoCluster {
        pano_ids: members.iter().map(|s| s.to_string()).collect(),
        detection_ids,
        score,
    }
}
