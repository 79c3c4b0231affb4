//! Read-only container for the panoramas and detections of one load.
//!
//! Keeps the caller's order (which drives every deterministic tie-break in the
//! assigners) and adds id lookups. Construction validates the references the
//! ingestion layer is responsible for.

use crate::types::{Detection, Observation, ObservationMap, Panorama};
use crate::{Error, Result};
use log::warn;
use std::collections::{HashMap, HashSet};

pub struct Scene {
    panoramas: Vec<Panorama>,
    detections: Vec<Detection>,
    pano_index: HashMap<String, usize>,
    detection_index: HashMap<String, usize>,
}

impl Scene {
    /// Builds the scene, rejecting detections that reference unknown
    /// panoramas and panoramas without a usable image width. Repeated ids keep
    /// their first occurrence.
    pub fn new(panoramas: Vec<Panorama>, detections: Vec<Detection>) -> Result<Self> {
        let mut pano_index = HashMap::with_capacity(panoramas.len());
        let mut kept_panos = Vec::with_capacity(panoramas.len());
        for pano in panoramas {
            if pano.image_width == 0 {
                return Err(Error::InvalidPanorama {
                    id: pano.id,
                    reason: "image width is zero".to_string(),
                });
            }
            if !(pano.lat.is_finite() && pano.lng.is_finite() && pano.heading_deg.is_finite()) {
                return Err(Error::InvalidPanorama {
                    id: pano.id,
                    reason: "position or heading is not finite".to_string(),
                });
            }
            if pano_index.contains_key(&pano.id) {
                warn!("Scene: duplicate panorama id {} ignored", pano.id);
                continue;
            }
            pano_index.insert(pano.id.clone(), kept_panos.len());
            kept_panos.push(pano);
        }

        let mut detection_index = HashMap::with_capacity(detections.len());
        let mut kept_detections = Vec::with_capacity(detections.len());
        for det in detections {
            if !pano_index.contains_key(&det.pano_id) {
                return Err(Error::UnknownPanorama(det.pano_id));
            }
            if detection_index.contains_key(&det.id) {
                warn!("Scene: duplicate detection id {} ignored", det.id);
                continue;
            }
            detection_index.insert(det.id.clone(), kept_detections.len());
            kept_detections.push(det);
        }

        Ok(Self {
            panoramas: kept_panos,
            detections: kept_detections,
            pano_index,
            detection_index,
        })
    }

    pub fn panoramas(&self) -> &[Panorama] {
        &self.panoramas
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn panorama(&self, id: &str) -> Option<&Panorama> {
        self.pano_index.get(id).map(|&i| &self.panoramas[i])
    }

    pub fn detection(&self, id: &str) -> Option<&Detection> {
        self.detection_index.get(id).map(|&i| &self.detections[i])
    }

    /// Looks up a detection together with its panorama.
    pub fn resolve(&self, detection_id: &str) -> Result<(&Detection, &Panorama)> {
        let det = self
            .detection(detection_id)
            .ok_or_else(|| Error::UnknownDetection(detection_id.to_string()))?;
        let pano = self
            .panorama(&det.pano_id)
            .ok_or_else(|| Error::UnknownPanorama(det.pano_id.clone()))?;
        Ok((det, pano))
    }

    /// Checks an observation map against the scene and the assignment
    /// invariant: known detections and panoramas, one owner per detection,
    /// one observation per panorama per object.
    pub fn check_observations(&self, observations: &ObservationMap) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (object_id, list) in observations {
            let mut panos: HashSet<&str> = HashSet::new();
            for obs in list {
                check_observation(self, obs)?;
                if let Some(owner) = owners.insert(&obs.detection_id, object_id) {
                    return Err(Error::DetectionAlreadyAssigned {
                        detection_id: obs.detection_id.clone(),
                        object_id: owner.to_string(),
                    });
                }
                if !panos.insert(&obs.pano_id) {
                    return Err(Error::DuplicatePanorama {
                        object_id: object_id.clone(),
                        pano_id: obs.pano_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_observation(scene: &Scene, obs: &Observation) -> Result<()> {
    if scene.panorama(&obs.pano_id).is_none() {
        return Err(Error::UnknownPanorama(obs.pano_id.clone()));
    }
    if scene.detection(&obs.detection_id).is_none() {
        return Err(Error::UnknownDetection(obs.detection_id.clone()));
    }
    Ok(())
}
