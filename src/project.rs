//! Annotation project state: objects, their observations and derived
//! summaries.
//!
//! Every mutation goes through [`ProjectState`] and recomputes the object
//! summaries, so a summary always reflects its observation list. Objects keep
//! their creation order, which also drives palette colors and the default
//! order of auto-assignment runs.

use crate::assign::{AssignParams, AssignStrategy, AutoAssigner, Progress, RunOutcome};
use crate::cluster::PanoCluster;
use crate::diagnostics::RunReport;
use crate::geo::triangulation::{triangulate, Ray};
use crate::scene::Scene;
use crate::types::{timestamp_ms, Detection, ObjectId, Observation, ObservationMap};
use crate::{Error, Result};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;

/// Display colors assigned to objects by creation index.
pub const PALETTE: [&str; 10] = [
    "#f97316", "#22c55e", "#e11d48", "#14b8a6", "#a855f7", "#facc15", "#ef4444", "#8b5cf6",
    "#d946ef", "#84cc16",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Coarse RMS prior (m) for an object with `n_obs` observations.
pub fn quality_hint(n_obs: usize) -> Option<f64> {
    (n_obs >= 2).then(|| (5.0 / n_obs as f64).max(0.5))
}

/// Localization grade of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Acceptable,
    Poor,
    Unlocated,
}

impl Quality {
    pub fn grade(rms: Option<f64>, params: &AssignParams) -> Self {
        match rms {
            None => Quality::Unlocated,
            Some(r) if r <= params.rms_good => Quality::Good,
            Some(r) if r <= params.rms_max => Quality::Acceptable,
            Some(_) => Quality::Poor,
        }
    }
}

/// Derived view of one object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub object_id: ObjectId,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    pub n_obs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_m: Option<f64>,
    pub quality: Quality,
    pub updated_at_ms: u64,
}

pub struct ProjectState {
    scene: Scene,
    params: AssignParams,
    order: Vec<ObjectId>,
    observations: ObservationMap,
    summaries: HashMap<ObjectId, ObjectSummary>,
}

impl ProjectState {
    pub fn new(scene: Scene, params: AssignParams) -> Result<Self> {
        Self::with_observations(scene, params, ObservationMap::new())
    }

    /// Loads a saved observation map. Objects are ordered by id.
    pub fn with_observations(
        scene: Scene,
        params: AssignParams,
        observations: ObservationMap,
    ) -> Result<Self> {
        params.validate()?;
        scene.check_observations(&observations)?;
        let order = observations.keys().cloned().collect();
        let mut state = Self {
            scene,
            params,
            order,
            observations,
            summaries: HashMap::new(),
        };
        state.recompute();
        Ok(state)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn params(&self) -> &AssignParams {
        &self.params
    }

    pub fn set_params(&mut self, params: AssignParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.recompute();
        Ok(())
    }

    pub fn observations(&self) -> &ObservationMap {
        &self.observations
    }

    pub fn observations_of(&self, object_id: &str) -> &[Observation] {
        self.observations
            .get(object_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Object ids in creation order.
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn object(&self, object_id: &str) -> Option<&ObjectSummary> {
        self.summaries.get(object_id)
    }

    /// Summaries in creation order.
    pub fn objects(&self) -> Vec<&ObjectSummary> {
        self.order
            .iter()
            .filter_map(|id| self.summaries.get(id))
            .collect()
    }

    /// Creates `obj-{n}` with the next palette color.
    pub fn add_object(&mut self) -> ObjectId {
        let mut n = self.order.len() + 1;
        while self.summaries.contains_key(&format!("obj-{n}")) {
            n += 1;
        }
        let id = format!("obj-{n}");
        self.order.push(id.clone());
        self.recompute();
        id
    }

    /// Binds a detection to an object.
    pub fn add_observation(&mut self, object_id: &str, detection_id: &str) -> Result<()> {
        self.require_object(object_id)?;
        if let Some(owner) = self.owner_of(detection_id) {
            return Err(Error::DetectionAlreadyAssigned {
                detection_id: detection_id.to_string(),
                object_id: owner.to_string(),
            });
        }
        let obs = self.resolve_for(object_id, detection_id)?;
        self.observations
            .entry(object_id.to_string())
            .or_default()
            .push(obs);
        self.recompute();
        Ok(())
    }

    /// Unbinds a detection from an object and returns the removed observation.
    pub fn remove_observation(
        &mut self,
        object_id: &str,
        detection_id: &str,
    ) -> Result<Observation> {
        self.require_object(object_id)?;
        let removed = self.take_observation(object_id, detection_id)?;
        self.recompute();
        Ok(removed)
    }

    /// Moves a detection from `from` to `to`, rebuilding the observation for
    /// its new owner.
    pub fn reassign_observation(
        &mut self,
        from: &str,
        to: &str,
        detection_id: &str,
    ) -> Result<()> {
        self.require_object(from)?;
        self.require_object(to)?;
        if self.owner_of(detection_id) != Some(from) {
            return Err(Error::UnknownDetection(detection_id.to_string()));
        }
        if from == to {
            return Ok(());
        }
        let obs = self.resolve_for(to, detection_id)?;
        self.take_observation(from, detection_id)?;
        self.observations.entry(to.to_string()).or_default().push(obs);
        self.recompute();
        Ok(())
    }

    /// Replaces the observation map with the result of a run.
    pub fn apply_run(&mut self, outcome: &RunOutcome) -> Result<()> {
        self.scene.check_observations(&outcome.observations)?;
        self.observations = outcome.observations.clone();
        for id in outcome.observations.keys() {
            if !self.order.contains(id) {
                self.order.push(id.clone());
            }
        }
        self.recompute();
        Ok(())
    }

    /// Runs auto-assignment over every object in creation order and applies
    /// the result.
    pub fn auto_assign(&mut self, strategy: AssignStrategy) -> Result<RunReport> {
        let ids = self.order.clone();
        self.auto_assign_progressive(&ids, strategy, |_| ControlFlow::Continue(()))
    }

    /// Runs auto-assignment over `object_ids` with checkpoints and applies
    /// whatever was processed, including after cancellation.
    pub fn auto_assign_progressive<F>(
        &mut self,
        object_ids: &[ObjectId],
        strategy: AssignStrategy,
        on_checkpoint: F,
    ) -> Result<RunReport>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let assigner =
            AutoAssigner::new(&self.scene, self.observations.clone(), self.params.clone())?;
        let outcome = assigner
            .with_strategy(strategy)
            .run_progressive(object_ids, on_checkpoint)?;
        self.apply_run(&outcome)?;
        Ok(outcome.report)
    }

    /// Clusters of the detections no object holds yet.
    pub fn preview(&self) -> Result<Vec<PanoCluster>> {
        let assigner =
            AutoAssigner::new(&self.scene, self.observations.clone(), self.params.clone())?;
        Ok(assigner.preview())
    }

    /// Detections no object holds, in load order.
    pub fn unassigned_detections(&self) -> Vec<&Detection> {
        let assigned = self.assignments();
        self.scene
            .detections()
            .iter()
            .filter(|d| !assigned.contains_key(d.id.as_str()))
            .collect()
    }

    /// Objects that cannot be triangulated yet.
    pub fn weak_objects(&self) -> Vec<&ObjectSummary> {
        self.objects().into_iter().filter(|o| o.n_obs < 2).collect()
    }

    /// Detection id to owning object id.
    pub fn assignments(&self) -> BTreeMap<&str, &str> {
        self.observations
            .iter()
            .flat_map(|(object_id, list)| {
                list.iter()
                    .map(move |o| (o.detection_id.as_str(), object_id.as_str()))
            })
            .collect()
    }

    fn require_object(&self, object_id: &str) -> Result<()> {
        if self.summaries.contains_key(object_id) {
            Ok(())
        } else {
            Err(Error::UnknownObject(object_id.to_string()))
        }
    }

    fn owner_of(&self, detection_id: &str) -> Option<&str> {
        self.observations
            .iter()
            .find(|(_, list)| list.iter().any(|o| o.detection_id == detection_id))
            .map(|(id, _)| id.as_str())
    }

    fn resolve_for(&self, object_id: &str, detection_id: &str) -> Result<Observation> {
        let (det, pano) = self.scene.resolve(detection_id)?;
        if self
            .observations_of(object_id)
            .iter()
            .any(|o| o.pano_id == det.pano_id)
        {
            return Err(Error::DuplicatePanorama {
                object_id: object_id.to_string(),
                pano_id: det.pano_id.clone(),
            });
        }
        Observation::resolve(object_id, det, pano, timestamp_ms())
    }

    fn take_observation(&mut self, object_id: &str, detection_id: &str) -> Result<Observation> {
        let list = self
            .observations
            .get_mut(object_id)
            .ok_or_else(|| Error::UnknownDetection(detection_id.to_string()))?;
        let pos = list
            .iter()
            .position(|o| o.detection_id == detection_id)
            .ok_or_else(|| Error::UnknownDetection(detection_id.to_string()))?;
        Ok(list.remove(pos))
    }

    fn recompute(&mut self) {
        let now = timestamp_ms();
        let mut summaries = HashMap::with_capacity(self.order.len());
        for (i, id) in self.order.iter().enumerate() {
            let list = self.observations_of(id);
            let rays: Vec<Ray> = list.iter().map(Observation::ray).collect();
            let fix = triangulate(&rays);
            let color = self
                .summaries
                .get(id)
                .map(|s| s.color.clone())
                .unwrap_or_else(|| palette_color(i).to_string());
            let rms_m = fix.map(|f| f.rms);
            summaries.insert(
                id.clone(),
                ObjectSummary {
                    object_id: id.clone(),
                    color,
                    lat: fix.map(|f| f.lat),
                    lng: fix.map(|f| f.lng),
                    n_obs: list.len(),
                    rms_m,
                    quality: Quality::grade(rms_m, &self.params),
                    updated_at_ms: now,
                },
            );
        }
        debug!("ProjectState: recomputed {} objects", summaries.len());
        self.summaries = summaries;
    }
}
