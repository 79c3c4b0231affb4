//! Sequential multi-object assignment run.
//!
//! One [`AutoAssigner`] owns everything a run shares across objects: the
//! spatial index (built once), the free-detection registry (seeded from the
//! existing observation map) and the memo [`Workspace`]. Objects are processed
//! in the caller's order; detections taken by an earlier object are no longer
//! free for later ones.

use super::greedy::greedy_assign;
use super::params::AssignParams;
use super::registry::DetectionRegistry;
use super::seed_grow::{Growth, SeedGrow};
use super::workspace::Workspace;
use crate::cluster::PanoCluster;
use crate::diagnostics::{ObjectOutcome, RunReport, StageClock};
use crate::scene::Scene;
use crate::spatial::SpatialIndex;
use crate::types::{timestamp_ms, ObjectId, ObservationMap};
use crate::{Error, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Per-object search strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignStrategy {
    #[default]
    SeedGrow,
    Greedy,
}

/// Checkpoint emitted after each processed object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// 1-based count of processed objects.
    pub current: usize,
    pub total: usize,
    pub object_id: ObjectId,
}

/// Updated observation map plus the run report.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub observations: ObservationMap,
    pub report: RunReport,
}

impl RunOutcome {
    pub fn cancelled(&self) -> bool {
        self.report.cancelled
    }
}

pub struct AutoAssigner<'s> {
    scene: &'s Scene,
    params: AssignParams,
    strategy: AssignStrategy,
    observations: ObservationMap,
    index: SpatialIndex,
    registry: DetectionRegistry,
    workspace: Workspace,
    clock: StageClock,
}

impl<'s> AutoAssigner<'s> {
    /// Validates `params` and `observations` against `scene` and prepares the
    /// run state.
    pub fn new(
        scene: &'s Scene,
        observations: ObservationMap,
        params: AssignParams,
    ) -> Result<Self> {
        params.validate()?;
        scene.check_observations(&observations)?;
        let mut clock = StageClock::start();
        let index = SpatialIndex::new(scene.panoramas());
        let registry = DetectionRegistry::from_observations(&observations);
        clock.lap("index");
        debug!(
            "AutoAssigner::new panoramas={} detections={} consumed={}",
            scene.panoramas().len(),
            scene.detections().len(),
            registry.consumed_count()
        );
        Ok(Self {
            scene,
            params,
            strategy: AssignStrategy::default(),
            observations,
            index,
            registry,
            workspace: Workspace::new(),
            clock,
        })
    }

    pub fn with_strategy(mut self, strategy: AssignStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn params(&self) -> &AssignParams {
        &self.params
    }

    /// Clusters of the currently free detections. Mutates nothing.
    pub fn preview(&self) -> Vec<PanoCluster> {
        SeedGrow::new(self.scene, &self.index, &self.params).clusters(&self.registry)
    }

    /// Processes `object_ids` in order without checkpoints.
    pub fn run(self, object_ids: &[ObjectId]) -> Result<RunOutcome> {
        self.run_progressive(object_ids, |_| ControlFlow::Continue(()))
    }

    /// Processes `object_ids` in order, calling `on_checkpoint` after each
    /// object. Returning `ControlFlow::Break(())` stops the run; objects
    /// already processed keep their new observations.
    pub fn run_progressive<F>(
        mut self,
        object_ids: &[ObjectId],
        mut on_checkpoint: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let total = object_ids.len();
        let free_before = self.free_count();
        let mut outcomes = Vec::with_capacity(total);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut cancelled = false;
        let now_ms = timestamp_ms();

        for (i, object_id) in object_ids.iter().enumerate() {
            if !seen.insert(object_id.as_str()) {
                warn!("AutoAssigner: object {} listed twice, skipping repeat", object_id);
            } else {
                let outcome = self.assign_one(object_id, now_ms)?;
                self.clock.lap(format!("assign {object_id}"));
                outcomes.push(outcome);
            }
            let progress = Progress {
                current: i + 1,
                total,
                object_id: object_id.clone(),
            };
            if on_checkpoint(&progress).is_break() {
                cancelled = i + 1 < total;
                if cancelled {
                    debug!("AutoAssigner: cancelled after {}/{}", i + 1, total);
                }
                break;
            }
        }

        let report = RunReport {
            strategy: self.strategy,
            total_objects: total,
            objects: outcomes,
            cancelled,
            free_detections_before: free_before,
            free_detections_after: self.free_count(),
            cache: self.workspace.stats(),
            timings: self.clock.finish(),
        };
        debug!(
            "AutoAssigner: processed={} consumed={} cancelled={}",
            report.objects.len(),
            report.consumed(),
            report.cancelled
        );
        Ok(RunOutcome {
            observations: self.observations,
            report,
        })
    }

    fn free_count(&self) -> usize {
        self.scene
            .detections()
            .iter()
            .filter(|d| self.registry.is_free(&d.id))
            .count()
    }

    fn assign_one(&mut self, object_id: &str, now_ms: u64) -> Result<ObjectOutcome> {
        let existing = self.observations.get(object_id).cloned().unwrap_or_default();
        let growth: Growth = match self.strategy {
            AssignStrategy::SeedGrow => {
                SeedGrow::new(self.scene, &self.index, &self.params).assign(
                    object_id,
                    &existing,
                    &self.registry,
                    &mut self.workspace,
                    now_ms,
                )?
            }
            AssignStrategy::Greedy => greedy_assign(
                self.scene,
                &self.params,
                object_id,
                &existing,
                &self.registry,
                &mut self.workspace,
                now_ms,
            )?,
        };

        let mut added = Vec::new();
        for obs in &growth.observations {
            match self.registry.owner(&obs.detection_id) {
                Some(owner) if owner == object_id => continue,
                Some(owner) => {
                    return Err(Error::DetectionAlreadyAssigned {
                        detection_id: obs.detection_id.clone(),
                        object_id: owner.to_string(),
                    })
                }
                None => {
                    self.registry.consume(&obs.detection_id, object_id);
                    added.push(obs.detection_id.clone());
                }
            }
        }

        let outcome = ObjectOutcome {
            object_id: object_id.to_string(),
            mode: growth.mode,
            observations_before: existing.len(),
            observations_after: growth.observations.len(),
            added,
            lat: growth.fix.map(|f| f.lat),
            lng: growth.fix.map(|f| f.lng),
            rms_m: growth.fix.map(|f| f.rms),
        };
        debug!(
            "AutoAssigner: object={} mode={:?} {} -> {}",
            object_id, outcome.mode, outcome.observations_before, outcome.observations_after
        );
        if !growth.observations.is_empty() || self.observations.contains_key(object_id) {
            self.observations
                .insert(object_id.to_string(), growth.observations);
        }
        Ok(outcome)
    }
}
