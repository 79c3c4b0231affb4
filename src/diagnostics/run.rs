use super::timing::TimingBreakdown;
use crate::assign::orchestrator::AssignStrategy;
use crate::assign::seed_grow::GrowthMode;
use crate::assign::workspace::CacheStats;
use crate::types::{DetectionId, ObjectId};
use serde::Serialize;

/// What one object's turn produced.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOutcome {
    pub object_id: ObjectId,
    pub mode: GrowthMode,
    pub observations_before: usize,
    pub observations_after: usize,
    /// Detections newly consumed by this object, in acceptance order.
    pub added: Vec<DetectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_m: Option<f64>,
}

/// Summary of an assignment run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub strategy: AssignStrategy,
    pub total_objects: usize,
    pub objects: Vec<ObjectOutcome>,
    pub cancelled: bool,
    pub free_detections_before: usize,
    pub free_detections_after: usize,
    pub cache: CacheStats,
    pub timings: TimingBreakdown,
}

impl RunReport {
    /// Number of detections the run consumed.
    pub fn consumed(&self) -> usize {
        self.free_detections_before
            .saturating_sub(self.free_detections_after)
    }

    /// One line per object, for terminal output.
    pub fn summary_lines(&self) -> Vec<String> {
        self.objects
            .iter()
            .map(|o| {
                format!(
                    "{:<12} {:<9} {} -> {} obs  rms={}",
                    o.object_id,
                    format!("{:?}", o.mode).to_lowercase(),
                    o.observations_before,
                    o.observations_after,
                    o.rms_m
                        .map(|v| format!("{v:.2}m"))
                        .unwrap_or_else(|| "-".to_string())
                )
            })
            .collect()
    }
}
