//! Parameter types configuring the auto-assignment run.
//!
//! All thresholds are metres or degrees. Defaults match the operator-facing
//! defaults of the annotation tool; for tuning start with `rms_max` and
//! `min_angle_diff_deg`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Run-wide assignment parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssignParams {
    /// Maximum RMS residual (m) a grown observation set may reach.
    pub rms_max: f64,
    /// RMS (m) at or below which an object is graded good.
    pub rms_good: f64,
    /// Maximum centroid displacement (m) a single added observation may cause.
    pub max_shift_m: f64,
    /// Upper bound on observations per object.
    pub max_obs_per_object: usize,
    /// Minimum bearing separation (deg) between observations of one object.
    #[serde(rename = "minAngleDiff")]
    pub min_angle_diff_deg: f64,
    /// Panorama proximity (m) that links two panoramas into one cluster.
    pub cluster_distance_m: f64,
}

impl Default for AssignParams {
    fn default() -> Self {
        Self {
            rms_max: 3.0,
            rms_good: 1.0,
            max_shift_m: 15.0,
            max_obs_per_object: 6,
            min_angle_diff_deg: 5.0,
            cluster_distance_m: 80.0,
        }
    }
}

impl AssignParams {
    /// Rejects NaN, infinite or negative thresholds and observation caps that
    /// cannot hold a triangulating pair.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("rmsMax", self.rms_max),
            ("rmsGood", self.rms_good),
            ("maxShiftM", self.max_shift_m),
            ("minAngleDiff", self.min_angle_diff_deg),
            ("clusterDistanceM", self.cluster_distance_m),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite, got {value}")));
            }
            if value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if self.max_obs_per_object < 2 {
            return Err(Error::InvalidConfig(format!(
                "maxObsPerObject must be at least 2, got {}",
                self.max_obs_per_object
            )));
        }
        Ok(())
    }

    /// RMS at which a seed that already reached the observation cap stops the
    /// search.
    pub fn good_enough_rms(&self) -> f64 {
        0.5 * self.rms_max
    }
}
