#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod assign;
pub mod diagnostics;
pub mod error;
pub mod project;
pub mod scene;
pub mod types;

// Geometry building blocks.
pub mod angle;
pub mod cluster;
pub mod geo;
pub mod spatial;

// Tooling for the demo binaries; the core modules never touch the filesystem.
pub mod config;
pub mod io;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{Error, Result};

// Main entry points: run orchestration and the project model.
pub use crate::assign::{
    AssignParams, AssignStrategy, AutoAssigner, GrowthMode, Progress, RunOutcome,
};
pub use crate::project::{ObjectSummary, ProjectState, Quality};
pub use crate::scene::Scene;

// Records exchanged with the ingestion and UI layers.
pub use crate::cluster::PanoCluster;
pub use crate::diagnostics::RunReport;
pub use crate::geo::{triangulate, Fix, Ray};
pub use crate::types::{BoundingBox, Detection, Observation, ObservationMap, Panorama};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use pano_locate::prelude::*;
///
/// # fn main() -> pano_locate::Result<()> {
/// let panoramas = vec![
///     Panorama { id: "a".into(), lat: 0.0, lng: 0.0, heading_deg: 0.0,
///                image_width: 3600, image_height: 1800 },
///     Panorama { id: "b".into(), lat: 0.0, lng: 0.0004, heading_deg: 0.0,
///                image_width: 3600, image_height: 1800 },
/// ];
/// let detections = vec![
///     Detection::new("a", BoundingBox::new(2240.0, 0.0, 2260.0, 10.0), None),
///     Detection::new("b", BoundingBox::new(1340.0, 0.0, 1360.0, 10.0), None),
/// ];
/// let scene = Scene::new(panoramas, detections)?;
/// let outcome = AutoAssigner::new(&scene, ObservationMap::new(), AssignParams::default())?
///     .run(&["obj-1".to_string()])?;
/// println!("{:?}", outcome.report.summary_lines());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        AssignParams, AutoAssigner, BoundingBox, Detection, ObservationMap, Panorama, Scene,
    };
}
