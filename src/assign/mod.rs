//! Automatic assignment of free detections to objects.
//!
//! - [`params`]: thresholds shared by every strategy.
//! - [`registry`]: which detection belongs to which object during a run.
//! - [`workspace`]: run-scoped bearing and triangulation caches.
//! - [`seed_grow`]: cluster-seeded greedy growth (default strategy).
//! - [`greedy`]: lowest-RMS-first scan over all free detections.
//! - [`orchestrator`]: runs a strategy over an ordered object list with
//!   progress checkpoints and cancellation.

pub mod greedy;
pub mod orchestrator;
pub mod params;
pub mod registry;
pub mod seed_grow;
pub mod workspace;

pub use orchestrator::{AssignStrategy, AutoAssigner, Progress, RunOutcome};
pub use params::AssignParams;
pub use registry::DetectionRegistry;
pub use seed_grow::{Growth, GrowthMode, SeedGrow};
pub use workspace::{CacheStats, Workspace};
