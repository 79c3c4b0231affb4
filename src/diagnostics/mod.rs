//! Serializable run diagnostics.
//!
//! `RunReport` is returned next to the updated observation map by every
//! assignment run: per-object outcomes, cache counters and a stage
//! `TimingBreakdown` (index build, then one stage per object).

pub mod run;
pub mod timing;

pub use run::{ObjectOutcome, RunReport};
pub use timing::{StageClock, StageTiming, TimingBreakdown};
