use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: f64,
}

/// Per-stage wall clock of one run; `total_ms` also covers untimed gaps.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn staged_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

/// Records consecutive stages against one start instant.
pub struct StageClock {
    start: Instant,
    lap: Instant,
    breakdown: TimingBreakdown,
}

impl StageClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap: now,
            breakdown: TimingBreakdown::default(),
        }
    }

    /// Closes the current stage and starts the next one.
    pub fn lap(&mut self, stage: impl Into<String>) -> f64 {
        let now = Instant::now();
        let ms = millis(now - self.lap);
        self.lap = now;
        self.breakdown.stages.push(StageTiming {
            stage: stage.into(),
            elapsed_ms: ms,
        });
        ms
    }

    pub fn finish(mut self) -> TimingBreakdown {
        self.breakdown.total_ms = millis(self.start.elapsed());
        self.breakdown
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
