use crate::pipeline::types::Stage;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks how long each stage of one request took, in the order entered.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    stage_durations: IndexMap<Stage, Duration>,
    /// Entry time of the stage currently running
    current_stage: Option<(Stage, Instant)>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record entry into a stage, closing the previous one if still open.
    pub fn enter(&mut self, stage: Stage) {
        self.exit();
        self.current_stage = Some((stage, Instant::now()));
    }

    /// Close the running stage and accumulate its duration.
    pub fn exit(&mut self) {
        if let Some((stage, started)) = self.current_stage.take() {
            *self.stage_durations.entry(stage).or_default() += started.elapsed();
        }
    }

    pub fn duration(&self, stage: Stage) -> Duration {
        self.stage_durations
            .get(&stage)
            .copied()
            .unwrap_or_default()
    }

    pub fn stages(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        self.stage_durations.iter().map(|(stage, d)| (*stage, *d))
    }

    pub fn total(&self) -> Duration {
        self.stage_durations.values().sum()
    }
}
