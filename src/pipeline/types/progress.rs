use uuid::Uuid;

/// A named phase of the enhancement lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Preprocessing,
    Processing,
    Postprocessing,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Preprocessing => "preprocessing",
            Stage::Processing => "processing",
            Stage::Postprocessing => "postprocessing",
            Stage::Complete => "complete",
        }
    }

    /// Percent range the stage covers, as `(entry, ceiling)`.
    pub fn percent_range(&self) -> (u8, u8) {
        match self {
            Stage::Idle => (0, 0),
            Stage::Preprocessing => (0, 30),
            Stage::Processing => (30, 80),
            Stage::Postprocessing => (80, 95),
            Stage::Complete => (95, 100),
        }
    }

    /// Whether `percent` is a valid checkpoint while in this stage.
    pub fn contains(&self, percent: u8) -> bool {
        let (entry, ceiling) = self.percent_range();
        (entry..=ceiling).contains(&percent)
    }

    /// Status line shown while the stage is running.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Idle => "Waiting for an image...",
            Stage::Preprocessing => "Preprocessing input tensor...",
            Stage::Processing => "Running SRGAN inference...",
            Stage::Postprocessing => "Converting output tensor...",
            Stage::Complete => "Super-resolution complete!",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub stage: Stage,
    pub percent: u8,
}

impl ProgressState {
    pub const IDLE: ProgressState = ProgressState {
        stage: Stage::Idle,
        percent: 0,
    };

    pub fn new(stage: Stage, percent: u8) -> Self {
        Self {
            stage,
            percent: percent.min(100),
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Notification published on the pipeline's progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Advanced {
        request_id: Uuid,
        state: ProgressState,
    },
    Settled {
        request_id: Uuid,
        succeeded: bool,
    },
}

impl ProgressEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            ProgressEvent::Advanced { request_id, .. } => *request_id,
            ProgressEvent::Settled { request_id, .. } => *request_id,
        }
    }
}
