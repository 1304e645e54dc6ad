pub mod backend;
pub mod orchestration;
pub mod types;

pub use backend::{InferenceBackend, LocalBackend, RemoteBackend};
pub use orchestration::{EnhancementPipeline, EnhancementPipelineBuilder, StatsMonitor};
pub use types::{EnhancementRequest, EnhancementResult, ProgressEvent, ProgressState, Stage};
