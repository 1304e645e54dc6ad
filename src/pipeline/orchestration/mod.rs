pub mod enhancement_pipeline;
pub mod metrics;
pub mod progress_publisher;
pub mod stage_timings;

pub use enhancement_pipeline::{EnhancementPipeline, EnhancementPipelineBuilder};
pub use metrics::{EnhancementStats, ObserverSet, PipelineObserver, StatsMonitor};
pub use progress_publisher::{ProgressPublisher, RequestTicket};
pub use stage_timings::StageTimings;
