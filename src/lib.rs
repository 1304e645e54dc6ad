pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod slider;

pub use app::EnhancementSession;
pub use config::{BackendKind, Configuration};
pub use error::{AppError, EnhancementError, ErrorCategory, TransportError};

pub use pipeline::{
    EnhancementPipeline, EnhancementPipelineBuilder, EnhancementRequest, EnhancementResult,
    ProgressEvent, ProgressState, Stage,
};
pub use slider::{CompareSlider, ContainerBounds, PointerEvent};
