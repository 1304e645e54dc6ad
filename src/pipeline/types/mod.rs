mod enhancement_request;
mod enhancement_result;
mod progress;

pub use enhancement_request::EnhancementRequest;
pub use enhancement_result::{EnhancementResult, SpeedRating};
pub use progress::{ProgressEvent, ProgressState, Stage};
