use crate::error::AppError;
use crate::pipeline::{EnhancementPipeline, EnhancementRequest, EnhancementResult, ProgressState};
use crate::slider::{CompareSlider, ComparisonPair, ContainerBounds};
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct SelectedImage {
    id: Uuid,
    name: String,
    request: EnhancementRequest,
}

/// Host-side state for one enhancement screen: the selected original, the
/// latest result or error, and the comparison slider over the two.
pub struct EnhancementSession {
    pipeline: EnhancementPipeline,
    slider: CompareSlider,
    original: Option<SelectedImage>,
    enhanced: Option<EnhancementResult>,
    error: Option<String>,
}

impl EnhancementSession {
    pub fn new(pipeline: EnhancementPipeline, bounds: ContainerBounds) -> Self {
        Self {
            pipeline,
            slider: CompareSlider::new(bounds),
            original: None,
            enhanced: None,
            error: None,
        }
    }

    /// Accepts a user-selected file. Anything that is not `image/*` is
    /// refused and leaves the session untouched apart from the error message.
    pub fn select_image(
        &mut self,
        name: impl Into<String>,
        mime_type: &str,
        bytes: impl Into<Bytes>,
    ) -> Result<Uuid, AppError> {
        self.error = None;
        if !mime_type.starts_with("image/") {
            let error = AppError::UnsupportedMediaType(mime_type.to_string());
            self.error = Some("Please upload an image file".to_string());
            return Err(error);
        }

        let name = name.into();
        let request = EnhancementRequest::new(bytes, mime_type).with_file_name(name.clone());
        let id = Uuid::new_v4();
        debug!("Selected {} ({} bytes) as {}", name, request.size_bytes(), id);
        self.original = Some(SelectedImage { id, name, request });
        self.enhanced = None;
        self.slider.set_pair(None);
        Ok(id)
    }

    pub async fn enhance(&mut self) -> Result<&EnhancementResult, AppError> {
        let (original_id, request) = match &self.original {
            Some(original) => (original.id, original.request.clone()),
            None => return Err(AppError::NoImageSelected),
        };
        self.error = None;

        match self.pipeline.enhance(request).await {
            Ok(result) => {
                info!("Session received enhanced image for {}", original_id);
                self.slider.set_pair(Some(ComparisonPair {
                    original: original_id,
                    enhanced: result.request_id,
                }));
                Ok(self.enhanced.insert(result))
            }
            Err(e) => {
                warn!("Enhancement failed: {}", e);
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Clears everything and cancels a request that may still be running.
    pub fn reset(&mut self) {
        self.pipeline.cancel();
        self.original = None;
        self.enhanced = None;
        self.error = None;
        self.slider.set_pair(None);
    }

    pub fn progress(&self) -> ProgressState {
        self.pipeline.current_progress()
    }

    pub fn pipeline(&self) -> &EnhancementPipeline {
        &self.pipeline
    }

    pub fn slider(&self) -> &CompareSlider {
        &self.slider
    }

    pub fn slider_mut(&mut self) -> &mut CompareSlider {
        &mut self.slider
    }

    pub fn original(&self) -> Option<&EnhancementRequest> {
        self.original.as_ref().map(|original| &original.request)
    }

    pub fn enhanced(&self) -> Option<&EnhancementResult> {
        self.enhanced.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// File name offered when saving the enhanced image.
    pub fn download_name(&self) -> Option<String> {
        self.enhanced.as_ref()?;
        let name = self
            .original
            .as_ref()
            .map(|original| original.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("image");
        Some(format!("enhanced-{}", name))
    }

    pub fn size_change_percent(&self) -> Option<f64> {
        let original = self.original.as_ref()?;
        self.enhanced
            .as_ref()?
            .size_change_percent(original.request.size_bytes())
    }
}
