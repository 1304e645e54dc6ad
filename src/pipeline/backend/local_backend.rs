use super::{BackendBody, BackendPayload, BackendReply, ImagePayload, InferenceBackend};
use crate::config::DEFAULT_LOCAL_MAX_OUTPUT_PIXELS;
use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, ImageReader, imageops::FilterType};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Counts a blocking upscale job for as long as it holds its buffers.
struct JobSlot(Arc<AtomicUsize>);

impl JobSlot {
    fn acquire(running: &Arc<AtomicUsize>) -> Self {
        running.fetch_add(1, Ordering::SeqCst);
        Self(running.clone())
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process engine. Upscales with a Lanczos filter so the crate works
/// without a running inference service.
///
/// The work runs on the blocking pool. Dropping the `infer` future cancels the
/// job at its next step boundary, so an abandoned request releases its image
/// buffers instead of running to completion.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    scale: u32,
    max_output_pixels: u64,
    running: Arc<AtomicUsize>,
}

impl LocalBackend {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
            max_output_pixels: DEFAULT_LOCAL_MAX_OUTPUT_PIXELS,
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Largest output, in pixels, the engine will produce.
    pub fn with_max_output_pixels(mut self, max_output_pixels: u64) -> Self {
        self.max_output_pixels = max_output_pixels.max(1);
        self
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn max_output_pixels(&self) -> u64 {
        self.max_output_pixels
    }

    /// Blocking jobs that still hold image buffers.
    pub fn running_jobs(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn load_failure() -> BackendReply {
        BackendReply::Failure {
            status: 422,
            message: Some("Failed to load image".to_string()),
        }
    }

    fn cancelled() -> TransportError {
        TransportError::Task("local upscale cancelled".to_string())
    }

    fn output_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let width = width.checked_mul(self.scale)?;
        let height = height.checked_mul(self.scale)?;
        let pixels = u64::from(width) * u64::from(height);
        (pixels <= self.max_output_pixels).then_some((width, height))
    }

    fn upscale(&self, image: &[u8], cancel: &CancellationToken) -> Result<BackendReply, TransportError> {
        let dimensions = ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());
        let Some((width, height)) = dimensions else {
            debug!("Local backend could not read image dimensions");
            return Ok(Self::load_failure());
        };
        let Some((out_width, out_height)) = self.output_size(width, height) else {
            warn!(
                "Refusing to upscale {}x{} by {}x: over budget of {} pixels",
                width, height, self.scale, self.max_output_pixels
            );
            return Ok(BackendReply::Failure {
                status: 413,
                message: Some("Image is too large to enhance locally".to_string()),
            });
        };

        if cancel.is_cancelled() {
            return Err(Self::cancelled());
        }
        let source = match image::load_from_memory(image) {
            Ok(source) => source,
            Err(e) => {
                debug!("Local backend could not decode input: {}", e);
                return Ok(Self::load_failure());
            }
        };

        if cancel.is_cancelled() {
            return Err(Self::cancelled());
        }
        let enhanced = source.resize_exact(out_width, out_height, FilterType::Lanczos3);
        drop(source);

        if cancel.is_cancelled() {
            return Err(Self::cancelled());
        }
        let mut encoded = Cursor::new(Vec::new());
        if let Err(e) = enhanced.write_to(&mut encoded, ImageFormat::Png) {
            error!("Local backend failed to encode output: {}", e);
            return Ok(BackendReply::Failure {
                status: 500,
                message: Some(format!("Failed to encode enhanced image: {}", e)),
            });
        }

        let encoded = encoded.into_inner();
        let enhanced_size = encoded.len() as u64;
        Ok(BackendReply::Success(BackendBody {
            success: Some(true),
            enhanced_image: Some(ImagePayload::Raw(Bytes::from(encoded))),
            enhanced_size: Some(enhanced_size),
        }))
    }
}

#[async_trait]
impl InferenceBackend for LocalBackend {
    async fn infer(&self, payload: BackendPayload) -> Result<BackendReply, TransportError> {
        debug!(
            "Upscaling {} bytes locally by {}x",
            payload.image.len(),
            self.scale
        );
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let backend = self.clone();
        let slot = JobSlot::acquire(&self.running);
        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            let outcome = backend.upscale(&payload.image, &cancel);
            if cancel.is_cancelled() {
                debug!("Local upscale abandoned by its caller");
            }
            outcome
        })
        .await
        .map_err(|e| TransportError::Task(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
