use super::metrics::{ObserverSet, PipelineObserver};
use super::progress_publisher::ProgressPublisher;
use super::stage_timings::StageTimings;
use crate::config::{BackendKind, Configuration};
use crate::error::{AppError, EnhancementError, TransportError};
use crate::pipeline::backend::{
    BackendBody, BackendPayload, BackendReply, BackendService, InferenceBackend, LocalBackend,
    RemoteBackend,
};
use crate::pipeline::types::{
    EnhancementRequest, EnhancementResult, ProgressEvent, ProgressState, Stage,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// File name the source image is packaged under for the backend.
const UPLOAD_FILE_NAME: &str = "image.jpg";

#[derive(Debug, Clone)]
struct PipelineSettings {
    max_payload_bytes: u64,
    backend_timeout: Duration,
    completion_grace: Duration,
}

struct Shared {
    publisher: ProgressPublisher,
    observers: Mutex<ObserverSet>,
}

/// Drives one image at a time through preprocessing, backend inference,
/// postprocessing and completion.
///
/// At most one request is in flight per pipeline. Calling [`enhance`] while a
/// request is running supersedes it: the earlier call settles with
/// [`EnhancementError::Cancelled`] and publishes nothing further. Clones share
/// the same in-flight slot and progress channel.
///
/// [`enhance`]: EnhancementPipeline::enhance
#[derive(Clone)]
pub struct EnhancementPipeline {
    settings: PipelineSettings,
    backend: Arc<dyn InferenceBackend>,
    shared: Arc<Shared>,
}

impl EnhancementPipeline {
    pub fn builder(configuration: Configuration) -> EnhancementPipelineBuilder {
        EnhancementPipelineBuilder::new(configuration)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.shared.publisher.subscribe()
    }

    pub fn progress_stream(&self) -> BroadcastStream<ProgressEvent> {
        self.shared.publisher.stream()
    }

    pub fn current_progress(&self) -> ProgressState {
        self.shared.publisher.current()
    }

    pub fn active_request(&self) -> Option<Uuid> {
        self.shared.publisher.active_id()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Cancels the in-flight request without starting a new one.
    pub fn cancel(&self) -> Option<Uuid> {
        let cancelled = self.shared.publisher.cancel_active();
        if let Some(id) = cancelled {
            info!("Cancelled request {}", id);
        }
        cancelled
    }

    pub async fn enhance(
        &self,
        request: EnhancementRequest,
    ) -> Result<EnhancementResult, EnhancementError> {
        let request_id = Uuid::new_v4();
        let size_bytes = request.effective_size();

        if size_bytes > self.settings.max_payload_bytes {
            let error = EnhancementError::PayloadTooLarge {
                size_bytes,
                max_bytes: self.settings.max_payload_bytes,
            };
            warn!(
                "Rejecting request {}: {} bytes exceeds limit of {} bytes",
                request_id, size_bytes, self.settings.max_payload_bytes
            );
            self.notify_failed(request_id, &error);
            return Err(error);
        }

        let (ticket, superseded) = self.shared.publisher.begin(request_id);
        if let Some(previous) = superseded {
            info!("Request {} supersedes request {}", request_id, previous);
        }
        info!(
            "Starting request {} ({} bytes, {}) on {} backend",
            request_id,
            size_bytes,
            request.mime_type(),
            self.backend.name()
        );

        let started = Instant::now();
        let mut timings = StageTimings::new();
        let outcome = tokio::select! {
            biased;
            _ = ticket.cancellation().cancelled() => Err(EnhancementError::Cancelled {
                superseded_by: ticket.superseded_by(),
            }),
            outcome = self.run(request_id, &request, started, &mut timings) => outcome,
        };

        match &outcome {
            Ok(result) => {
                if self.shared.publisher.settle(request_id, true) {
                    info!(
                        "Request {} completed in {}ms",
                        request_id, result.elapsed_millis
                    );
                    self.notify_completed(request_id, result);
                } else {
                    // Cancelled after the last await point; the newer owner of
                    // the slot decides what is shown.
                    return Err(EnhancementError::Cancelled {
                        superseded_by: ticket.superseded_by(),
                    });
                }
            }
            Err(e @ EnhancementError::Cancelled { .. }) => {
                debug!("Request {} was cancelled", request_id);
                self.notify_failed(request_id, e);
            }
            Err(e) => {
                if self.shared.publisher.settle(request_id, false) {
                    error!("Request {} failed: {:?}", request_id, e);
                    self.notify_failed(request_id, e);
                } else {
                    return Err(EnhancementError::Cancelled {
                        superseded_by: ticket.superseded_by(),
                    });
                }
            }
        }
        outcome
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: &EnhancementRequest,
        started: Instant,
        timings: &mut StageTimings,
    ) -> Result<EnhancementResult, EnhancementError> {
        timings.enter(Stage::Preprocessing);
        let payload = self.preprocess(request_id, request);

        timings.enter(Stage::Processing);
        let reply = self.process(request_id, payload).await?;

        timings.enter(Stage::Postprocessing);
        let body = self.postprocess(request_id, reply)?;

        timings.enter(Stage::Complete);
        let result = self.complete(request_id, body, started, timings)?;

        // Hold the terminal state so observers can render 100% before it clears.
        if !self.settings.completion_grace.is_zero() {
            tokio::time::sleep(self.settings.completion_grace).await;
        }
        Ok(result)
    }

    fn advance(&self, request_id: Uuid, stage: Stage, percent: u8) {
        self.shared.publisher.advance(request_id, stage, percent);
    }

    #[instrument(skip(self, request), fields(stage = "preprocessing"))]
    fn preprocess(&self, request_id: Uuid, request: &EnhancementRequest) -> BackendPayload {
        self.advance(request_id, Stage::Preprocessing, 0);
        self.advance(request_id, Stage::Preprocessing, 10);
        // Size was validated before the request became active.
        self.advance(request_id, Stage::Preprocessing, 20);
        debug!("Packaging {} bytes for the backend", request.source_bytes().len());
        BackendPayload {
            image: request.source_bytes().clone(),
            mime_type: request.mime_type().to_string(),
            file_name: UPLOAD_FILE_NAME.to_string(),
        }
    }

    #[instrument(skip(self, payload), fields(stage = "processing"))]
    async fn process(
        &self,
        request_id: Uuid,
        payload: BackendPayload,
    ) -> Result<BackendReply, EnhancementError> {
        self.advance(request_id, Stage::Processing, 30);
        self.advance(request_id, Stage::Processing, 40);

        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(self.settings.backend_timeout))
            .service(BackendService::new(self.backend.clone()));

        self.advance(request_id, Stage::Processing, 60);
        // On timeout the backend future is dropped here, so its reply can
        // never be observed.
        let reply = service.oneshot(payload).await.map_err(|e| {
            if e.is::<Elapsed>() {
                warn!(
                    "Backend did not respond within {:?}",
                    self.settings.backend_timeout
                );
                EnhancementError::Timeout {
                    after: self.settings.backend_timeout,
                }
            } else if let Some(transport) = e.downcast_ref::<TransportError>() {
                EnhancementError::NetworkFailure(transport.to_string())
            } else {
                EnhancementError::NetworkFailure(e.to_string())
            }
        })?;
        Ok(reply)
    }

    #[instrument(skip(self, reply), fields(stage = "postprocessing"))]
    fn postprocess(
        &self,
        request_id: Uuid,
        reply: BackendReply,
    ) -> Result<BackendBody, EnhancementError> {
        self.advance(request_id, Stage::Postprocessing, 80);
        let body = match reply {
            BackendReply::Success(body) => body,
            BackendReply::Failure { status, message } => {
                return Err(EnhancementError::BackendError {
                    message,
                    status: Some(status),
                });
            }
        };
        self.advance(request_id, Stage::Postprocessing, 95);

        if body.success != Some(true) {
            return Err(EnhancementError::InvalidBackendResponse(
                "response does not report success".to_string(),
            ));
        }
        if body.enhanced_image.is_none() {
            return Err(EnhancementError::InvalidBackendResponse(
                "response carries no enhanced image".to_string(),
            ));
        }
        Ok(body)
    }

    #[instrument(skip(self, body, started, timings), fields(stage = "complete"))]
    fn complete(
        &self,
        request_id: Uuid,
        body: BackendBody,
        started: Instant,
        timings: &mut StageTimings,
    ) -> Result<EnhancementResult, EnhancementError> {
        let enhanced_image = body
            .enhanced_image
            .as_ref()
            .and_then(|image| image.decode())
            .ok_or_else(|| {
                EnhancementError::InvalidBackendResponse(
                    "enhanced image payload could not be decoded".to_string(),
                )
            })?;

        self.advance(request_id, Stage::Complete, 100);
        timings.exit();
        Ok(EnhancementResult {
            request_id,
            enhanced_image,
            enhanced_size_bytes: body.enhanced_size,
            elapsed_millis: started.elapsed().as_millis() as u64,
            stage_timings: timings.clone(),
        })
    }

    fn observers(&self) -> std::sync::MutexGuard<'_, ObserverSet> {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_completed(&self, request_id: Uuid, result: &EnhancementResult) {
        self.observers().notify_completed(request_id, result);
    }

    fn notify_failed(&self, request_id: Uuid, error: &EnhancementError) {
        self.observers().notify_failed(request_id, error);
    }
}

pub struct EnhancementPipelineBuilder {
    configuration: Configuration,
    backend_timeout: Option<Duration>,
    completion_grace: Option<Duration>,
    backend: Option<Arc<dyn InferenceBackend>>,
    observers: ObserverSet,
}

impl EnhancementPipelineBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            backend_timeout: None,
            completion_grace: None,
            backend: None,
            observers: ObserverSet::new(),
        }
    }

    /// Overrides the payload ceiling from the configuration.
    pub fn max_payload_bytes(mut self, max_payload_bytes: u64) -> Self {
        self.configuration.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Overrides the backend deadline from the configuration.
    pub fn backend_timeout(mut self, backend_timeout: Duration) -> Self {
        self.backend_timeout = Some(backend_timeout);
        self
    }

    /// Overrides the completion grace delay from the configuration.
    pub fn completion_grace(mut self, completion_grace: Duration) -> Self {
        self.completion_grace = Some(completion_grace);
        self
    }

    pub fn progress_buffer_size(mut self, progress_buffer_size: usize) -> Self {
        self.configuration.progress_buffer_size = progress_buffer_size;
        self
    }

    /// Uses `backend` instead of the one named in the configuration.
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.observers = self.observers.add_observer(observer);
        self
    }

    pub fn build(self) -> Result<EnhancementPipeline, AppError> {
        let configuration = self.configuration;
        configuration.validate()?;

        let backend_timeout = self
            .backend_timeout
            .unwrap_or_else(|| configuration.backend_timeout());
        if backend_timeout.is_zero() {
            return Err(AppError::InvalidConfig(
                "Backend timeout must be greater than 0".to_string(),
            ));
        }

        let backend: Arc<dyn InferenceBackend> = match self.backend {
            Some(backend) => backend,
            None => match configuration.backend_kind {
                BackendKind::Remote => Arc::new(
                    RemoteBackend::new(configuration.backend_url.clone())
                        .map_err(|e| AppError::Pipeline(e.to_string()))?,
                ),
                BackendKind::Local => Arc::new(
                    LocalBackend::new(configuration.local_scale)
                        .with_max_output_pixels(configuration.local_max_output_pixels),
                ),
            },
        };

        Ok(EnhancementPipeline {
            settings: PipelineSettings {
                max_payload_bytes: configuration.max_payload_bytes,
                backend_timeout,
                completion_grace: self
                    .completion_grace
                    .unwrap_or_else(|| configuration.completion_grace()),
            },
            backend,
            shared: Arc::new(Shared {
                publisher: ProgressPublisher::new(configuration.progress_buffer_size),
                observers: Mutex::new(self.observers),
            }),
        })
    }
}
