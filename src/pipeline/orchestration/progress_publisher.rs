use crate::pipeline::types::{ProgressEvent, ProgressState, Stage};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

struct ActiveRequest {
    id: Uuid,
    cancel: CancellationToken,
    successor: Arc<OnceLock<Uuid>>,
    progress: ProgressState,
}

/// Handle held by the task running a request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    cancel: CancellationToken,
    successor: Arc<OnceLock<Uuid>>,
}

impl RequestTicket {
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The request that replaced this one, fixed at the moment of replacement.
    /// `None` when it was cancelled without a successor or is still active.
    pub fn superseded_by(&self) -> Option<Uuid> {
        self.successor.get().copied()
    }
}

/// Owns the identity of the in-flight request and the progress channel.
///
/// Every publish is checked against the active request id under the lock, so
/// a stale request can never emit after it was superseded or settled.
pub struct ProgressPublisher {
    active: Mutex<Option<ActiveRequest>>,
    progress_tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressPublisher {
    pub fn new(capacity: usize) -> Self {
        let (progress_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            active: Mutex::new(None),
            progress_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveRequest>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<ProgressEvent> {
        BroadcastStream::new(self.subscribe())
    }

    /// Makes `id` the active request. Returns its ticket and the id of the
    /// request it replaced, which has been cancelled and told its successor.
    pub fn begin(&self, id: Uuid) -> (RequestTicket, Option<Uuid>) {
        let ticket = RequestTicket {
            cancel: CancellationToken::new(),
            successor: Arc::new(OnceLock::new()),
        };
        let mut active = self.lock();
        let superseded = active.take().map(|previous| {
            let _ = previous.successor.set(id);
            previous.cancel.cancel();
            previous.id
        });
        *active = Some(ActiveRequest {
            id,
            cancel: ticket.cancel.clone(),
            successor: ticket.successor.clone(),
            progress: ProgressState::IDLE,
        });
        (ticket, superseded)
    }

    /// Publishes a progress update for `id`. Stage and percent only ever move
    /// forward; returns `false` when `id` is no longer the active request.
    pub fn advance(&self, id: Uuid, stage: Stage, percent: u8) -> bool {
        debug_assert!(
            stage.contains(percent),
            "{}% is outside the {} range",
            percent,
            stage
        );
        let mut active = self.lock();
        let Some(request) = active.as_mut().filter(|request| request.id == id) else {
            debug!("Dropping progress for stale request {}", id);
            return false;
        };

        let next = ProgressState::new(
            stage.max(request.progress.stage),
            percent.max(request.progress.percent),
        );
        if next != request.progress {
            request.progress = next;
            let _ = self.progress_tx.send(ProgressEvent::Advanced {
                request_id: id,
                state: next,
            });
        }
        true
    }

    /// Records the terminal outcome for `id`. Only the first settlement of the
    /// active request is published.
    pub fn settle(&self, id: Uuid, succeeded: bool) -> bool {
        let mut active = self.lock();
        if active.as_ref().is_none_or(|request| request.id != id) {
            return false;
        }
        *active = None;
        let _ = self.progress_tx.send(ProgressEvent::Settled {
            request_id: id,
            succeeded,
        });
        true
    }

    /// Cancels the active request, if any, and settles it as failed.
    pub fn cancel_active(&self) -> Option<Uuid> {
        let mut active = self.lock();
        let request = active.take()?;
        request.cancel.cancel();
        let _ = self.progress_tx.send(ProgressEvent::Settled {
            request_id: request.id,
            succeeded: false,
        });
        Some(request.id)
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.lock().as_ref().map(|request| request.id)
    }

    /// Snapshot of the live progress; idle when nothing is in flight.
    pub fn current(&self) -> ProgressState {
        self.lock()
            .as_ref()
            .map(|request| request.progress)
            .unwrap_or_default()
    }
}
