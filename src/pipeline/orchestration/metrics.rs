use crate::error::{EnhancementError, ErrorCategory};
use crate::pipeline::types::EnhancementResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Observer pattern for request outcomes
pub trait PipelineObserver: Send + Sync {
    fn on_request_completed(&mut self, request_id: Uuid, result: &EnhancementResult);
    fn on_request_failed(&mut self, request_id: Uuid, error: &EnhancementError);
}

/// Collects and manages multiple pipeline observers
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn PipelineObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify_completed(&mut self, request_id: Uuid, result: &EnhancementResult) {
        for observer in &mut self.observers {
            observer.on_request_completed(request_id, result);
        }
    }

    pub fn notify_failed(&mut self, request_id: Uuid, error: &EnhancementError) {
        for observer in &mut self.observers {
            observer.on_request_failed(request_id, error);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnhancementStats {
    pub total_completed: usize,
    pub total_failed: usize,
    pub failures_by_category: HashMap<ErrorCategory, usize>,
    pub average_elapsed_ms: f32,
    pub max_elapsed_ms: u64,
    pub last_request: Option<Uuid>,
}

/// Aggregates outcome statistics; clones share the same counters.
#[derive(Clone, Default)]
pub struct StatsMonitor {
    stats: Arc<Mutex<EnhancementStats>>,
}

impl StatsMonitor {
    const ALPHA: f32 = 0.2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> EnhancementStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_ewma(current: f32, new_value: u64, first: bool) -> f32 {
        if first {
            new_value as f32
        } else {
            current * (1.0 - Self::ALPHA) + new_value as f32 * Self::ALPHA
        }
    }
}

impl PipelineObserver for StatsMonitor {
    fn on_request_completed(&mut self, request_id: Uuid, result: &EnhancementResult) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let first = stats.total_completed == 0;
        stats.total_completed += 1;
        stats.average_elapsed_ms =
            Self::update_ewma(stats.average_elapsed_ms, result.elapsed_millis, first);
        stats.max_elapsed_ms = stats.max_elapsed_ms.max(result.elapsed_millis);
        stats.last_request = Some(request_id);
        tracing::debug!(
            "StatsMonitor: completed request {}, elapsed={}ms",
            request_id,
            result.elapsed_millis
        );
    }

    fn on_request_failed(&mut self, request_id: Uuid, error: &EnhancementError) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_failed += 1;
        *stats
            .failures_by_category
            .entry(error.category())
            .or_insert(0) += 1;
        stats.last_request = Some(request_id);
    }
}
