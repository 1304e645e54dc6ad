//! Scripted backends and helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use srgan_enhancer::TransportError;
use srgan_enhancer::pipeline::backend::{
    BackendBody, BackendPayload, BackendReply, ImagePayload, InferenceBackend,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted backend call: wait `delay`, then answer with `reply`.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub reply: Result<BackendReply, TransportError>,
}

impl Step {
    pub fn reply(reply: BackendReply) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(reply),
        }
    }

    pub fn transport(error: TransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Calls {
    started: usize,
    completed: usize,
    payloads: Vec<BackendPayload>,
}

/// Backend that plays back a fixed script and records every call.
///
/// Calls beyond the end of the script repeat the last step.
#[derive(Clone)]
pub struct ScriptedBackend {
    steps: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<Option<Step>>>,
    calls: Arc<Mutex<Calls>>,
}

impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new([step])
    }

    pub fn started(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .started
    }

    pub fn completed(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .completed
    }

    pub fn payloads(&self) -> Vec<BackendPayload> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .payloads
            .clone()
    }

    fn next_step(&self) -> Step {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last
                .clone()
                .unwrap_or_else(|| Step::transport(TransportError::Task("empty script".into()))),
        }
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn infer(&self, payload: BackendPayload) -> Result<BackendReply, TransportError> {
        let step = self.next_step();
        {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.started += 1;
            calls.payloads.push(payload);
        }
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .completed += 1;
        step.reply
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A well-formed success reply carrying `image` as a base64 data URL.
pub fn success_with(image: &[u8]) -> BackendReply {
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    BackendReply::Success(BackendBody {
        success: Some(true),
        enhanced_image: Some(ImagePayload::DataUrl(format!(
            "data:image/png;base64,{}",
            encoded
        ))),
        enhanced_size: Some(image.len() as u64),
    })
}

pub fn success() -> BackendReply {
    success_with(b"enhanced png bytes")
}

pub fn jpeg(len: usize) -> Bytes {
    Bytes::from(vec![0xffu8; len])
}

/// A gradient PNG of the given size.
pub fn png(width: u32, height: u32) -> Bytes {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    Bytes::from(bytes.into_inner())
}
