//! Inference backends. Local and remote engines sit behind the same
//! [`InferenceBackend`] contract so the pipeline never knows which one runs.

pub mod backend_service;
pub mod local_backend;
pub mod remote_backend;

pub use backend_service::BackendService;
pub use local_backend::LocalBackend;
pub use remote_backend::RemoteBackend;

use crate::error::TransportError;
use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use serde::Deserialize;

/// What gets handed to a backend: the packaged source image.
#[derive(Debug, Clone)]
pub struct BackendPayload {
    pub image: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

/// Enhanced image as delivered by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Raw(Bytes),
    /// `data:<mime>;base64,<data>`
    DataUrl(String),
}

impl ImagePayload {
    /// Resolves the payload to image bytes. Returns `None` for an empty or
    /// undecodable payload.
    pub fn decode(&self) -> Option<Bytes> {
        match self {
            ImagePayload::Raw(bytes) if bytes.is_empty() => None,
            ImagePayload::Raw(bytes) => Some(bytes.clone()),
            ImagePayload::DataUrl(url) => {
                let (header, data) = url.strip_prefix("data:")?.split_once(',')?;
                if !header.ends_with(";base64") {
                    return None;
                }
                base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .ok()
                    .filter(|bytes| !bytes.is_empty())
                    .map(Bytes::from)
            }
        }
    }
}

/// Body of a 2xx backend reply. Every field is optional on the wire; the
/// pipeline decides whether the shape is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendBody {
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "data_url")]
    pub enhanced_image: Option<ImagePayload>,
    pub enhanced_size: Option<u64>,
}

fn data_url<'de, D>(deserializer: D) -> Result<Option<ImagePayload>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let url: Option<String> = Option::deserialize(deserializer)?;
    Ok(url.map(ImagePayload::DataUrl))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Success(BackendBody),
    Failure {
        status: u16,
        message: Option<String>,
    },
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn infer(&self, payload: BackendPayload) -> Result<BackendReply, TransportError>;
    fn name(&self) -> &'static str;
}
