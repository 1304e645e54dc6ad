use super::{BackendBody, BackendPayload, BackendReply, InferenceBackend};
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Sends the image to an HTTP enhancement service as a single multipart
/// `image` field.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    url: String,
}

impl RemoteBackend {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        // The pipeline owns the deadline, so the client carries none.
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// A connection dropped mid-body is a transport error, not a malformed reply.
    async fn read_reply(response: Response) -> Result<BackendReply, TransportError> {
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            let body = serde_json::from_slice::<BackendBody>(&body).unwrap_or_else(|e| {
                warn!("Backend returned an unreadable success body: {}", e);
                BackendBody::default()
            });
            return Ok(BackendReply::Success(body));
        }

        let message = match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(body) => body.error,
            Err(_) => Some("Unknown error occurred".to_string()),
        };
        Ok(BackendReply::Failure {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl InferenceBackend for RemoteBackend {
    async fn infer(&self, payload: BackendPayload) -> Result<BackendReply, TransportError> {
        debug!("Posting {} bytes to {}", payload.image.len(), self.url);
        let part = Part::stream(payload.image)
            .file_name(payload.file_name)
            .mime_str(&payload.mime_type)?;
        let form = Form::new().part("image", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        debug!("Backend responded with status {}", response.status());
        Self::read_reply(response).await
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
