use super::{BackendPayload, BackendReply, InferenceBackend};
use futures::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Adapts an [`InferenceBackend`] to a tower `Service` so middleware such as
/// `TimeoutLayer` can wrap the call.
#[derive(Clone)]
pub struct BackendService {
    inner: Arc<dyn InferenceBackend>,
}

impl BackendService {
    pub fn new(inner: Arc<dyn InferenceBackend>) -> Self {
        Self { inner }
    }
}

impl Service<BackendPayload> for BackendService {
    type Response = BackendReply;
    type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, payload: BackendPayload) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let reply = inner.infer(payload).await?;
            Ok(reply)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::pipeline::backend::BackendBody;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tower::ServiceExt;

    struct EchoBackend;

    #[async_trait]
    impl InferenceBackend for EchoBackend {
        async fn infer(&self, payload: BackendPayload) -> Result<BackendReply, TransportError> {
            if payload.image.is_empty() {
                return Err(TransportError::Request("empty".to_string()));
            }
            Ok(BackendReply::Success(BackendBody {
                success: Some(true),
                enhanced_image: None,
                enhanced_size: Some(payload.image.len() as u64),
            }))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn payload(image: &'static [u8]) -> BackendPayload {
        BackendPayload {
            image: Bytes::from_static(image),
            mime_type: "image/png".to_string(),
            file_name: "image.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn forwards_to_backend() {
        let service = BackendService::new(Arc::new(EchoBackend));
        let reply = service.oneshot(payload(b"abc")).await.unwrap();
        match reply {
            BackendReply::Success(body) => assert_eq!(body.enhanced_size, Some(3)),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_errors_are_boxed() {
        let service = BackendService::new(Arc::new(EchoBackend));
        let err = service.oneshot(payload(b"")).await.unwrap_err();
        assert!(err.downcast_ref::<TransportError>().is_some());
    }
}
