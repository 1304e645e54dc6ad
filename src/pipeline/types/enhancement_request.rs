use bytes::Bytes;

/// A user-supplied image waiting to be enhanced.
///
/// Immutable once created. `size_bytes` is the size declared by whoever read
/// the file; the pipeline checks both it and the actual payload length.
#[derive(Debug, Clone)]
pub struct EnhancementRequest {
    source_bytes: Bytes,
    size_bytes: u64,
    mime_type: String,
    file_name: Option<String>,
}

impl EnhancementRequest {
    pub fn new(source_bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        let source_bytes = source_bytes.into();
        let size_bytes = source_bytes.len() as u64;
        Self::with_declared_size(source_bytes, size_bytes, mime_type)
    }

    pub fn with_declared_size(
        source_bytes: impl Into<Bytes>,
        size_bytes: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            source_bytes: source_bytes.into(),
            size_bytes,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn source_bytes(&self) -> &Bytes {
        &self.source_bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// The larger of the declared size and the real payload length.
    pub fn effective_size(&self) -> u64 {
        self.size_bytes.max(self.source_bytes.len() as u64)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}
