//! Response envelope returned for every request

use crate::channel::ByteStream;

/// Content type plus byte stream, or neither
///
/// An envelope without a stream means "resource not found" and carries no
/// information about why the request failed.
pub struct ResponseEnvelope {
    content_type: Option<String>,
    stream: Option<ByteStream>,
}

impl ResponseEnvelope {
    /// Envelope for a successfully opened file
    pub fn found(content_type: String, stream: ByteStream) -> Self {
        Self {
            content_type: Some(content_type),
            stream: Some(stream),
        }
    }

    /// Envelope for any failed request
    pub fn not_found() -> Self {
        Self {
            content_type: None,
            stream: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.stream.is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Split into content type and stream; the caller owns the stream
    pub fn into_parts(self) -> (Option<String>, Option<ByteStream>) {
        (self.content_type, self.stream)
    }

    pub fn into_stream(self) -> Option<ByteStream> {
        self.stream
    }
}

impl std::fmt::Debug for ResponseEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEnvelope")
            .field("content_type", &self.content_type)
            .field("stream", &self.stream.as_ref().map(|_| "<stream>"))
            .finish()
    }
}
