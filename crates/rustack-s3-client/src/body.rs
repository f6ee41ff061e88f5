//! Request body types with deferred materialization and progress reporting.
//!
//! A [`RequestBody`] is one of four shapes: empty, text, a fixed byte buffer,
//! or a lazily produced byte stream. It is consumed exactly once, when the
//! request is finalized into a [`FinalizedBody`] stream for the transport.
//!
//! When a [`ProgressCallback`] is attached, the finalized stream caps every
//! chunk at [`MAX_CHUNK_SIZE`] bytes and reports the cumulative byte count
//! after each chunk is handed to the transport.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::stream::BoxStream;

/// Largest chunk emitted while a progress callback is attached.
pub const MAX_CHUNK_SIZE: usize = 65_536;

/// A lazily produced request body.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Request payload.
#[derive(Default)]
pub enum RequestBody {
    /// No body; sent with `content-length: 0`.
    #[default]
    Empty,
    /// UTF-8 text, encoded once at finalization.
    Text(String),
    /// A fixed byte buffer.
    Bytes(Bytes),
    /// A lazy stream, pulled by the transport as it sends.
    Stream(ByteStream),
}

impl RequestBody {
    /// Wrap a stream of byte chunks.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// The body length, when known without reading a stream.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Text(text) => Some(text.len() as u64),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream(_) => None,
        }
    }

    /// Whether the body is a lazy stream.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// The hex SHA-256 of the body, or `None` for a stream.
    #[must_use]
    pub fn sha256(&self) -> Option<String> {
        match self {
            Self::Empty => Some(rustack_s3_signer::EMPTY_PAYLOAD_SHA256.to_owned()),
            Self::Text(text) => Some(rustack_s3_signer::hash_payload(text.as_bytes())),
            Self::Bytes(bytes) => Some(rustack_s3_signer::hash_payload(bytes)),
            Self::Stream(_) => None,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Receives the cumulative number of body bytes sent.
#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(u64) + Send + Sync>);

impl ProgressCallback {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    fn report(&self, sent: u64) {
        (self.0)(sent);
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressCallback")
    }
}

enum BodySource {
    Once(Option<Bytes>),
    Stream(ByteStream),
}

/// The transmittable form of a [`RequestBody`].
///
/// Poll-driven: a source stream is only pulled when the transport polls for
/// the next chunk. Empty chunks are skipped.
pub struct FinalizedBody {
    source: BodySource,
    pending: Option<Bytes>,
    progress: Option<ProgressCallback>,
    sent: u64,
    content_length: Option<u64>,
}

impl FinalizedBody {
    /// Finalize `body`, consuming it.
    #[must_use]
    pub fn new(body: RequestBody, progress: Option<ProgressCallback>) -> Self {
        let content_length = body.content_length();
        let source = match body {
            RequestBody::Empty => BodySource::Once(None),
            RequestBody::Text(text) => BodySource::Once(Some(Bytes::from(text))),
            RequestBody::Bytes(bytes) => BodySource::Once(Some(bytes)),
            RequestBody::Stream(stream) => BodySource::Stream(stream),
        };
        Self {
            source,
            pending: None,
            progress,
            sent: 0,
            content_length,
        }
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(RequestBody::Empty, None)
    }

    /// The total length, when known up front.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Bytes emitted so far.
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    fn emit(&mut self, mut chunk: Bytes) -> Bytes {
        if self.progress.is_some() && chunk.len() > MAX_CHUNK_SIZE {
            let rest = chunk.split_off(MAX_CHUNK_SIZE);
            self.pending = Some(rest);
        }
        self.sent += chunk.len() as u64;
        if let Some(progress) = &self.progress {
            progress.report(self.sent);
        }
        chunk
    }
}

impl fmt::Debug for FinalizedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizedBody")
            .field("content_length", &self.content_length)
            .field("sent", &self.sent)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl Stream for FinalizedBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(pending) = this.pending.take() {
                return Poll::Ready(Some(Ok(this.emit(pending))));
            }

            let next = match &mut this.source {
                BodySource::Once(bytes) => bytes.take().map(Ok),
                BodySource::Stream(stream) => match stream.as_mut().poll_next(cx) {
                    Poll::Ready(item) => item,
                    Poll::Pending => return Poll::Pending,
                },
            };

            match next {
                None => return Poll::Ready(None),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                Some(Ok(chunk)) if chunk.is_empty() => {}
                Some(Ok(chunk)) => this.pending = Some(chunk),
            }
        }
    }
}
