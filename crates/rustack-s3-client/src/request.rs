//! Request and response values exchanged with the transport.

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use http_body_util::BodyExt;

use crate::body::{FinalizedBody, ProgressCallback, RequestBody};
use crate::error::{S3ClientError, S3ClientResult};
use crate::transport::ResponseBody;

/// A fully addressed request whose body has not been read yet.
#[derive(Debug)]
pub struct S3Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request payload.
    pub body: RequestBody,
    /// Upload progress callback.
    pub progress: Option<ProgressCallback>,
}

impl S3Request {
    /// Create a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            progress: None,
        }
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach an upload progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Consume the request and turn its body into a transmittable stream.
    ///
    /// `content-length` is set from the body when its length is known; a
    /// stream keeps whatever `content-length` the caller supplied.
    #[must_use]
    pub fn finalize(self) -> http::Request<FinalizedBody> {
        let body = FinalizedBody::new(self.body, self.progress);

        let mut request = http::Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;

        if let Some(length) = request.body().content_length() {
            request
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(length));
        }
        request
    }
}

/// A response whose body has been read in full.
#[derive(Debug, Clone)]
pub struct S3Response {
    /// Response status.
    pub status: StatusCode,
    /// Canonical reason phrase for the status.
    pub reason: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl S3Response {
    /// The body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body is left for the caller to drain.
#[derive(Debug)]
pub struct S3StreamingResponse {
    /// Response status.
    pub status: StatusCode,
    /// Canonical reason phrase for the status.
    pub reason: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Deferred response body.
    pub body: ResponseBody,
}

impl S3StreamingResponse {
    /// Drain the body into memory.
    pub async fn bytes(self) -> S3ClientResult<Bytes> {
        let collected = self.body.collect().await.map_err(S3ClientError::Transport)?;
        Ok(collected.to_bytes())
    }
}

/// The canonical reason phrase for `status`, or an empty string.
pub(crate) fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_owned()
}
