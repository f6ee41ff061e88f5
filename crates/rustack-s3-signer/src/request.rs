//! Borrowed view of the request parts that participate in a signature.

use http::{HeaderMap, Method, Uri};

/// The method, URI and headers of a request about to be signed.
///
/// Only references are held; the body is never read during signing.
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    /// HTTP method.
    pub method: &'a Method,
    /// Absolute request URI.
    pub uri: &'a Uri,
    /// Request headers, including `host`, `x-amz-date` and `x-amz-content-sha256`.
    pub headers: &'a HeaderMap,
}

impl<'a> SignableRequest<'a> {
    /// Create a signable view from its parts.
    #[must_use]
    pub fn new(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Create a signable view from request parts.
    #[must_use]
    pub fn from_parts(parts: &'a http::request::Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers)
    }
}

impl<'a, B> From<&'a http::Request<B>> for SignableRequest<'a> {
    fn from(request: &'a http::Request<B>) -> Self {
        Self::new(request.method(), request.uri(), request.headers())
    }
}
