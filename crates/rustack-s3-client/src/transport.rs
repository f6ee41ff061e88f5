//! The HTTP transport seam and its reqwest-backed implementation.
//!
//! The dispatcher only sees [`HttpTransport`]. Connection pooling, TLS,
//! timeouts and retries all belong to the transport.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::body::FinalizedBody;
use crate::error::TransportError;

/// Response body handed back by a transport.
pub type ResponseBody = UnsyncBoxBody<Bytes, TransportError>;

/// Sends finalized requests.
///
/// The trait uses boxed futures so it can be shared as `Arc<dyn HttpTransport>`.
pub trait HttpTransport: Send + Sync + 'static {
    /// Send `request` and return the response head with a deferred body.
    ///
    /// A response with an error status is still `Ok`; only failures to get a
    /// response at all are errors.
    fn send(
        &self,
        request: http::Request<FinalizedBody>,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<ResponseBody>, TransportError>> + Send + '_>>;
}

/// [`HttpTransport`] over a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap a configured client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: http::Request<FinalizedBody>,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<ResponseBody>, TransportError>> + Send + '_>>
    {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let request = http::Request::from_parts(parts, reqwest::Body::wrap_stream(body));
            let request = reqwest::Request::try_from(request).map_err(map_reqwest_error)?;
            let response = self
                .client
                .execute(request)
                .await
                .map_err(map_reqwest_error)?;
            let response: http::Response<reqwest::Body> = response.into();
            Ok(response.map(|body| body.map_err(map_reqwest_error).boxed_unsync()))
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(Box::new(err))
    } else if err.is_connect() {
        TransportError::Connect(Box::new(err))
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(Box::new(err))
    } else {
        TransportError::Other(Box::new(err))
    }
}
