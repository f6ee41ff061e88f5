//! Error types for request dispatch.
//!
//! [`S3ClientError`] is the single error returned by every client operation.
//! Transport failures keep their kind in [`TransportError`] so a timeout or a
//! cancellation is never confused with an HTTP error status.

use http::StatusCode;
use rustack_s3_signer::SignError;

/// Boxed error used by the transport and region-locator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised by an [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request or response exceeded the transport deadline.
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    /// The request was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// No connection could be established.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// Sending the request body or reading the response body failed.
    #[error("body transfer failed: {0}")]
    Body(#[source] BoxError),

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

/// Errors returned by [`S3Client`](crate::S3Client) operations.
#[derive(Debug, thiserror::Error)]
pub enum S3ClientError {
    /// The request body cannot be used with the active signing policy: a lazy
    /// stream cannot be hashed without buffering it.
    #[error("unsupported body type: streaming bodies cannot be sent with payload hashing enabled")]
    UnsupportedBodyType,

    /// The bucket region lookup failed.
    #[error("failed to resolve region for bucket {bucket}: {source}")]
    RegionResolution {
        /// The bucket whose region was requested.
        bucket: String,
        /// The locator failure.
        #[source]
        source: BoxError,
    },

    /// Computing the signature failed; the request was not sent.
    #[error("signing failed: {0}")]
    Signing(#[source] SignError),

    /// The presign expiry is outside `1..=604800` seconds.
    #[error("invalid presign expiry: {0} seconds (must be between 1 and 604800)")]
    InvalidExpiry(u64),

    /// The server answered with a status of 400 or above.
    #[error("HTTP {} {reason}", .status.as_u16())]
    Http {
        /// The response status.
        status: StatusCode,
        /// The canonical reason phrase for the status.
        reason: String,
        /// The response body, when it was read.
        body: Option<String>,
    },

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The URL or request could not be constructed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The operation needs credentials but the client is anonymous.
    #[error("anonymous client cannot {0}")]
    AnonymousRequest(&'static str),
}

impl From<SignError> for S3ClientError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::InvalidExpiry(seconds) => Self::InvalidExpiry(seconds),
            other => Self::Signing(other),
        }
    }
}

/// Convenience result type for client operations.
pub type S3ClientResult<T> = Result<T, S3ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_invalid_expiry_to_dedicated_variant() {
        let err = S3ClientError::from(SignError::InvalidExpiry(0));
        assert!(matches!(err, S3ClientError::InvalidExpiry(0)));
    }

    #[test]
    fn test_should_map_other_sign_errors_to_signing() {
        let err = S3ClientError::from(SignError::MissingHost);
        assert!(matches!(err, S3ClientError::Signing(SignError::MissingHost)));
    }

    #[test]
    fn test_should_display_http_error() {
        let err = S3ClientError::Http {
            status: StatusCode::FORBIDDEN,
            reason: "Forbidden".to_owned(),
            body: Some("AccessDenied".to_owned()),
        };
        assert_eq!(err.to_string(), "HTTP 403 Forbidden");
    }

    #[test]
    fn test_should_keep_transport_error_message() {
        let err = S3ClientError::from(TransportError::Timeout("deadline elapsed".into()));
        assert_eq!(err.to_string(), "request timed out: deadline elapsed");
    }
}
