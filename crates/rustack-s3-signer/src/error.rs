//! Error types for SigV4 signing.
//!
//! All signing failures are represented by [`SignError`]. Signing never performs
//! I/O, so every variant describes malformed input rather than a remote failure.

/// Errors that can occur while signing a request, presigning a URL, or signing a
/// POST policy.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The presign expiry is outside the accepted `1..=604800` seconds window.
    #[error("invalid presign expiry: {0} seconds (must be between 1 and 604800)")]
    InvalidExpiry(u64),

    /// A signed header carries a value that is not visible ASCII.
    #[error("invalid value for header: {0}")]
    InvalidHeaderValue(String),

    /// A header listed as signed is absent from the request.
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// The request URI has no authority, so no `host` header can be derived.
    #[error("request URI has no host")]
    MissingHost,

    /// The request URI cannot be turned into an absolute URL.
    #[error("invalid request URI: {0}")]
    InvalidUri(String),

    /// The POST policy is incomplete or cannot be serialized.
    #[error("invalid POST policy: {0}")]
    InvalidPolicy(String),
}

/// Convenience result type for signing operations.
pub type SignResult<T> = Result<T, SignError>;
