//! Signed request dispatch for S3-compatible object storage.
//!
//! This crate turns a logical S3 call (method, bucket, object, query, headers,
//! body) into a correctly addressed, SigV4-signed HTTP request, sends it over
//! a pluggable transport, and validates the response status. Signing itself
//! lives in [`rustack_s3_signer`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use http::Method;
//! use rustack_s3_client::{ClientConfig, DispatchRequest, S3Client};
//! use rustack_s3_signer::Credentials;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .endpoint("localhost")
//!     .port(4566)
//!     .credentials(Credentials::new("test", "test"))
//!     .build();
//! let client = S3Client::new(config)?;
//!
//! let response = client
//!     .execute(
//!         DispatchRequest::builder()
//!             .method(Method::PUT)
//!             .bucket("photos")
//!             .object("cat.txt")
//!             .body("meow")
//!             .build(),
//!     )
//!     .await?;
//! assert!(response.status.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`body`] - Request bodies, finalization and progress reporting
//! - [`config`] - Client configuration and signing policy
//! - [`dispatch`] - The [`S3Client`] dispatcher
//! - [`error`] - Client and transport error types
//! - [`region`] - Region resolution and bucket region lookup
//! - [`request`] - Request and response values
//! - [`trace`] - Request/response trace hooks
//! - [`transport`] - The transport trait and reqwest adapter
//! - [`url`] - Path-style URL construction

pub mod body;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod region;
pub mod request;
pub mod trace;
pub mod transport;
pub mod url;

pub use body::{FinalizedBody, MAX_CHUNK_SIZE, ProgressCallback, RequestBody};
pub use config::{ClientConfig, SigningPolicy};
pub use dispatch::{DispatchRequest, PostPolicyForm, PresignRequest, S3Client};
pub use error::{S3ClientError, S3ClientResult, TransportError};
pub use region::{BucketRegionLocator, ResolvedRegion, StaticRegionLocator};
pub use request::{S3Request, S3Response, S3StreamingResponse};
pub use trace::{NoopTraceSink, TraceEvent, TraceSink, TracingSink};
pub use transport::{HttpTransport, ReqwestTransport, ResponseBody};
