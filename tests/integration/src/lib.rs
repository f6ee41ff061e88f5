//! Integration tests for the Rustack S3 client.
//!
//! These tests require a running S3-compatible server at `localhost:4566`
//! that accepts the `test`/`test` credentials. They are marked `#[ignore]`
//! so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p rustack-s3-client-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use http::{Method, Uri};
use rustack_s3_client::{ClientConfig, DispatchRequest, S3Client, TracingSink};
use rustack_s3_signer::Credentials;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> Uri {
    std::env::var("S3_ENDPOINT_URL")
        .unwrap_or_else(|_| "http://localhost:4566".to_owned())
        .parse()
        .expect("S3_ENDPOINT_URL must be a valid URL")
}

/// Client configuration pointing at the local server.
#[must_use]
pub fn test_config() -> ClientConfig {
    let url = endpoint_url();
    let use_ssl = url.scheme_str() == Some("https");

    ClientConfig::builder()
        .endpoint(url.host().unwrap_or("localhost"))
        .port(url.port_u16().unwrap_or(if use_ssl { 443 } else { 80 }))
        .use_ssl(use_ssl)
        .credentials(Credentials::new("test", "test"))
        .region("us-east-1")
        .build()
}

/// Create a configured client pointing at the local server.
#[must_use]
pub fn s3_client() -> S3Client {
    init_tracing();

    S3Client::new(test_config())
        .expect("valid test configuration")
        .with_trace_sink(Arc::new(TracingSink))
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a bucket and return its name. Caller is responsible for cleanup.
pub async fn create_test_bucket(client: &S3Client, prefix: &str) -> String {
    let name = test_bucket_name(prefix);
    client
        .execute(
            DispatchRequest::builder()
                .method(Method::PUT)
                .bucket(name.as_str())
                .build(),
        )
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {name}: {e}"));
    name
}

/// Delete the given objects, then delete the bucket.
pub async fn cleanup_bucket(client: &S3Client, bucket: &str, keys: &[&str]) {
    for key in keys {
        let _ = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::DELETE)
                    .bucket(bucket)
                    .object(*key)
                    .build(),
            )
            .await;
    }

    let _ = client
        .execute(
            DispatchRequest::builder()
                .method(Method::DELETE)
                .bucket(bucket)
                .build(),
        )
        .await;
}

mod test_error;
mod test_object;
mod test_presign;
