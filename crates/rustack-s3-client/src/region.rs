//! Per-call region resolution.
//!
//! A request needs a region twice: optionally in the host name, and always in
//! the signing scope. [`resolve_region`] decides both from the endpoint, the
//! region supplied by the caller, and (only when neither settles it) a
//! [`BucketRegionLocator`] lookup.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::config::DEFAULT_REGION;
use crate::error::{BoxError, S3ClientError, S3ClientResult};

/// Region codes recognized inside endpoint host names.
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-southeast-5",
    "ca-central-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Looks up the region a bucket lives in.
///
/// Implementations typically issue a `GetBucketLocation` call. The trait is
/// object safe so it can be shared as `Arc<dyn BucketRegionLocator>`.
pub trait BucketRegionLocator: Send + Sync + 'static {
    /// Return the region of `bucket`. An empty string means "no region".
    fn bucket_region<'a>(
        &'a self,
        bucket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send + 'a>>;
}

/// A locator that answers every lookup with the same region.
///
/// Useful for deployments with a single region, or none at all.
#[derive(Debug, Clone)]
pub struct StaticRegionLocator {
    region: String,
}

impl StaticRegionLocator {
    /// Create a locator that always returns `region`.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

impl BucketRegionLocator for StaticRegionLocator {
    fn bucket_region<'a>(
        &'a self,
        _bucket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.region.clone()) })
    }
}

/// The outcome of region resolution for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegion {
    /// Region to insert into the host, if any.
    pub host_region: Option<String>,
    /// Region used in the signing scope.
    pub signing_region: String,
}

/// Whether any dot-separated label of `endpoint` is one of `known`.
///
/// # Examples
///
/// ```
/// use rustack_s3_client::region::{KNOWN_REGIONS, endpoint_contains_region};
///
/// assert!(endpoint_contains_region("s3.us-west-2.amazonaws.com", KNOWN_REGIONS));
/// assert!(!endpoint_contains_region("s3.amazonaws.com", KNOWN_REGIONS));
/// assert!(!endpoint_contains_region("my-us-west-2-proxy.local", KNOWN_REGIONS));
/// ```
#[must_use]
pub fn endpoint_contains_region(endpoint: &str, known: &[&str]) -> bool {
    region_in_endpoint(endpoint, known).is_some()
}

/// The first dot-separated label of `endpoint` that is one of `known`.
#[must_use]
pub fn region_in_endpoint<'a>(endpoint: &'a str, known: &[&str]) -> Option<&'a str> {
    endpoint.split('.').find(|label| known.contains(label))
}

/// Resolve the host and signing regions for one call.
///
/// - An endpoint that already names a region wins: no region is added to the
///   host and that region signs the request.
/// - Otherwise the supplied region is used; without one, the locator is asked
///   about `bucket` (when both exist).
/// - With no region at all, the host is left alone and `us-east-1` signs.
///
/// # Errors
///
/// Returns [`S3ClientError::RegionResolution`] if the locator fails.
pub async fn resolve_region(
    endpoint: &str,
    supplied: Option<&str>,
    bucket: Option<&str>,
    locator: Option<&dyn BucketRegionLocator>,
) -> S3ClientResult<ResolvedRegion> {
    if let Some(region) = region_in_endpoint(endpoint, KNOWN_REGIONS) {
        return Ok(ResolvedRegion {
            host_region: None,
            signing_region: region.to_owned(),
        });
    }

    let region = match (supplied, bucket, locator) {
        (Some(region), _, _) => Some(region.to_owned()),
        (None, Some(bucket), Some(locator)) => {
            let region = locator.bucket_region(bucket).await.map_err(|source| {
                S3ClientError::RegionResolution {
                    bucket: bucket.to_owned(),
                    source,
                }
            })?;
            debug!(bucket, region = %region, "Discovered bucket region");
            Some(region)
        }
        _ => None,
    };

    Ok(match region.filter(|r| !r.is_empty()) {
        Some(region) => ResolvedRegion {
            host_region: Some(region.clone()),
            signing_region: region,
        },
        None => ResolvedRegion {
            host_region: None,
            signing_region: DEFAULT_REGION.to_owned(),
        },
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingLocator {
        calls: AtomicUsize,
    }

    impl BucketRegionLocator for CountingLocator {
        fn bucket_region<'a>(
            &'a self,
            _bucket: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok("eu-west-1".to_owned()) })
        }
    }

    #[derive(Debug)]
    struct FailingLocator;

    impl BucketRegionLocator for FailingLocator {
        fn bucket_region<'a>(
            &'a self,
            _bucket: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send + 'a>> {
            Box::pin(async { Err("lookup refused".into()) })
        }
    }

    #[test]
    fn test_should_detect_region_label_in_endpoint() {
        assert!(endpoint_contains_region("bucket.s3.eu-central-1.amazonaws.com", KNOWN_REGIONS));
        assert!(!endpoint_contains_region("localhost", KNOWN_REGIONS));
        assert_eq!(
            region_in_endpoint("s3.us-west-2.amazonaws.com", KNOWN_REGIONS),
            Some("us-west-2")
        );
    }

    #[tokio::test]
    async fn test_should_use_region_encoded_in_endpoint() {
        let locator = CountingLocator::default();
        let resolved = resolve_region(
            "s3.us-west-2.amazonaws.com",
            Some("us-west-2"),
            Some("bucket"),
            Some(&locator),
        )
        .await
        .unwrap();
        assert_eq!(resolved.host_region, None);
        assert_eq!(resolved.signing_region, "us-west-2");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_retain_supplied_region_without_lookup() {
        let locator = CountingLocator::default();
        let resolved = resolve_region("s3.amazonaws.com", Some("us-west-2"), Some("bucket"), Some(&locator))
            .await
            .unwrap();
        assert_eq!(resolved.host_region.as_deref(), Some("us-west-2"));
        assert_eq!(resolved.signing_region, "us-west-2");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_discover_region_for_bucket() {
        let locator = CountingLocator::default();
        let resolved = resolve_region("s3.amazonaws.com", None, Some("bucket"), Some(&locator))
            .await
            .unwrap();
        assert_eq!(resolved.host_region.as_deref(), Some("eu-west-1"));
        assert_eq!(resolved.signing_region, "eu-west-1");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_not_lookup_without_bucket() {
        let locator = CountingLocator::default();
        let resolved = resolve_region("s3.amazonaws.com", None, None, Some(&locator))
            .await
            .unwrap();
        assert_eq!(resolved.host_region, None);
        assert_eq!(resolved.signing_region, DEFAULT_REGION);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_fall_back_to_default_for_empty_discovered_region() {
        let locator = StaticRegionLocator::new("");
        let resolved = resolve_region("localhost", None, Some("bucket"), Some(&locator))
            .await
            .unwrap();
        assert_eq!(resolved.host_region, None);
        assert_eq!(resolved.signing_region, DEFAULT_REGION);
    }

    #[tokio::test]
    async fn test_should_report_locator_failure() {
        let result = resolve_region("s3.amazonaws.com", None, Some("photos"), Some(&FailingLocator)).await;
        match result {
            Err(S3ClientError::RegionResolution { bucket, source }) => {
                assert_eq!(bucket, "photos");
                assert_eq!(source.to_string(), "lookup refused");
            }
            other => panic!("expected region resolution failure, got {other:?}"),
        }
    }
}
