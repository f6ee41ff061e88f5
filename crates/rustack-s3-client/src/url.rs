//! Path-style request URL construction.

use std::collections::BTreeMap;
use std::net::IpAddr;

use http::Uri;
use percent_encoding::utf8_percent_encode;
use rustack_s3_signer::canonical::URI_ENCODE_SET;

use crate::error::{S3ClientError, S3ClientResult};

/// Everything that determines a request URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSpec<'a> {
    /// Endpoint host name.
    pub endpoint: &'a str,
    /// Explicit port, if any.
    pub port: Option<u16>,
    /// Use `https` instead of `http`.
    pub use_ssl: bool,
    /// Region to insert into the host.
    pub region: Option<&'a str>,
    /// Whether `region` may rewrite the host at all.
    pub region_host_rewrite: bool,
    /// Bucket name.
    pub bucket: Option<&'a str>,
    /// Object key; `/` separates path segments.
    ///
    /// Empty segments are dropped, so a trailing `/` is not preserved and a
    /// folder-marker key such as `dir/` addresses `dir`.
    pub object: Option<&'a str>,
    /// Literal sub-resource query such as `uploads` or `?location`.
    pub resource: Option<&'a str>,
    /// Extra query parameters, encoded and appended after the resource.
    pub queries: Option<&'a BTreeMap<String, String>>,
}

/// Build a path-style request URL.
///
/// # Errors
///
/// Returns [`S3ClientError::InvalidRequest`] if an object is given without a
/// bucket, or if the pieces do not form a valid URI.
///
/// # Examples
///
/// ```
/// use rustack_s3_client::url::{UrlSpec, build_url};
///
/// let uri = build_url(&UrlSpec {
///     endpoint: "s3.amazonaws.com",
///     use_ssl: true,
///     region: Some("us-west-2"),
///     region_host_rewrite: true,
///     bucket: Some("photos"),
///     object: Some("2024/cat.jpg"),
///     ..UrlSpec::default()
/// })
/// .unwrap();
/// assert_eq!(uri.to_string(), "https://s3.us-west-2.amazonaws.com/photos/2024/cat.jpg");
/// ```
pub fn build_url(spec: &UrlSpec<'_>) -> S3ClientResult<Uri> {
    let scheme = if spec.use_ssl { "https" } else { "http" };

    let host = match spec.region {
        Some(region) if spec.region_host_rewrite && !is_literal_host(spec.endpoint) => {
            regional_host(spec.endpoint, region)
        }
        _ => spec.endpoint.to_owned(),
    };
    let authority = match spec.port {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    let path = build_path(spec.bucket, spec.object)?;

    let mut query_parts: Vec<String> = Vec::new();
    if let Some(resource) = spec.resource {
        let resource = resource.strip_prefix('?').unwrap_or(resource);
        if !resource.is_empty() {
            query_parts.push(resource.to_owned());
        }
    }
    if let Some(queries) = spec.queries {
        query_parts.extend(
            queries
                .iter()
                .map(|(key, value)| format!("{}={}", encode(key), encode(value))),
        );
    }

    let url = if query_parts.is_empty() {
        format!("{scheme}://{authority}{path}")
    } else {
        format!("{scheme}://{authority}{path}?{}", query_parts.join("&"))
    };

    url.parse::<Uri>()
        .map_err(|e| S3ClientError::InvalidRequest(format!("invalid URL {url}: {e}")))
}

/// The `host[:port]` authority of `uri`, used verbatim as the `host` header.
///
/// # Examples
///
/// ```
/// use rustack_s3_client::url::host_header;
///
/// let uri = "http://localhost:9000/bucket".parse().unwrap();
/// assert_eq!(host_header(&uri), Some("localhost:9000"));
/// ```
#[must_use]
pub fn host_header(uri: &Uri) -> Option<&str> {
    uri.authority().map(http::uri::Authority::as_str)
}

fn regional_host(endpoint: &str, region: &str) -> String {
    match endpoint.split_once('.') {
        Some(("s3", rest)) => format!("s3.{region}.{rest}"),
        _ => format!("s3.{region}.{endpoint}"),
    }
}

/// IP literals and `localhost` never get a region prefix.
fn is_literal_host(endpoint: &str) -> bool {
    endpoint.eq_ignore_ascii_case("localhost")
        || endpoint.parse::<IpAddr>().is_ok()
        || endpoint
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| inner.parse::<IpAddr>().is_ok())
}

fn build_path(bucket: Option<&str>, object: Option<&str>) -> S3ClientResult<String> {
    let bucket = bucket.filter(|b| !b.is_empty());
    let object = object.filter(|o| !o.is_empty());

    let Some(bucket) = bucket else {
        if object.is_some() {
            return Err(S3ClientError::InvalidRequest(
                "an object key requires a bucket".to_owned(),
            ));
        }
        return Ok("/".to_owned());
    };

    let segments: Vec<String> = std::iter::once(bucket)
        .chain(object.into_iter().flat_map(|o| o.split('/')))
        .filter(|segment| !segment.is_empty())
        .map(encode)
        .collect();

    Ok(format!("/{}", segments.join("/")))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec<'a>() -> UrlSpec<'a> {
        UrlSpec {
            endpoint: "s3.amazonaws.com",
            region_host_rewrite: true,
            ..UrlSpec::default()
        }
    }

    #[test]
    fn test_should_insert_region_after_s3_label() {
        let uri = build_url(&UrlSpec {
            region: Some("us-west-2"),
            bucket: Some("bucket"),
            ..spec()
        })
        .unwrap();
        assert_eq!(host_header(&uri), Some("s3.us-west-2.amazonaws.com"));
    }

    #[test]
    fn test_should_prefix_region_for_other_endpoints() {
        let uri = build_url(&UrlSpec {
            endpoint: "storage.example.com",
            region: Some("eu-west-1"),
            ..spec()
        })
        .unwrap();
        assert_eq!(host_header(&uri), Some("s3.eu-west-1.storage.example.com"));
    }

    #[test]
    fn test_should_leave_host_alone_without_region() {
        let uri = build_url(&UrlSpec {
            endpoint: "s3.us-west-2.amazonaws.com",
            region: None,
            bucket: Some("bucket"),
            ..spec()
        })
        .unwrap();
        assert_eq!(host_header(&uri), Some("s3.us-west-2.amazonaws.com"));
    }

    #[test]
    fn test_should_leave_host_alone_when_rewrite_disabled() {
        let uri = build_url(&UrlSpec {
            region: Some("us-west-2"),
            region_host_rewrite: false,
            ..spec()
        })
        .unwrap();
        assert_eq!(host_header(&uri), Some("s3.amazonaws.com"));
    }

    #[test]
    fn test_should_not_rewrite_localhost_or_ip() {
        for endpoint in ["localhost", "127.0.0.1", "[::1]"] {
            let uri = build_url(&UrlSpec {
                endpoint,
                port: Some(9000),
                region: Some("us-east-1"),
                ..spec()
            })
            .unwrap();
            assert_eq!(host_header(&uri), Some(format!("{endpoint}:9000").as_str()));
        }
    }

    #[test]
    fn test_should_prefix_region_for_bare_internal_host() {
        let uri = build_url(&UrlSpec {
            endpoint: "minio.internal",
            port: Some(9000),
            region: Some("us-east-1"),
            bucket: Some("bucket"),
            ..spec()
        })
        .unwrap();
        assert_eq!(host_header(&uri), Some("s3.us-east-1.minio.internal:9000"));
    }

    #[test]
    fn test_should_select_scheme_and_port() {
        let plain = build_url(&UrlSpec { port: Some(8080), ..spec() }).unwrap();
        assert_eq!(plain.to_string(), "http://s3.amazonaws.com:8080/");

        let tls = build_url(&UrlSpec { use_ssl: true, ..spec() }).unwrap();
        assert_eq!(tls.to_string(), "https://s3.amazonaws.com/");
    }

    #[test]
    fn test_should_encode_object_segments_and_drop_empty_ones() {
        let uri = build_url(&UrlSpec {
            bucket: Some("bucket"),
            object: Some("/dir//my file+1.txt"),
            ..spec()
        })
        .unwrap();
        assert_eq!(uri.path(), "/bucket/dir/my%20file%2B1.txt");
    }

    #[test]
    fn test_should_drop_trailing_slash_from_folder_key() {
        let uri = build_url(&UrlSpec {
            bucket: Some("b"),
            object: Some("dir/"),
            ..spec()
        })
        .unwrap();
        assert_eq!(uri.path(), "/b/dir");
    }

    #[test]
    fn test_should_join_resource_and_queries() {
        let mut queries = BTreeMap::new();
        queries.insert("prefix".to_owned(), "a b".to_owned());
        queries.insert("delimiter".to_owned(), "/".to_owned());
        let uri = build_url(&UrlSpec {
            bucket: Some("bucket"),
            resource: Some("?versions"),
            queries: Some(&queries),
            ..spec()
        })
        .unwrap();
        assert_eq!(uri.query(), Some("versions&delimiter=%2F&prefix=a%20b"));
    }

    #[test]
    fn test_should_reject_object_without_bucket() {
        let result = build_url(&UrlSpec {
            object: Some("key"),
            ..spec()
        });
        assert!(matches!(result, Err(S3ClientError::InvalidRequest(_))));
    }
}
