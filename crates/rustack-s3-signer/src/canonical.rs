//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Each component is normalized according to the AWS specification to ensure
//! deterministic signature computation.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::{SignError, SignResult};
use crate::request::SignableRequest;

/// The set of characters that must be percent-encoded in URI path segments and
/// query components.
///
/// Per AWS SigV4 spec, all characters except unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) must be encoded.
pub const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers never included in the signature.
///
/// `user-agent` and `content-type` may be rewritten by proxies, and
/// `content-length` is only known once the body is finalized.
const UNSIGNED_HEADERS: [&str; 4] = ["authorization", "content-length", "content-type", "user-agent"];

/// Select the headers to sign from a list of header names.
///
/// Names are lowercased, the unsigned set (`authorization`, `content-length`,
/// `content-type`, `user-agent`) is dropped, duplicates are removed, and the
/// result is sorted ascending.
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::signed_headers;
///
/// assert_eq!(
///     signed_headers(["Host", "X-Amz-Date", "Authorization"]),
///     vec!["host", "x-amz-date"]
/// );
/// ```
#[must_use]
pub fn signed_headers<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers: Vec<String> = names
        .into_iter()
        .map(|name| name.as_ref().to_ascii_lowercase())
        .filter(|name| !UNSIGNED_HEADERS.contains(&name.as_str()))
        .collect();
    headers.sort_unstable();
    headers.dedup();
    headers
}

/// Build the canonical request for `request`.
///
/// `signed_headers` must be lowercase (as returned by [`signed_headers`]); every
/// name in it must be present on the request. Repeated header values are
/// joined with commas.
///
/// # Errors
///
/// Returns [`SignError::MissingHeader`] if a signed header is absent, or
/// [`SignError::InvalidHeaderValue`] if a value is not visible ASCII.
pub fn canonical_request(
    request: &SignableRequest<'_>,
    signed_headers: &[String],
    hashed_payload: &str,
) -> SignResult<String> {
    let mut header_pairs: Vec<(&str, &str)> = Vec::with_capacity(signed_headers.len());
    for name in signed_headers {
        let mut values = request.headers.get_all(name.as_str()).iter().peekable();
        if values.peek().is_none() {
            return Err(SignError::MissingHeader(name.clone()));
        }
        for value in values {
            let value = value
                .to_str()
                .map_err(|_| SignError::InvalidHeaderValue(name.clone()))?;
            header_pairs.push((name.as_str(), value));
        }
    }

    let signed_refs: Vec<&str> = signed_headers.iter().map(String::as_str).collect();
    let method = request.method.as_str().to_ascii_uppercase();

    Ok(build_canonical_request(
        &method,
        request.uri.path(),
        request.uri.query().unwrap_or(""),
        &header_pairs,
        &signed_refs,
        hashed_payload,
    ))
}

/// Build the full canonical request string from its components.
///
/// The result is a newline-separated string of:
/// 1. HTTP method
/// 2. Canonical URI
/// 3. Canonical query string
/// 4. Canonical headers (terminated by an extra newline)
/// 5. Signed headers
/// 6. Hashed payload
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
/// Each segment is percent-encoded according to RFC 3986 unreserved characters.
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri("/"), "/");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already-encoded path is not encoded twice.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string.
///
/// Each `key=value` pair is decoded (form rules, so `+` means a space), then
/// re-encoded with the SigV4 unreserved set, which turns a space into `%20`.
/// Pairs are sorted by key, then by value for repeated keys. A parameter
/// without `=` is rendered as `key=`.
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("prefix=a+b"), "prefix=a%20b");
/// assert_eq!(build_canonical_query_string("location"), "location=");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (uri_encode(&key), uri_encode(&value)))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string from the request headers.
///
/// Only headers listed in `signed_headers` are included. Header names are lowercased,
/// values are trimmed of leading/trailing whitespace and consecutive spaces are collapsed
/// to a single space. Headers are sorted by name.
///
/// The result does NOT include a trailing newline; the caller adds that as part of
/// the canonical request format (the double newline between headers and signed headers).
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::build_canonical_headers;
///
/// let result = build_canonical_headers(
///     &[("Host", "example.com"), ("X-Amz-Date", "20130524T000000Z")],
///     &["host", "x-amz-date"],
/// );
/// assert_eq!(result, "host:example.com\nx-amz-date:20130524T000000Z");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    // Repeated header names are folded into one comma-separated value.
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string as a semicolon-separated list of lowercase header names.
///
/// The header names are sorted lexicographically.
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&["x-amz-date", "host"]),
///     "host;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// URI-encode a string using the AWS SigV4 encoding rules (`/` included).
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
