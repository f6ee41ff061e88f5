//! AWS Signature Version 4 header signing.
//!
//! Signing a request goes through four stages:
//!
//! 1. Build the canonical request from the method, URI, signed headers and
//!    payload hash (see [`crate::canonical`]).
//! 2. Build the string to sign from the timestamp, credential scope and the
//!    hash of the canonical request.
//! 3. Derive the signing key with a four-step HMAC-SHA256 chain over the
//!    secret key, date, region and service.
//! 4. HMAC the string to sign with the signing key and render the
//!    `Authorization` header.
//!
//! The main entry points are [`authorization_header`] and [`sign_request`].

use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use http::HeaderValue;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{canonical_request, signed_headers};
use crate::credentials::Credentials;
use crate::error::{SignError, SignResult};
use crate::request::SignableRequest;

/// The signing algorithm name.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The service name in every credential scope produced by this crate.
pub const SERVICE: &str = "s3";

/// Payload hash used when the body is not hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Hex SHA-256 of the empty string.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Header carrying the request timestamp.
pub const X_AMZ_DATE: &str = "x-amz-date";

/// Header carrying the payload hash.
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

/// Header carrying the STS session token.
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

type HmacSha256 = Hmac<Sha256>;

/// Format a timestamp as ISO 8601 basic format (`YYYYMMDDTHHMMSSZ`).
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_s3_signer::sigv4::format_long_date;
///
/// let date = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(format_long_date(&date), "20130524T000000Z");
/// ```
#[must_use]
pub fn format_long_date(date: &DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a timestamp as the scope date (`YYYYMMDD`).
#[must_use]
pub fn format_short_date(date: &DateTime<Utc>) -> String {
    date.format("%Y%m%d").to_string()
}

/// Build the credential scope `date/region/s3/aws4_request`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_s3_signer::sigv4::credential_scope;
///
/// let date = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(credential_scope(&date, "us-east-1"), "20130524/us-east-1/s3/aws4_request");
/// ```
#[must_use]
pub fn credential_scope(date: &DateTime<Utc>, region: &str) -> String {
    format!("{}/{region}/{SERVICE}/aws4_request", format_short_date(date))
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Build the string to sign for a canonical request signed at `date` in `region`.
#[must_use]
pub fn string_to_sign(canonical_request: &str, date: &DateTime<Utc>, region: &str) -> String {
    build_string_to_sign(
        &format_long_date(date),
        &credential_scope(date, region),
        &hash_payload(canonical_request.as_bytes()),
    )
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::sigv4::derive_signing_key;
///
/// let key = derive_signing_key(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "20130524",
///     "us-east-1",
///     "s3",
/// );
/// assert_eq!(key.len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Derive the S3 signing key for `date` and `region`.
#[must_use]
pub fn signing_key(date: &DateTime<Utc>, region: &str, secret_key: &str) -> Vec<u8> {
    derive_signing_key(secret_key, &format_short_date(date), region, SERVICE)
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the `Authorization` header value for `request`.
///
/// Every header on the request except `authorization`, `content-length`,
/// `content-type` and `user-agent` is signed. The payload hash is read from
/// the request's `x-amz-content-sha256` header.
///
/// # Errors
///
/// Returns [`SignError::MissingHeader`] if `x-amz-content-sha256` is absent,
/// or [`SignError::InvalidHeaderValue`] if a signed header value is not
/// visible ASCII.
pub fn authorization_header(
    credentials: &Credentials,
    request: &SignableRequest<'_>,
    date: &DateTime<Utc>,
    region: &str,
) -> SignResult<String> {
    let hashed_payload = request
        .headers
        .get(X_AMZ_CONTENT_SHA256)
        .ok_or_else(|| SignError::MissingHeader(X_AMZ_CONTENT_SHA256.to_owned()))?
        .to_str()
        .map_err(|_| SignError::InvalidHeaderValue(X_AMZ_CONTENT_SHA256.to_owned()))?;

    let signed = signed_headers(request.headers.keys().map(http::HeaderName::as_str));
    let canonical = canonical_request(request, &signed, hashed_payload)?;
    debug!(canonical_request = %canonical, "Built canonical request");

    let string_to_sign = string_to_sign(&canonical, date, region);
    debug!(string_to_sign = %string_to_sign, "Built string to sign");

    let key = signing_key(date, region, credentials.secret_key());
    let signature = compute_signature(&key, &string_to_sign);

    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={signature}",
        credentials.access_key(),
        credential_scope(date, region),
        signed.join(";"),
    ))
}

/// Sign `request` in place by inserting the `authorization` header.
///
/// # Errors
///
/// Propagates any error from [`authorization_header`].
pub fn sign_request<B>(
    credentials: &Credentials,
    request: &mut http::Request<B>,
    date: &DateTime<Utc>,
    region: &str,
) -> SignResult<()> {
    let header = authorization_header(credentials, &SignableRequest::from(&*request), date, region)?;
    let value = HeaderValue::from_str(&header)
        .map_err(|_| SignError::InvalidHeaderValue(http::header::AUTHORIZATION.to_string()))?;
    request
        .headers_mut()
        .insert(http::header::AUTHORIZATION, value);
    Ok(())
}

/// Compute the SHA-256 hash of a payload and return it as a lowercase hex string.
///
/// # Examples
///
/// ```
/// use rustack_s3_signer::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as KeyInit>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
