//! Browser-based POST upload policies.
//!
//! A POST policy is a JSON document listing the conditions an HTML form
//! upload must satisfy. The document is base64-encoded and signed with the
//! SigV4 signing key; the form then carries the policy, the signature and the
//! credential fields alongside the file.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::credentials::Credentials;
use crate::error::{SignError, SignResult};
use crate::sigv4::{
    ALGORITHM, compute_signature, credential_scope, format_long_date, signing_key,
};

/// Expiration timestamp format used in policy documents.
const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Sign a base64-encoded POST policy.
///
/// Returns the hex HMAC-SHA256 of `base64_policy` under the signing key for
/// `date` and `region`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_s3_signer::sign_post_policy;
///
/// let date = Utc.with_ymd_and_hms(2015, 12, 29, 0, 0, 0).unwrap();
/// let signature = sign_post_policy("us-east-1", &date, "secret", "eyJjb25kaXRpb25zIjpbXX0=");
/// assert_eq!(signature.len(), 64);
/// ```
#[must_use]
pub fn sign_post_policy(
    region: &str,
    date: &DateTime<Utc>,
    secret_key: &str,
    base64_policy: &str,
) -> String {
    let key = signing_key(date, region, secret_key);
    compute_signature(&key, base64_policy)
}

/// A single policy condition on a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Eq { element: String, value: String },
    StartsWith { element: String, value: String },
}

impl Condition {
    fn to_json(&self) -> Value {
        match self {
            Self::Eq { element, value } => json!(["eq", format!("${element}"), value]),
            Self::StartsWith { element, value } => {
                json!(["starts-with", format!("${element}"), value])
            }
        }
    }

    fn element(&self) -> &str {
        match self {
            Self::Eq { element, .. } | Self::StartsWith { element, .. } => element,
        }
    }
}

/// Builder for a POST policy document.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use rustack_s3_signer::{Credentials, PostPolicy};
///
/// let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let policy = PostPolicy::new("photos", date + Duration::hours(1))
///     .key_starts_with("uploads/")
///     .content_length_range(1, 10 * 1024 * 1024);
///
/// let creds = Credentials::new("AKID", "secret");
/// let fields = policy.sign(&creds, "us-east-1", &date).unwrap();
/// assert_eq!(fields["x-amz-algorithm"], "AWS4-HMAC-SHA256");
/// assert_eq!(fields["key"], "uploads/");
/// ```
#[derive(Debug, Clone)]
pub struct PostPolicy {
    bucket: String,
    expiration: DateTime<Utc>,
    conditions: Vec<Condition>,
    content_length_range: Option<(u64, u64)>,
}

/// Form fields computed by [`PostPolicy::sign`].
const RESERVED_FIELDS: &[&str] = &[
    "bucket",
    "policy",
    "x-amz-algorithm",
    "x-amz-credential",
    "x-amz-date",
    "x-amz-security-token",
    "x-amz-signature",
];

impl PostPolicy {
    /// Start a policy for `bucket` that stops being valid at `expiration`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        Self {
            bucket: bucket.into(),
            expiration,
            conditions: Vec::new(),
            content_length_range: None,
        }
    }

    /// The bucket the policy authorizes uploads into.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The policy expiration.
    #[must_use]
    pub fn expiration(&self) -> &DateTime<Utc> {
        &self.expiration
    }

    /// Require the object key to equal `key`.
    #[must_use]
    pub fn key(self, key: impl Into<String>) -> Self {
        self.with_condition(Condition::Eq {
            element: "key".to_owned(),
            value: key.into(),
        })
    }

    /// Require the object key to start with `prefix`.
    #[must_use]
    pub fn key_starts_with(self, prefix: impl Into<String>) -> Self {
        self.with_condition(Condition::StartsWith {
            element: "key".to_owned(),
            value: prefix.into(),
        })
    }

    /// Require the upload's `Content-Type` to equal `content_type`.
    #[must_use]
    pub fn content_type(self, content_type: impl Into<String>) -> Self {
        self.with_condition(Condition::Eq {
            element: "Content-Type".to_owned(),
            value: content_type.into(),
        })
    }

    /// Bound the uploaded object size, in bytes, inclusive.
    #[must_use]
    pub fn content_length_range(mut self, min: u64, max: u64) -> Self {
        self.content_length_range = Some((min, max));
        self
    }

    /// Require an arbitrary form field to equal `value`.
    ///
    /// A leading `$` on `element` is optional. Fields the signer fills in
    /// itself (`bucket`, `policy` and the `x-amz-*` signing fields) are
    /// rejected by [`PostPolicy::sign`].
    #[must_use]
    pub fn condition_eq(self, element: impl Into<String>, value: impl Into<String>) -> Self {
        let element = element.into();
        let element = element.strip_prefix('$').unwrap_or(&element).to_owned();
        self.with_condition(Condition::Eq {
            element,
            value: value.into(),
        })
    }

    fn with_condition(mut self, condition: Condition) -> Self {
        // A later condition on the same field replaces the earlier one.
        self.conditions
            .retain(|existing| existing.element() != condition.element());
        self.conditions.push(condition);
        self
    }

    /// Render, encode and sign the policy.
    ///
    /// Returns the form fields to post alongside the file: `policy`,
    /// `x-amz-algorithm`, `x-amz-credential`, `x-amz-date`,
    /// `x-amz-signature`, `x-amz-security-token` when the credentials carry a
    /// session token, and one field per key/content-type/custom condition.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidPolicy`] if no key condition was set, the
    /// bucket is empty, a custom condition names a reserved field, or the
    /// content-length range is inverted.
    pub fn sign(
        &self,
        credentials: &Credentials,
        region: &str,
        date: &DateTime<Utc>,
    ) -> SignResult<BTreeMap<String, String>> {
        if self.bucket.is_empty() {
            return Err(SignError::InvalidPolicy("bucket must not be empty".to_owned()));
        }
        if let Some(reserved) = self
            .conditions
            .iter()
            .map(Condition::element)
            .find(|element| {
                RESERVED_FIELDS
                    .iter()
                    .any(|field| field.eq_ignore_ascii_case(element))
            })
        {
            return Err(SignError::InvalidPolicy(format!(
                "condition on reserved field {reserved} is not allowed"
            )));
        }
        if !self.conditions.iter().any(|c| c.element() == "key") {
            return Err(SignError::InvalidPolicy(
                "a key or key prefix condition is required".to_owned(),
            ));
        }
        if let Some((min, max)) = self.content_length_range {
            if min > max {
                return Err(SignError::InvalidPolicy(format!(
                    "content length range {min}..={max} is inverted"
                )));
            }
        }

        let long_date = format_long_date(date);
        let credential = format!(
            "{}/{}",
            credentials.access_key(),
            credential_scope(date, region)
        );

        let mut conditions = vec![json!(["eq", "$bucket", self.bucket])];
        conditions.extend(self.conditions.iter().map(Condition::to_json));
        if let Some((min, max)) = self.content_length_range {
            conditions.push(json!(["content-length-range", min, max]));
        }
        conditions.push(json!(["eq", "$x-amz-date", long_date]));
        conditions.push(json!(["eq", "$x-amz-algorithm", ALGORITHM]));
        conditions.push(json!(["eq", "$x-amz-credential", credential]));
        if let Some(token) = credentials.session_token() {
            conditions.push(json!(["eq", "$x-amz-security-token", token]));
        }

        let document = json!({
            "expiration": self.expiration.format(EXPIRATION_FORMAT).to_string(),
            "conditions": conditions,
        });
        let encoded = serde_json::to_vec(&document)
            .map_err(|e| SignError::InvalidPolicy(e.to_string()))?;
        let policy = BASE64.encode(encoded);
        let signature = sign_post_policy(region, date, credentials.secret_key(), &policy);

        let mut fields: BTreeMap<String, String> = self
            .conditions
            .iter()
            .map(|condition| match condition {
                Condition::Eq { element, value } | Condition::StartsWith { element, value } => {
                    (element.clone(), value.clone())
                }
            })
            .collect();
        fields.insert("x-amz-algorithm".to_owned(), ALGORITHM.to_owned());
        fields.insert("x-amz-credential".to_owned(), credential);
        fields.insert("x-amz-date".to_owned(), long_date);
        if let Some(token) = credentials.session_token() {
            fields.insert("x-amz-security-token".to_owned(), token.to_owned());
        }
        fields.insert("policy".to_owned(), policy);
        fields.insert("x-amz-signature".to_owned(), signature);

        Ok(fields)
    }
}
