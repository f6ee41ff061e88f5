//! Client configuration.
//!
//! Provides [`ClientConfig`], built once per client and immutable afterwards,
//! and [`SigningPolicy`], derived from it at client construction.

use rustack_s3_signer::Credentials;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Region used for the signing scope when none is supplied or discovered.
pub const DEFAULT_REGION: &str = "us-east-1";

/// S3 client configuration.
///
/// # Examples
///
/// ```
/// use rustack_s3_client::config::ClientConfig;
/// use rustack_s3_signer::Credentials;
///
/// let config = ClientConfig::builder()
///     .endpoint("s3.amazonaws.com")
///     .use_ssl(true)
///     .credentials(Credentials::new("AKID", "secret"))
///     .build();
/// assert!(config.port.is_none());
/// assert!(config.region_host_rewrite);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Endpoint host name without scheme or port (e.g. `"s3.amazonaws.com"`).
    #[builder(default = String::from("localhost"), setter(into))]
    pub endpoint: String,

    /// Explicit port; omitted from URLs when absent.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub port: Option<u16>,

    /// Whether to use HTTPS.
    #[builder(default = false)]
    pub use_ssl: bool,

    /// Credentials; requests are anonymous when absent.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Region used when a call does not supply one.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub region: Option<String>,

    /// Value of the `user-agent` header.
    #[builder(default = default_user_agent(), setter(into))]
    pub user_agent: String,

    /// Whether a known region is inserted into the request host.
    #[builder(default = true)]
    pub region_host_rewrite: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("localhost"),
            port: None,
            use_ssl: false,
            credentials: None,
            region: None,
            user_agent: default_user_agent(),
            region_host_rewrite: true,
            log_level: String::from("info"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ENDPOINT` | `localhost` |
    /// | `S3_PORT` | none |
    /// | `S3_USE_SSL` | `false` |
    /// | `AWS_ACCESS_KEY_ID` | none |
    /// | `AWS_SECRET_ACCESS_KEY` | empty |
    /// | `AWS_SESSION_TOKEN` | none |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | none |
    /// | `S3_USER_AGENT` | `Rustack (<os>; <arch>) rustack-s3-client/<version>` |
    /// | `S3_REGION_HOST_REWRITE` | `true` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Examples
    ///
    /// ```
    /// use rustack_s3_client::config::ClientConfig;
    ///
    /// let config = ClientConfig::from_env();
    /// assert!(!config.endpoint.is_empty());
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("S3_ENDPOINT") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("S3_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                config.port = Some(port);
            }
        }
        if let Ok(v) = std::env::var("S3_USE_SSL") {
            config.use_ssl = parse_bool(&v);
        }
        if let Ok(access_key) = std::env::var("AWS_ACCESS_KEY_ID") {
            let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default();
            let mut credentials = Credentials::new(access_key, secret_key);
            if let Ok(token) = std::env::var("AWS_SESSION_TOKEN") {
                credentials = credentials.with_session_token(token);
            }
            config.credentials = Some(credentials);
        }
        if let Ok(v) = std::env::var("AWS_REGION").or_else(|_| std::env::var("DEFAULT_REGION")) {
            config.region = Some(v);
        }
        if let Ok(v) = std::env::var("S3_USER_AGENT") {
            config.user_agent = v;
        }
        if let Ok(v) = std::env::var("S3_REGION_HOST_REWRITE") {
            config.region_host_rewrite = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// How requests from a client are signed.
///
/// Computed once from the [`ClientConfig`] when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningPolicy {
    /// No credentials, or both keys empty: requests carry no `authorization`.
    pub anonymous: bool,
    /// Whether payloads are hashed with SHA-256 instead of `UNSIGNED-PAYLOAD`.
    ///
    /// Only signed requests over plain HTTP hash their payload; TLS already
    /// protects the body in transit.
    pub sha256_payload: bool,
}

impl SigningPolicy {
    /// Derive the policy for `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustack_s3_client::config::{ClientConfig, SigningPolicy};
    ///
    /// let policy = SigningPolicy::from_config(&ClientConfig::default());
    /// assert!(policy.anonymous);
    /// assert!(!policy.sha256_payload);
    /// ```
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let anonymous = config
            .credentials
            .as_ref()
            .is_none_or(Credentials::is_anonymous);
        Self {
            anonymous,
            sha256_payload: !anonymous && !config.use_ssl,
        }
    }
}

/// The `user-agent` sent when none is configured.
fn default_user_agent() -> String {
    format!(
        "Rustack ({}; {}) rustack-s3-client/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION"),
    )
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
