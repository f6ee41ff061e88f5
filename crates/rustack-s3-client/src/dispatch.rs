//! Signed request dispatch.
//!
//! [`S3Client`] turns a [`DispatchRequest`] into a signed, addressed HTTP
//! request and sends it through an [`HttpTransport`]. Each call runs the same
//! linear pipeline:
//!
//! 1. Resolve the host and signing regions.
//! 2. Build the path-style URL.
//! 3. Compute the payload hash (or `UNSIGNED-PAYLOAD`).
//! 4. Attach `host`, `user-agent`, `x-amz-date`, `x-amz-content-sha256` and,
//!    with a session token, `x-amz-security-token`.
//! 5. Sign, unless the client is anonymous.
//! 6. Trace, finalize the body, send, trace the response.
//! 7. Turn a status of 400 or above into [`S3ClientError::Http`].
//!
//! Nothing is retried and nothing is cached between calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, HOST, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method, Uri};
use http_body_util::BodyExt;
use rustack_s3_signer::sigv4::{
    X_AMZ_CONTENT_SHA256, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN, format_long_date,
};
use rustack_s3_signer::{
    Credentials, PostPolicy, SignableRequest, UNSIGNED_PAYLOAD, authorization_header, presign,
};
use serde::Serialize;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::body::{ProgressCallback, RequestBody};
use crate::config::{ClientConfig, SigningPolicy};
use crate::error::{S3ClientError, S3ClientResult};
use crate::region::{BucketRegionLocator, ResolvedRegion, resolve_region};
use crate::request::{S3Request, S3Response, S3StreamingResponse, reason_phrase};
use crate::trace::{NoopTraceSink, TraceEvent, TraceSink};
use crate::transport::{HttpTransport, ReqwestTransport, ResponseBody};
use crate::url::{UrlSpec, build_url, host_header};

/// Presign expiry used when none is given (seven days).
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(604_800);

/// One logical S3 call.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use rustack_s3_client::DispatchRequest;
///
/// let request = DispatchRequest::builder()
///     .method(Method::PUT)
///     .bucket("photos")
///     .object("2024/cat.jpg")
///     .body("meow")
///     .build();
/// assert_eq!(request.bucket.as_deref(), Some("photos"));
/// ```
#[derive(Debug, TypedBuilder)]
pub struct DispatchRequest {
    /// HTTP method.
    pub method: Method,
    /// Target bucket.
    #[builder(default, setter(strip_option, into))]
    pub bucket: Option<String>,
    /// Target object key.
    #[builder(default, setter(strip_option, into))]
    pub object: Option<String>,
    /// Region for this call; overrides the configured region.
    #[builder(default, setter(strip_option, into))]
    pub region: Option<String>,
    /// Literal sub-resource query such as `uploads` or `location`.
    #[builder(default, setter(strip_option, into))]
    pub resource: Option<String>,
    /// Request payload.
    #[builder(default, setter(into))]
    pub body: RequestBody,
    /// Extra query parameters.
    #[builder(default)]
    pub queries: BTreeMap<String, String>,
    /// Extra request headers.
    #[builder(default)]
    pub headers: HeaderMap,
    /// Upload progress callback.
    #[builder(default, setter(strip_option))]
    pub progress: Option<ProgressCallback>,
    /// Fixed signing time; defaults to now.
    #[builder(default, setter(strip_option))]
    pub request_date: Option<DateTime<Utc>>,
}

/// Parameters for a presigned URL.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PresignRequest {
    /// HTTP method the URL will be used with.
    #[builder(default = Method::GET)]
    pub method: Method,
    /// Target bucket.
    #[builder(setter(into))]
    pub bucket: String,
    /// Target object key.
    #[builder(default, setter(strip_option, into))]
    pub object: Option<String>,
    /// Region for this call; overrides the configured region.
    #[builder(default, setter(strip_option, into))]
    pub region: Option<String>,
    /// Extra query parameters, e.g. `response-content-type`.
    #[builder(default)]
    pub queries: BTreeMap<String, String>,
    /// How long the URL stays valid; whole seconds only.
    #[builder(default = DEFAULT_PRESIGN_EXPIRY)]
    pub expiry: Duration,
    /// Fixed signing time; defaults to now.
    #[builder(default, setter(strip_option))]
    pub request_date: Option<DateTime<Utc>>,
}

/// A signed browser upload form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPolicyForm {
    /// URL the form posts to.
    pub url: String,
    /// Form fields to send alongside the file.
    pub fields: BTreeMap<String, String>,
}

/// S3 request dispatcher.
///
/// Cheap to clone; all clones share the same configuration and collaborators.
#[derive(Clone)]
pub struct S3Client {
    config: Arc<ClientConfig>,
    policy: SigningPolicy,
    transport: Arc<dyn HttpTransport>,
    locator: Option<Arc<dyn BucketRegionLocator>>,
    trace: Arc<dyn TraceSink>,
}

impl fmt::Debug for S3Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Client")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("region_locator", &self.locator.is_some())
            .finish_non_exhaustive()
    }
}

impl S3Client {
    /// Create a client that sends requests with a default [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::InvalidRequest`] if the endpoint is empty or
    /// contains a scheme or path.
    pub fn new(config: ClientConfig) -> S3ClientResult<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    /// Create a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::InvalidRequest`] if the endpoint is empty or
    /// contains a scheme or path.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> S3ClientResult<Self> {
        if config.endpoint.is_empty() || config.endpoint.contains('/') {
            return Err(S3ClientError::InvalidRequest(format!(
                "endpoint must be a bare host name, got {:?}",
                config.endpoint
            )));
        }

        let policy = SigningPolicy::from_config(&config);
        debug!(
            endpoint = %config.endpoint,
            port = ?config.port,
            use_ssl = config.use_ssl,
            anonymous = policy.anonymous,
            sha256_payload = policy.sha256_payload,
            "Created S3 client"
        );

        Ok(Self {
            config: Arc::new(config),
            policy,
            transport,
            locator: None,
            trace: Arc::new(NoopTraceSink),
        })
    }

    /// Look up bucket regions with `locator` when no region is known.
    #[must_use]
    pub fn with_region_locator(mut self, locator: Arc<dyn BucketRegionLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Report requests and responses to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signing policy derived from the configuration.
    #[must_use]
    pub fn signing_policy(&self) -> SigningPolicy {
        self.policy
    }

    /// Send `request` and read the whole response body.
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::Http`] with the response body for a status of
    /// 400 or above, or any error raised while preparing or sending.
    pub async fn execute(&self, request: DispatchRequest) -> S3ClientResult<S3Response> {
        let (method, uri, response) = self.send(request).await?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(S3ClientError::Transport)?
            .to_bytes();
        let reason = reason_phrase(parts.status);

        if parts.status.as_u16() >= 400 {
            let text = String::from_utf8_lossy(&body).into_owned();
            warn!(method = %method, uri = %uri, status = parts.status.as_u16(), body = %text, "S3 request failed");
            return Err(S3ClientError::Http {
                status: parts.status,
                reason,
                body: Some(text),
            });
        }

        Ok(S3Response {
            status: parts.status,
            reason,
            headers: parts.headers,
            body,
        })
    }

    /// Send `request` and hand the response body back unread.
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::Http`] without a body for a status of 400 or
    /// above, or any error raised while preparing or sending.
    pub async fn execute_streaming(
        &self,
        request: DispatchRequest,
    ) -> S3ClientResult<S3StreamingResponse> {
        let (method, uri, response) = self.send(request).await?;
        let (parts, body) = response.into_parts();
        let reason = reason_phrase(parts.status);

        if parts.status.as_u16() >= 400 {
            warn!(method = %method, uri = %uri, status = parts.status.as_u16(), "S3 request failed");
            return Err(S3ClientError::Http {
                status: parts.status,
                reason,
                body: None,
            });
        }

        Ok(S3StreamingResponse {
            status: parts.status,
            reason,
            headers: parts.headers,
            body,
        })
    }

    /// Build a presigned URL.
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::AnonymousRequest`] for an anonymous client,
    /// [`S3ClientError::InvalidExpiry`] for an expiry outside one second to
    /// seven days, or a region or URL error.
    pub async fn presigned_url(&self, request: PresignRequest) -> S3ClientResult<String> {
        let credentials = self
            .signing_credentials()
            .ok_or(S3ClientError::AnonymousRequest("presign a URL"))?;

        let resolved = self
            .resolve(request.region.as_deref(), Some(request.bucket.as_str()))
            .await?;
        let uri = self.url(
            &resolved,
            Some(request.bucket.as_str()),
            request.object.as_deref(),
            None,
            &request.queries,
        )?;
        let date = request.request_date.unwrap_or_else(Utc::now);
        let headers = HeaderMap::new();

        let url = presign(
            credentials,
            &SignableRequest::new(&request.method, &uri, &headers),
            &resolved.signing_region,
            &date,
            request.expiry.as_secs(),
        )?;
        debug!(method = %request.method, uri = %uri, expiry_secs = request.expiry.as_secs(), "Presigned URL");
        Ok(url)
    }

    /// Sign a POST policy for a browser form upload.
    ///
    /// # Errors
    ///
    /// Returns [`S3ClientError::AnonymousRequest`] for an anonymous client,
    /// [`S3ClientError::Signing`] for an incomplete policy, or a region or URL
    /// error.
    pub async fn presigned_post_policy(&self, policy: &PostPolicy) -> S3ClientResult<PostPolicyForm> {
        let credentials = self
            .signing_credentials()
            .ok_or(S3ClientError::AnonymousRequest("sign a POST policy"))?;

        let resolved = self.resolve(None, Some(policy.bucket())).await?;
        let uri = self.url(&resolved, Some(policy.bucket()), None, None, &BTreeMap::new())?;
        let fields = policy.sign(credentials, &resolved.signing_region, &Utc::now())?;

        Ok(PostPolicyForm {
            url: uri.to_string(),
            fields,
        })
    }

    /// Credentials to sign with, or `None` for an anonymous client.
    fn signing_credentials(&self) -> Option<&Credentials> {
        if self.policy.anonymous {
            None
        } else {
            self.config.credentials.as_ref()
        }
    }

    async fn resolve(
        &self,
        supplied: Option<&str>,
        bucket: Option<&str>,
    ) -> S3ClientResult<ResolvedRegion> {
        let supplied = supplied.or(self.config.region.as_deref());
        resolve_region(
            &self.config.endpoint,
            supplied,
            bucket,
            self.locator.as_deref(),
        )
        .await
    }

    fn url(
        &self,
        resolved: &ResolvedRegion,
        bucket: Option<&str>,
        object: Option<&str>,
        resource: Option<&str>,
        queries: &BTreeMap<String, String>,
    ) -> S3ClientResult<Uri> {
        build_url(&UrlSpec {
            endpoint: &self.config.endpoint,
            port: self.config.port,
            use_ssl: self.config.use_ssl,
            region: resolved.host_region.as_deref(),
            region_host_rewrite: self.config.region_host_rewrite,
            bucket,
            object,
            resource,
            queries: (!queries.is_empty()).then_some(queries),
        })
    }

    async fn send(
        &self,
        request: DispatchRequest,
    ) -> S3ClientResult<(Method, Uri, http::Response<ResponseBody>)> {
        let DispatchRequest {
            method,
            bucket,
            object,
            region,
            resource,
            body,
            queries,
            mut headers,
            progress,
            request_date,
        } = request;

        let resolved = self.resolve(region.as_deref(), bucket.as_deref()).await?;
        let uri = self.url(
            &resolved,
            bucket.as_deref(),
            object.as_deref(),
            resource.as_deref(),
            &queries,
        )?;

        let payload_hash = if self.policy.sha256_payload {
            body.sha256().ok_or(S3ClientError::UnsupportedBodyType)?
        } else {
            UNSIGNED_PAYLOAD.to_owned()
        };

        let date = request_date.unwrap_or_else(Utc::now);
        let host = host_header(&uri)
            .ok_or_else(|| S3ClientError::InvalidRequest(format!("URL {uri} has no host")))?;
        headers.insert(HOST, header_value(host)?);
        headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);
        headers.insert(X_AMZ_DATE, header_value(&format_long_date(&date))?);
        headers.insert(X_AMZ_CONTENT_SHA256, header_value(&payload_hash)?);

        if let Some(credentials) = self.signing_credentials() {
            if let Some(token) = credentials.session_token() {
                headers.insert(X_AMZ_SECURITY_TOKEN, header_value(token)?);
            }
            let authorization = authorization_header(
                credentials,
                &SignableRequest::new(&method, &uri, &headers),
                &date,
                &resolved.signing_region,
            )?;
            headers.insert(AUTHORIZATION, header_value(&authorization)?);
        }

        debug!(
            method = %method,
            uri = %uri,
            region = %resolved.signing_region,
            bucket = ?bucket,
            object = ?object,
            "Dispatching S3 request"
        );

        let request = S3Request {
            method,
            uri,
            headers,
            body,
            progress,
        };
        self.trace.on_event(&TraceEvent::Request {
            method: &request.method,
            uri: &request.uri,
            headers: &request.headers,
        });

        let request = request.finalize();
        let method = request.method().clone();
        let uri = request.uri().clone();

        let started = Instant::now();
        let response = self.transport.send(request).await.map_err(|e| {
            warn!(method = %method, uri = %uri, error = %e, "S3 transport failure");
            S3ClientError::Transport(e)
        })?;

        self.trace.on_event(&TraceEvent::Response {
            method: &method,
            uri: &uri,
            status: response.status(),
            headers: response.headers(),
            elapsed: started.elapsed(),
        });
        debug!(method = %method, uri = %uri, status = response.status().as_u16(), "S3 response received");

        Ok((method, uri, response))
    }
}

fn header_value(value: &str) -> S3ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| S3ClientError::InvalidRequest(format!("invalid header value: {value:?}")))
}
