//! Request/response trace hooks.
//!
//! The dispatcher reports every outgoing request and incoming response head
//! to a [`TraceSink`]. The default [`NoopTraceSink`] discards them;
//! [`TracingSink`] forwards them to `tracing` with secrets redacted.

use std::fmt::Write as _;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode, Uri};
use tracing::debug;

/// One observable step of a dispatch.
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    /// A signed request is about to be sent.
    Request {
        /// HTTP method.
        method: &'a Method,
        /// Request URL.
        uri: &'a Uri,
        /// Request headers, including `authorization`.
        headers: &'a HeaderMap,
    },
    /// A response head was received.
    Response {
        /// HTTP method of the request.
        method: &'a Method,
        /// Request URL.
        uri: &'a Uri,
        /// Response status.
        status: StatusCode,
        /// Response headers.
        headers: &'a HeaderMap,
        /// Time from send to response head.
        elapsed: Duration,
    },
}

/// Receives trace events.
pub trait TraceSink: Send + Sync + 'static {
    /// Observe one event.
    fn on_event(&self, event: &TraceEvent<'_>);
}

/// A sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn on_event(&self, _event: &TraceEvent<'_>) {}
}

/// A sink that logs events at `debug` level through `tracing`.
///
/// The `Signature=` part of `authorization` and the session token are
/// replaced with `**REDACTED**`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn on_event(&self, event: &TraceEvent<'_>) {
        match event {
            TraceEvent::Request {
                method,
                uri,
                headers,
            } => {
                debug!(
                    method = %method,
                    uri = %uri,
                    headers = %render_headers(headers),
                    "S3 request"
                );
            }
            TraceEvent::Response {
                method,
                uri,
                status,
                headers,
                elapsed,
            } => {
                debug!(
                    method = %method,
                    uri = %uri,
                    status = status.as_u16(),
                    elapsed_ms = elapsed.as_millis(),
                    headers = %render_headers(headers),
                    "S3 response"
                );
            }
        }
    }
}

const REDACTED: &str = "**REDACTED**";

/// Render headers as `name: value` pairs separated by `; `, with secrets redacted.
#[must_use]
pub fn render_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        if !out.is_empty() {
            out.push_str("; ");
        }
        let value = value.to_str().unwrap_or("<binary>");
        let value = match name.as_str() {
            "authorization" => redact_signature(value),
            "x-amz-security-token" => REDACTED.to_owned(),
            _ => value.to_owned(),
        };
        let _ = write!(out, "{name}: {value}");
    }
    out
}

/// Replace the hex after `Signature=` with a marker.
///
/// # Examples
///
/// ```
/// use rustack_s3_client::trace::redact_signature;
///
/// assert_eq!(
///     redact_signature("AWS4-HMAC-SHA256 Credential=AKID/x, SignedHeaders=host, Signature=abc123"),
///     "AWS4-HMAC-SHA256 Credential=AKID/x, SignedHeaders=host, Signature=**REDACTED**"
/// );
/// ```
#[must_use]
pub fn redact_signature(value: &str) -> String {
    match value.find("Signature=") {
        Some(index) => {
            let start = index + "Signature=".len();
            let end = value[start..]
                .find(|c: char| !c.is_ascii_hexdigit())
                .map_or(value.len(), |offset| start + offset);
            format!("{}{REDACTED}{}", &value[..start], &value[end..])
        }
        None => value.to_owned(),
    }
}
