//! # HTTP Transport
//!
//! One request in, one [`RequestOutcome`] out. No retries here; those live in
//! [`crate::executor`].
//!
//! ## Outcome Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   connect failure / timeout / body read error  ──▶  NetworkError        │
//! │                                                                         │
//! │   status outside 2xx  ──▶  HttpError(status)                            │
//! │                            message = body.message if JSON, else         │
//! │                            "HTTP <status>"                              │
//! │                                                                         │
//! │   2xx, body not JSON  ──▶  ProtocolError                                │
//! │                                                                         │
//! │   2xx, JSON body      ──▶  Success                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use tagsakay_core::{HttpMethod, RequestOutcome};

use crate::error::{DeviceError, DeviceResult};

// =============================================================================
// Request
// =============================================================================

/// A fully-built API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,

    /// Path below the base URL, starting with `/`.
    pub path: String,

    pub headers: Vec<(String, String)>,

    /// JSON body, if any.
    pub body: Option<String>,

    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl ApiRequest {
    /// Returns the value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Executes a single request attempt.
///
/// Implementations never return errors; every failure is folded into the
/// outcome kind.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> RequestOutcome;
}

// =============================================================================
// reqwest Implementation
// =============================================================================

/// JSON-over-HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url`.
    pub fn new(base_url: &str) -> DeviceResult<Self> {
        Self::from_reqwest(base_url, reqwest::Client::builder().build()?)
    }

    /// Creates a transport around an existing client.
    pub fn from_reqwest(base_url: &str, client: reqwest::Client) -> DeviceResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(DeviceError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }
        Ok(Self { client, base_url })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl TransportClient for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> RequestOutcome {
        let url = self.url_for(&request.path);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, &url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("request timed out after {}ms", request.timeout.as_millis())
                } else {
                    format!("request failed: {e}")
                };
                return RequestOutcome::network_error(message, started.elapsed());
            }
        };

        let status = response.status().as_u16();
        let outcome = match response.text().await {
            Ok(body) => classify_response(status, body, started.elapsed()),
            Err(e) => RequestOutcome::network_error(
                format!("failed to read response body: {e}"),
                started.elapsed(),
            ),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            kind = ?outcome.kind,
            latency_ms = outcome.latency.as_millis() as u64,
            "HTTP request finished"
        );
        outcome
    }
}

/// Maps a received status and body to an outcome.
pub fn classify_response(status: u16, body: String, latency: Duration) -> RequestOutcome {
    let parsed = serde_json::from_str::<serde_json::Value>(&body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP {status}"));
        return RequestOutcome::http_error(status, body, message, latency);
    }

    match parsed {
        Ok(_) => RequestOutcome::success(status, body, latency),
        Err(e) => RequestOutcome::protocol_error(
            Some(status),
            body,
            format!("response is not JSON: {e}"),
            latency,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagsakay_core::OutcomeKind;

    #[test]
    fn test_classify_http_error_uses_server_message() {
        let outcome = classify_response(
            403,
            r#"{"success":false,"message":"Device ID mismatch"}"#.to_string(),
            Duration::ZERO,
        );
        assert_eq!(outcome.kind, OutcomeKind::HttpError);
        assert_eq!(outcome.status, Some(403));
        assert_eq!(outcome.message, "Device ID mismatch");

        let outcome = classify_response(502, "<html>bad gateway</html>".into(), Duration::ZERO);
        assert_eq!(outcome.message, "HTTP 502");
    }

    #[test]
    fn test_classify_non_json_success_is_protocol_error() {
        let outcome = classify_response(200, "OK".into(), Duration::ZERO);
        assert_eq!(outcome.kind, OutcomeKind::ProtocolError);
        assert_eq!(outcome.status, Some(200));
    }

    #[test]
    fn test_classify_json_success() {
        let outcome = classify_response(201, r#"{"success":true}"#.into(), Duration::ZERO);
        assert!(outcome.is_success());
        assert_eq!(outcome.status, Some(201));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(HttpTransport::new("ftp://example.com").is_err());
        assert!(HttpTransport::new("http://localhost:8787").is_ok());
    }

    #[test]
    fn test_url_join() {
        let transport = HttpTransport::new("http://localhost:8787/").unwrap();
        assert_eq!(
            transport.url_for("/api/health"),
            "http://localhost:8787/api/health"
        );
    }

    #[test]
    fn test_request_header_lookup() {
        let request = ApiRequest {
            method: HttpMethod::Get,
            path: "/api/health".into(),
            headers: vec![("x-api-key".into(), "k".into())],
            body: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(request.header("X-API-KEY"), Some("k"));
        assert_eq!(request.header("x-device-id"), None);
    }
}
