//! # Domain Types
//!
//! Core domain types used throughout the TagSakay kiosk.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ DeviceIdentity  │   │  RetryPolicy    │   │ RequestOutcome  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  device_id      │   │  max_retries    │   │  kind           │       │
//! │  │  api_key        │   │  base_delay     │   │  status         │       │
//! │  │  base_url       │   │  exponential    │   │  body, latency  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │     immutable/boot        reconfigurable        per call only           │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanEvent     │   │   Statistics    │   │ScanClassification│      │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  tag_id         │   │  total/ok/fail  │   │  Registered     │       │
//! │  │  detected_at    │   │  latency sum    │   │  Unregistered   │       │
//! │  │  timestamp      │   │  consecutive    │   │  Unknown/Reject │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Clocks
//! `ScanEvent` carries a monotonic `Instant` (debounce, timeouts) and a
//! wall-clock `DateTime<Utc>` (what the server sees). Never mix them.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{validate_required, ValidationResult};

// =============================================================================
// Device Identity
// =============================================================================

/// Who this kiosk is and where it talks to.
///
/// Built once at boot and never mutated afterwards; every request carries the
/// device id and API key from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    device_id: String,
    api_key: String,
    base_url: String,
}

impl DeviceIdentity {
    /// Creates an identity, rejecting blank fields.
    ///
    /// A trailing `/` on the base URL is dropped so paths can be appended
    /// verbatim.
    pub fn new(
        device_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> ValidationResult<Self> {
        let device_id = device_id.into().trim().to_string();
        let api_key = api_key.into().trim().to_string();
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        validate_required("deviceId", &device_id)?;
        validate_required("apiKey", &api_key)?;
        validate_required("baseUrl", &base_url)?;

        Ok(Self {
            device_id,
            api_key,
            base_url,
        })
    }

    #[inline]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry configuration for outbound requests.
///
/// ## Delay Schedule
/// ```text
/// attempt 1 ──fail──▶ sleep base ──▶ attempt 2 ──fail──▶ sleep 2×base ──▶ ...
///
/// {3, 1000ms, exponential}  →  1000, 2000, 4000   (4 attempts max)
/// {3, 1000ms, linear}       →  1000, 1000, 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Double the delay after each wait.
    pub exponential: bool,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration, exponential: bool) -> Self {
        Self {
            max_retries,
            base_delay,
            exponential,
        }
    }

    /// A policy that never retries.
    pub const fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, false)
    }

    /// Total attempts allowed (`max_retries + 1`).
    #[inline]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// The sleeps between consecutive attempts, in order.
    ///
    /// Yields exactly `max_retries` delays.
    pub fn delay_schedule(&self) -> impl Iterator<Item = Duration> {
        let exponential = self.exponential;
        let mut current = self.base_delay;
        (0..self.max_retries).map(move |_| {
            let delay = current;
            if exponential {
                current = current.saturating_mul(2);
            }
            delay
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), true)
    }
}

// =============================================================================
// HTTP Method
// =============================================================================

/// Methods used by the device API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request Outcome
// =============================================================================

/// Classification of a single transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// 2xx with a JSON body.
    Success,
    /// Non-2xx status.
    HttpError,
    /// Connection failure or timeout.
    NetworkError,
    /// Body could not be understood.
    ProtocolError,
}

impl OutcomeKind {
    /// Whether another attempt may change the result.
    ///
    /// Protocol errors are deterministic and never retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, OutcomeKind::HttpError | OutcomeKind::NetworkError)
    }
}

/// Result of one request attempt. Produced per call, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub kind: OutcomeKind,

    /// HTTP status when a response arrived.
    pub status: Option<u16>,

    /// Raw response body (empty when none arrived).
    pub body: String,

    /// Human-readable summary of the outcome.
    pub message: String,

    /// Wall time spent on this attempt.
    pub latency: Duration,
}

impl RequestOutcome {
    pub fn success(status: u16, body: impl Into<String>, latency: Duration) -> Self {
        Self {
            kind: OutcomeKind::Success,
            status: Some(status),
            body: body.into(),
            message: "OK".to_string(),
            latency,
        }
    }

    pub fn http_error(
        status: u16,
        body: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            kind: OutcomeKind::HttpError,
            status: Some(status),
            body: body.into(),
            message: message.into(),
            latency,
        }
    }

    pub fn network_error(message: impl Into<String>, latency: Duration) -> Self {
        Self {
            kind: OutcomeKind::NetworkError,
            status: None,
            body: String::new(),
            message: message.into(),
            latency,
        }
    }

    pub fn protocol_error(
        status: Option<u16>,
        body: impl Into<String>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            kind: OutcomeKind::ProtocolError,
            status,
            body: body.into(),
            message: message.into(),
            latency,
        }
    }

    /// Reclassifies this outcome as a protocol error, keeping status and body.
    pub fn into_protocol_error(self, message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::ProtocolError,
            message: message.into(),
            ..self
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

// =============================================================================
// Scan Event
// =============================================================================

/// A tag read by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Upper-case hex UID.
    pub tag_id: String,

    /// Monotonic detection time (debounce, timeouts).
    pub detected_at: Instant,

    /// Wall-clock time sent to the server.
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    /// Creates an event stamped with the current wall-clock time.
    ///
    /// The tag id is trimmed and upper-cased.
    pub fn new(tag_id: impl AsRef<str>, detected_at: Instant) -> Self {
        Self::with_timestamp(tag_id, detected_at, Utc::now())
    }

    pub fn with_timestamp(
        tag_id: impl AsRef<str>,
        detected_at: Instant,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            tag_id: tag_id.as_ref().trim().to_ascii_uppercase(),
            detected_at,
            timestamp,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Request statistics, updated exactly once per top-level call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,

    /// Sum of every attempt's latency, retries included.
    pub total_latency: Duration,

    /// Failed calls since the last success.
    pub consecutive_failures: u32,
}

impl Statistics {
    /// Records one finished call.
    pub fn record(&mut self, success: bool, latency: Duration) {
        self.total_requests += 1;
        self.total_latency = self.total_latency.saturating_add(latency);
        if success {
            self.successful_requests += 1;
            self.consecutive_failures = 0;
        } else {
            self.failed_requests += 1;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
    }

    /// Percentage of successful calls; 0.0 before any call.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 * 100.0 / self.total_requests as f64
    }

    /// Mean latency per call; zero before any call.
    pub fn average_latency(&self) -> Duration {
        if self.total_requests == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.total_requests);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Scan Classification
// =============================================================================

/// Driver attached to a registered tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverName {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl DriverName {
    /// "First Last", or whichever part is present.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// What the server said about a submitted scan.
///
/// ## Display
/// ```text
/// Registered   → "registered, queue #7, driver Ana"
/// Unregistered → "unregistered tag 04A1B2C3"
/// Unknown      → "status blocked"
/// Rejected     → "rejected: Tag revoked"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanClassification {
    Registered {
        tag_id: String,
        queue_number: Option<u32>,
        driver: Option<DriverName>,
    },
    Unregistered {
        tag_id: String,
    },
    /// Any other status string.
    Unknown {
        tag_id: String,
        status: String,
    },
    /// The server answered with `success: false`.
    Rejected {
        message: String,
    },
}

impl fmt::Display for ScanClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanClassification::Registered {
                queue_number,
                driver,
                ..
            } => {
                f.write_str("registered")?;
                if let Some(n) = queue_number {
                    write!(f, ", queue #{n}")?;
                }
                if let Some(name) = driver.as_ref().map(DriverName::full_name) {
                    if !name.is_empty() {
                        write!(f, ", driver {name}")?;
                    }
                }
                Ok(())
            }
            ScanClassification::Unregistered { tag_id } => write!(f, "unregistered tag {tag_id}"),
            ScanClassification::Unknown { status, .. } => write!(f, "status {status}"),
            ScanClassification::Rejected { message } => write!(f, "rejected: {message}"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
