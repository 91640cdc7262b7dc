//! # API Facade
//!
//! One method per server endpoint. Each method validates its input, builds
//! the JSON payload, hands the request to the retrying executor with the
//! right retry disposition, and decodes the `data` it expects.
//!
//! ## Call Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  facade.queue_override(42, "manual")                                   │
//! │     │                                                                   │
//! │     ├── validate_queue_number(42)  ──✘──▶ ApiError::Validation          │
//! │     │                                     (no request issued)           │
//! │     ├── serialize QueueOverrideRequest                                 │
//! │     ├── headers: Content-Type, x-api-key, User-Agent, x-device-id      │
//! │     ├── executor.execute(request, Retry)                               │
//! │     │        │                                                          │
//! │     │        ▼                                                          │
//! │     │   RequestOutcome ──▶ ApiError::{Network, Http, Protocol}          │
//! │     │                                                                   │
//! │     └── decode Envelope<T> ──✘──▶ ApiError::Protocol                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Health checks and error reports are never retried.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use tagsakay_core::validation::{normalize_mac, validate_queue_number, validate_required, validate_tag_id};
use tagsakay_core::{
    DeviceIdentity, HttpMethod, OutcomeKind, RequestOutcome, RetryPolicy, ScanClassification,
    ServerModeState, Statistics, ValidationError, DEVICE_NAME, FIRMWARE_VERSION,
};

use crate::executor::{RetryDisposition, RetryingRequestExecutor};
use crate::protocol::{
    Ack, CommandPoll, CommandPollData, DeviceData, DeviceProfile, DeviceProfileEnvelope,
    DeviceRegistrationRequest, Envelope, ErrorReport, HeartbeatRequest, ModeUpdateRequest,
    QueueOverrideRequest, RegistrationStatusData, ScanData, ScanRequest, StatusReport,
};
use crate::transport::{ApiRequest, TransportClient};

// =============================================================================
// API Error
// =============================================================================

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Why an API call failed. `Display` is the operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Input rejected locally; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Connection failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ApiError {
    /// Network and HTTP failures may succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Http { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_outcome(outcome: RequestOutcome) -> Self {
        match outcome.kind {
            OutcomeKind::NetworkError => ApiError::Network(outcome.message),
            OutcomeKind::HttpError => ApiError::Http {
                status: outcome.status.unwrap_or_default(),
                message: outcome.message,
            },
            OutcomeKind::ProtocolError | OutcomeKind::Success => ApiError::Protocol(outcome.message),
        }
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Typed client for the TagSakay device API.
pub struct ApiFacade {
    identity: DeviceIdentity,
    executor: RetryingRequestExecutor,
    timeout: Duration,
    user_agent: String,
}

impl ApiFacade {
    pub fn new(
        identity: DeviceIdentity,
        transport: Arc<dyn TransportClient>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            identity,
            executor: RetryingRequestExecutor::new(transport, policy),
            timeout,
            user_agent: format!("{DEVICE_NAME}/{FIRMWARE_VERSION}"),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    // -------------------------------------------------------------------------
    // Statistics & policy
    // -------------------------------------------------------------------------

    pub fn statistics(&self) -> &Statistics {
        self.executor.statistics()
    }

    pub fn reset_statistics(&mut self) {
        self.executor.reset_statistics();
    }

    /// Percentage of successful calls; 0.0 before any call.
    pub fn success_rate(&self) -> f64 {
        self.executor.statistics().success_rate()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.executor.statistics().consecutive_failures
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.executor.set_policy(policy);
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.executor.policy()
    }

    // -------------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------------

    /// Submits a scan stamped with the current time.
    pub async fn submit_scan(&mut self, tag_id: &str, location: &str) -> ApiResult<ScanClassification> {
        self.submit_scan_at(tag_id, location, Utc::now()).await
    }

    /// `POST /api/rfid/scan`
    pub async fn submit_scan_at(
        &mut self,
        tag_id: &str,
        location: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<ScanClassification> {
        let tag_id = validate_tag_id(tag_id)?;
        let payload = ScanRequest {
            tag_id: tag_id.clone(),
            device_id: self.identity.device_id().to_string(),
            timestamp,
            location: location.to_string(),
        };

        let envelope: Envelope<ScanData> = self
            .call(HttpMethod::Post, "/api/rfid/scan".into(), Some(&payload), RetryDisposition::Retry)
            .await?;

        if !envelope.success {
            return Ok(ScanClassification::Rejected {
                message: envelope.message.unwrap_or_else(|| "Scan rejected".to_string()),
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| ApiError::Protocol("scan response has no data".into()))?;
        let tag_id = data.tag_id.filter(|t| !t.is_empty()).unwrap_or(tag_id);
        let status = data.status.unwrap_or_default();

        let classification = match status.as_str() {
            "registered" => ScanClassification::Registered {
                tag_id,
                queue_number: data.queue_number,
                driver: data.driver,
            },
            "unregistered" => ScanClassification::Unregistered { tag_id },
            _ => ScanClassification::Unknown { tag_id, status },
        };
        info!(%classification, "Scan submitted");
        Ok(classification)
    }

    /// `POST /api/devices/{id}/heartbeat`. Returns the server's mode fields
    /// when it sent any.
    pub async fn heartbeat(&mut self, payload: &HeartbeatRequest) -> ApiResult<Option<ServerModeState>> {
        let path = self.device_path("/heartbeat");
        let envelope: Envelope<DeviceData> = self
            .call(HttpMethod::Post, path, Some(payload), RetryDisposition::Retry)
            .await?;
        Ok(envelope.data.and_then(|d| d.device).map(Into::into))
    }

    /// `GET /api/health`, one attempt only.
    pub async fn health_check(&mut self) -> ApiResult<Ack> {
        let envelope: Envelope<serde_json::Value> = self
            .call::<(), _>(HttpMethod::Get, "/api/health".into(), None, RetryDisposition::NoRetry)
            .await?;
        Ok(ack(envelope))
    }

    /// `GET /api/devices/{id}/registration-status`
    pub async fn registration_status(&mut self) -> ApiResult<ServerModeState> {
        let path = self.device_path("/registration-status");
        let envelope: Envelope<RegistrationStatusData> = self
            .call::<(), _>(HttpMethod::Get, path, None, RetryDisposition::Retry)
            .await?;
        Ok(envelope.data.unwrap_or_default().into())
    }

    /// `POST /api/devices/{id}/queue-override`
    pub async fn queue_override(&mut self, queue_number: u32, reason: &str) -> ApiResult<Ack> {
        let queue_number = validate_queue_number(queue_number)?;
        let payload = QueueOverrideRequest {
            queue_number,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        let path = self.device_path("/queue-override");
        self.call_ack(HttpMethod::Post, path, Some(&payload), RetryDisposition::Retry)
            .await
    }

    /// `POST /api/devices/{id}/status`
    pub async fn report_status(&mut self, report: &StatusReport) -> ApiResult<Ack> {
        validate_required("status", &report.status)?;
        let path = self.device_path("/status");
        self.call_ack(HttpMethod::Post, path, Some(report), RetryDisposition::Retry)
            .await
    }

    /// `POST /api/devices`
    pub async fn register_device(&mut self, mac_address: &str, name: &str, location: &str) -> ApiResult<Ack> {
        let mac_address = normalize_mac(mac_address)?;
        validate_required("name", name)?;
        validate_required("location", location)?;

        let payload = DeviceRegistrationRequest {
            mac_address,
            name: name.trim().to_string(),
            location: location.trim().to_string(),
        };
        self.call_ack(HttpMethod::Post, "/api/devices".into(), Some(&payload), RetryDisposition::Retry)
            .await
    }

    /// `GET /api/devices/{id}/config`. The payload is opaque to the kiosk.
    pub async fn device_config(&mut self) -> ApiResult<serde_json::Value> {
        let path = self.device_path("/config");
        let envelope: Envelope<serde_json::Value> = self
            .call::<(), _>(HttpMethod::Get, path, None, RetryDisposition::Retry)
            .await?;
        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    }

    /// `PUT /api/devices/{id}/config`
    pub async fn update_device_config(&mut self, config: &serde_json::Value) -> ApiResult<Ack> {
        let path = self.device_path("/config");
        self.call_ack(HttpMethod::Put, path, Some(config), RetryDisposition::Retry)
            .await
    }

    /// `POST /api/devices/{id}/error`, one attempt only.
    pub async fn report_error(
        &mut self,
        error_type: &str,
        error_message: &str,
        uptime: u64,
        free_heap: u64,
    ) -> ApiResult<Ack> {
        validate_required("errorType", error_type)?;
        let payload = ErrorReport {
            error_type: error_type.to_string(),
            error_message: error_message.to_string(),
            timestamp: Utc::now(),
            uptime,
            free_heap,
        };
        let path = self.device_path("/error");
        self.call_ack(HttpMethod::Post, path, Some(&payload), RetryDisposition::NoRetry)
            .await
    }

    /// `GET /api/devices/{id}/commands`
    pub async fn poll_commands(&mut self) -> ApiResult<CommandPoll> {
        let path = self.device_path("/commands");
        let envelope: Envelope<CommandPollData> = self
            .call::<(), _>(HttpMethod::Get, path, None, RetryDisposition::Retry)
            .await?;
        Ok(envelope.data.unwrap_or_default().into())
    }

    /// `POST /api/devices/{id}/mode`. Returns the device state the server
    /// settled on.
    pub async fn update_mode(
        &mut self,
        registration_mode: bool,
        scan_mode: bool,
        pending_tag_id: Option<&str>,
    ) -> ApiResult<Option<ServerModeState>> {
        let pending_registration_tag_id = pending_tag_id
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(validate_tag_id)
            .transpose()?;
        let payload = ModeUpdateRequest {
            registration_mode,
            scan_mode,
            pending_registration_tag_id,
        };
        let path = self.device_path("/mode");
        let envelope: Envelope<DeviceData> = self
            .call(HttpMethod::Post, path, Some(&payload), RetryDisposition::Retry)
            .await?;
        Ok(envelope.data.and_then(|d| d.device).map(Into::into))
    }

    /// `GET /api/devices/{id}`
    pub async fn sync_profile(&mut self) -> ApiResult<DeviceProfile> {
        let path = self.device_path("");
        let envelope: Envelope<DeviceProfileEnvelope> = self
            .call::<(), _>(HttpMethod::Get, path, None, RetryDisposition::Retry)
            .await?;
        envelope
            .data
            .and_then(|d| d.device)
            .map(DeviceProfile::from)
            .ok_or_else(|| ApiError::Protocol("profile response has no device".into()))
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    fn device_path(&self, suffix: &str) -> String {
        format!("/api/devices/{}{}", self.identity.device_id(), suffix)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> ApiRequest {
        ApiRequest {
            method,
            path,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("x-api-key".to_string(), self.identity.api_key().to_string()),
                ("User-Agent".to_string(), self.user_agent.clone()),
                ("x-device-id".to_string(), self.identity.device_id().to_string()),
            ],
            body,
            timeout: self.timeout,
        }
    }

    async fn call<B, T>(
        &mut self,
        method: HttpMethod,
        path: String,
        body: Option<&B>,
        disposition: RetryDisposition,
    ) -> ApiResult<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Protocol(format!("failed to encode request: {e}")))?;

        let request = self.request(method, path, body);
        debug!(method = %request.method, path = %request.path, "Calling API");

        let outcome = self.executor.execute(&request, disposition).await;
        if !outcome.is_success() {
            return Err(ApiError::from_outcome(outcome));
        }

        serde_json::from_str(&outcome.body)
            .map_err(|e| ApiError::Protocol(format!("unexpected response shape: {e}")))
    }

    async fn call_ack<B>(
        &mut self,
        method: HttpMethod,
        path: String,
        body: Option<&B>,
        disposition: RetryDisposition,
    ) -> ApiResult<Ack>
    where
        B: Serialize + ?Sized,
    {
        let envelope: Envelope<serde_json::Value> = self.call(method, path, body, disposition).await?;
        Ok(ack(envelope))
    }
}

fn ack(envelope: Envelope<serde_json::Value>) -> Ack {
    Ack {
        accepted: envelope.success,
        message: envelope.message,
    }
}
