//! # Retrying Request Executor
//!
//! Wraps a [`TransportClient`] with bounded retry and keeps the request
//! statistics.
//!
//! ## Attempt Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  attempt ──▶ envelope check ──▶ Success ─────────────────▶ return       │
//! │     ▲              │                                                    │
//! │     │              ├──▶ ProtocolError ───────────────────▶ return       │
//! │     │              │    (never retried)                                 │
//! │     │              │                                                    │
//! │     │              └──▶ Network/Http ──▶ budget left? ─no─▶ return      │
//! │     │                                        │ yes                      │
//! │     └──────────── sleep(current delay) ◀─────┘                          │
//! │                   delay doubles when exponential                        │
//! │                                                                         │
//! │  Statistics are recorded ONCE per call, after the loop.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sleeps go through `tokio::time`, so paused-clock tests see exact delays.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use tagsakay_core::{RequestOutcome, RetryPolicy, Statistics};

use crate::transport::{ApiRequest, TransportClient};

/// Whether a call may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Follow the active retry policy.
    Retry,
    /// Exactly one attempt.
    NoRetry,
}

pub struct RetryingRequestExecutor {
    transport: Arc<dyn TransportClient>,
    policy: RetryPolicy,
    stats: Statistics,
}

impl RetryingRequestExecutor {
    pub fn new(transport: Arc<dyn TransportClient>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            stats: Statistics::default(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RetryPolicy) {
        debug!(?policy, "Retry policy updated");
        self.policy = policy;
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Runs the request, retrying per `disposition`.
    pub async fn execute(
        &mut self,
        request: &ApiRequest,
        disposition: RetryDisposition,
    ) -> RequestOutcome {
        let max_attempts = match disposition {
            RetryDisposition::Retry => self.policy.max_attempts(),
            RetryDisposition::NoRetry => 1,
        };
        let mut delays = self.policy.delay_schedule();
        let mut total_latency = Duration::ZERO;
        let mut attempt = 0u32;

        let outcome = loop {
            attempt += 1;
            let outcome = require_success_indicator(self.transport.execute(request).await);
            total_latency = total_latency.saturating_add(outcome.latency);

            if outcome.is_success() || !outcome.kind.is_retryable() || attempt >= max_attempts {
                break outcome;
            }

            let Some(delay) = delays.next() else {
                break outcome;
            };

            warn!(
                path = %request.path,
                attempt,
                max_attempts,
                kind = ?outcome.kind,
                message = %outcome.message,
                delay_ms = delay.as_millis() as u64,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        };

        self.stats.record(outcome.is_success(), total_latency);

        if !outcome.is_success() {
            debug!(
                path = %request.path,
                attempts = attempt,
                consecutive_failures = self.stats.consecutive_failures,
                "Request gave up"
            );
        }
        outcome
    }
}

/// Downgrades a 2xx body without a boolean `success` field to a protocol
/// error.
fn require_success_indicator(outcome: RequestOutcome) -> RequestOutcome {
    if !outcome.is_success() {
        return outcome;
    }
    let has_indicator = serde_json::from_str::<serde_json::Value>(&outcome.body)
        .ok()
        .and_then(|json| json.get("success").map(serde_json::Value::is_boolean))
        .unwrap_or(false);

    if has_indicator {
        outcome
    } else {
        outcome.into_protocol_error("response has no success indicator")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use tagsakay_core::{HttpMethod, OutcomeKind};

    fn request() -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Post,
            path: "/api/rfid/scan".into(),
            headers: Vec::new(),
            body: Some("{}".into()),
            timeout: Duration::from_secs(5),
        }
    }

    fn ok() -> RequestOutcome {
        RequestOutcome::success(200, r#"{"success":true}"#, Duration::from_millis(10))
    }

    fn down() -> RequestOutcome {
        RequestOutcome::network_error("connection refused", Duration::from_millis(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_delays_and_attempt_cap() {
        let transport = ScriptedTransport::failing(down());
        let mut executor = RetryingRequestExecutor::new(transport.clone(), RetryPolicy::default());

        let started = tokio::time::Instant::now();
        let outcome = executor.execute(&request(), RetryDisposition::Retry).await;

        assert_eq!(outcome.kind, OutcomeKind::NetworkError);
        assert_eq!(transport.call_count(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(1000 + 2000 + 4000));

        let gaps: Vec<u128> = transport
            .call_times()
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![1000, 2000, 4000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_success() {
        let transport = ScriptedTransport::new(vec![down(), ok()]);
        let mut executor = RetryingRequestExecutor::new(transport.clone(), RetryPolicy::default());

        let outcome = executor.execute(&request(), RetryDisposition::Retry).await;

        assert!(outcome.is_success());
        assert_eq!(transport.call_count(), 2);
        let stats = executor.statistics();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.total_latency, Duration::from_millis(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_issues_one_attempt() {
        let transport = ScriptedTransport::failing(down());
        let mut executor = RetryingRequestExecutor::new(transport.clone(), RetryPolicy::default());

        executor.execute(&request(), RetryDisposition::NoRetry).await;
        assert_eq!(transport.call_count(), 1);
        assert_eq!(executor.statistics().failed_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_success_indicator_not_retried() {
        let transport = ScriptedTransport::failing(RequestOutcome::success(
            200,
            r#"{"data":{}}"#,
            Duration::ZERO,
        ));
        let mut executor = RetryingRequestExecutor::new(transport.clone(), RetryPolicy::default());

        let outcome = executor.execute(&request(), RetryDisposition::Retry).await;
        assert_eq!(outcome.kind, OutcomeKind::ProtocolError);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_errors_are_retried() {
        let server_error =
            RequestOutcome::http_error(503, "{}", "Service Unavailable", Duration::ZERO);
        let transport = ScriptedTransport::new(vec![server_error, ok()]);
        let policy = RetryPolicy::new(1, Duration::from_millis(250), false);
        let mut executor = RetryingRequestExecutor::new(transport.clone(), policy);

        let outcome = executor.execute(&request(), RetryDisposition::Retry).await;
        assert!(outcome.is_success());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_once_per_call() {
        let transport = ScriptedTransport::failing(down());
        let mut executor = RetryingRequestExecutor::new(transport.clone(), RetryPolicy::default());

        executor.execute(&request(), RetryDisposition::Retry).await;
        executor.execute(&request(), RetryDisposition::Retry).await;

        let stats = *executor.statistics();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 2);
        assert_eq!(stats.consecutive_failures, 2);
        assert_eq!(stats.total_latency, Duration::from_millis(5 * 8));

        executor.reset_statistics();
        assert_eq!(executor.statistics().total_requests, 0);
    }
}
