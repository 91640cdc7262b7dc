// HTTP transport and API facade tests against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tagsakay_core::{DeviceIdentity, HttpMethod, OutcomeKind, RetryPolicy, ScanClassification};
use tagsakay_device::{ApiError, ApiFacade, ApiRequest, HttpTransport, TransportClient};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE_ID: &str = "A4CF120B9E01";

async fn setup(policy: RetryPolicy) -> (MockServer, ApiFacade) {
    let server = MockServer::start().await;
    let transport = HttpTransport::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    let identity = DeviceIdentity::new(DEVICE_ID, "test-key", server.uri()).unwrap();
    let api = ApiFacade::new(identity, Arc::new(transport), policy, Duration::from_secs(2));
    (server, api)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(10), true)
}

fn get(path: &str) -> ApiRequest {
    ApiRequest {
        method: HttpMethod::Get,
        path: path.to_string(),
        headers: Vec::new(),
        body: None,
        timeout: Duration::from_millis(500),
    }
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_classifies_statuses() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(&server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "success": false, "message": "Device ID mismatch" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let ok = transport.execute(&get("/ok")).await;
    assert_eq!(ok.kind, OutcomeKind::Success);
    assert_eq!(ok.status, Some(200));

    let forbidden = transport.execute(&get("/forbidden")).await;
    assert_eq!(forbidden.kind, OutcomeKind::HttpError);
    assert_eq!(forbidden.status, Some(403));
    assert_eq!(forbidden.message, "Device ID mismatch");

    let plain = transport.execute(&get("/plain")).await;
    assert_eq!(plain.kind, OutcomeKind::ProtocolError);
}

#[tokio::test]
async fn test_transport_timeout_is_network_error() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(&server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut request = get("/slow");
    request.timeout = Duration::from_millis(50);
    let outcome = transport.execute(&request).await;

    assert_eq!(outcome.kind, OutcomeKind::NetworkError);
    assert!(outcome.message.contains("timed out"));
}

#[tokio::test]
async fn test_transport_connection_refused_is_network_error() {
    let transport = HttpTransport::new("http://127.0.0.1:9").unwrap();
    let outcome = transport.execute(&get("/api/health")).await;
    assert_eq!(outcome.kind, OutcomeKind::NetworkError);
}

// ── Facade ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_scan_sends_headers_and_payload() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("POST"))
        .and(path("/api/rfid/scan"))
        .and(header("content-type", "application/json"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-device-id", DEVICE_ID))
        .and(header("user-agent", "TagSakay Scanner/2.0.0"))
        .and(body_partial_json(json!({
            "tagId": "04A1B2C3",
            "deviceId": DEVICE_ID,
            "location": "Gate1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "status": "registered", "queueNumber": 7, "driver": { "firstName": "Ana" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = api.submit_scan("04A1B2C3", "Gate1").await.unwrap();
    assert!(matches!(result, ScanClassification::Registered { queue_number: Some(7), .. }));
    assert_eq!(result.to_string(), "registered, queue #7, driver Ana");
}

#[tokio::test]
async fn test_server_errors_use_full_retry_budget() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{DEVICE_ID}/commands")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "boom"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let err = api.poll_commands().await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 500, message: "boom".into() });
    assert_eq!(api.statistics().total_requests, 1);
    assert_eq!(api.consecutive_failures(), 1);
}

#[tokio::test]
async fn test_health_check_is_single_attempt() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(matches!(api.health_check().await, Err(ApiError::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_missing_success_indicator_is_protocol_error() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{DEVICE_ID}/registration-status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "registrationMode": true, "expectedTagId": "CAFE01" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(matches!(api.registration_status().await, Err(ApiError::Protocol(_))));
}

#[tokio::test]
async fn test_queue_override_validation_and_single_request() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/devices/{DEVICE_ID}/queue-override")))
        .and(body_partial_json(json!({ "queueNumber": 42, "reason": "manual" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(matches!(api.queue_override(0, "x").await, Err(ApiError::Validation(_))));
    assert!(matches!(api.queue_override(1000, "x").await, Err(ApiError::Validation(_))));
    assert!(api.queue_override(42, "manual").await.unwrap().accepted);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_config_round_trip() {
    let (server, mut api) = setup(fast_retry()).await;
    let config_path = format!("/api/devices/{DEVICE_ID}/config");

    Mock::given(method("GET"))
        .and(path(config_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "scanCooldownMs": 1500 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(config_path))
        .and(body_partial_json(json!({ "scanCooldownMs": 2000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let config = api.device_config().await.unwrap();
    assert_eq!(config["scanCooldownMs"], 1500);

    let ack = api
        .update_device_config(&json!({ "scanCooldownMs": 2000 }))
        .await
        .unwrap();
    assert!(ack.accepted);
}

#[tokio::test]
async fn test_profile_sync() {
    let (server, mut api) = setup(fast_retry()).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{DEVICE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "device": {
                "name": "North Gate",
                "location": "Terminal 2",
                "isActive": true,
                "registrationMode": false,
                "scanMode": true
            } }
        })))
        .mount(&server)
        .await;

    let profile = api.sync_profile().await.unwrap();
    assert_eq!(profile.name.as_deref(), Some("North Gate"));
    assert_eq!(profile.location.as_deref(), Some("Terminal 2"));
    assert!(profile.is_active);
    assert_eq!(profile.server_state.scan_mode, Some(true));
    assert_eq!(profile.server_state.registration_mode, Some(false));
}
