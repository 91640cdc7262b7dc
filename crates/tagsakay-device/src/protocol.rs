//! # API Wire Types
//!
//! JSON shapes exchanged with the TagSakay server.
//!
//! ## Envelope
//! Every response is wrapped the same way:
//! ```json
//! { "success": true, "message": "Scan recorded", "data": { ... } }
//! ```
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/rfid/scan                     ScanRequest → ScanData         │
//! │  POST /api/devices/{id}/heartbeat        HeartbeatRequest → DeviceData  │
//! │  GET  /api/health                        → ack                          │
//! │  GET  /api/devices/{id}/registration-status → RegistrationStatusData    │
//! │  POST /api/devices/{id}/queue-override   QueueOverrideRequest → ack     │
//! │  POST /api/devices/{id}/status           StatusReport → ack             │
//! │  POST /api/devices                       DeviceRegistrationRequest      │
//! │  GET  /api/devices/{id}/config           → opaque JSON                  │
//! │  PUT  /api/devices/{id}/config           opaque JSON → ack              │
//! │  POST /api/devices/{id}/error            ErrorReport → ack              │
//! │  GET  /api/devices/{id}/commands         → CommandPollData              │
//! │  POST /api/devices/{id}/mode             ModeUpdateRequest → DeviceData │
//! │  GET  /api/devices/{id}                  → DeviceProfileData            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tagsakay_core::{DriverName, PollAction, ServerModeState};

// =============================================================================
// Envelope
// =============================================================================

/// Common response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

// =============================================================================
// Scan
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub tag_id: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub queue_number: Option<u32>,
    #[serde(default)]
    pub driver: Option<DriverName>,
}

// =============================================================================
// Heartbeat
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub status: String,
    /// Seconds since boot.
    pub uptime: u64,
    pub free_heap: u64,
    pub location: String,
    pub firmware_version: String,
    pub registration_mode: bool,
    pub scan_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_registration_tag_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<HeartbeatStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatStats {
    pub total_scans: u64,
    pub error_count: u64,
    pub api_success_rate: f64,
    /// Milliseconds.
    pub avg_response_time: u64,
}

/// Mode fields as the server stores them on a device row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceModeData {
    #[serde(default)]
    pub registration_mode: Option<bool>,
    #[serde(default)]
    pub scan_mode: Option<bool>,
    #[serde(default)]
    pub pending_registration_tag_id: Option<String>,
}

impl From<DeviceModeData> for ServerModeState {
    fn from(data: DeviceModeData) -> Self {
        ServerModeState {
            registration_mode: data.registration_mode,
            scan_mode: data.scan_mode,
            expected_tag_id: data.pending_registration_tag_id,
        }
    }
}

/// `data` of heartbeat and mode-update responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceData {
    #[serde(default)]
    pub device: Option<DeviceModeData>,
}

// =============================================================================
// Registration Status
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatusData {
    #[serde(default)]
    pub registration_mode: Option<bool>,
    #[serde(default)]
    pub expected_tag_id: Option<String>,
}

impl From<RegistrationStatusData> for ServerModeState {
    fn from(data: RegistrationStatusData) -> Self {
        ServerModeState {
            registration_mode: data.registration_mode,
            scan_mode: None,
            expected_tag_id: data.expected_tag_id,
        }
    }
}

// =============================================================================
// Queue Override / Status / Registration / Error
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOverrideRequest {
    pub queue_number: u32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub free_heap: u64,
    pub location: String,
    pub firmware_version: String,
    pub wifi_connected: bool,
    pub rfid_initialized: bool,
    pub offline_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub mac_address: String,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_type: String,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub free_heap: u64,
}

// =============================================================================
// Command Poll
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPollData {
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub device_status: Option<DeviceModeData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    pub action: String,
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl From<&CommandEntry> for PollAction {
    fn from(entry: &CommandEntry) -> Self {
        match entry.action.as_str() {
            "enable_registration" => PollAction::EnableRegistration {
                tag_id: entry.tag_id.clone(),
            },
            "disable_registration" => PollAction::DisableRegistration,
            "scan_mode" => PollAction::ScanMode {
                enabled: entry.enabled,
            },
            other => PollAction::Unknown(other.to_string()),
        }
    }
}

/// Decoded poll: state-sync fields plus the ordered action list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPoll {
    pub server_state: ServerModeState,
    pub actions: Vec<PollAction>,
}

impl From<CommandPollData> for CommandPoll {
    fn from(data: CommandPollData) -> Self {
        CommandPoll {
            actions: data.commands.iter().map(PollAction::from).collect(),
            server_state: data.device_status.map(Into::into).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Mode Update / Profile
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeUpdateRequest {
    pub registration_mode: bool,
    pub scan_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_registration_tag_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfileData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub modes: DeviceModeData,
}

/// `data` of the profile endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceProfileEnvelope {
    #[serde(default)]
    pub device: Option<DeviceProfileData>,
}

/// Device profile as adopted by the kiosk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub server_state: ServerModeState,
}

impl From<DeviceProfileData> for DeviceProfile {
    fn from(data: DeviceProfileData) -> Self {
        DeviceProfile {
            name: data.name.filter(|n| !n.trim().is_empty()),
            location: data.location.filter(|l| !l.trim().is_empty()),
            is_active: data.is_active.unwrap_or(true),
            server_state: data.modes.into(),
        }
    }
}

/// Plain acknowledgement (`success` plus optional message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub accepted: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_request_field_names() {
        let request = ScanRequest {
            tag_id: "04A1B2C3".into(),
            device_id: "A4CF120B9E01".into(),
            timestamp: Utc::now(),
            location: "Gate1".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        for field in ["tagId", "deviceId", "timestamp", "location"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_heartbeat_omits_absent_tag() {
        let request = HeartbeatRequest {
            status: "online".into(),
            uptime: 12,
            free_heap: 1024,
            location: "Gate1".into(),
            firmware_version: "2.0.0".into(),
            registration_mode: false,
            scan_mode: true,
            pending_registration_tag_id: None,
            stats: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("pendingRegistrationTagId").is_none());
        assert_eq!(value["freeHeap"], 1024);
        assert_eq!(value["firmwareVersion"], "2.0.0");
    }

    #[test]
    fn test_command_poll_decoding() {
        let data: CommandPollData = serde_json::from_value(json!({
            "commands": [
                { "action": "enable_registration", "tagId": "CAFE01", "timestamp": 1 },
                { "action": "scan_mode", "enabled": false },
                { "action": "reboot" }
            ],
            "deviceStatus": { "isActive": true, "registrationMode": true, "scanMode": false }
        }))
        .unwrap();

        let poll = CommandPoll::from(data);
        assert_eq!(poll.server_state.registration_mode, Some(true));
        assert_eq!(poll.server_state.scan_mode, Some(false));
        assert_eq!(
            poll.actions,
            vec![
                PollAction::EnableRegistration {
                    tag_id: Some("CAFE01".into())
                },
                PollAction::ScanMode {
                    enabled: Some(false)
                },
                PollAction::Unknown("reboot".into()),
            ]
        );
    }

    #[test]
    fn test_profile_decoding() {
        let envelope: DeviceProfileEnvelope = serde_json::from_value(json!({
            "device": {
                "name": "North Gate",
                "location": "",
                "isActive": true,
                "registrationMode": false,
                "scanMode": true,
                "pendingRegistrationTagId": null
            }
        }))
        .unwrap();

        let profile = DeviceProfile::from(envelope.device.unwrap());
        assert_eq!(profile.name.as_deref(), Some("North Gate"));
        assert_eq!(profile.location, None);
        assert_eq!(profile.server_state.scan_mode, Some(true));
        assert_eq!(profile.server_state.registration_mode, Some(false));
    }
}
