//! # Device Identity Resolution
//!
//! Picks the id this kiosk reports to the server.
//!
//! ```text
//!   configured id ──▶ hardware (fuse) MAC ──▶ network interface MAC ──▶ error
//!        │                   │                         │
//!        └───────────────────┴──── first usable wins ──┘
//!
//!   "a4:cf:12:0b:9e:01"  →  "A4CF120B9E01"
//! ```

use tracing::{debug, warn};

use tagsakay_core::validation::normalize_mac;
use tagsakay_core::DeviceIdentity;

use crate::config::KioskConfig;
use crate::error::{DeviceError, DeviceResult};

/// Resolves the device id from the available sources, in priority order.
///
/// MAC-shaped values are normalized to upper-case hex without separators.
/// A configured id that is not MAC-shaped is used as given (trimmed).
pub fn resolve_device_id(
    configured: Option<&str>,
    hardware_mac: Option<&str>,
    network_mac: Option<&str>,
) -> DeviceResult<String> {
    if let Some(id) = configured.map(str::trim).filter(|id| !id.is_empty()) {
        let id = normalize_mac(id).unwrap_or_else(|_| id.to_string());
        debug!(device_id = %id, "Using configured device id");
        return Ok(id);
    }

    for (source, mac) in [("hardware", hardware_mac), ("network", network_mac)] {
        let Some(mac) = mac else { continue };
        match normalize_mac(mac) {
            Ok(id) => {
                debug!(device_id = %id, source, "Derived device id from MAC");
                return Ok(id);
            }
            Err(e) => warn!(source, mac, error = %e, "Ignoring unusable MAC address"),
        }
    }

    Err(DeviceError::NoDeviceId)
}

/// Builds the boot-time identity from config plus the network MAC.
pub fn build_identity(config: &KioskConfig, network_mac: Option<&str>) -> DeviceResult<DeviceIdentity> {
    let device_id = resolve_device_id(
        config.device.id.as_deref(),
        config.device.hardware_mac.as_deref(),
        network_mac,
    )?;
    Ok(DeviceIdentity::new(
        device_id,
        config.server.api_key.as_str(),
        config.server.base_url.as_str(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_id_wins() {
        let id = resolve_device_id(Some("kiosk-gate-1"), Some("A4:CF:12:0B:9E:01"), None).unwrap();
        assert_eq!(id, "kiosk-gate-1");

        let id = resolve_device_id(Some("a4-cf-12-0b-9e-01"), None, None).unwrap();
        assert_eq!(id, "A4CF120B9E01");
    }

    #[test]
    fn test_hardware_mac_before_network_mac() {
        let id = resolve_device_id(None, Some("a4:cf:12:0b:9e:01"), Some("11:22:33:44:55:66")).unwrap();
        assert_eq!(id, "A4CF120B9E01");
    }

    #[test]
    fn test_falls_back_past_bad_sources() {
        let id = resolve_device_id(Some("   "), Some("garbage"), Some("11-22-33-44-55-66")).unwrap();
        assert_eq!(id, "112233445566");
    }

    #[test]
    fn test_no_source_is_error() {
        assert!(matches!(
            resolve_device_id(None, None, Some("00:00:00:00:00:00")),
            Err(DeviceError::NoDeviceId)
        ));
    }

    #[test]
    fn test_build_identity_from_config() {
        let mut config = KioskConfig::default();
        config.server.api_key = "secret".to_string();
        config.server.base_url = "http://localhost:8787/".to_string();

        let identity = build_identity(&config, Some("A4:CF:12:0B:9E:01")).unwrap();
        assert_eq!(identity.device_id(), "A4CF120B9E01");
        assert_eq!(identity.base_url(), "http://localhost:8787");
        assert_eq!(identity.api_key(), "secret");
    }
}
