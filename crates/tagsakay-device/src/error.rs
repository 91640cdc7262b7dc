//! # Device Error Types
//!
//! Error types for the device runtime (everything outside a single API
//! call; those use [`crate::api::ApiError`]).
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Device Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Peripherals         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  HttpClient     │  │  LedLink                │ │
//! │  │  MissingApiKey  │  │  Api            │  │  Reader                 │ │
//! │  │  InvalidUrl     │  │                 │  │                         │ │
//! │  │  NoDeviceId     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Protocol     │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  Serialization  │  │  ChannelError   │                              │
//! │  │  Validation     │  │  ShuttingDown   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tagsakay_core::{CoreError, ValidationError};
use thiserror::Error;

use crate::api::ApiError;

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Device runtime error.
#[derive(Debug, Error)]
pub enum DeviceError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid kiosk configuration.
    #[error("Invalid kiosk configuration: {0}")]
    InvalidConfig(String),

    /// API key not configured.
    #[error("API key not configured. Set server.api_key or TAGSAKAY_API_KEY.")]
    MissingApiKey,

    /// Invalid server URL.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// No configured id and no usable MAC address.
    #[error("Unable to determine a device id: no configured id and no MAC address")]
    NoDeviceId,

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// A server call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize or parse JSON.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Input rejected before reaching the server.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Mode machine rejected a transition.
    #[error("{0}")]
    Core(#[from] CoreError),

    // =========================================================================
    // Peripheral Errors
    // =========================================================================
    /// LED matrix serial link failed.
    #[error("LED link error: {0}")]
    LedLink(String),

    /// Tag reader failed.
    #[error("Tag reader error: {0}")]
    Reader(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Controller is shutting down.
    #[error("Scan controller is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for DeviceError {
    fn from(err: url::ParseError) -> Self {
        DeviceError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DeviceError {
    fn from(err: toml::de::Error) -> Self {
        DeviceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for DeviceError {
    fn from(err: toml::ser::Error) -> Self {
        DeviceError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        DeviceError::HttpClient(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl DeviceError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeviceError::Api(api) => api.is_retryable(),
            DeviceError::LedLink(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DeviceError::InvalidConfig(_)
                | DeviceError::MissingApiKey
                | DeviceError::InvalidUrl(_)
                | DeviceError::NoDeviceId
                | DeviceError::ConfigLoadFailed(_)
                | DeviceError::ConfigSaveFailed(_)
        )
    }
}
