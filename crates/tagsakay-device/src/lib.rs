//! # tagsakay-device: Device Runtime for the TagSakay Kiosk
//!
//! Everything the kiosk does over the network, plus the single control loop
//! that ties the tag reader, keypad, screen and LED matrix to the server.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Device Runtime                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                ScanController (Main Orchestrator)                │  │
//! │  │                                                                  │  │
//! │  │  One tokio task. select! over events, tick and shutdown.         │  │
//! │  │  Owns DeviceState, Debouncer, KeypadInput, ConnectivityMonitor   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  Peripherals   │  │   ApiFacade    │  │   ModeReconciler       │    │
//! │  │                │  │                │  │   (tagsakay-core)      │    │
//! │  │ TagReader      │  │ one method per │  │                        │    │
//! │  │ StatusDisplay  │  │ endpoint       │  │ registration and scan  │    │
//! │  │ LedMatrix      │  │                │  │ mode, server wins      │    │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │                              ▼                                          │
//! │                 ┌──────────────────────────┐                            │
//! │                 │ RetryingRequestExecutor  │ bounded retry, statistics  │
//! │                 └────────────┬─────────────┘                            │
//! │                              ▼                                          │
//! │                 ┌──────────────────────────┐                            │
//! │                 │ TransportClient (reqwest)│ one attempt → outcome      │
//! │                 └──────────────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`controller`] - `ScanController` orchestrator and its builder
//! - [`api`] - `ApiFacade` and `ApiError`
//! - [`executor`] - Retry loop and request statistics
//! - [`transport`] - `TransportClient` trait and the reqwest implementation
//! - [`protocol`] - JSON payloads of the server API
//! - [`connectivity`] - Offline detection and reconnect backoff
//! - [`peripherals`] - Reader, display and LED matrix interfaces
//! - [`events`] - Controller inputs and render events
//! - [`identity`] - Device id resolution
//! - [`config`] - Kiosk configuration (TOML + env)
//! - [`error`] - Device error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagsakay_device::{build_identity, ApiFacade, HttpTransport, KioskConfig, ScanControllerBuilder};
//!
//! let config = KioskConfig::load(None)?;
//! let identity = build_identity(&config, network_mac.as_deref())?;
//! let transport = Arc::new(HttpTransport::new(identity.base_url())?);
//! let api = ApiFacade::new(identity, transport, config.retry_policy(), config.request_timeout());
//!
//! let controller = ScanControllerBuilder::new(config)
//!     .with_api(api)
//!     .with_probe(Box::new(probe))
//!     .build()?;
//! controller.run(events_rx, shutdown_signal()).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;
pub mod events;
pub mod executor;
pub mod identity;
pub mod peripherals;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{ApiError, ApiFacade, ApiResult};
pub use config::KioskConfig;
pub use connectivity::ConnectivityMonitor;
pub use controller::{DeviceState, ScanController, ScanControllerBuilder, SystemStatus};
pub use error::{DeviceError, DeviceResult};
pub use events::{KioskEvent, LocalCommand, RenderEvent};
pub use executor::{RetryDisposition, RetryingRequestExecutor};
pub use identity::{build_identity, resolve_device_id};
pub use peripherals::{
    spawn_tag_forwarder, LedMatrix, LogDisplay, SerialLedMatrix, StatusDisplay, SystemProbe,
    TagReader,
};
pub use protocol::{Ack, CommandPoll, DeviceProfile};
pub use transport::{ApiRequest, HttpTransport, TransportClient};
