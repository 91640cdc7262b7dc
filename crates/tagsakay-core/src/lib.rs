//! # tagsakay-core: Pure Kiosk Logic for TagSakay
//!
//! This crate holds every decision the kiosk makes that does not need the
//! network: input validation, the registration mode machine, duplicate tag
//! suppression, the keypad buffer and the LED-matrix line protocol.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      TagSakay Kiosk Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Peripherals (tag reader, keypad, TFT, LED)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ events / render commands               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tagsakay-device (ScanController + API)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ tagsakay-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐ ┌──────────────┐ ┌──────────┐ ┌─────────────┐  │   │
//! │  │  │ validation │ │ registration │ │ debounce │ │ keypad, led │  │   │
//! │  │  └────────────┘ └──────────────┘ └──────────┘ └─────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • TIME IS A PARAMETER         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identity, retry policy, request outcomes, statistics, scans
//! - [`error`] - Domain error types
//! - [`validation`] - Tag id, queue number and MAC address rules
//! - [`registration`] - `ModeReconciler` state machine
//! - [`debounce`] - Duplicate tag suppression
//! - [`keypad`] - Keypad buffer and menu
//! - [`led`] - LED-matrix line protocol
//!
//! ## Example Usage
//!
//! ```rust
//! use std::time::Duration;
//! use tagsakay_core::types::RetryPolicy;
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(1000), true);
//! let delays: Vec<u64> = policy
//!     .delay_schedule()
//!     .map(|d| d.as_millis() as u64)
//!     .collect();
//! assert_eq!(delays, vec![1000, 2000, 4000]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod debounce;
pub mod error;
pub mod keypad;
pub mod led;
pub mod registration;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use debounce::Debouncer;
pub use error::{CoreError, CoreResult, ValidationError};
pub use keypad::{KeypadAction, KeypadInput, MenuSelection};
pub use led::{LedAck, LedCommand};
pub use registration::{
    ExitReason, ModeChange, ModeReconciler, ModeSource, PollAction, RegistrationState,
    ServerModeState, TagMatch,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a tag id (hex-encoded UID).
///
/// A 7-byte ISO14443A UID encodes to 14 characters; 16 leaves room for
/// readers that report 8-byte identifiers.
pub const MAX_TAG_ID_LENGTH: usize = 16;

/// Largest queue number the server hands out.
pub const MAX_QUEUE_NUMBER: u32 = 999;

/// Firmware version reported in heartbeats and status reports.
pub const FIRMWARE_VERSION: &str = "2.0.0";

/// Product name used in the `User-Agent` header.
pub const DEVICE_NAME: &str = "TagSakay Scanner";
