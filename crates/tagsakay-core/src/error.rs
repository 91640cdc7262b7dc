//! # Error Types
//!
//! Domain-specific error types for tagsakay-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tagsakay-core errors (this file)                                      │
//! │  ├── CoreError        - Mode machine / domain rule violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tagsakay-device errors (separate crate)                               │
//! │  ├── ApiError         - Validation / Network / Http / Protocol         │
//! │  └── DeviceError      - Config, peripherals, channels                  │
//! │                                                                         │
//! │  Flow: ValidationError → ApiError → ScanController → display + LED     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, tag id, bounds)
//! 3. Errors are enum variants, never String
//! 4. `Display` is the message the operator sees

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Registration mode was requested without a tag to wait for.
    ///
    /// ## When This Occurs
    /// - A local command asked for registration with an empty tag id
    /// - The server pushed `registrationMode=true` with a blank tag id
    ///
    /// The reconciler stays in normal mode.
    #[error("Registration mode requires a non-empty expected tag id")]
    EmptyExpectedTag,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any request is serialized, so a validation failure never
/// reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., non-hex MAC address).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
