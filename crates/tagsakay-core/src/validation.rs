//! # Validation Module
//!
//! Input validation for everything the kiosk sends to the server.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Peripherals                                                  │
//! │  └── Reader yields hex UIDs, keypad caps input at 3 digits             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: ApiFacade (Rust)                                             │
//! │  └── THIS MODULE: rejects bad input before any network call            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Server                                                       │
//! │  └── Authoritative checks, answered as HTTP 4xx                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tagsakay_core::validation::{validate_queue_number, validate_tag_id};
//!
//! assert_eq!(validate_tag_id("04a1b2c3").unwrap(), "04A1B2C3");
//! assert!(validate_queue_number(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_QUEUE_NUMBER, MAX_TAG_ID_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Hex digits in a MAC address.
const MAC_HEX_DIGITS: usize = 12;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a tag id.
///
/// ## Rules
/// - Must not be empty
/// - At most 16 characters
/// - Letters and digits only
///
/// ## Returns
/// The trimmed, upper-cased tag id.
pub fn validate_tag_id(tag_id: &str) -> ValidationResult<String> {
    let tag_id = tag_id.trim();

    validate_required("tagId", tag_id)?;

    if tag_id.chars().count() > MAX_TAG_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "tagId".to_string(),
            max: MAX_TAG_ID_LENGTH,
        });
    }

    if !tag_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "tagId".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(tag_id.to_ascii_uppercase())
}

/// Normalizes a MAC address to 12 upper-case hex digits.
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` and `AABBCCDDEEFF`.
///
/// ## Example
/// ```rust
/// use tagsakay_core::validation::normalize_mac;
///
/// assert_eq!(normalize_mac("a4:cf:12:0b:9e:01").unwrap(), "A4CF120B9E01");
/// assert!(normalize_mac("not-a-mac").is_err());
/// ```
pub fn normalize_mac(raw: &str) -> ValidationResult<String> {
    validate_required("macAddress", raw)?;

    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.') && !c.is_whitespace())
        .collect();

    if digits.len() != MAC_HEX_DIGITS || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidFormat {
            field: "macAddress".to_string(),
            reason: "expected 12 hexadecimal digits".to_string(),
        });
    }

    if digits.chars().all(|c| c == '0') {
        return Err(ValidationError::InvalidFormat {
            field: "macAddress".to_string(),
            reason: "all-zero address".to_string(),
        });
    }

    Ok(digits.to_ascii_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a queue number (1..=999).
pub fn validate_queue_number(queue_number: u32) -> ValidationResult<u32> {
    if queue_number == 0 || queue_number > MAX_QUEUE_NUMBER {
        return Err(ValidationError::OutOfRange {
            field: "queueNumber".to_string(),
            min: 1,
            max: i64::from(MAX_QUEUE_NUMBER),
        });
    }
    Ok(queue_number)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag_id() {
        assert_eq!(validate_tag_id(" 04a1b2c3 ").unwrap(), "04A1B2C3");
        assert_eq!(validate_tag_id(&"A".repeat(16)).unwrap().len(), 16);

        assert!(matches!(
            validate_tag_id(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_tag_id(&"A".repeat(17)),
            Err(ValidationError::TooLong { max: 16, .. })
        ));
        assert!(matches!(
            validate_tag_id("04A1|B2"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_queue_number_bounds() {
        assert!(validate_queue_number(0).is_err());
        assert!(validate_queue_number(1000).is_err());
        assert_eq!(validate_queue_number(1).unwrap(), 1);
        assert_eq!(validate_queue_number(999).unwrap(), 999);
    }

    #[test]
    fn test_normalize_mac_formats() {
        assert_eq!(normalize_mac("A4:CF:12:0B:9E:01").unwrap(), "A4CF120B9E01");
        assert_eq!(normalize_mac("a4-cf-12-0b-9e-01").unwrap(), "A4CF120B9E01");
        assert_eq!(normalize_mac("a4cf120b9e01").unwrap(), "A4CF120B9E01");

        assert!(normalize_mac("").is_err());
        assert!(normalize_mac("A4:CF:12").is_err());
        assert!(normalize_mac("ZZ:CF:12:0B:9E:01").is_err());
        assert!(normalize_mac("00:00:00:00:00:00").is_err());
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("name", "Gate 1").is_ok());
        assert!(validate_required("name", "   ").is_err());
    }
}
