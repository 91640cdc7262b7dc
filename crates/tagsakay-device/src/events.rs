//! # Kiosk Events
//!
//! Inputs the controller loop consumes and render events it emits.
//!
//! ```text
//!  TagReader ─┐                                   ┌──▶ StatusDisplay (RenderEvent)
//!  Keypad   ──┼──▶ mpsc<KioskEvent> ──▶ Controller ┤
//!  Operator ──┘                                   └──▶ LedMatrix (LedCommand)
//! ```

use tagsakay_core::{ExitReason, ScanClassification, ScanEvent};

// =============================================================================
// Inputs
// =============================================================================

/// Everything that can wake the controller besides its own tick.
#[derive(Debug, Clone, PartialEq)]
pub enum KioskEvent {
    TagDetected(ScanEvent),
    Key(char),
    Command(LocalCommand),
}

/// Operator or maintenance actions that do not come from the keypad.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    SendHeartbeat,
    /// `None` lets the server pick the tag.
    EnableRegistration { tag_id: Option<String> },
    DisableRegistration,
    SyncProfile,
    QueueOverride { number: u32, reason: String },
    PushConfig(serde_json::Value),
    ReportStatus { status: String, reason: String },
}

// =============================================================================
// Outputs
// =============================================================================

/// What the screen should show next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Boot { device_id: String },
    Ready,
    Processing { tag_id: String },
    ScanResult(ScanClassification),
    ScanFailed { message: String },
    ScanningDisabled { tag_id: String },
    RegistrationWaiting { tag_id: String },
    RegistrationComplete { tag_id: String },
    WrongTag { expected: String, actual: String },
    RegistrationEnded { reason: ExitReason },
    ScanModeChanged { enabled: bool },
    KeypadPrompt { buffer: String },
    KeypadMenu,
    OverrideResult { number: u32, accepted: bool, message: String },
    Connectivity { online: bool },
    Info(String),
}
