//! # Registration Mode Machine
//!
//! `ModeReconciler` owns the kiosk's two server-authoritative flags:
//! registration mode (with the tag being enrolled) and scan mode.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              enable(tag) / server registrationMode=true + tag           │
//! │   ┌────────┐ ─────────────────────────────────────────▶ ┌────────────┐ │
//! │   │ NORMAL │                                             │  PENDING   │ │
//! │   │        │ ◀───────────────────────────────────────── │ (expected) │ │
//! │   └────────┘   tag matched / disable / timeout          └─────┬──────┘ │
//! │       │                                                       │  ▲     │
//! │       │ enable("")  → rejected, stays NORMAL                  └──┘     │
//! │       │                                            server sends other  │
//! │       ▼                                            tag: restart timer  │
//! │   scan_mode=false → tag events rejected ("scanning disabled")          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Precedence
//! Server values always overwrite local state. Each response is applied the
//! moment it arrives, so the most recent response wins.
//!
//! Time is passed in, never read, so the machine is fully deterministic.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// State
// =============================================================================

/// Registration sub-state.
///
/// Invariant: `expected_tag_id` is non-empty whenever `enabled` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationState {
    pub enabled: bool,
    pub expected_tag_id: String,
    pub started_at: Option<Instant>,
}

/// Where a mode change came from. Used in logs and render events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeSource {
    Local,
    Heartbeat,
    RegistrationStatus,
    CommandPoll,
    ModeUpdate,
    Profile,
}

impl fmt::Display for ModeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModeSource::Local => "local",
            ModeSource::Heartbeat => "heartbeat",
            ModeSource::RegistrationStatus => "registration_status",
            ModeSource::CommandPoll => "command_poll",
            ModeSource::ModeUpdate => "mode_update",
            ModeSource::Profile => "profile",
        };
        f.write_str(s)
    }
}

/// Why registration mode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The expected tag was scanned.
    Completed,
    /// Turned off locally or by the server.
    Disabled,
    /// Nobody scanned the expected tag in time.
    TimedOut,
}

/// A transition the controller must surface to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChange {
    RegistrationStarted {
        expected_tag_id: String,
        source: ModeSource,
    },
    RegistrationEnded {
        reason: ExitReason,
        source: ModeSource,
    },
    ScanModeChanged {
        enabled: bool,
        source: ModeSource,
    },
}

/// Result of offering a scanned tag to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    /// Expected tag scanned; registration mode has been left.
    Matched { tag_id: String },
    /// Pending, but a different tag was scanned. No transition.
    Mismatch { expected: String, actual: String },
    /// Not in registration mode.
    NotPending,
}

/// Mode fields as reported by any server response.
///
/// `None` means the response did not mention the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerModeState {
    pub registration_mode: Option<bool>,
    pub scan_mode: Option<bool>,
    pub expected_tag_id: Option<String>,
}

/// One action from the command poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    EnableRegistration { tag_id: Option<String> },
    DisableRegistration,
    ScanMode { enabled: Option<bool> },
    /// Unrecognised action name; ignored.
    Unknown(String),
}

// =============================================================================
// Mode Reconciler
// =============================================================================

#[derive(Debug, Clone)]
pub struct ModeReconciler {
    registration: RegistrationState,
    scan_mode: bool,
    timeout: Duration,
}

impl ModeReconciler {
    /// Starts in normal mode with scanning enabled.
    pub fn new(timeout: Duration) -> Self {
        Self {
            registration: RegistrationState::default(),
            scan_mode: true,
            timeout,
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn state(&self) -> &RegistrationState {
        &self.registration
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.registration.enabled
    }

    pub fn expected_tag_id(&self) -> Option<&str> {
        self.is_pending()
            .then_some(self.registration.expected_tag_id.as_str())
    }

    #[inline]
    pub fn scan_mode(&self) -> bool {
        self.scan_mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Enters (or re-targets) registration mode.
    ///
    /// Returns `Ok(None)` when already waiting for the same tag; the start
    /// time is kept in that case.
    ///
    /// ## Errors
    /// `CoreError::EmptyExpectedTag` for a blank tag id. State is unchanged.
    pub fn enable(
        &mut self,
        tag_id: &str,
        source: ModeSource,
        now: Instant,
    ) -> CoreResult<Option<ModeChange>> {
        let tag_id = tag_id.trim();
        if tag_id.is_empty() {
            return Err(CoreError::EmptyExpectedTag);
        }
        let tag_id = tag_id.to_ascii_uppercase();

        if self.registration.enabled && self.registration.expected_tag_id == tag_id {
            return Ok(None);
        }

        self.registration = RegistrationState {
            enabled: true,
            expected_tag_id: tag_id.clone(),
            started_at: Some(now),
        };

        Ok(Some(ModeChange::RegistrationStarted {
            expected_tag_id: tag_id,
            source,
        }))
    }

    /// Leaves registration mode. `None` when it was not active.
    pub fn disable(&mut self, source: ModeSource) -> Option<ModeChange> {
        self.exit(ExitReason::Disabled, source)
    }

    pub fn set_scan_mode(&mut self, enabled: bool, source: ModeSource) -> Option<ModeChange> {
        if self.scan_mode == enabled {
            return None;
        }
        self.scan_mode = enabled;
        Some(ModeChange::ScanModeChanged { enabled, source })
    }

    /// Offers a scanned tag. Comparison is case-insensitive.
    pub fn match_tag(&mut self, tag_id: &str) -> TagMatch {
        if !self.is_pending() {
            return TagMatch::NotPending;
        }

        let actual = tag_id.trim();
        if actual.eq_ignore_ascii_case(&self.registration.expected_tag_id) {
            let tag_id = std::mem::take(&mut self.registration.expected_tag_id);
            self.registration = RegistrationState::default();
            TagMatch::Matched { tag_id }
        } else {
            TagMatch::Mismatch {
                expected: self.registration.expected_tag_id.clone(),
                actual: actual.to_ascii_uppercase(),
            }
        }
    }

    /// Leaves registration mode once it has been pending longer than the
    /// timeout.
    pub fn check_timeout(&mut self, now: Instant) -> Option<ModeChange> {
        let started_at = self.registration.started_at?;
        if !self.is_pending() || now.saturating_duration_since(started_at) <= self.timeout {
            return None;
        }
        self.exit(ExitReason::TimedOut, ModeSource::Local)
    }

    // -------------------------------------------------------------------------
    // Server Reconciliation
    // -------------------------------------------------------------------------

    /// Overwrites local state with whatever the server reported.
    ///
    /// `registration_mode=true` without a usable tag cannot be entered; it is
    /// ignored rather than violating the non-empty tag invariant.
    pub fn apply_server_state(
        &mut self,
        server: &ServerModeState,
        source: ModeSource,
        now: Instant,
    ) -> Vec<ModeChange> {
        let mut changes = Vec::new();

        if let Some(enabled) = server.scan_mode {
            changes.extend(self.set_scan_mode(enabled, source));
        }

        match server.registration_mode {
            Some(true) => {
                let tag = server.expected_tag_id.as_deref().unwrap_or_default();
                if let Ok(change) = self.enable(tag, source, now) {
                    changes.extend(change);
                }
            }
            Some(false) => changes.extend(self.disable(source)),
            None => {}
        }

        changes
    }

    /// Applies poll actions in order.
    pub fn apply_poll_actions(&mut self, actions: &[PollAction], now: Instant) -> Vec<ModeChange> {
        let mut changes = Vec::new();

        for action in actions {
            match action {
                PollAction::EnableRegistration { tag_id } => {
                    let tag = tag_id.as_deref().unwrap_or_default();
                    if let Ok(change) = self.enable(tag, ModeSource::CommandPoll, now) {
                        changes.extend(change);
                    }
                }
                PollAction::DisableRegistration => {
                    changes.extend(self.disable(ModeSource::CommandPoll));
                }
                PollAction::ScanMode {
                    enabled: Some(enabled),
                } => {
                    changes.extend(self.set_scan_mode(*enabled, ModeSource::CommandPoll));
                }
                PollAction::ScanMode { enabled: None } | PollAction::Unknown(_) => {}
            }
        }

        changes
    }

    fn exit(&mut self, reason: ExitReason, source: ModeSource) -> Option<ModeChange> {
        if !self.is_pending() {
            return None;
        }
        self.registration = RegistrationState::default();
        Some(ModeChange::RegistrationEnded { reason, source })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> ModeReconciler {
        ModeReconciler::new(Duration::from_secs(120))
    }

    fn server(registration: Option<bool>, tag: Option<&str>) -> ServerModeState {
        ServerModeState {
            registration_mode: registration,
            scan_mode: None,
            expected_tag_id: tag.map(str::to_string),
        }
    }

    #[test]
    fn test_enable_rejects_empty_tag() {
        let mut modes = reconciler();
        let now = Instant::now();

        assert!(matches!(
            modes.enable("  ", ModeSource::Local, now),
            Err(CoreError::EmptyExpectedTag)
        ));
        assert!(!modes.is_pending());
        assert!(modes.state().expected_tag_id.is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let mut modes = reconciler();
        modes
            .enable("04a1b2c3", ModeSource::Local, Instant::now())
            .unwrap();

        assert_eq!(
            modes.match_tag("04A1B2C3"),
            TagMatch::Matched {
                tag_id: "04A1B2C3".to_string()
            }
        );
        assert!(!modes.is_pending());
        assert_eq!(modes.state(), &RegistrationState::default());
    }

    #[test]
    fn test_mismatch_keeps_pending() {
        let mut modes = reconciler();
        modes
            .enable("04A1B2C3", ModeSource::Local, Instant::now())
            .unwrap();

        assert!(matches!(modes.match_tag("DEADBEEF"), TagMatch::Mismatch { .. }));
        assert_eq!(modes.expected_tag_id(), Some("04A1B2C3"));
        assert_eq!(modes.match_tag("x"), TagMatch::Mismatch {
            expected: "04A1B2C3".to_string(),
            actual: "X".to_string(),
        });
    }

    #[test]
    fn test_timeout_is_strictly_after_limit() {
        let mut modes = reconciler();
        let start = Instant::now();
        modes.enable("04A1B2C3", ModeSource::Local, start).unwrap();

        assert_eq!(modes.check_timeout(start + Duration::from_secs(120)), None);
        assert_eq!(
            modes.check_timeout(start + Duration::from_secs(121)),
            Some(ModeChange::RegistrationEnded {
                reason: ExitReason::TimedOut,
                source: ModeSource::Local,
            })
        );
        assert!(!modes.is_pending());
        assert_eq!(modes.check_timeout(start + Duration::from_secs(500)), None);
    }

    #[test]
    fn test_server_retarget_resets_start() {
        let mut modes = reconciler();
        let start = Instant::now();
        modes.enable("AAAA", ModeSource::Local, start).unwrap();

        let later = start + Duration::from_secs(100);
        let changes =
            modes.apply_server_state(&server(Some(true), Some("BBBB")), ModeSource::Heartbeat, later);

        assert_eq!(changes.len(), 1);
        assert_eq!(modes.expected_tag_id(), Some("BBBB"));
        assert_eq!(modes.state().started_at, Some(later));
        assert_eq!(modes.check_timeout(start + Duration::from_secs(150)), None);
    }

    #[test]
    fn test_same_tag_from_server_is_noop() {
        let mut modes = reconciler();
        let start = Instant::now();
        modes.enable("AAAA", ModeSource::Local, start).unwrap();

        let changes = modes.apply_server_state(
            &server(Some(true), Some("aaaa")),
            ModeSource::CommandPoll,
            start + Duration::from_secs(10),
        );
        assert!(changes.is_empty());
        assert_eq!(modes.state().started_at, Some(start));
    }

    #[test]
    fn test_server_disable_overrides_local() {
        let mut modes = reconciler();
        let now = Instant::now();
        modes.enable("AAAA", ModeSource::Local, now).unwrap();

        let changes = modes.apply_server_state(&server(Some(false), None), ModeSource::Heartbeat, now);
        assert_eq!(
            changes,
            vec![ModeChange::RegistrationEnded {
                reason: ExitReason::Disabled,
                source: ModeSource::Heartbeat,
            }]
        );
        assert!(!modes.is_pending());
    }

    #[test]
    fn test_server_enable_without_tag_ignored() {
        let mut modes = reconciler();
        let changes = modes.apply_server_state(
            &server(Some(true), Some("")),
            ModeSource::Heartbeat,
            Instant::now(),
        );
        assert!(changes.is_empty());
        assert!(!modes.is_pending());
    }

    #[test]
    fn test_scan_mode_from_server() {
        let mut modes = reconciler();
        let state = ServerModeState {
            scan_mode: Some(false),
            ..Default::default()
        };
        let changes = modes.apply_server_state(&state, ModeSource::Profile, Instant::now());
        assert_eq!(
            changes,
            vec![ModeChange::ScanModeChanged {
                enabled: false,
                source: ModeSource::Profile,
            }]
        );
        assert!(!modes.scan_mode());
    }

    #[test]
    fn test_poll_actions_applied_in_order() {
        let mut modes = reconciler();
        let now = Instant::now();
        let actions = vec![
            PollAction::EnableRegistration {
                tag_id: Some("CAFE01".to_string()),
            },
            PollAction::Unknown("reboot".to_string()),
            PollAction::ScanMode {
                enabled: Some(false),
            },
            PollAction::EnableRegistration { tag_id: None },
        ];

        let changes = modes.apply_poll_actions(&actions, now);
        assert_eq!(changes.len(), 2);
        assert_eq!(modes.expected_tag_id(), Some("CAFE01"));
        assert!(!modes.scan_mode());

        let changes = modes.apply_poll_actions(&[PollAction::DisableRegistration], now);
        assert_eq!(changes.len(), 1);
        assert!(!modes.is_pending());
    }
}
