//! # LED Matrix Line Protocol
//!
//! The LED matrix is driven by a separate microcontroller over a serial
//! link. Each command is one line of three pipe-separated fields:
//!
//! ```text
//!   COMMAND|param1|param2\n      kiosk ──▶ matrix
//!   ACK|COMMAND|OK\n             kiosk ◀── matrix
//!
//!   INIT|A4CF120B9E01|Gate 1     QUEUE|7|Ana
//!   STATUS|READY|                UNREG|04A1B2C3|
//!   REG|WAITING|04A1B2C3         CLEAR||
//! ```
//!
//! Parameters never contain `|` or line breaks; those are replaced with a
//! space before encoding. Tag ids, driver names and statuses are cut to
//! 8 characters to fit the panel.

use std::fmt;

/// Characters shown for tag ids, driver names and statuses.
pub const LED_FIELD_WIDTH: usize = 8;

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedCommand {
    Init { device_id: String, location: String },
    Ready,
    Queue { number: u32, driver: String },
    Unregistered { tag_id: String },
    Status { status: String },
    NetworkError,
    ServerError,
    RegistrationWaiting { tag_id: String },
    RegistrationSuccess { tag_id: String },
    RegistrationMismatch,
    RegistrationTimeout,
    Override { number: u32 },
    Clear,
}

impl LedCommand {
    /// The command keyword (first field).
    pub fn name(&self) -> &'static str {
        match self {
            LedCommand::Init { .. } => "INIT",
            LedCommand::Ready | LedCommand::Status { .. } => "STATUS",
            LedCommand::Queue { .. } => "QUEUE",
            LedCommand::Unregistered { .. } => "UNREG",
            LedCommand::NetworkError | LedCommand::ServerError => "ERROR",
            LedCommand::RegistrationWaiting { .. }
            | LedCommand::RegistrationSuccess { .. }
            | LedCommand::RegistrationMismatch
            | LedCommand::RegistrationTimeout => "REG",
            LedCommand::Override { .. } => "OVERRIDE",
            LedCommand::Clear => "CLEAR",
        }
    }

    /// The two parameters, already truncated and sanitized.
    pub fn params(&self) -> (String, String) {
        let (p1, p2) = match self {
            LedCommand::Init {
                device_id,
                location,
            } => (device_id.clone(), location.clone()),
            LedCommand::Ready => ("READY".to_string(), String::new()),
            LedCommand::Queue { number, driver } => (number.to_string(), short(driver)),
            LedCommand::Unregistered { tag_id } => (short(tag_id), String::new()),
            LedCommand::Status { status } => (short(status), String::new()),
            LedCommand::NetworkError => ("NETWORK".to_string(), String::new()),
            LedCommand::ServerError => ("SERVER".to_string(), String::new()),
            LedCommand::RegistrationWaiting { tag_id } => ("WAITING".to_string(), short(tag_id)),
            LedCommand::RegistrationSuccess { tag_id } => ("SUCCESS".to_string(), short(tag_id)),
            LedCommand::RegistrationMismatch => ("MISMATCH".to_string(), String::new()),
            LedCommand::RegistrationTimeout => ("TIMEOUT".to_string(), String::new()),
            LedCommand::Override { number } => (number.to_string(), String::new()),
            LedCommand::Clear => (String::new(), String::new()),
        };
        (sanitize(&p1), sanitize(&p2))
    }

    /// Encodes the command as a wire line, newline included.
    pub fn to_line(&self) -> String {
        let (p1, p2) = self.params();
        format!("{}|{}|{}\n", self.name(), p1, p2)
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_line().trim_end())
    }
}

fn short(value: &str) -> String {
    value.trim().chars().take(LED_FIELD_WIDTH).collect()
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '|' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

// =============================================================================
// Acknowledgements
// =============================================================================

/// A parsed `ACK|COMMAND|STATUS` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedAck {
    pub command: String,
    pub ok: bool,
}

impl LedAck {
    /// Parses one line from the matrix. Anything else yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim().splitn(3, '|');
        if fields.next()? != "ACK" {
            return None;
        }
        let command = fields.next()?.trim();
        if command.is_empty() {
            return None;
        }
        let ok = fields.next().map(str::trim) == Some("OK");
        Some(Self {
            command: command.to_string(),
            ok,
        })
    }

    /// Whether this ACK confirms the given command.
    pub fn acknowledges(&self, command: &LedCommand) -> bool {
        self.ok && self.command == command.name()
    }
}
