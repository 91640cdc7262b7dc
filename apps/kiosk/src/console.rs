//! Line-based console that stands in for the tag reader and keypad.
//!
//! ```text
//!   04A1B2C3              tag read
//!   key:42#               keypad presses, one per character
//!   cmd:heartbeat         send a heartbeat now
//!   cmd:register [TAG]    enter registration mode (server picks TAG if omitted)
//!   cmd:unregister        leave registration mode
//!   cmd:sync              pull the device profile
//!   cmd:override N [why]  queue override
//!   cmd:status [reason]   status report
//!   cmd:config {json}     push device config
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tagsakay_core::ScanEvent;
use tagsakay_device::{KioskEvent, LocalCommand, TagReader};

#[derive(Debug, PartialEq)]
enum ConsoleInput {
    Tag(String),
    Events(Vec<KioskEvent>),
    Empty,
    Invalid(String),
}

pub struct ConsoleReader {
    lines: Lines<BufReader<Stdin>>,
    events: mpsc::Sender<KioskEvent>,
}

impl ConsoleReader {
    pub fn new(events: mpsc::Sender<KioskEvent>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            events,
        }
    }
}

#[async_trait]
impl TagReader for ConsoleReader {
    async fn read_tag(&mut self) -> Option<ScanEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Console closed");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    return None;
                }
            };

            match parse_line(&line) {
                ConsoleInput::Tag(tag) => {
                    return Some(ScanEvent::new(tag, tokio::time::Instant::now().into_std()));
                }
                ConsoleInput::Events(events) => {
                    for event in events {
                        if self.events.send(event).await.is_err() {
                            return None;
                        }
                    }
                }
                ConsoleInput::Empty => {}
                ConsoleInput::Invalid(reason) => warn!(input = %line, %reason, "Ignoring console input"),
            }
        }
    }
}

fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }

    if let Some(keys) = line.strip_prefix("key:") {
        let events: Vec<KioskEvent> = keys
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(KioskEvent::Key)
            .collect();
        return if events.is_empty() {
            ConsoleInput::Invalid("no keys given".into())
        } else {
            ConsoleInput::Events(events)
        };
    }

    if let Some(command) = line.strip_prefix("cmd:") {
        return match parse_command(command.trim()) {
            Ok(command) => ConsoleInput::Events(vec![KioskEvent::Command(command)]),
            Err(reason) => ConsoleInput::Invalid(reason),
        };
    }

    ConsoleInput::Tag(line.to_string())
}

fn parse_command(input: &str) -> Result<LocalCommand, String> {
    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };
    let rest = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "heartbeat" => Ok(LocalCommand::SendHeartbeat),
        "register" => Ok(LocalCommand::EnableRegistration { tag_id: rest }),
        "unregister" => Ok(LocalCommand::DisableRegistration),
        "sync" => Ok(LocalCommand::SyncProfile),
        "override" => {
            let rest = rest.ok_or("override needs a queue number")?;
            let (number, reason) = match rest.split_once(char::is_whitespace) {
                Some((number, reason)) => (number, reason.trim().to_string()),
                None => (rest.as_str(), "Console override".to_string()),
            };
            let number = number
                .parse::<u32>()
                .map_err(|_| format!("'{number}' is not a queue number"))?;
            Ok(LocalCommand::QueueOverride { number, reason })
        }
        "status" => Ok(LocalCommand::ReportStatus {
            status: "active".into(),
            reason: rest.unwrap_or_else(|| "manual_status_check".into()),
        }),
        "config" => {
            let rest = rest.ok_or("config needs a JSON object")?;
            serde_json::from_str(&rest)
                .map(LocalCommand::PushConfig)
                .map_err(|e| format!("invalid JSON: {e}"))
        }
        other => Err(format!("unknown command '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_tag() {
        assert_eq!(parse_line("  04a1b2c3 \n"), ConsoleInput::Tag("04a1b2c3".into()));
        assert_eq!(parse_line("   "), ConsoleInput::Empty);
    }

    #[test]
    fn test_key_line_expands_to_presses() {
        assert_eq!(
            parse_line("key:4 2#"),
            ConsoleInput::Events(vec![
                KioskEvent::Key('4'),
                KioskEvent::Key('2'),
                KioskEvent::Key('#'),
            ])
        );
        assert!(matches!(parse_line("key:"), ConsoleInput::Invalid(_)));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_command("heartbeat"), Ok(LocalCommand::SendHeartbeat));
        assert_eq!(
            parse_command("register CAFE01"),
            Ok(LocalCommand::EnableRegistration {
                tag_id: Some("CAFE01".into())
            })
        );
        assert_eq!(
            parse_command("register"),
            Ok(LocalCommand::EnableRegistration { tag_id: None })
        );
        assert_eq!(
            parse_command("override 42 late arrival"),
            Ok(LocalCommand::QueueOverride {
                number: 42,
                reason: "late arrival".into()
            })
        );
        assert!(parse_command("override forty").is_err());
        assert!(parse_command("reboot").is_err());
    }

    #[test]
    fn test_config_command_parses_json() {
        assert_eq!(
            parse_command(r#"config {"scanCooldownMs": 2000}"#),
            Ok(LocalCommand::PushConfig(serde_json::json!({ "scanCooldownMs": 2000 })))
        );
        assert!(parse_command("config {oops").is_err());
    }
}
