//! # Peripherals
//!
//! Narrow interfaces to the hardware around the controller.
//!
//! ```text
//! ┌──────────────┐  read_tag()   ┌────────────┐  render()   ┌───────────────┐
//! │  TagReader   │──────────────▶│ Controller │────────────▶│ StatusDisplay │
//! └──────────────┘               │            │             └───────────────┘
//!                                │            │  send()     ┌───────────────┐
//!                                │            │────────────▶│   LedMatrix   │
//!                                └────────────┘             └───────┬───────┘
//!                                                                   │
//!                                           "QUEUE|7|Ana\n" ──▶ serial link
//!                                           ◀── "ACK|QUEUE|OK"
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tagsakay_core::{LedAck, LedCommand, ScanEvent};

use crate::error::{DeviceError, DeviceResult};
use crate::events::{KioskEvent, RenderEvent};

// =============================================================================
// Traits
// =============================================================================

/// Source of tag reads. `None` means the reader is gone.
#[async_trait]
pub trait TagReader: Send {
    async fn read_tag(&mut self) -> Option<ScanEvent>;
}

/// Screen output. Rendering must not block the controller.
pub trait StatusDisplay: Send {
    fn render(&mut self, event: &RenderEvent);
}

/// LED matrix link.
#[async_trait]
pub trait LedMatrix: Send {
    async fn send(&mut self, command: &LedCommand) -> DeviceResult<()>;
}

/// Host metrics reported in heartbeats and status reports.
pub trait SystemProbe: Send {
    /// Free memory in bytes.
    fn free_memory(&self) -> u64;

    fn network_connected(&self) -> bool;
}

/// Pumps tag reads into the controller's event channel until either side
/// closes.
pub fn spawn_tag_forwarder<R>(mut reader: R, events: mpsc::Sender<KioskEvent>) -> JoinHandle<()>
where
    R: TagReader + 'static,
{
    tokio::spawn(async move {
        while let Some(scan) = reader.read_tag().await {
            debug!(tag_id = %scan.tag_id, "Tag read");
            if events.send(KioskEvent::TagDetected(scan)).await.is_err() {
                break;
            }
        }
        debug!("Tag reader stopped");
    })
}

// =============================================================================
// Log Display
// =============================================================================

/// Display that writes render events to the log. Used when no screen is
/// attached.
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn render(&mut self, event: &RenderEvent) {
        match event {
            RenderEvent::ScanResult(result) => info!(target: "display", %result, "Scan result"),
            RenderEvent::ScanFailed { message } => warn!(target: "display", %message, "Scan failed"),
            RenderEvent::WrongTag { expected, actual } => {
                warn!(target: "display", %expected, %actual, "Wrong tag")
            }
            other => info!(target: "display", event = ?other),
        }
    }
}

// =============================================================================
// Serial LED Matrix
// =============================================================================

/// Line-protocol LED matrix over any async byte stream.
///
/// With a reader attached, each command waits up to `ack_timeout` for the
/// matching `ACK|CMD|OK`. A missing or negative ACK is logged only.
pub struct SerialLedMatrix<W, R = tokio::io::Empty> {
    writer: W,
    reader: Option<BufReader<R>>,
    ack_timeout: Duration,
}

impl<W> SerialLedMatrix<W, tokio::io::Empty>
where
    W: AsyncWrite + Unpin + Send,
{
    /// No ACK channel; commands are fire-and-forget.
    pub fn write_only(writer: W) -> Self {
        Self {
            writer,
            reader: None,
            ack_timeout: Duration::ZERO,
        }
    }
}

impl<W, R> SerialLedMatrix<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    pub fn new(writer: W, reader: R, ack_timeout: Duration) -> Self {
        Self {
            writer,
            reader: Some(BufReader::new(reader)),
            ack_timeout,
        }
    }

    /// Drops input that is already waiting, such as an ACK that arrived after
    /// its command timed out, so it cannot answer the next command.
    async fn discard_stale_input(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        let mut line = String::new();
        loop {
            line.clear();
            match tokio::time::timeout(Duration::ZERO, reader.read_line(&mut line)).await {
                Ok(Ok(n)) if n > 0 => {
                    debug!(line = line.trim_end(), "Discarding stale LED input");
                }
                _ => break,
            }
        }
    }

    /// Returns true when an ACK for `command` arrived in time.
    async fn wait_for_ack(&mut self, command: &LedCommand) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return true;
        };

        let wait = async {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => return None,
                    Ok(_) => {}
                }
                match LedAck::parse(&line) {
                    Some(ack) if ack.acknowledges(command) => return Some(true),
                    Some(ack) if ack.command == command.name() => return Some(false),
                    _ => {}
                }
            }
        };

        match tokio::time::timeout(self.ack_timeout, wait).await {
            Ok(Some(true)) => true,
            Ok(Some(false)) => {
                warn!(command = command.name(), "LED matrix rejected command");
                false
            }
            Ok(None) => {
                warn!(command = command.name(), "LED link closed before ACK");
                false
            }
            Err(_) => {
                warn!(
                    command = command.name(),
                    timeout_ms = self.ack_timeout.as_millis() as u64,
                    "No ACK from LED matrix"
                );
                false
            }
        }
    }
}

#[async_trait]
impl<W, R> LedMatrix for SerialLedMatrix<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    async fn send(&mut self, command: &LedCommand) -> DeviceResult<()> {
        self.discard_stale_input().await;

        let line = command.to_line();
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DeviceError::LedLink(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| DeviceError::LedLink(e.to_string()))?;
        debug!(command = %command, "LED command sent");

        self.wait_for_ack(command).await;
        Ok(())
    }
}
