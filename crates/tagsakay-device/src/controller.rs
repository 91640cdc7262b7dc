//! # Scan Controller
//!
//! Top-level orchestrator. Owns the device state and the API facade and runs
//! one cooperative loop over tag events, keypad keys, local commands and a
//! periodic tick.
//!
//! ## Event Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ScanController::run                            │
//! │                                                                         │
//! │   startup: LED INIT ─▶ register? ─▶ health ─▶ reg. status ─▶ profile    │
//! │                                                                         │
//! │   loop select! {                                                        │
//! │     shutdown          ──▶ LED CLEAR, exit                               │
//! │     KioskEvent::TagDetected ──▶ debounce ─▶ pending? ─▶ match / submit  │
//! │     KioskEvent::Key         ──▶ keypad ─▶ override / menu               │
//! │     KioskEvent::Command     ──▶ operator action                         │
//! │     tick ──▶ online:  heartbeat ─▶ poll ─▶ periodic status              │
//! │              offline: backoff-gated health check                        │
//! │              always:  registration timeout, keypad timeout              │
//! │   }                                                                     │
//! │                                                                         │
//! │   Every server response that carries mode fields is applied the moment  │
//! │   it arrives (server wins, most recent response wins).                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers take `&mut self`, so exactly one request is in flight at a time.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tagsakay_core::validation::{normalize_mac, validate_tag_id};
use tagsakay_core::{
    DriverName, ExitReason, KeypadAction, KeypadInput, LedCommand, MenuSelection, ModeChange,
    ModeReconciler, ModeSource, ScanClassification, ScanEvent, ServerModeState, TagMatch,
    Debouncer, FIRMWARE_VERSION,
};

use crate::api::{ApiError, ApiFacade};
use crate::config::KioskConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{DeviceError, DeviceResult};
use crate::events::{KioskEvent, LocalCommand, RenderEvent};
use crate::peripherals::{LedMatrix, LogDisplay, SerialLedMatrix, StatusDisplay, SystemProbe};
use crate::protocol::{HeartbeatRequest, HeartbeatStats, StatusReport};

/// Reason sent with keypad queue overrides.
pub const KEYPAD_OVERRIDE_REASON: &str = "Manual keypad override";

// =============================================================================
// Device State
// =============================================================================

/// Health flags and counters reported to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemStatus {
    pub network_connected: bool,
    pub reader_initialized: bool,
    pub api_connected: bool,
    pub offline_mode: bool,
    pub scan_count: u64,
    pub error_count: u64,
}

/// Everything the kiosk knows about itself.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub name: String,
    pub location: String,
    pub is_active: bool,
    pub modes: ModeReconciler,
    pub system: SystemStatus,
    pub booted_at: Instant,
    last_heartbeat: Option<Instant>,
    last_poll: Option<Instant>,
    last_status_report: Option<Instant>,
}

impl DeviceState {
    fn new(config: &KioskConfig, booted_at: Instant) -> Self {
        Self {
            name: config.device.name.clone(),
            location: config.device.location.clone(),
            is_active: true,
            modes: ModeReconciler::new(config.timing.registration_timeout()),
            system: SystemStatus::default(),
            booted_at,
            last_heartbeat: None,
            last_poll: None,
            last_status_report: Some(booted_at),
        }
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.booted_at)
    }
}

fn due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last.map_or(true, |at| now.saturating_duration_since(at) >= interval)
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

// =============================================================================
// Controller
// =============================================================================

pub struct ScanController {
    config: KioskConfig,
    state: DeviceState,
    api: ApiFacade,
    debouncer: Debouncer,
    keypad: KeypadInput,
    connectivity: ConnectivityMonitor,
    /// When a shown result gives way to the idle screen.
    idle_at: Option<Instant>,
    display: Box<dyn StatusDisplay>,
    led: Box<dyn LedMatrix>,
    probe: Box<dyn SystemProbe>,
}

impl ScanController {
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn api(&self) -> &ApiFacade {
        &self.api
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn mark_reader_initialized(&mut self, ready: bool) {
        self.state.system.reader_initialized = ready;
    }

    /// Runs startup, then the event loop until `shutdown` resolves or the
    /// event channel closes.
    pub async fn run<S>(mut self, mut events: mpsc::Receiver<KioskEvent>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let started = tokio::select! {
            _ = &mut shutdown => false,
            _ = self.startup() => true,
        };
        if !started {
            info!("Shutdown requested during startup");
            self.led(LedCommand::Clear).await;
            return;
        }

        let mut ticker = tokio::time::interval(self.config.timing.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.tick(now()).await,
            }
        }

        self.led(LedCommand::Clear).await;
        info!("Scan controller stopped");
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Boot sequence: announce, optionally register, then pull server state.
    pub async fn startup(&mut self) {
        let device_id = self.api.identity().device_id().to_string();
        info!(
            device_id = %device_id,
            location = %self.state.location,
            firmware = FIRMWARE_VERSION,
            "Kiosk starting"
        );
        self.render(RenderEvent::Boot {
            device_id: device_id.clone(),
        });
        self.led(LedCommand::Init {
            device_id: device_id.clone(),
            location: self.state.location.clone(),
        })
        .await;
        self.state.system.network_connected = self.probe.network_connected();

        if self.config.device.register_on_boot {
            self.register_device().await;
        }

        match self.api.health_check().await {
            Ok(_) => {
                self.state.system.api_connected = true;
                info!("API reachable");
            }
            Err(e) => {
                self.state.system.api_connected = false;
                warn!(error = %e, "API health check failed");
            }
        }

        match self.api.registration_status().await {
            Ok(server) => self.apply_server_state(&server, ModeSource::RegistrationStatus).await,
            Err(e) => warn!(error = %e, "Could not fetch registration status"),
        }

        self.sync_profile().await;
        self.check_failure_threshold(now()).await;
        self.show_idle().await;
    }

    async fn register_device(&mut self) {
        let mac = normalize_mac(self.api.identity().device_id())
            .ok()
            .or_else(|| self.config.device.hardware_mac.clone());
        let Some(mac) = mac else {
            warn!("Skipping device registration: no MAC address");
            return;
        };

        let name = self.state.name.clone();
        let location = self.state.location.clone();
        match self.api.register_device(&mac, &name, &location).await {
            Ok(ack) => info!(accepted = ack.accepted, message = ?ack.message, "Device registration sent"),
            Err(e) => warn!(error = %e, "Device registration failed"),
        }
    }

    // =========================================================================
    // Event Dispatch
    // =========================================================================

    pub async fn handle_event(&mut self, event: KioskEvent) {
        match event {
            KioskEvent::TagDetected(scan) => self.handle_scan(scan).await,
            KioskEvent::Key(key) => self.handle_key(key, now()).await,
            KioskEvent::Command(command) => self.handle_command(command).await,
        }
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    async fn handle_scan(&mut self, scan: ScanEvent) {
        if !self.debouncer.accept(&scan.tag_id, scan.detected_at) {
            debug!(tag_id = %scan.tag_id, "Duplicate read suppressed");
            return;
        }

        match self.state.modes.match_tag(&scan.tag_id) {
            TagMatch::Matched { tag_id } => self.complete_registration(tag_id).await,
            TagMatch::Mismatch { expected, actual } => {
                warn!(expected = %expected, actual = %actual, "Wrong tag while registration pending");
                self.render(RenderEvent::WrongTag { expected, actual });
                self.led(LedCommand::RegistrationMismatch).await;
                self.hold_result();
            }
            TagMatch::NotPending if !self.state.modes.scan_mode() => {
                info!(tag_id = %scan.tag_id, "Scanning disabled, tag ignored");
                self.render(RenderEvent::ScanningDisabled {
                    tag_id: scan.tag_id,
                });
            }
            TagMatch::NotPending => self.submit_scan(scan).await,
        }
    }

    async fn submit_scan(&mut self, scan: ScanEvent) {
        self.render(RenderEvent::Processing {
            tag_id: scan.tag_id.clone(),
        });
        self.state.system.scan_count += 1;

        let location = self.state.location.clone();
        let result = self
            .api
            .submit_scan_at(&scan.tag_id, &location, scan.timestamp)
            .await;

        match result {
            Ok(classification) => {
                self.led(scan_led(&classification)).await;
                self.render(RenderEvent::ScanResult(classification));
            }
            Err(e) => {
                self.state.system.error_count += 1;
                warn!(tag_id = %scan.tag_id, error = %e, "Scan failed");
                self.led(error_led(&e)).await;
                self.render(RenderEvent::ScanFailed {
                    message: e.to_string(),
                });
            }
        }
        self.hold_result();

        self.check_failure_threshold(now()).await;
    }

    async fn complete_registration(&mut self, tag_id: String) {
        info!(tag_id = %tag_id, "Registration tag scanned");
        self.render(RenderEvent::RegistrationComplete {
            tag_id: tag_id.clone(),
        });
        self.led(LedCommand::RegistrationSuccess {
            tag_id: tag_id.clone(),
        })
        .await;
        self.hold_result();

        self.report_status("active", "registration_complete").await;
        self.push_mode(false, None).await;
        self.check_failure_threshold(now()).await;
    }

    // -------------------------------------------------------------------------
    // Keypad
    // -------------------------------------------------------------------------

    async fn handle_key(&mut self, key: char, at: Instant) {
        match self.keypad.press(key, at) {
            KeypadAction::Ignored => {}
            KeypadAction::BufferChanged(buffer) => {
                self.render(RenderEvent::KeypadPrompt { buffer });
            }
            KeypadAction::Submit(number) => {
                self.queue_override(number, KEYPAD_OVERRIDE_REASON).await;
            }
            KeypadAction::Cancelled | KeypadAction::MenuClosed => self.show_idle().await,
            KeypadAction::MenuOpened => self.render(RenderEvent::KeypadMenu),
            KeypadAction::Menu(selection) => {
                let command = match selection {
                    MenuSelection::SendHeartbeat => LocalCommand::SendHeartbeat,
                    MenuSelection::EnableRegistration => {
                        LocalCommand::EnableRegistration { tag_id: None }
                    }
                    MenuSelection::DisableRegistration => LocalCommand::DisableRegistration,
                    MenuSelection::SyncProfile => LocalCommand::SyncProfile,
                };
                self.handle_command(command).await;
            }
            KeypadAction::InvalidSelection(key) => {
                self.render(RenderEvent::Info(format!("Invalid menu option '{key}'")));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Local Commands
    // -------------------------------------------------------------------------

    pub async fn handle_command(&mut self, command: LocalCommand) {
        debug!(?command, "Local command");
        match command {
            LocalCommand::SendHeartbeat => self.send_heartbeat(now()).await,
            LocalCommand::EnableRegistration { tag_id } => {
                self.enable_registration(tag_id).await;
            }
            LocalCommand::DisableRegistration => {
                if let Some(change) = self.state.modes.disable(ModeSource::Local) {
                    self.on_mode_change(change).await;
                }
                self.push_mode(false, None).await;
            }
            LocalCommand::SyncProfile => self.sync_profile().await,
            LocalCommand::QueueOverride { number, reason } => {
                self.queue_override(number, &reason).await;
            }
            LocalCommand::PushConfig(config) => match self.api.update_device_config(&config).await {
                Ok(ack) => self.render(RenderEvent::Info(format!(
                    "Config update {}",
                    if ack.accepted { "accepted" } else { "rejected" }
                ))),
                Err(e) => self.render(RenderEvent::Info(format!("Config update failed: {e}"))),
            },
            LocalCommand::ReportStatus { status, reason } => {
                self.report_status(&status, &reason).await;
            }
        }
        self.check_failure_threshold(now()).await;
    }

    async fn enable_registration(&mut self, tag_id: Option<String>) {
        let tag_id = match tag_id
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(validate_tag_id)
            .transpose()
        {
            Ok(tag_id) => tag_id,
            Err(e) => {
                warn!(error = %e, "Rejected registration tag");
                self.render(RenderEvent::Info(format!("Registration request failed: {e}")));
                return;
            }
        };

        let scan_mode = self.state.modes.scan_mode();
        match self.api.update_mode(true, scan_mode, tag_id.as_deref()).await {
            // The server decided; its answer stands even when it says no.
            Ok(Some(server)) => {
                self.apply_server_state(&server, ModeSource::ModeUpdate).await;
                return;
            }
            Ok(None) => {}
            Err(e @ ApiError::Network(_)) => {
                warn!(error = %e, "Mode update failed, server unreachable");
            }
            Err(e) => {
                warn!(error = %e, "Mode update refused");
                self.render(RenderEvent::Info(format!("Registration request failed: {e}")));
                return;
            }
        }

        // No mode answer from the server: wait for the requested tag locally.
        if let Some(tag) = tag_id {
            match self.state.modes.enable(&tag, ModeSource::Local, now()) {
                Ok(Some(change)) => self.on_mode_change(change).await,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cannot enter registration mode"),
            }
        }
    }

    async fn queue_override(&mut self, number: u32, reason: &str) {
        info!(queue_number = number, reason, "Queue override");
        match self.api.queue_override(number, reason).await {
            Ok(ack) => {
                if ack.accepted {
                    self.led(LedCommand::Override { number }).await;
                }
                self.render(RenderEvent::OverrideResult {
                    number,
                    accepted: ack.accepted,
                    message: ack.message.unwrap_or_default(),
                });
                self.hold_result();
            }
            Err(e) => {
                self.state.system.error_count += 1;
                warn!(queue_number = number, error = %e, "Queue override failed");
                self.render(RenderEvent::OverrideResult {
                    number,
                    accepted: false,
                    message: e.to_string(),
                });
            }
        }
    }

    // =========================================================================
    // Periodic Work
    // =========================================================================

    /// One pass of interval-gated background work.
    pub async fn tick(&mut self, now: Instant) {
        self.state.system.network_connected = self.probe.network_connected();

        if self.connectivity.is_online() {
            if due(self.state.last_heartbeat, self.config.timing.heartbeat_interval(), now) {
                self.send_heartbeat(now).await;
            }
            if due(self.state.last_poll, self.config.timing.poll_interval(), now) {
                self.poll_commands(now).await;
            }
            if due(
                self.state.last_status_report,
                self.config.timing.status_report_interval(),
                now,
            ) {
                self.state.last_status_report = Some(now);
                self.report_status("active", "periodic").await;
            }
            self.check_failure_threshold(now).await;
        } else if self.connectivity.should_check(now) {
            self.probe_connectivity(now).await;
        }

        if let Some(change) = self.state.modes.check_timeout(now) {
            warn!("Registration timed out");
            self.on_mode_change(change).await;
            self.push_mode(false, None).await;
        }

        if self.keypad.check_timeout(now) {
            debug!("Keypad input timed out");
            self.show_idle().await;
        }

        if self.idle_at.is_some_and(|at| now >= at) {
            self.show_idle().await;
        }
    }

    async fn send_heartbeat(&mut self, now: Instant) {
        self.state.last_heartbeat = Some(now);
        let payload = self.heartbeat_payload(now);
        match self.api.heartbeat(&payload).await {
            Ok(Some(server)) => self.apply_server_state(&server, ModeSource::Heartbeat).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Heartbeat failed"),
        }
    }

    async fn poll_commands(&mut self, now: Instant) {
        self.state.last_poll = Some(now);
        match self.api.poll_commands().await {
            Ok(poll) => {
                self.apply_server_state(&poll.server_state, ModeSource::CommandPoll).await;
                let changes = self.state.modes.apply_poll_actions(&poll.actions, now);
                for change in changes {
                    self.on_mode_change(change).await;
                }
            }
            Err(e) => warn!(error = %e, "Command poll failed"),
        }
    }

    async fn sync_profile(&mut self) {
        match self.api.sync_profile().await {
            Ok(profile) => {
                if let Some(name) = profile.name {
                    self.state.name = name;
                }
                if let Some(location) = profile.location {
                    self.state.location = location;
                }
                if !profile.is_active && self.state.is_active {
                    warn!("Device is marked inactive on the server");
                    self.render(RenderEvent::Info("Device inactive".into()));
                }
                self.state.is_active = profile.is_active;
                info!(name = %self.state.name, location = %self.state.location, "Profile synced");
                self.apply_server_state(&profile.server_state, ModeSource::Profile).await;
            }
            Err(e) => warn!(error = %e, "Profile sync failed"),
        }
    }

    async fn report_status(&mut self, status: &str, reason: &str) {
        let report = StatusReport {
            status: status.to_string(),
            reason: reason.to_string(),
            timestamp: chrono::Utc::now(),
            uptime: self.state.uptime(now()).as_secs(),
            free_heap: self.probe.free_memory(),
            location: self.state.location.clone(),
            firmware_version: FIRMWARE_VERSION.to_string(),
            wifi_connected: self.state.system.network_connected,
            rfid_initialized: self.state.system.reader_initialized,
            offline_mode: self.state.system.offline_mode,
        };
        match self.api.report_status(&report).await {
            Ok(_) => debug!(status, reason, "Status reported"),
            Err(e) => warn!(status, reason, error = %e, "Status report failed"),
        }
    }

    /// Tells the server our registration mode and adopts its answer.
    async fn push_mode(&mut self, registration_mode: bool, tag_id: Option<&str>) {
        let scan_mode = self.state.modes.scan_mode();
        match self.api.update_mode(registration_mode, scan_mode, tag_id).await {
            Ok(Some(server)) => self.apply_server_state(&server, ModeSource::ModeUpdate).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Mode update failed"),
        }
    }

    fn heartbeat_payload(&self, now: Instant) -> HeartbeatRequest {
        let stats = self.api.statistics();
        HeartbeatRequest {
            status: (if self.state.system.offline_mode { "offline" } else { "online" }).to_string(),
            uptime: self.state.uptime(now).as_secs(),
            free_heap: self.probe.free_memory(),
            location: self.state.location.clone(),
            firmware_version: FIRMWARE_VERSION.to_string(),
            registration_mode: self.state.modes.is_pending(),
            scan_mode: self.state.modes.scan_mode(),
            pending_registration_tag_id: self.state.modes.expected_tag_id().map(str::to_string),
            stats: Some(HeartbeatStats {
                total_scans: self.state.system.scan_count,
                error_count: self.state.system.error_count,
                api_success_rate: stats.success_rate(),
                avg_response_time: stats.average_latency().as_millis() as u64,
            }),
        }
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    async fn check_failure_threshold(&mut self, now: Instant) {
        let failures = self.api.consecutive_failures();
        if failures < self.config.retry.max_consecutive_failures {
            return;
        }
        if !self.connectivity.mark_offline(now) {
            return;
        }

        error!(consecutive_failures = failures, "Too many failed requests, going offline");
        self.state.system.offline_mode = true;
        self.state.system.api_connected = false;
        self.render(RenderEvent::Connectivity { online: false });
        self.led(LedCommand::NetworkError).await;

        let uptime = self.state.uptime(now).as_secs();
        let free = self.probe.free_memory();
        let message = format!("{failures} consecutive request failures");
        if let Err(e) = self.api.report_error("connectivity", &message, uptime, free).await {
            debug!(error = %e, "Error report not delivered");
        }
    }

    async fn probe_connectivity(&mut self, now: Instant) {
        let reachable = self.api.health_check().await.is_ok();
        if !self.connectivity.record_check(reachable, now) {
            debug!(next_check = ?self.connectivity.next_check(), "Still offline");
            return;
        }

        self.state.system.offline_mode = false;
        self.state.system.api_connected = true;
        self.render(RenderEvent::Connectivity { online: true });
        self.report_status("online", "connection_restored").await;
        self.show_idle().await;
    }

    // =========================================================================
    // Mode Changes & Output
    // =========================================================================

    /// Server values overwrite local state; every resulting change is shown.
    async fn apply_server_state(&mut self, server: &ServerModeState, source: ModeSource) {
        let changes = self.state.modes.apply_server_state(server, source, now());
        for change in changes {
            self.on_mode_change(change).await;
        }
    }

    async fn on_mode_change(&mut self, change: ModeChange) {
        info!(?change, "Mode changed");
        match change {
            ModeChange::RegistrationStarted { expected_tag_id, .. } => {
                self.render(RenderEvent::RegistrationWaiting {
                    tag_id: expected_tag_id.clone(),
                });
                self.led(LedCommand::RegistrationWaiting {
                    tag_id: expected_tag_id,
                })
                .await;
            }
            ModeChange::RegistrationEnded { reason, .. } => {
                self.render(RenderEvent::RegistrationEnded { reason });
                match reason {
                    ExitReason::TimedOut => self.led(LedCommand::RegistrationTimeout).await,
                    ExitReason::Disabled => self.led(LedCommand::Ready).await,
                    ExitReason::Completed => {}
                }
            }
            ModeChange::ScanModeChanged { enabled, .. } => {
                self.render(RenderEvent::ScanModeChanged { enabled });
                let command = if enabled {
                    LedCommand::Ready
                } else {
                    LedCommand::Status {
                        status: "PAUSED".into(),
                    }
                };
                self.led(command).await;
            }
        }
    }

    /// Keeps the current result up for `result_display`, then idle.
    fn hold_result(&mut self) {
        self.idle_at = Some(now() + self.config.timing.result_display());
    }

    async fn show_idle(&mut self) {
        self.idle_at = None;
        match self.state.modes.expected_tag_id().map(str::to_string) {
            Some(tag_id) => {
                self.render(RenderEvent::RegistrationWaiting {
                    tag_id: tag_id.clone(),
                });
                self.led(LedCommand::RegistrationWaiting { tag_id }).await;
            }
            None => {
                self.render(RenderEvent::Ready);
                self.led(LedCommand::Ready).await;
            }
        }
    }

    fn render(&mut self, event: RenderEvent) {
        self.display.render(&event);
    }

    async fn led(&mut self, command: LedCommand) {
        if let Err(e) = self.led.send(&command).await {
            warn!(command = %command, error = %e, "LED update failed");
        }
    }
}

// =============================================================================
// LED Mapping
// =============================================================================

fn scan_led(classification: &ScanClassification) -> LedCommand {
    match classification {
        ScanClassification::Registered {
            queue_number: Some(number),
            driver,
            ..
        } => LedCommand::Queue {
            number: *number,
            driver: driver.as_ref().map(DriverName::full_name).unwrap_or_default(),
        },
        ScanClassification::Registered { .. } => LedCommand::Status {
            status: "OK".into(),
        },
        ScanClassification::Unregistered { tag_id } => LedCommand::Unregistered {
            tag_id: tag_id.clone(),
        },
        ScanClassification::Unknown { status, .. } => LedCommand::Status {
            status: status.clone(),
        },
        ScanClassification::Rejected { .. } => LedCommand::Status {
            status: "REJECTED".into(),
        },
    }
}

fn error_led(error: &ApiError) -> LedCommand {
    match error {
        ApiError::Network(_) => LedCommand::NetworkError,
        ApiError::Http { .. } | ApiError::Protocol(_) => LedCommand::ServerError,
        ApiError::Validation(_) => LedCommand::Status {
            status: "INVALID".into(),
        },
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`ScanController`].
pub struct ScanControllerBuilder {
    config: KioskConfig,
    api: Option<ApiFacade>,
    display: Option<Box<dyn StatusDisplay>>,
    led: Option<Box<dyn LedMatrix>>,
    probe: Option<Box<dyn SystemProbe>>,
}

impl ScanControllerBuilder {
    pub fn new(config: KioskConfig) -> Self {
        ScanControllerBuilder {
            config,
            api: None,
            display: None,
            led: None,
            probe: None,
        }
    }

    pub fn with_api(mut self, api: ApiFacade) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_display(mut self, display: Box<dyn StatusDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_led(mut self, led: Box<dyn LedMatrix>) -> Self {
        self.led = Some(led);
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn SystemProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Builds the controller. The API facade and system probe are required;
    /// the display defaults to the log and the LED link to a sink.
    pub fn build(self) -> DeviceResult<ScanController> {
        let api = self
            .api
            .ok_or_else(|| DeviceError::InvalidConfig("API facade required".into()))?;
        let probe = self
            .probe
            .ok_or_else(|| DeviceError::InvalidConfig("System probe required".into()))?;
        let display = self.display.unwrap_or_else(|| Box::new(LogDisplay));
        let led = self
            .led
            .unwrap_or_else(|| Box::new(SerialLedMatrix::write_only(tokio::io::sink())));

        let timing = &self.config.timing;
        Ok(ScanController {
            state: DeviceState::new(&self.config, now()),
            debouncer: Debouncer::new(timing.debounce()),
            keypad: KeypadInput::new(timing.key_input_timeout()),
            connectivity: ConnectivityMonitor::new(timing.reconnect_initial(), timing.reconnect_max()),
            idle_at: None,
            config: self.config,
            api,
            display,
            led,
            probe,
        })
    }
}
