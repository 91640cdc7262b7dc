//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tagsakay_core::{LedCommand, RequestOutcome};

use crate::error::DeviceResult;
use crate::events::RenderEvent;
use crate::peripherals::{LedMatrix, StatusDisplay, SystemProbe};
use crate::transport::{ApiRequest, TransportClient};

/// 200 response with the given JSON body.
pub fn json_ok(body: serde_json::Value) -> RequestOutcome {
    RequestOutcome::success(200, body.to_string(), Duration::ZERO)
}

// =============================================================================
// Scripted Transport
// =============================================================================

#[derive(Default)]
struct Script {
    sequence: VecDeque<RequestOutcome>,
    routes: Vec<(String, VecDeque<RequestOutcome>)>,
    requests: Vec<ApiRequest>,
    call_times: Vec<tokio::time::Instant>,
}

/// Replays canned outcomes and records every request.
///
/// Routes match on path suffix and take priority over the shared sequence.
/// The last outcome of a queue repeats forever.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<RequestOutcome>) -> Arc<Self> {
        let transport = Self::default();
        transport.lock().sequence = outcomes.into();
        Arc::new(transport)
    }

    /// Every call returns `outcome`.
    pub fn failing(outcome: RequestOutcome) -> Arc<Self> {
        Self::new(vec![outcome])
    }

    pub fn set_route(&self, path_suffix: &str, outcomes: Vec<RequestOutcome>) {
        let mut script = self.lock();
        script.routes.retain(|(suffix, _)| suffix != path_suffix);
        script.routes.push((path_suffix.to_string(), outcomes.into()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, path_suffix: &str) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.path.ends_with(path_suffix))
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.lock().call_times.clone()
    }

    pub fn clear_requests(&self) {
        let mut script = self.lock();
        script.requests.clear();
        script.call_times.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

fn next(queue: &mut VecDeque<RequestOutcome>) -> Option<RequestOutcome> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl TransportClient for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> RequestOutcome {
        let mut script = self.lock();
        script.requests.push(request.clone());
        script.call_times.push(tokio::time::Instant::now());

        let routed = script
            .routes
            .iter_mut()
            .find(|(suffix, _)| request.path.ends_with(suffix.as_str()))
            .and_then(|(_, queue)| next(queue));

        routed
            .or_else(|| next(&mut script.sequence))
            .unwrap_or_else(|| RequestOutcome::network_error("no scripted response", Duration::ZERO))
    }
}

// =============================================================================
// Recording Peripherals
// =============================================================================

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingDisplay {
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl StatusDisplay for RecordingDisplay {
    fn render(&mut self, event: &RenderEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingLed {
    commands: Arc<Mutex<Vec<LedCommand>>>,
}

impl RecordingLed {
    pub fn commands(&self) -> Vec<LedCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.commands().iter().map(LedCommand::to_string).collect()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

#[async_trait]
impl LedMatrix for RecordingLed {
    async fn send(&mut self, command: &LedCommand) -> DeviceResult<()> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

pub struct FixedProbe;

impl SystemProbe for FixedProbe {
    fn free_memory(&self) -> u64 {
        64 * 1024
    }

    fn network_connected(&self) -> bool {
        true
    }
}
