//! The device session: discovery, binding and polling driven by ticks.
//!
//! # Architecture
//!
//! ```text
//! tick() ──> drain outcomes ──> act on state
//!               ▲                    │
//!               │ mpsc               ├─> spawn exchange (Transport::send)
//!               │                    └─> arm RetryTimer
//!               └───── exchange / timer tasks report back
//! ```
//!
//! All session state is mutated inside [`DeviceSession::tick`] and
//! [`DeviceSession::set_param`]. Exchanges and timers run as separate tasks
//! and only ever send an [`Outcome`] back, which the next tick applies. At
//! most one exchange and one retry timer exist at any time; both carry a
//! generation number so a stale outcome is recognised and dropped.
//!
//! # Write Policy
//!
//! Writes are validated immediately and kept last-write-wins per parameter.
//! They are delivered on the next entry to `GettingDeviceStatus` once bound,
//! ahead of that cycle's status poll. A failed delivery puts the values back
//! unless a newer write for the same parameter arrived in the meantime.
//!
//! # Example
//!
//! ```no_run
//! use airlink_network::UdpTransport;
//! use airlink_session::{DeviceSession, SessionConfig};
//!
//! # async fn example() {
//! let config = SessionConfig::new("192.168.1.50:7000".parse().unwrap());
//! let mut session = DeviceSession::new(UdpTransport::default(), config);
//!
//! let mut interval = tokio::time::interval(session.config().tick_interval);
//! loop {
//!     interval.tick().await;
//!     session.tick();
//! }
//! # }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::events::{Callback, EventDispatcher};
use crate::state::{SessionState, StateMachine, StateTransition};
use crate::timer::RetryTimer;
use airlink_core::constants::{DEFAULT_RETRY_DELAY_MS, DEFAULT_TICK_INTERVAL_MS, PARAMS_EVENT};
use airlink_core::{DeviceIdentity, ParameterName, ParameterSet, ParameterValue, SessionKey};
use airlink_network::{Transport, TransportError};
use airlink_protocol::{
    Envelope, bind_request, command_request, parse_bind_reply, parse_command_reply,
    parse_scan_reply, parse_status_reply, scan_request, status_request,
};

/// Timing and addressing for one device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device address; scan, bind and polls all go here
    pub address: SocketAddr,

    /// How often the runner calls [`DeviceSession::tick`]
    pub tick_interval: Duration,

    /// Delay before retrying a failed scan or bind, and between polls
    pub retry_delay: Duration,
}

impl SessionConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub exchanges_started: u64,
    pub timers_armed: u64,
    pub params_published: u64,
    pub commands_delivered: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeKind {
    Scan,
    Bind,
    Status,
    Command,
}

#[derive(Debug)]
struct InFlight {
    kind: ExchangeKind,
    generation: u64,
    /// Writes carried by a command exchange, re-queued if it fails.
    writes: Vec<(ParameterName, i64)>,
}

/// Completion report from an exchange or timer task.
#[derive(Debug)]
enum Outcome {
    Exchange {
        generation: u64,
        reply: Result<Option<Envelope>, TransportError>,
    },
    TimerFired {
        generation: u64,
    },
}

/// State machine for one air conditioner.
pub struct DeviceSession<T: Transport> {
    config: SessionConfig,
    transport: Arc<T>,
    machine: StateMachine,

    identity: Option<DeviceIdentity>,
    key: Option<SessionKey>,
    params: Option<ParameterSet>,
    pending_writes: BTreeMap<ParameterName, i64>,

    in_flight: Option<InFlight>,
    timer: Option<RetryTimer>,
    generation: u64,

    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,

    events: Arc<EventDispatcher<ParameterSet>>,
    stats: SessionStats,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self::with_events(transport, config, Arc::new(EventDispatcher::new()))
    }

    /// Create a session that publishes into an existing dispatcher.
    pub fn with_events(
        transport: T,
        config: SessionConfig,
        events: Arc<EventDispatcher<ParameterSet>>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        info!(address = %config.address, "Creating device session");

        Self {
            config,
            transport: Arc::new(transport),
            machine: StateMachine::new(),
            identity: None,
            key: None,
            params: None,
            pending_writes: BTreeMap::new(),
            in_flight: None,
            timer: None,
            generation: 0,
            outcome_tx,
            outcome_rx,
            events,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.key.is_some()
    }

    /// Last successfully polled parameters.
    pub fn params(&self) -> Option<&ParameterSet> {
        self.params.as_ref()
    }

    pub fn pending_writes(&self) -> &BTreeMap<ParameterName, i64> {
        &self.pending_writes
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn has_exchange_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn events(&self) -> &Arc<EventDispatcher<ParameterSet>> {
        &self.events
    }

    /// Subscribe to `"params"` events.
    pub fn on_params(&self, callback: &Arc<Callback<ParameterSet>>) {
        self.events.on(PARAMS_EVENT, callback);
    }

    pub fn off_params(&self, callback: &Arc<Callback<ParameterSet>>) {
        self.events.off(PARAMS_EVENT, callback);
    }

    /// Queue a parameter write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is read-only or the value is out of
    /// range. Nothing is queued in that case.
    pub fn set_param(
        &mut self,
        name: ParameterName,
        value: ParameterValue,
    ) -> airlink_core::Result<()> {
        let raw = name.encode(value)?;
        debug!(param = %name, raw, state = %self.state(), "Queued write");
        self.pending_writes.insert(name, raw);
        Ok(())
    }

    /// Advance the session by one step.
    ///
    /// Applies every exchange and timer outcome that arrived since the last
    /// tick, then performs the action for the resulting state. Must be
    /// called from within a Tokio runtime.
    pub fn tick(&mut self) {
        self.stats.ticks += 1;

        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply(outcome);
        }

        self.step();
    }

    fn step(&mut self) {
        match self.state() {
            SessionState::Idle => {
                self.identity = None;
                self.key = None;
                self.timer = None;

                self.transition(SessionState::WaitScanResult);
                self.start_exchange(ExchangeKind::Scan, Ok(scan_request()), Vec::new());
            }
            SessionState::DeviceFound => {
                self.key = None;
                self.timer = None;

                let Some(identity) = &self.identity else {
                    warn!("Device found without identity, rescanning");
                    self.transition(SessionState::Idle);
                    return;
                };
                let request = bind_request(&identity.cid);

                self.transition(SessionState::WaitBindResult);
                self.start_exchange(ExchangeKind::Bind, Ok(request), Vec::new());
            }
            SessionState::DeviceBound => {
                self.transition(SessionState::GettingDeviceStatus);
            }
            SessionState::GettingDeviceStatus => {
                self.timer = None;

                let (Some(identity), Some(key)) = (&self.identity, &self.key) else {
                    error!("Polling without a bound device, resetting");
                    self.reset();
                    return;
                };

                if self.pending_writes.is_empty() {
                    let request = status_request(&identity.cid, key, &ParameterName::ALL);
                    self.transition(SessionState::WaitDeviceStatusResult);
                    self.start_exchange(ExchangeKind::Status, request, Vec::new());
                } else {
                    let writes: Vec<_> = std::mem::take(&mut self.pending_writes)
                        .into_iter()
                        .collect();
                    let request = command_request(&identity.cid, key, &writes);
                    self.transition(SessionState::WaitCommandResult);
                    self.start_exchange(ExchangeKind::Command, request, writes);
                }
            }
            SessionState::WaitNextScan
            | SessionState::WaitNextBind
            | SessionState::WaitNextDeviceStatus => self.arm_retry_timer(),
            SessionState::WaitScanResult
            | SessionState::WaitBindResult
            | SessionState::WaitDeviceStatusResult
            | SessionState::WaitCommandResult => {}
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TimerFired { generation } => self.on_timer_fired(generation),
            Outcome::Exchange { generation, reply } => {
                let in_flight = match self.in_flight.take() {
                    Some(in_flight) if in_flight.generation == generation => in_flight,
                    other => {
                        trace!(generation, "Discarding stale exchange outcome");
                        self.in_flight = other;
                        return;
                    }
                };
                self.on_exchange_complete(in_flight, reply);
            }
        }
    }

    fn on_timer_fired(&mut self, generation: u64) {
        if self.timer.as_ref().map(RetryTimer::generation) != Some(generation) {
            trace!(generation, "Discarding stale timer");
            return;
        }
        self.timer = None;

        let next = match self.state() {
            SessionState::WaitNextScan => SessionState::Idle,
            SessionState::WaitNextBind => SessionState::DeviceFound,
            SessionState::WaitNextDeviceStatus => SessionState::GettingDeviceStatus,
            state => {
                trace!(%state, "Timer fired outside a retry wait");
                return;
            }
        };
        self.transition(next);
    }

    fn on_exchange_complete(
        &mut self,
        in_flight: InFlight,
        reply: Result<Option<Envelope>, TransportError>,
    ) {
        let reply = match reply {
            Ok(Some(envelope)) => Some(envelope),
            Ok(None) => {
                debug!(kind = ?in_flight.kind, "No reply");
                None
            }
            Err(e) => {
                warn!(kind = ?in_flight.kind, error = %e, "Exchange failed");
                None
            }
        };

        match in_flight.kind {
            ExchangeKind::Scan => self.on_scan_reply(reply),
            ExchangeKind::Bind => self.on_bind_reply(reply),
            ExchangeKind::Status => self.on_status_reply(reply),
            ExchangeKind::Command => self.on_command_reply(reply, in_flight.writes),
        }
    }

    fn on_scan_reply(&mut self, reply: Option<Envelope>) {
        let identity = reply.map(|envelope| parse_scan_reply(&envelope, self.config.address));

        match identity {
            Some(Ok(identity)) => {
                info!(device = %identity, "Device found");
                self.identity = Some(identity);
                self.transition(SessionState::DeviceFound);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Invalid scan reply");
                self.transition(SessionState::WaitNextScan);
            }
            None => self.transition(SessionState::WaitNextScan),
        }
    }

    fn on_bind_reply(&mut self, reply: Option<Envelope>) {
        match reply.map(|envelope| parse_bind_reply(&envelope)) {
            Some(Ok(key)) => {
                info!(address = %self.config.address, "Device bound");
                self.key = Some(key);
                self.transition(SessionState::DeviceBound);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Invalid bind reply");
                self.transition(SessionState::WaitNextBind);
            }
            None => self.transition(SessionState::WaitNextBind),
        }
    }

    fn on_status_reply(&mut self, reply: Option<Envelope>) {
        let parsed = match (reply, &self.key) {
            (Some(envelope), Some(key)) => Some(parse_status_reply(&envelope, key)),
            _ => None,
        };

        match parsed {
            Some(Ok(params)) => {
                trace!(count = params.len(), "Status received");
                let delivered = self.events.dispatch(PARAMS_EVENT, &params);
                debug!(listeners = delivered, "Published params");
                self.params = Some(params);
                self.stats.params_published += 1;
                self.transition(SessionState::WaitNextDeviceStatus);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Invalid status reply, rebinding");
                self.transition(SessionState::Idle);
            }
            None => {
                warn!("No status reply, rebinding");
                self.transition(SessionState::Idle);
            }
        }
    }

    fn on_command_reply(&mut self, reply: Option<Envelope>, writes: Vec<(ParameterName, i64)>) {
        let parsed = match (reply, &self.key) {
            (Some(envelope), Some(key)) => Some(parse_command_reply(&envelope, key)),
            _ => None,
        };

        match parsed {
            Some(Ok(_)) => {
                debug!(count = writes.len(), "Command accepted");
                self.stats.commands_delivered += 1;
                self.transition(SessionState::GettingDeviceStatus);
            }
            failure => {
                if let Some(Err(e)) = failure {
                    warn!(error = %e, "Command rejected");
                } else {
                    warn!("No command reply");
                }
                for (name, raw) in writes {
                    self.pending_writes.entry(name).or_insert(raw);
                }
                self.transition(SessionState::Idle);
            }
        }
    }

    fn start_exchange(
        &mut self,
        kind: ExchangeKind,
        request: airlink_core::Result<Envelope>,
        writes: Vec<(ParameterName, i64)>,
    ) {
        if let Some(in_flight) = &self.in_flight {
            error!(
                current = ?in_flight.kind,
                rejected = ?kind,
                "Exchange already in flight, not starting another"
            );
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        self.in_flight = Some(InFlight {
            kind,
            generation,
            writes,
        });
        self.stats.exchanges_started += 1;

        let tx = self.outcome_tx.clone();
        match request {
            Ok(envelope) => {
                let transport = Arc::clone(&self.transport);
                let addr = self.config.address;
                trace!(?kind, generation, %addr, "Starting exchange");

                tokio::spawn(async move {
                    let reply = transport.send(envelope, addr).await;
                    // Fails only once the session is gone.
                    let _ = tx.send(Outcome::Exchange { generation, reply });
                });
            }
            Err(e) => {
                let _ = tx.send(Outcome::Exchange {
                    generation,
                    reply: Err(e.into()),
                });
            }
        }
    }

    fn arm_retry_timer(&mut self) {
        if self.timer.is_some() {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let tx = self.outcome_tx.clone();

        trace!(generation, state = %self.state(), "Arming retry timer");
        self.timer = Some(RetryTimer::arm(generation, self.config.retry_delay, move || {
            let _ = tx.send(Outcome::TimerFired { generation });
        }));
        self.stats.timers_armed += 1;
    }

    fn transition(&mut self, next: SessionState) {
        match self.machine.transition_to(next) {
            Ok(transition) => debug!(from = %transition.from, to = %transition.to, "Transition"),
            Err(e) => {
                error!(error = %e, "Rejected transition, resetting session");
                self.reset();
            }
        }
    }

    fn reset(&mut self) {
        self.machine.reset();
        self.in_flight = None;
        self.timer = None;
        self.identity = None;
        self.key = None;
    }
}

impl<T: Transport> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.config.address)
            .field("state", &self.state())
            .field("bound", &self.is_bound())
            .field("pending_writes", &self.pending_writes)
            .finish_non_exhaustive()
    }
}
