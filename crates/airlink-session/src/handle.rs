//! Spawned session runner and the handle consumers hold.
//!
//! ```text
//! ┌───────────────┐  SessionCommand (mpsc)   ┌──────────────────────┐
//! │ SessionHandle │ ───────────────────────> │ runner task          │
//! │               │                          │  select! {           │
//! │  latest()  <──┼── watch <── "params" ────┤    shutdown,         │
//! │  on_params ───┼── EventDispatcher ──────>│    command,          │
//! └───────────────┘                          │    interval.tick()   │
//!                                            │  }                   │
//!                                            └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use airlink_core::{ParameterName, ParameterValue};
//! use airlink_network::UdpTransport;
//! use airlink_session::{SessionConfig, SessionHandle};
//!
//! # async fn example() -> Result<(), airlink_session::SessionError> {
//! let config = SessionConfig::new("192.168.1.50:7000".parse().unwrap());
//! let handle = SessionHandle::spawn(UdpTransport::default(), config);
//!
//! handle.set_param(ParameterName::Power, ParameterValue::Bool(true)).await?;
//!
//! let mut latest = handle.latest();
//! latest.changed().await.ok();
//! println!("{:?}", *latest.borrow());
//!
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::events::{Callback, EventDispatcher};
use crate::session::{DeviceSession, SessionConfig, SessionStats};
use crate::state::SessionState;
use airlink_core::constants::PARAMS_EVENT;
use airlink_core::{DeviceIdentity, ParameterName, ParameterSet, ParameterValue};
use airlink_network::Transport;

/// Capacity of the command channel into the runner.
const COMMAND_CHANNEL_SIZE: usize = 32;

/// Point-in-time view of a running session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub identity: Option<DeviceIdentity>,
    pub bound: bool,
    pub pending_writes: BTreeMap<ParameterName, i64>,
    pub stats: SessionStats,
}

enum SessionCommand {
    SetParam {
        name: ParameterName,
        value: ParameterValue,
        reply: oneshot::Sender<airlink_core::Result<()>>,
    },
    Status(oneshot::Sender<SessionStatus>),
}

/// Handle to a session running on its own task.
///
/// Dropping the handle stops the runner.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: Arc<EventDispatcher<ParameterSet>>,
    latest: watch::Receiver<Option<ParameterSet>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,

    /// Keeps the watch forwarder registered.
    _forwarder: Arc<Callback<ParameterSet>>,
}

impl SessionHandle {
    /// Start a session for `config.address` on a new task.
    pub fn spawn<T: Transport>(transport: T, config: SessionConfig) -> Self {
        let events = Arc::new(EventDispatcher::new());
        let session = DeviceSession::with_events(transport, config, Arc::clone(&events));

        let (latest_tx, latest) = watch::channel(None);
        let forwarder: Arc<Callback<ParameterSet>> = Arc::new(move |params: &ParameterSet| {
            latest_tx.send_replace(Some(params.clone()));
        });
        events.on(PARAMS_EVENT, &forwarder);

        let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(session, command_rx, shutdown.clone()));

        Self {
            commands,
            events,
            latest,
            shutdown,
            task: Some(task),
            _forwarder: forwarder,
        }
    }

    /// Subscribe to `"params"` events. The callback runs on the runner task.
    pub fn on_params(&self, callback: &Arc<Callback<ParameterSet>>) {
        self.events.on(PARAMS_EVENT, callback);
    }

    pub fn off_params(&self, callback: &Arc<Callback<ParameterSet>>) {
        self.events.off(PARAMS_EVENT, callback);
    }

    /// Watch the last published parameters; `None` until the first poll.
    pub fn latest(&self) -> watch::Receiver<Option<ParameterSet>> {
        self.latest.clone()
    }

    /// Queue a parameter write.
    ///
    /// Resolves once the write is queued, not when the device applies it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Invalid` for read-only parameters or
    /// out-of-range values and `SessionError::Stopped` if the runner is gone.
    pub async fn set_param(
        &self,
        name: ParameterName,
        value: ParameterValue,
    ) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::SetParam { name, value, reply })
            .await
            .map_err(|_| SessionError::Stopped)?;

        rx.await.map_err(|_| SessionError::Stopped)??;
        Ok(())
    }

    /// Current state, identity and counters.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Stopped` if the runner is gone.
    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Status(reply))
            .await
            .map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)
    }

    /// Stop ticking and wait for the runner to exit.
    ///
    /// Exchanges and timers already in flight finish on their own and their
    /// results are discarded.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "Session runner did not exit cleanly");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run<T: Transport>(
    mut session: DeviceSession<T>,
    mut commands: mpsc::Receiver<SessionCommand>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(session.config().tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(address = %session.config().address, "Session started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(command) = commands.recv() => handle_command(&mut session, command),
            _ = interval.tick() => session.tick(),
        }
    }

    info!(state = %session.state(), "Session stopped");
}

fn handle_command<T: Transport>(session: &mut DeviceSession<T>, command: SessionCommand) {
    match command {
        SessionCommand::SetParam { name, value, reply } => {
            let result = session.set_param(name, value);
            if let Err(e) = &result {
                debug!(param = %name, error = %e, "Rejected write");
            }
            let _ = reply.send(result);
        }
        SessionCommand::Status(reply) => {
            let _ = reply.send(SessionStatus {
                state: session.state(),
                identity: session.identity().cloned(),
                bound: session.is_bound(),
                pending_writes: session.pending_writes().clone(),
                stats: session.stats(),
            });
        }
    }
}
