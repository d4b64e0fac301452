//! Device session for the air-conditioner LAN protocol.
//!
//! # Components
//!
//! - [`DeviceSession`]: tick-driven state machine that scans, binds and
//!   polls one device, retrying forever on failure
//! - [`SessionHandle`]: runs a session on its own task
//! - [`EventDispatcher`]: weak-reference publish/subscribe used for the
//!   `"params"` event
//! - [`StateMachine`]: transition table and history

pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod state;
pub mod timer;

pub use error::SessionError;
pub use events::{Callback, EventDispatcher};
pub use handle::{SessionHandle, SessionStatus};
pub use session::{DeviceSession, SessionConfig, SessionStats};
pub use state::{SessionState, StateMachine, StateTransition};
pub use timer::RetryTimer;
