//! Session state machine.
//!
//! The session walks discovery, binding and polling as a single enumerated
//! state. [`SessionState::can_transition_to`] is the transition table;
//! [`StateMachine`] enforces it and keeps a bounded history.
//!
//! # Valid Transitions
//!
//! ```text
//! Idle → WaitScanResult → DeviceFound | WaitNextScan
//! WaitNextScan → Idle
//! DeviceFound → WaitBindResult | Idle
//! WaitBindResult → DeviceBound | WaitNextBind
//! WaitNextBind → DeviceFound
//! DeviceBound → GettingDeviceStatus
//! GettingDeviceStatus → WaitDeviceStatusResult | WaitCommandResult
//! WaitDeviceStatusResult → WaitNextDeviceStatus | Idle
//! WaitCommandResult → GettingDeviceStatus | Idle
//! WaitNextDeviceStatus → GettingDeviceStatus
//! ```
//!
//! [`StateMachine::reset`] returns to `Idle` from anywhere.
//!
//! # Examples
//!
//! ```
//! use airlink_session::{SessionState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(SessionState::WaitScanResult).unwrap();
//! assert!(machine.transition_to(SessionState::DeviceBound).is_err());
//! assert_eq!(machine.current_state(), SessionState::WaitScanResult);
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use airlink_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// One full poll cycle is three transitions, so this covers well over a
/// minute of steady-state polling.
const MAX_HISTORY_SIZE: usize = 100;

/// Every state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Unbound; the next tick clears the session and scans.
    Idle,

    /// Scan request in flight.
    WaitScanResult,

    /// Device answered the scan; the next tick binds.
    DeviceFound,

    /// Bind request in flight.
    WaitBindResult,

    /// Session key obtained.
    DeviceBound,

    /// The next tick sends pending writes or polls status.
    GettingDeviceStatus,

    /// Status request in flight.
    WaitDeviceStatusResult,

    /// Command request in flight.
    WaitCommandResult,

    /// Scan failed; waiting for the retry timer.
    WaitNextScan,

    /// Bind failed; waiting for the retry timer.
    WaitNextBind,

    /// Poll succeeded; waiting for the next poll.
    WaitNextDeviceStatus,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Idle => "IDLE",
            SessionState::WaitScanResult => "WAIT_SCAN_RESULT",
            SessionState::DeviceFound => "DEVICE_FOUND",
            SessionState::WaitBindResult => "WAIT_BIND_RESULT",
            SessionState::DeviceBound => "DEVICE_BOUND",
            SessionState::GettingDeviceStatus => "GETTING_DEVICE_STATUS",
            SessionState::WaitDeviceStatusResult => "WAIT_DEVICE_STATUS_RESULT",
            SessionState::WaitCommandResult => "WAIT_COMMAND_RESULT",
            SessionState::WaitNextScan => "WAIT_NEXT_SCAN",
            SessionState::WaitNextBind => "WAIT_NEXT_BIND",
            SessionState::WaitNextDeviceStatus => "WAIT_NEXT_DEVICE_STATUS",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use airlink_session::SessionState;
    ///
    /// assert!(SessionState::Idle.can_transition_to(&SessionState::WaitScanResult));
    /// assert!(!SessionState::Idle.can_transition_to(&SessionState::DeviceBound));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, target),
            (Idle, WaitScanResult)
                | (WaitScanResult, DeviceFound | WaitNextScan)
                | (WaitNextScan, Idle)
                | (DeviceFound, WaitBindResult | Idle)
                | (WaitBindResult, DeviceBound | WaitNextBind)
                | (WaitNextBind, DeviceFound)
                | (DeviceBound, GettingDeviceStatus)
                | (GettingDeviceStatus, WaitDeviceStatusResult | WaitCommandResult)
                | (WaitDeviceStatusResult, WaitNextDeviceStatus | Idle)
                | (WaitCommandResult, GettingDeviceStatus | Idle)
                | (WaitNextDeviceStatus, GettingDeviceStatus)
        )
    }

    /// States in which an exchange is outstanding.
    pub fn is_waiting_for_reply(&self) -> bool {
        matches!(
            self,
            SessionState::WaitScanResult
                | SessionState::WaitBindResult
                | SessionState::WaitDeviceStatusResult
                | SessionState::WaitCommandResult
        )
    }

    /// States that arm a retry timer and leave when it fires.
    pub fn is_retry_wait(&self) -> bool {
        matches!(
            self,
            SessionState::WaitNextScan
                | SessionState::WaitNextBind
                | SessionState::WaitNextDeviceStatus
        )
    }

    /// Whether a session key is held in this state.
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            SessionState::DeviceBound
                | SessionState::GettingDeviceStatus
                | SessionState::WaitDeviceStatusResult
                | SessionState::WaitCommandResult
                | SessionState::WaitNextDeviceStatus
        )
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self { from, to }
    }
}

/// Enforces the transition table and records recent transitions.
///
/// Not thread-safe; owned by a single session.
#[derive(Debug)]
pub struct StateMachine {
    current_state: SessionState,

    /// Oldest first, at most `MAX_HISTORY_SIZE` entries.
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a machine in the `Idle` state.
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).copied().collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not in
    /// the table. The current state is left unchanged.
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition);
        Ok(transition)
    }

    /// Force the machine back to `Idle`, recording the jump.
    pub fn reset(&mut self) -> StateTransition {
        let transition = StateTransition::new(self.current_state, SessionState::Idle);
        self.perform_state_change(SessionState::Idle, transition);
        transition
    }

    fn perform_state_change(&mut self, new_state: SessionState, transition: StateTransition) {
        self.current_state = new_state;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL_STATES: [SessionState; 11] = [
        SessionState::Idle,
        SessionState::WaitScanResult,
        SessionState::DeviceFound,
        SessionState::WaitBindResult,
        SessionState::DeviceBound,
        SessionState::GettingDeviceStatus,
        SessionState::WaitDeviceStatusResult,
        SessionState::WaitCommandResult,
        SessionState::WaitNextScan,
        SessionState::WaitNextBind,
        SessionState::WaitNextDeviceStatus,
    ];

    #[test]
    fn test_new_machine_starts_idle() {
        let machine = StateMachine::new();
        assert_eq!(machine.current_state(), SessionState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_happy_path_to_polling() {
        let mut machine = StateMachine::new();
        for state in [
            SessionState::WaitScanResult,
            SessionState::DeviceFound,
            SessionState::WaitBindResult,
            SessionState::DeviceBound,
            SessionState::GettingDeviceStatus,
            SessionState::WaitDeviceStatusResult,
            SessionState::WaitNextDeviceStatus,
            SessionState::GettingDeviceStatus,
        ] {
            machine.transition_to(state).unwrap();
        }

        assert_eq!(machine.current_state(), SessionState::GettingDeviceStatus);
        assert_eq!(machine.history().len(), 8);
        assert_eq!(machine.history()[0].from, SessionState::Idle);
    }

    #[rstest]
    #[case(SessionState::Idle, SessionState::DeviceFound)]
    #[case(SessionState::WaitScanResult, SessionState::DeviceBound)]
    #[case(SessionState::WaitNextBind, SessionState::Idle)]
    #[case(SessionState::WaitNextDeviceStatus, SessionState::Idle)]
    #[case(SessionState::DeviceBound, SessionState::WaitDeviceStatusResult)]
    fn test_invalid_transitions(#[case] from: SessionState, #[case] to: SessionState) {
        assert!(!from.can_transition_to(&to));
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut machine = StateMachine::new();
        let result = machine.transition_to(SessionState::DeviceBound);

        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
        assert_eq!(machine.current_state(), SessionState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_no_state_transitions_to_itself() {
        for state in ALL_STATES {
            assert!(!state.can_transition_to(&state), "{state} loops to itself");
        }
    }

    #[test]
    fn test_every_state_has_an_exit() {
        for state in ALL_STATES {
            assert!(
                ALL_STATES.iter().any(|target| state.can_transition_to(target)),
                "{state} is terminal"
            );
        }
    }

    #[test]
    fn test_state_classes_are_disjoint() {
        for state in ALL_STATES {
            assert!(!(state.is_waiting_for_reply() && state.is_retry_wait()));
        }
    }

    #[test]
    fn test_reset_from_anywhere() {
        let mut machine = StateMachine::new();
        machine.transition_to(SessionState::WaitScanResult).unwrap();
        machine.transition_to(SessionState::WaitNextScan).unwrap();

        let transition = machine.reset();
        assert_eq!(transition.from, SessionState::WaitNextScan);
        assert_eq!(transition.to, SessionState::Idle);
        assert_eq!(machine.current_state(), SessionState::Idle);
        assert_eq!(machine.history().len(), 3);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = StateMachine::new();
        for _ in 0..60 {
            machine.transition_to(SessionState::WaitScanResult).unwrap();
            machine.transition_to(SessionState::WaitNextScan).unwrap();
            machine.transition_to(SessionState::Idle).unwrap();
        }

        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
        let last = machine.last_transitions(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].to, SessionState::Idle);
    }

    #[test]
    fn test_display_uses_protocol_names() {
        assert_eq!(
            SessionState::WaitDeviceStatusResult.to_string(),
            "WAIT_DEVICE_STATUS_RESULT"
        );
    }
}
