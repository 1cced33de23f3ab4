//! Authentication state machine.
//!
//! This module tracks where an authentication session is, from the wake
//! signal through face verification and the OTP fallback to the final
//! grant or denial, and refuses any transition the flow does not allow.
//!
//! # States
//!
//! - `Idle`: waiting for a wake signal
//! - `Capturing`: taking a frame with the camera
//! - `FaceVerifying`: comparing the frame against the owner's reference
//! - `OtpIssuing`: generating and mailing a one-time password
//! - `OtpAwaitingInput`: collecting keypad digits
//! - `OtpRetry`: a wrong code was entered and attempts remain
//! - `Granted`: the lock is open for the hold period
//! - `Denied`: access refused, intruder alert dispatched
//!
//! # Valid Transitions
//!
//! - Idle → Capturing → FaceVerifying → Granted/OtpIssuing
//! - OtpIssuing → OtpAwaitingInput/Denied
//! - OtpAwaitingInput → Granted/OtpRetry/Denied
//! - OtpRetry → OtpAwaitingInput
//! - Granted → Idle, Denied → Idle
//!
//! # Examples
//!
//! ```
//! use seculock_controller::{AuthState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), &AuthState::Idle);
//!
//! machine.transition_to(AuthState::Capturing).unwrap();
//! assert_eq!(machine.current_state(), &AuthState::Capturing);
//!
//! // The face has not been checked yet
//! assert!(machine.transition_to(AuthState::Granted).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use seculock_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// A session through the OTP path with two retries takes about ten
/// transitions, so the history covers the last several sessions.
pub const MAX_HISTORY_SIZE: usize = 100;

/// All states of an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Waiting for a keypad press or the wake button.
    Idle,

    /// Capturing a frame from the camera.
    Capturing,

    /// Running face detection and comparison on the captured frame.
    FaceVerifying,

    /// Issuing and mailing a one-time password.
    OtpIssuing,

    /// Collecting keypad digits for the outstanding OTP.
    OtpAwaitingInput,

    /// The last code was wrong and attempts remain.
    OtpRetry,

    /// Access granted, lock relay energised for the hold period.
    Granted,

    /// Access denied, intruder alert dispatched.
    Denied,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            AuthState::Idle => "Idle",
            AuthState::Capturing => "Capturing",
            AuthState::FaceVerifying => "FaceVerifying",
            AuthState::OtpIssuing => "OtpIssuing",
            AuthState::OtpAwaitingInput => "OtpAwaitingInput",
            AuthState::OtpRetry => "OtpRetry",
            AuthState::Granted => "Granted",
            AuthState::Denied => "Denied",
        };
        write!(f, "{}", state_str)
    }
}

impl AuthState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use seculock_controller::AuthState;
    ///
    /// assert!(AuthState::FaceVerifying.can_transition_to(&AuthState::OtpIssuing));
    /// assert!(!AuthState::Idle.can_transition_to(&AuthState::Granted));
    /// ```
    pub fn can_transition_to(&self, target: &AuthState) -> bool {
        matches!(
            (self, target),
            // From Idle
            (AuthState::Idle, AuthState::Capturing)
            // From Capturing
            | (AuthState::Capturing, AuthState::FaceVerifying)
            // From FaceVerifying
            | (AuthState::FaceVerifying, AuthState::Granted | AuthState::OtpIssuing)
            // From OtpIssuing
            | (AuthState::OtpIssuing, AuthState::OtpAwaitingInput | AuthState::Denied)
            // From OtpAwaitingInput
            | (AuthState::OtpAwaitingInput, AuthState::Granted | AuthState::OtpRetry | AuthState::Denied)
            // From OtpRetry
            | (AuthState::OtpRetry, AuthState::OtpAwaitingInput)
            // Terminal states
            | (AuthState::Granted | AuthState::Denied, AuthState::Idle)
        )
    }

    /// Whether a session ends in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Granted | AuthState::Denied)
    }
}

/// Represents a single state transition with timestamp.
///
/// # Serialization Note
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
/// When deserializing, the timestamp will be set to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: AuthState,

    /// The state transitioned to.
    pub to: AuthState,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    /// Create a new state transition record stamped with the current time.
    pub fn new(from: AuthState, to: AuthState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// State machine for one authenticator.
///
/// Enforces the transition table and keeps a bounded history of recent
/// transitions for diagnostics.
///
/// # Thread Safety
///
/// This struct is not thread-safe. It is owned by the
/// [`Authenticator`](crate::Authenticator) that drives it.
///
/// # Examples
///
/// ```
/// use seculock_controller::{AuthState, StateMachine};
///
/// let mut machine = StateMachine::new();
///
/// machine.transition_to(AuthState::Capturing).unwrap();
/// machine.transition_to(AuthState::FaceVerifying).unwrap();
/// machine.transition_to(AuthState::Granted).unwrap();
/// machine.transition_to(AuthState::Idle).unwrap();
///
/// assert_eq!(machine.history().len(), 4);
/// ```
#[derive(Debug)]
pub struct StateMachine {
    /// Current state of the session.
    current_state: AuthState,

    /// When the current state was entered.
    state_entered_at: Instant,

    /// History of state transitions (limited to MAX_HISTORY_SIZE).
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current_state: AuthState::Idle,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Create a builder for constructing a state machine with custom configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use seculock_controller::{AuthState, StateMachine};
    ///
    /// let machine = StateMachine::builder()
    ///     .with_initial_state(AuthState::OtpAwaitingInput)
    ///     .build();
    ///
    /// assert_eq!(machine.current_state(), &AuthState::OtpAwaitingInput);
    /// ```
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::default()
    }

    /// Get the current state of the machine.
    pub fn current_state(&self) -> &AuthState {
        &self.current_state
    }

    /// Get the time elapsed in the current state.
    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition table does
    /// not allow moving from the current state to `new_state`. The machine
    /// is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use seculock_controller::{AuthState, StateMachine};
    ///
    /// let mut machine = StateMachine::new();
    ///
    /// let transition = machine.transition_to(AuthState::Capturing).unwrap();
    /// assert_eq!(transition.from, AuthState::Idle);
    /// assert_eq!(transition.to, AuthState::Capturing);
    ///
    /// assert!(machine.transition_to(AuthState::OtpRetry).is_err());
    /// ```
    pub fn transition_to(&mut self, new_state: AuthState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());

        Ok(transition)
    }

    /// Reset the state machine to Idle state.
    ///
    /// This forcefully resets the machine to Idle regardless of current state.
    /// Used after an invalid transition or an aborted session.
    pub fn reset(&mut self) -> StateTransition {
        let transition = StateTransition::new(self.current_state, AuthState::Idle);
        self.perform_state_change(AuthState::Idle, transition.clone());
        transition
    }

    fn perform_state_change(&mut self, new_state: AuthState, transition: StateTransition) {
        self.current_state = new_state;
        self.state_entered_at = Instant::now();

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

/// Builder for constructing `StateMachine` instances with custom configuration.
#[derive(Debug)]
pub struct StateMachineBuilder {
    initial_state: AuthState,
    history: VecDeque<StateTransition>,
}

impl StateMachineBuilder {
    /// Set the initial state for the machine.
    pub fn with_initial_state(mut self, state: AuthState) -> Self {
        self.initial_state = state;
        self
    }

    /// Set pre-populated history for the machine.
    pub fn with_history(mut self, history: VecDeque<StateTransition>) -> Self {
        self.history = history;
        self
    }

    /// Build the state machine with configured parameters.
    pub fn build(self) -> StateMachine {
        StateMachine {
            current_state: self.initial_state,
            state_entered_at: Instant::now(),
            history: self.history,
        }
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self {
            initial_state: AuthState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL_STATES: [AuthState; 8] = [
        AuthState::Idle,
        AuthState::Capturing,
        AuthState::FaceVerifying,
        AuthState::OtpIssuing,
        AuthState::OtpAwaitingInput,
        AuthState::OtpRetry,
        AuthState::Granted,
        AuthState::Denied,
    ];

    fn walk(machine: &mut StateMachine, states: &[AuthState]) {
        for state in states {
            machine.transition_to(*state).unwrap();
        }
    }

    #[test]
    fn test_new_machine_starts_idle() {
        let machine = StateMachine::new();
        assert_eq!(machine.current_state(), &AuthState::Idle);
        assert_eq!(machine.history().len(), 0);
    }

    #[test]
    fn test_face_match_flow() {
        let mut machine = StateMachine::new();
        walk(
            &mut machine,
            &[
                AuthState::Capturing,
                AuthState::FaceVerifying,
                AuthState::Granted,
                AuthState::Idle,
            ],
        );

        assert_eq!(machine.current_state(), &AuthState::Idle);
        assert_eq!(machine.history().len(), 4);
    }

    #[test]
    fn test_otp_flow_with_retry() {
        let mut machine = StateMachine::new();
        walk(
            &mut machine,
            &[
                AuthState::Capturing,
                AuthState::FaceVerifying,
                AuthState::OtpIssuing,
                AuthState::OtpAwaitingInput,
                AuthState::OtpRetry,
                AuthState::OtpAwaitingInput,
                AuthState::Granted,
                AuthState::Idle,
            ],
        );

        let states: Vec<AuthState> = machine.history().iter().map(|t| t.to).collect();
        assert_eq!(states[4], AuthState::OtpRetry);
        assert_eq!(machine.current_state(), &AuthState::Idle);
    }

    #[test]
    fn test_delivery_failure_flow() {
        let mut machine = StateMachine::new();
        walk(
            &mut machine,
            &[
                AuthState::Capturing,
                AuthState::FaceVerifying,
                AuthState::OtpIssuing,
                AuthState::Denied,
                AuthState::Idle,
            ],
        );
        assert_eq!(machine.current_state(), &AuthState::Idle);
    }

    #[rstest]
    #[case(AuthState::Idle, AuthState::Granted)]
    #[case(AuthState::Idle, AuthState::OtpIssuing)]
    #[case(AuthState::Capturing, AuthState::Granted)]
    #[case(AuthState::FaceVerifying, AuthState::Denied)]
    #[case(AuthState::OtpRetry, AuthState::Granted)]
    #[case(AuthState::Granted, AuthState::Capturing)]
    #[case(AuthState::Denied, AuthState::OtpIssuing)]
    fn test_invalid_transition_leaves_state(#[case] from: AuthState, #[case] to: AuthState) {
        let mut machine = StateMachine::builder().with_initial_state(from).build();

        let result = machine.transition_to(to);

        assert!(matches!(
            result,
            Err(Error::InvalidStateTransition { .. })
        ));
        assert_eq!(machine.current_state(), &from);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_every_non_idle_state_reaches_a_terminal_state() {
        for state in ALL_STATES.iter().filter(|s| **s != AuthState::Idle) {
            let mut current = *state;
            let mut steps = 0;
            while !current.is_terminal() {
                current = ALL_STATES
                    .iter()
                    .copied()
                    .find(|next| current.can_transition_to(next) && *next != AuthState::OtpRetry)
                    .unwrap_or_else(|| panic!("{current} has no way forward"));
                steps += 1;
                assert!(steps < ALL_STATES.len(), "no path to a terminal state from {state}");
            }
        }
    }

    #[test]
    fn test_terminal_states_only_return_to_idle() {
        for terminal in [AuthState::Granted, AuthState::Denied] {
            let targets: Vec<_> = ALL_STATES
                .iter()
                .filter(|s| terminal.can_transition_to(s))
                .collect();
            assert_eq!(targets, vec![&AuthState::Idle]);
        }
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut machine = StateMachine::builder()
            .with_initial_state(AuthState::OtpAwaitingInput)
            .build();

        let transition = machine.reset();

        assert_eq!(transition.from, AuthState::OtpAwaitingInput);
        assert_eq!(transition.to, AuthState::Idle);
        assert_eq!(machine.current_state(), &AuthState::Idle);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn test_history_size_limit() {
        let mut machine = StateMachine::new();

        for _ in 0..50 {
            walk(
                &mut machine,
                &[
                    AuthState::Capturing,
                    AuthState::FaceVerifying,
                    AuthState::Granted,
                    AuthState::Idle,
                ],
            );
        }

        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(machine.history().back().unwrap().to, AuthState::Idle);
    }

    #[test]
    fn test_last_transitions() {
        let mut machine = StateMachine::new();
        walk(
            &mut machine,
            &[AuthState::Capturing, AuthState::FaceVerifying, AuthState::OtpIssuing],
        );

        let last = machine.last_transitions(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].to, AuthState::FaceVerifying);
        assert_eq!(last[1].to, AuthState::OtpIssuing);
        assert_eq!(machine.last_transitions(10).len(), 3);
    }

    #[test]
    fn test_builder_with_history() {
        let mut history = VecDeque::new();
        history.push_back(StateTransition::new(AuthState::Idle, AuthState::Capturing));

        let machine = StateMachine::builder()
            .with_initial_state(AuthState::Capturing)
            .with_history(history)
            .build();

        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.current_state(), &AuthState::Capturing);
    }

    #[test]
    fn test_state_serialization() {
        let serialized = serde_json::to_string(&AuthState::OtpAwaitingInput).unwrap();
        assert_eq!(serialized, "\"otp_awaiting_input\"");

        let deserialized: AuthState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, AuthState::OtpAwaitingInput);
    }

    #[test]
    fn test_transition_serialization() {
        let transition = StateTransition::new(AuthState::FaceVerifying, AuthState::OtpIssuing);
        let serialized = serde_json::to_string(&transition).unwrap();

        assert!(serialized.contains("\"face_verifying\""));
        assert!(serialized.contains("\"otp_issuing\""));

        let deserialized: StateTransition = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.from, AuthState::FaceVerifying);
        assert_eq!(deserialized.to, AuthState::OtpIssuing);
    }
}
