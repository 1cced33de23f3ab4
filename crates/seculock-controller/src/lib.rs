//! SecuLock controller crate.
//!
//! This crate contains the two state machines of the locker and the loop
//! that runs them:
//!
//! - [`Authenticator`]: face capture and verification, OTP fallback over
//!   mail, keypad entry and lock actuation.
//! - [`IntrusionMonitor`]: tamper sensor polling, buzzer and alert mail.
//! - [`Controller`]: wake polling, session scheduling and shutdown.
//!
//! Configuration is read from a TOML file into [`ControllerConfig`].

pub mod authenticator;
pub mod config;
pub mod controller;
pub mod messages;
pub mod monitor;
pub mod session;
pub mod state_machine;

pub use authenticator::{
    AuthDevices, AuthSettings, Authenticator, Decision, DenialReason, GrantPath, SessionOutcome,
    WakeSource,
};
pub use config::{ControllerConfig, SMTP_PASSWORD_ENV};
pub use controller::{Controller, ControllerReport, Peripherals};
pub use messages::{DenialNotice, Screen};
pub use monitor::{AlertStatus, IntrusionEvent, IntrusionMonitor, MonitorSettings, MonitorState};
pub use session::{AuthSession, EntryEvent, KeyBuffer};
pub use state_machine::{AuthState, StateMachine, StateMachineBuilder, StateTransition};
