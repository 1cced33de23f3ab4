//! Face-then-OTP authentication sessions.
//!
//! An [`Authenticator`] owns the camera, keypad, face verifier, OTP service
//! and lock relay, and drives one [`AuthSession`] at a time through the
//! [`StateMachine`]. Peripheral failures never escape a session: each is
//! logged and mapped onto the transition the flow takes on failure, so every
//! session ends `Granted` or `Denied` and returns to `Idle`.

use crate::messages::{DenialNotice, Screen, render};
use crate::session::{AuthSession, EntryEvent};
use crate::state_machine::{AuthState, StateMachine};
use chrono::{DateTime, Utc};
use image::RgbImage;
use seculock_core::constants::{
    DEFAULT_CAPTURE_TIMEOUT, DEFAULT_OTP_ENTRY_TIMEOUT, DEFAULT_UNLOCK_HOLD, INTRUDER_BODY,
    INTRUDER_SUBJECT, KEYPAD_POLL_INTERVAL,
};
use seculock_core::{KeySymbol, Result};
use seculock_face::{FaceMatch, FaceVerifier, FailureReason};
use seculock_hardware::devices::{AnyCamera, AnyDisplay, AnyGpioChip, AnyKeypad};
use seculock_hardware::{Camera, InputPin, KeypadScanner, OutputPin, SharedDisplay};
use seculock_otp::{OtpService, OtpVerdict};
use seculock_notify::Notifier;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};
use zeroize::Zeroize;

/// What started a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSource {
    Keypad(KeySymbol),
    Button,
}

/// How access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantPath {
    Face,
    Otp,
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Wrong code entered until no attempts remained.
    OtpRejected,
    /// The ticket expired or was no longer outstanding.
    OtpExpired,
    /// No key pressed within the entry timeout.
    EntryTimeout,
    /// The keypad failed during entry.
    KeypadFault,
    /// The OTP could not be delivered.
    DeliveryFailed,
    /// The session hit an invalid transition and was reset.
    Internal,
}

impl DenialReason {
    fn notice(&self) -> DenialNotice {
        match self {
            Self::OtpRejected => DenialNotice::TooManyAttempts,
            Self::OtpExpired | Self::EntryTimeout | Self::KeypadFault => DenialNotice::Expired,
            Self::DeliveryFailed => DenialNotice::OtpNotSent,
            Self::Internal => DenialNotice::Error,
        }
    }
}

/// Final decision of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted(GrantPath),
    Denied(DenialReason),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Granted(path) => write!(f, "granted ({path:?})"),
            Self::Denied(reason) => write!(f, "denied ({reason:?})"),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_id: uuid::Uuid,
    pub wake: WakeSource,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// `None` only if the session was reset before verification.
    pub face: Option<FaceMatch>,
    pub otp_attempts: u8,
    pub alert_sent: bool,
    pub decision: Decision,
}

/// Timing of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    pub capture_timeout: Duration,
    pub unlock_hold: Duration,
    /// Inactivity limit between key presses during OTP entry.
    pub entry_timeout: Duration,
    pub keypad_poll: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            unlock_hold: DEFAULT_UNLOCK_HOLD,
            entry_timeout: DEFAULT_OTP_ENTRY_TIMEOUT,
            keypad_poll: KEYPAD_POLL_INTERVAL,
        }
    }
}

/// Devices the authenticator drives exclusively.
#[derive(Debug)]
pub struct AuthDevices {
    pub camera: AnyCamera,
    pub keypad: AnyKeypad,
    pub wake_button: Option<InputPin<AnyGpioChip>>,
    pub lock_relay: OutputPin<AnyGpioChip>,
    pub display: SharedDisplay<AnyDisplay>,
}

enum Entry {
    Code(String),
    TimedOut,
    Fault,
}

/// Primary state machine of the locker.
#[derive(Debug)]
pub struct Authenticator {
    machine: StateMachine,
    devices: AuthDevices,
    verifier: FaceVerifier,
    otp: OtpService,
    notifier: Notifier,
    settings: AuthSettings,
    button_was_active: bool,
}

impl Authenticator {
    pub fn new(
        devices: AuthDevices,
        verifier: FaceVerifier,
        otp: OtpService,
        notifier: Notifier,
        settings: AuthSettings,
    ) -> Self {
        Self {
            machine: StateMachine::new(),
            devices,
            verifier,
            otp,
            notifier,
            settings,
            button_was_active: false,
        }
    }

    /// Replace the state machine, e.g. to resume from a recorded history.
    pub fn with_state_machine(mut self, machine: StateMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn state(&self) -> AuthState {
        *self.machine.current_state()
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn otp(&self) -> &OtpService {
        &self.otp
    }

    /// Check once for a wake signal.
    ///
    /// Any key press wakes; the wake button wakes on its press edge only,
    /// so holding it does not start back-to-back sessions.
    pub async fn poll_wake(&mut self) -> Option<WakeSource> {
        match self.devices.keypad.scan().await {
            Ok(Some(key)) => return Some(WakeSource::Keypad(key)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "keypad scan failed"),
        }

        let button = self.devices.wake_button.as_ref()?;
        let active = match button.is_active() {
            Ok(active) => active,
            Err(e) => {
                warn!(pin = button.pin(), error = %e, "wake button read failed");
                false
            }
        };
        let pressed = active && !self.button_was_active;
        self.button_was_active = active;
        pressed.then_some(WakeSource::Button)
    }

    /// Run one session to its decision and back to `Idle`.
    pub async fn run_session(&mut self, wake: WakeSource) -> SessionOutcome {
        let mut session = AuthSession::new();
        let span = info_span!("session", session_id = %session.id());

        let decision = async {
            info!(?wake, "session started");
            match self.drive(&mut session).await {
                Ok(decision) => decision,
                Err(e) => {
                    error!(error = %e, "session aborted");
                    self.abort_session();
                    render(&self.devices.display, &Screen::Denied(DenialNotice::Error)).await;
                    Decision::Denied(DenialReason::Internal)
                }
            }
        }
        .instrument(span.clone())
        .await;

        let outcome = SessionOutcome {
            session_id: session.id(),
            wake,
            started_at: session.started_wall(),
            elapsed: session.started_at().elapsed(),
            face: session.face,
            otp_attempts: session.otp_attempts,
            alert_sent: session.alert_sent,
            decision,
        };
        span.in_scope(|| {
            info!(
                decision = %outcome.decision,
                otp_attempts = outcome.otp_attempts,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "session finished"
            );
        });
        outcome
    }

    /// Bring the authenticator back to a safe `Idle` after a session was
    /// interrupted: lock relay released, ticket withdrawn.
    pub fn abort_session(&mut self) {
        if let Err(e) = self.devices.lock_relay.deactivate() {
            error!(pin = self.devices.lock_relay.pin(), error = %e, "failed to re-lock");
        }
        if let Some(ticket) = self.otp.outstanding() {
            self.otp.revoke(ticket.id);
        }
        if self.state() != AuthState::Idle {
            let transition = self.machine.reset();
            warn!(from = %transition.from, "state machine reset");
        }
    }

    async fn drive(&mut self, session: &mut AuthSession) -> Result<Decision> {
        self.enter(AuthState::Capturing)?;
        render(&self.devices.display, &Screen::Scanning).await;
        let frame = self.capture().await;

        self.enter(AuthState::FaceVerifying)?;
        let face = match frame {
            Some(frame) => {
                let verification = self.verifier.verify(&frame).await;
                session.probe = verification.probe;
                verification.outcome
            }
            None => FaceMatch::VerificationFailed(FailureReason::CaptureFailed),
        };
        session.face = Some(face);
        info!(face = %face, "face verification finished");

        if face.is_match() {
            return self.grant(GrantPath::Face).await;
        }

        self.enter(AuthState::OtpIssuing)?;
        render(&self.devices.display, &Screen::FaceNotRecognized).await;
        let ticket = match self.otp.issue().await {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(error = %e, "OTP could not be issued");
                return self.deny(session, DenialReason::DeliveryFailed).await;
            }
        };
        session.ticket = Some(ticket);

        self.enter(AuthState::OtpAwaitingInput)?;
        let mut prompt = true;
        loop {
            let verdict = match self.collect_entry(session, prompt).await {
                Entry::Code(mut code) => {
                    session.otp_attempts += 1;
                    let verdict = self.otp.verify(ticket, &code);
                    code.zeroize();
                    verdict
                }
                Entry::TimedOut => {
                    info!(
                        timeout_ms = self.settings.entry_timeout.as_millis() as u64,
                        "OTP entry timed out"
                    );
                    return self.deny(session, DenialReason::EntryTimeout).await;
                }
                Entry::Fault => return self.deny(session, DenialReason::KeypadFault).await,
            };

            match verdict {
                Ok(OtpVerdict::Valid) => return self.grant(GrantPath::Otp).await,
                Ok(OtpVerdict::Invalid { remaining }) if remaining > 0 => {
                    info!(remaining, "incorrect OTP");
                    self.enter(AuthState::OtpRetry)?;
                    render(&self.devices.display, &Screen::Incorrect { remaining }).await;
                    self.enter(AuthState::OtpAwaitingInput)?;
                    // The retry notice stays up until the next key press.
                    prompt = false;
                }
                Ok(OtpVerdict::Invalid { .. }) => {
                    return self.deny(session, DenialReason::OtpRejected).await;
                }
                Ok(OtpVerdict::Expired) => {
                    return self.deny(session, DenialReason::OtpExpired).await;
                }
                Err(e) => {
                    warn!(ticket = %ticket, error = %e, "OTP check failed");
                    return self.deny(session, DenialReason::OtpExpired).await;
                }
            }
        }
    }

    async fn collect_entry(&mut self, session: &mut AuthSession, prompt: bool) -> Entry {
        if prompt {
            let entered = session.keys.len();
            render(&self.devices.display, &Screen::EnterOtp { entered }).await;
        }

        loop {
            let key = match tokio::time::timeout(
                self.settings.entry_timeout,
                wait_for_key(&mut self.devices.keypad, self.settings.keypad_poll),
            )
            .await
            {
                Ok(Ok(key)) => key,
                Ok(Err(e)) => {
                    warn!(error = %e, "keypad failed during OTP entry");
                    return Entry::Fault;
                }
                Err(_) => return Entry::TimedOut,
            };

            match session.keys.feed(key) {
                EntryEvent::Submit(code) => return Entry::Code(code),
                EntryEvent::Digit | EntryEvent::Cleared => {
                    let entered = session.keys.len();
                    render(&self.devices.display, &Screen::EnterOtp { entered }).await;
                }
                EntryEvent::Ignored => debug!(%key, "key ignored during OTP entry"),
            }
        }
    }

    async fn grant(&mut self, path: GrantPath) -> Result<Decision> {
        self.enter(AuthState::Granted)?;
        info!(?path, "access granted");
        render(&self.devices.display, &Screen::Granted).await;

        let relay = &self.devices.lock_relay;
        match relay.activate() {
            Ok(()) => tokio::time::sleep(self.settings.unlock_hold).await,
            Err(e) => warn!(pin = relay.pin(), error = %e, "failed to open lock"),
        }
        if let Err(e) = relay.deactivate() {
            error!(pin = relay.pin(), error = %e, "failed to re-lock");
        }

        self.enter(AuthState::Idle)?;
        Ok(Decision::Granted(path))
    }

    async fn deny(&mut self, session: &mut AuthSession, reason: DenialReason) -> Result<Decision> {
        self.enter(AuthState::Denied)?;
        warn!(?reason, "access denied");
        if let Some(ticket) = session.ticket {
            self.otp.revoke(ticket);
        }
        render(&self.devices.display, &Screen::Denied(reason.notice())).await;

        let alert = match self.intruder_image(session).await {
            Some(image) => {
                self.notifier
                    .send_with_image(INTRUDER_SUBJECT, INTRUDER_BODY, &image)
                    .await
            }
            None => self.notifier.send_plain(INTRUDER_SUBJECT, INTRUDER_BODY).await,
        };
        match alert {
            Ok(()) => session.alert_sent = true,
            Err(e) => error!(error = %e, "intruder alert failed"),
        }

        self.enter(AuthState::Idle)?;
        Ok(Decision::Denied(reason))
    }

    async fn capture(&mut self) -> Option<RgbImage> {
        match tokio::time::timeout(self.settings.capture_timeout, self.devices.camera.capture())
            .await
        {
            Ok(Ok(frame)) => Some(frame),
            Ok(Err(e)) => {
                warn!(error = %e, "capture failed");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.capture_timeout.as_millis() as u64,
                    "capture timed out"
                );
                None
            }
        }
    }

    /// Photo of the person at the locker for the intruder alert: a fresh
    /// capture, else the probe of this session.
    async fn intruder_image(&mut self, session: &AuthSession) -> Option<PathBuf> {
        if let Some(frame) = self.capture().await {
            match self.verifier.save_snapshot(&frame).await {
                Ok(path) => return Some(path),
                Err(e) => warn!(error = %e, "could not save intruder snapshot"),
            }
        }
        session.probe.clone()
    }

    fn enter(&mut self, state: AuthState) -> Result<()> {
        let transition = self.machine.transition_to(state)?;
        debug!(from = %transition.from, to = %transition.to, "transition");
        Ok(())
    }
}

async fn wait_for_key(
    keypad: &mut AnyKeypad,
    poll: Duration,
) -> seculock_hardware::Result<KeySymbol> {
    loop {
        if let Some(key) = keypad.scan().await? {
            return Ok(key);
        }
        tokio::time::sleep(poll).await;
    }
}
