//! Top-level control loop.
//!
//! The [`Controller`] spawns the intrusion monitor on its own task, then
//! polls for wake signals and runs one authentication session at a time
//! until the shutdown token is cancelled. A session interrupted by shutdown
//! is dropped and the authenticator is brought back to a locked `Idle`.

use crate::authenticator::{AuthDevices, Authenticator, SessionOutcome};
use crate::config::ControllerConfig;
use crate::messages::{Screen, render};
use crate::monitor::IntrusionMonitor;
use seculock_core::{Clock, Result};
use seculock_face::{AnyComparator, AnyDetector, FaceVerifier};
use seculock_hardware::devices::{AnyCamera, AnyDisplay, AnyGpioChip, AnyKeypad};
use seculock_hardware::{HardwareState, SharedDisplay};
use seculock_notify::{AnyTransport, Notifier};
use seculock_otp::OtpService;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Devices that are not GPIO pins and therefore not owned by
/// [`HardwareState`].
#[derive(Debug)]
pub struct Peripherals {
    pub camera: AnyCamera,
    pub keypad: AnyKeypad,
    pub detector: AnyDetector,
    pub comparator: AnyComparator,
    pub transport: AnyTransport,
}

/// Counters of one controller run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerReport {
    pub sessions: u64,
    pub granted: u64,
    pub denied: u64,
    pub intrusions: u64,
}

impl ControllerReport {
    fn record(&mut self, outcome: &SessionOutcome) {
        self.sessions += 1;
        if outcome.decision.is_granted() {
            self.granted += 1;
        } else {
            self.denied += 1;
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    authenticator: Authenticator,
    monitor: Option<IntrusionMonitor>,
    display: SharedDisplay<AnyDisplay>,
    poll_interval: Duration,
}

impl Controller {
    pub fn new(
        authenticator: Authenticator,
        display: SharedDisplay<AnyDisplay>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            authenticator,
            monitor: None,
            display,
            poll_interval,
        }
    }

    pub fn with_monitor(mut self, monitor: IntrusionMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Wire every component from the configuration.
    ///
    /// Pin handles and the display come from `hardware`; everything else
    /// from `peripherals`. The reference image is read here, once.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the reference image is missing or not
    /// decodable.
    pub async fn assemble(
        config: &ControllerConfig,
        hardware: &HardwareState<AnyGpioChip, AnyDisplay>,
        peripherals: Peripherals,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let notifier = Notifier::new(
            peripherals.transport,
            config.smtp.sender(),
            config.smtp.to.clone(),
            config.smtp.send_timeout(),
        );
        let verifier = FaceVerifier::from_reference_file(
            &config.face.reference_image,
            peripherals.detector,
            peripherals.comparator,
            config.face.probe_path.clone(),
        )
        .await?
        .with_timeouts(config.face.detect_timeout(), config.face.compare_timeout());
        let otp = OtpService::new(config.otp_settings(), notifier.clone(), Arc::clone(&clock));

        let devices = AuthDevices {
            camera: peripherals.camera,
            keypad: peripherals.keypad,
            wake_button: hardware.wake_button(),
            lock_relay: hardware.lock_relay(),
            display: hardware.display(),
        };
        let authenticator = Authenticator::new(
            devices,
            verifier,
            otp,
            notifier.clone(),
            config.auth_settings(),
        );
        let monitor = IntrusionMonitor::new(
            hardware.tamper_sensors(),
            hardware.buzzer_relay(),
            notifier,
            hardware.display(),
            clock,
            config.monitor_settings(),
        );

        Ok(Self::new(authenticator, hardware.display(), config.timing.keypad_poll())
            .with_monitor(monitor))
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> ControllerReport {
        let mut report = ControllerReport::default();
        let monitor_token = shutdown.child_token();
        let monitor = self
            .monitor
            .take()
            .map(|monitor| tokio::spawn(monitor.run(monitor_token.clone())));
        if monitor.is_none() {
            warn!("running without intrusion monitor");
        }

        info!(poll_ms = self.poll_interval.as_millis() as u64, "controller ready");
        render(&self.display, &Screen::Ready).await;

        loop {
            let wake = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                wake = self.authenticator.poll_wake() => wake,
            };
            let Some(wake) = wake else {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            };

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                outcome = self.authenticator.run_session(wake) => Some(outcome),
            };
            match outcome {
                Some(outcome) => {
                    report.record(&outcome);
                    render(&self.display, &Screen::Ready).await;
                }
                None => {
                    warn!("session interrupted by shutdown");
                    self.authenticator.abort_session();
                    break;
                }
            }
        }

        monitor_token.cancel();
        if let Some(monitor) = monitor {
            match monitor.await {
                Ok(intrusions) => report.intrusions = intrusions,
                Err(e) => error!(error = %e, "intrusion monitor task failed"),
            }
        }
        render(&self.display, &Screen::Offline).await;

        info!(
            sessions = report.sessions,
            granted = report.granted,
            denied = report.denied,
            intrusions = report.intrusions,
            "controller stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::{Decision, DenialReason, GrantPath, WakeSource};
    use seculock_core::KeySymbol;
    use seculock_face::FaceMatch;

    fn outcome(decision: Decision) -> SessionOutcome {
        SessionOutcome {
            session_id: uuid::Uuid::new_v4(),
            wake: WakeSource::Keypad(KeySymbol::Digit(1)),
            started_at: chrono::Utc::now(),
            elapsed: Duration::from_secs(1),
            face: Some(FaceMatch::Matched),
            otp_attempts: 0,
            alert_sent: false,
            decision,
        }
    }

    #[test]
    fn test_report_counts_decisions() {
        let mut report = ControllerReport::default();

        report.record(&outcome(Decision::Granted(GrantPath::Face)));
        report.record(&outcome(Decision::Denied(DenialReason::OtpRejected)));
        report.record(&outcome(Decision::Granted(GrantPath::Otp)));

        assert_eq!(
            report,
            ControllerReport {
                sessions: 3,
                granted: 2,
                denied: 1,
                intrusions: 0,
            }
        );
    }
}
