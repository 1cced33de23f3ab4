//! Tamper detection on the vibration sensors.
//!
//! The [`IntrusionMonitor`] polls every sensor on its own cadence, sounds the
//! buzzer and mails the owner when any of them fires. It runs as a separate
//! task so a slow capture or mail send in the foreground never delays it,
//! and shares only the display with the authenticator.

use crate::messages::{Screen, render};
use chrono::{DateTime, Local};
use seculock_core::constants::{
    DEFAULT_BUZZER_DURATION, DEFAULT_INTRUSION_QUIET_PERIOD, DEFAULT_SENSOR_POLL_INTERVAL,
    TAMPER_BODY, TAMPER_SUBJECT,
};
use seculock_core::{Clock, SensorId};
use seculock_hardware::devices::{AnyDisplay, AnyGpioChip};
use seculock_hardware::{InputPin, OutputPin, SharedDisplay};
use seculock_notify::Notifier;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Recent face capture that may be attached to tamper alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSource {
    pub path: PathBuf,
    /// Older files are considered stale and not attached.
    pub max_age: Duration,
}

/// Timing of the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub buzzer_duration: Duration,
    /// Measured from detection; sensors are not read inside it.
    pub quiet_period: Duration,
    pub snapshot: Option<SnapshotSource>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_SENSOR_POLL_INTERVAL,
            buzzer_duration: DEFAULT_BUZZER_DURATION,
            quiet_period: DEFAULT_INTRUSION_QUIET_PERIOD,
            snapshot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Armed,
    Triggered,
}

/// Result of the alert mail of an intrusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertStatus {
    Sent,
    Failed(String),
}

/// One or more sensors firing in the same tick.
#[derive(Debug, Clone)]
pub struct IntrusionEvent {
    pub sensors: Vec<SensorId>,
    pub detected_at: Instant,
    pub wall_clock: DateTime<Local>,
    pub alert: AlertStatus,
}

impl IntrusionEvent {
    /// Alert body naming the sensors and the local time of detection.
    pub fn alert_body(&self) -> String {
        alert_body(&self.sensors, &self.wall_clock)
    }
}

fn alert_body(sensors: &[SensorId], at: &DateTime<Local>) -> String {
    let names: Vec<String> = sensors.iter().map(SensorId::to_string).collect();
    format!(
        "{TAMPER_BODY}: {} at {}",
        names.join(", "),
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Secondary state machine: `Armed -> Triggered -> Armed`.
pub struct IntrusionMonitor {
    sensors: Vec<(SensorId, InputPin<AnyGpioChip>)>,
    buzzer: OutputPin<AnyGpioChip>,
    notifier: Notifier,
    display: SharedDisplay<AnyDisplay>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
    state: MonitorState,
    last_trigger: Option<Instant>,
}

impl fmt::Debug for IntrusionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrusionMonitor")
            .field("sensors", &self.sensors.len())
            .field("buzzer", &self.buzzer.pin())
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl IntrusionMonitor {
    pub fn new(
        sensors: Vec<(SensorId, InputPin<AnyGpioChip>)>,
        buzzer: OutputPin<AnyGpioChip>,
        notifier: Notifier,
        display: SharedDisplay<AnyDisplay>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            sensors,
            buzzer,
            notifier,
            display,
            clock,
            settings,
            state: MonitorState::Armed,
            last_trigger: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Whether the quiet window of the last intrusion is still open.
    pub fn in_quiet_period(&self) -> bool {
        self.last_trigger
            .is_some_and(|at| self.clock.now().duration_since(at) < self.settings.quiet_period)
    }

    /// Poll the sensors once and handle an intrusion if any fired.
    ///
    /// Returns the event when one was raised, after both the buzzer hold and
    /// the alert mail are over. Cancelling `shutdown` cuts the hold short; the
    /// buzzer is switched off either way.
    pub async fn tick(&mut self, shutdown: &CancellationToken) -> Option<IntrusionEvent> {
        if self.in_quiet_period() {
            return None;
        }

        let fired = self.read_sensors();
        if fired.is_empty() {
            return None;
        }

        let detected_at = self.clock.now();
        let wall_clock = Local::now();
        self.last_trigger = Some(detected_at);
        self.state = MonitorState::Triggered;
        let names: Vec<String> = fired.iter().map(SensorId::to_string).collect();
        warn!(sensors = ?names, "intrusion detected");

        render(&self.display, &Screen::Intrusion { sensors: fired.clone() }).await;
        if let Err(e) = self.buzzer.activate() {
            error!(pin = self.buzzer.pin(), error = %e, "failed to sound buzzer");
        }

        let body = alert_body(&fired, &wall_clock);
        let alarm = async {
            hold(self.settings.buzzer_duration, shutdown).await;
            if let Err(e) = self.buzzer.deactivate() {
                error!(pin = self.buzzer.pin(), error = %e, "failed to silence buzzer");
            }
        };
        // The buzzer is silenced on its own schedule, however long the mail takes.
        let (alert, ()) = tokio::join!(self.send_alert(&body), alarm);
        self.state = MonitorState::Armed;
        debug!(
            quiet_ms = self.settings.quiet_period.as_millis() as u64,
            "monitor re-armed"
        );

        Some(IntrusionEvent {
            sensors: fired,
            detected_at,
            wall_clock,
            alert,
        })
    }

    /// Poll until `shutdown` is cancelled. Returns the number of intrusions.
    pub async fn run(mut self, shutdown: CancellationToken) -> u64 {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut intrusions = 0;

        info!(
            sensors = self.sensors.len(),
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            "intrusion monitor armed"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    if self.tick(&shutdown).await.is_some() {
                        intrusions += 1;
                    }
                }
            }
        }

        info!(intrusions, "intrusion monitor stopped");
        intrusions
    }

    fn read_sensors(&self) -> Vec<SensorId> {
        self.sensors
            .iter()
            .filter_map(|(id, pin)| match pin.is_active() {
                Ok(true) => Some(*id),
                Ok(false) => None,
                Err(e) => {
                    warn!(sensor = %id, pin = pin.pin(), error = %e, "sensor read failed");
                    None
                }
            })
            .collect()
    }

    async fn send_alert(&self, body: &str) -> AlertStatus {
        let result = match self.recent_snapshot().await {
            Some(path) => {
                self.notifier
                    .send_with_image(TAMPER_SUBJECT, body, &path)
                    .await
            }
            None => self.notifier.send_plain(TAMPER_SUBJECT, body).await,
        };
        match result {
            Ok(()) => AlertStatus::Sent,
            Err(e) => {
                error!(error = %e, "tamper alert failed");
                AlertStatus::Failed(e.to_string())
            }
        }
    }

    async fn recent_snapshot(&self) -> Option<PathBuf> {
        let snapshot = self.settings.snapshot.as_ref()?;
        is_recent(&snapshot.path, snapshot.max_age)
            .await
            .then(|| snapshot.path.clone())
    }
}

async fn hold(duration: Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown.cancelled() => debug!("buzzer hold cut short by shutdown"),
    }
}

async fn is_recent(path: &Path, max_age: Duration) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age <= max_age)
}
