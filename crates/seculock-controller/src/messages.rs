//! Text shown on the two-line display.
//!
//! Every screen fits the 16-column LCD; [`SharedDisplay::show`] pads and
//! truncates anyway.

use seculock_core::constants::OTP_LENGTH;
use seculock_core::SensorId;
use seculock_hardware::{CharacterDisplay, SharedDisplay};
use tracing::warn;

/// Why a session was denied, as shown on the bottom line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialNotice {
    TooManyAttempts,
    Expired,
    OtpNotSent,
    Error,
}

/// Everything the controller puts on the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Idle prompt.
    Ready,
    Scanning,
    FaceNotRecognized,
    /// OTP prompt with `entered` digits typed so far.
    EnterOtp { entered: usize },
    Incorrect { remaining: u8 },
    Granted,
    Denied(DenialNotice),
    Intrusion { sensors: Vec<SensorId> },
    Offline,
}

impl Screen {
    /// Top and bottom line.
    pub fn lines(&self) -> (String, String) {
        match self {
            Screen::Ready => ("SecuLock".into(), "Press any key".into()),
            Screen::Scanning => ("Scanning face".into(), "Please wait".into()),
            Screen::FaceNotRecognized => ("Face not known".into(), "Sending OTP...".into()),
            Screen::EnterOtp { entered } => {
                let entered = (*entered).min(OTP_LENGTH);
                (
                    "Enter OTP:".into(),
                    format!("{}{}", "*".repeat(entered), "_".repeat(OTP_LENGTH - entered)),
                )
            }
            Screen::Incorrect { remaining } => {
                let noun = if *remaining == 1 { "try" } else { "tries" };
                ("Incorrect, retry".into(), format!("{remaining} {noun} left"))
            }
            Screen::Granted => ("Access Granted".into(), String::new()),
            Screen::Denied(notice) => {
                let reason = match notice {
                    DenialNotice::TooManyAttempts => "Too many tries",
                    DenialNotice::Expired => "Code expired",
                    DenialNotice::OtpNotSent => "OTP not sent",
                    DenialNotice::Error => "",
                };
                ("Access Denied".into(), reason.into())
            }
            Screen::Intrusion { sensors } => {
                let ids: Vec<String> = sensors.iter().map(|id| (id.0 + 1).to_string()).collect();
                ("Intrusion!".into(), format!("Sensor {}", ids.join(",")))
            }
            Screen::Offline => ("SecuLock".into(), "Offline".into()),
        }
    }
}

/// Show `screen`, logging instead of failing if the display is faulty.
pub async fn render<D: CharacterDisplay>(display: &SharedDisplay<D>, screen: &Screen) {
    let (top, bottom) = screen.lines();
    if let Err(e) = display.show(&top, &bottom).await {
        warn!(error = %e, ?screen, "display update failed");
    }
}
