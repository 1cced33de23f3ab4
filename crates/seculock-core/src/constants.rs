//! Fixed constants of the SecuLock reference board.
//!
//! This module collects the pin map, timing defaults, OTP parameters and
//! the user-facing texts of the locker controller. Configuration files
//! override most of these values; the constants are the defaults and the
//! single source of truth for tests.
//!
//! # Pin Numbering
//!
//! All pin numbers use the Broadcom (BCM) numbering of the Raspberry Pi
//! header, which is what the Linux GPIO interfaces expose.
//!
//! # Signal Convention
//!
//! Relays and tamper sensors are active-low: a level of 0 means the relay
//! is energised or the sensor fired.
//!
//! ```
//! use seculock_core::constants::*;
//!
//! assert_eq!(KEYPAD_ROW_PINS.len(), 4);
//! assert_eq!(OTP_LENGTH, 6);
//! ```

use std::time::Duration;

// ============================================================================
// Pin Map
// ============================================================================

/// Keypad row pins, driven as outputs (idle high, scanned low).
pub const KEYPAD_ROW_PINS: [u32; 4] = [17, 27, 22, 10];

/// Keypad column pins, read as inputs with pull-ups.
pub const KEYPAD_COL_PINS: [u32; 4] = [9, 11, 5, 6];

/// Relay that drives the solenoid lock (active-low).
pub const RELAY_LOCK_PIN: u32 = 26;

/// Relay that drives the buzzer (active-low).
pub const RELAY_BUZZER_PIN: u32 = 19;

/// Vibration (tamper) sensor inputs (active-low).
pub const VIBRATION_SENSOR_PINS: [u32; 2] = [23, 24];

// ============================================================================
// Display
// ============================================================================

/// Number of lines on the character LCD.
pub const DISPLAY_LINES: usize = 2;

/// Number of characters per LCD line.
pub const DISPLAY_COLUMNS: usize = 16;

/// I2C address of the PCF8574 backpack driving the LCD.
pub const LCD_I2C_ADDRESS: u8 = 0x27;

/// I2C bus number the LCD is attached to (`/dev/i2c-1`).
pub const LCD_I2C_BUS: u8 = 1;

// ============================================================================
// Keypad
// ============================================================================

/// Symbol layout of the 4x4 membrane keypad, indexed `[row][column]`.
pub const KEYPAD_LAYOUT: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// Key that submits the buffered OTP immediately.
pub const KEY_SUBMIT: char = '#';

/// Key that clears the buffered OTP.
pub const KEY_CLEAR: char = '*';

/// Settle time after a detected key press.
pub const KEYPAD_DEBOUNCE: Duration = Duration::from_millis(200);

/// Interval between keypad scans while waiting for input.
pub const KEYPAD_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// One-Time Passwords
// ============================================================================

/// Number of digits in an OTP.
pub const OTP_LENGTH: usize = 6;

/// Exclusive upper bound of the OTP code space (`10^OTP_LENGTH`).
pub const OTP_CODE_SPACE: u32 = 1_000_000;

/// Lower bound used when codes must not start with zero.
pub const OTP_NO_LEADING_ZERO_MIN: u32 = 100_000;

/// Validity window of an issued OTP.
pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Verification attempts allowed per ticket.
pub const DEFAULT_OTP_ATTEMPTS: u8 = 3;

/// Inactivity limit while waiting for OTP digits.
pub const DEFAULT_OTP_ENTRY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Actuation and Monitoring
// ============================================================================

/// How long the lock stays open after a grant.
pub const DEFAULT_UNLOCK_HOLD: Duration = Duration::from_secs(5);

/// How long the buzzer sounds on intrusion.
pub const DEFAULT_BUZZER_DURATION: Duration = Duration::from_secs(5);

/// Tamper sensor polling interval.
pub const DEFAULT_SENSOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after an intrusion during which new triggers are ignored.
///
/// Must be longer than [`DEFAULT_BUZZER_DURATION`] so one shake of the
/// locker produces one alert.
pub const DEFAULT_INTRUSION_QUIET_PERIOD: Duration = Duration::from_secs(15);

// ============================================================================
// Timeouts
// ============================================================================

/// Upper bound for a single camera capture.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for face detection on one frame.
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for one comparator invocation.
pub const DEFAULT_COMPARE_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound for one mail delivery.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Files
// ============================================================================

/// Where the most recent cropped probe face is written.
pub const CAPTURED_FACE_PATH: &str = "captured_face.png";

/// Attachment filename used for intruder photos.
pub const CAPTURED_FACE_FILENAME: &str = "captured_face.png";

/// Default reference image of the authorised owner.
pub const REFERENCE_IMAGE_PATH: &str = "owner.jpeg";

// ============================================================================
// Mail
// ============================================================================

/// Default mail relay.
pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";

/// Default mail relay port (STARTTLS submission).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Subject of OTP messages.
pub const OTP_SUBJECT: &str = "Your OTP for Verification";

/// Subject of intruder alerts raised after failed authentication.
pub const INTRUDER_SUBJECT: &str = "Theft detected !!";

/// Body of intruder alerts raised after failed authentication.
pub const INTRUDER_BODY: &str = "Unauthorized access attempt detected.";

/// Subject of tamper alerts raised by the vibration sensors.
pub const TAMPER_SUBJECT: &str = "Theft Detected";

/// Body prefix of tamper alerts raised by the vibration sensors.
pub const TAMPER_BODY: &str = "Vibration sensors activated";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_map_has_no_duplicates() {
        let mut pins: Vec<u32> = KEYPAD_ROW_PINS
            .iter()
            .chain(KEYPAD_COL_PINS.iter())
            .chain(VIBRATION_SENSOR_PINS.iter())
            .copied()
            .collect();
        pins.push(RELAY_LOCK_PIN);
        pins.push(RELAY_BUZZER_PIN);

        let total = pins.len();
        pins.sort_unstable();
        pins.dedup();
        assert_eq!(pins.len(), total);
    }

    #[test]
    fn test_quiet_period_outlasts_buzzer() {
        assert!(DEFAULT_INTRUSION_QUIET_PERIOD > DEFAULT_BUZZER_DURATION);
    }

    #[test]
    fn test_code_space_matches_length() {
        assert_eq!(OTP_CODE_SPACE, 10u32.pow(OTP_LENGTH as u32));
    }
}
