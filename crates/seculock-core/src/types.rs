use crate::{
    Result,
    constants::{KEY_CLEAR, KEY_SUBMIT, KEYPAD_LAYOUT, OTP_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One symbol of the 16-key membrane keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySymbol {
    /// Numeric digit (0-9).
    Digit(u8),
    /// Letter keys on the right-hand column.
    A,
    B,
    C,
    D,
    /// Star key (*).
    Star,
    /// Hash/pound key (#).
    Hash,
}

impl KeySymbol {
    /// Parse a symbol from its printed character.
    ///
    /// # Errors
    /// Returns `Error::InvalidKeySymbol` for characters not on the keypad.
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            '0'..='9' => Ok(Self::Digit(c as u8 - b'0')),
            'A' => Ok(Self::A),
            'B' => Ok(Self::B),
            'C' => Ok(Self::C),
            'D' => Ok(Self::D),
            '*' => Ok(Self::Star),
            '#' => Ok(Self::Hash),
            other => Err(Error::InvalidKeySymbol(other)),
        }
    }

    /// The character printed on the key.
    #[must_use]
    pub fn as_char(&self) -> char {
        match self {
            Self::Digit(d) => char::from(b'0' + d),
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::Star => '*',
            Self::Hash => '#',
        }
    }

    /// Symbol at a `(row, column)` position of the matrix, if in range.
    #[must_use]
    pub fn at(row: usize, column: usize) -> Option<Self> {
        let c = KEYPAD_LAYOUT.get(row)?.get(column)?;
        Self::from_char(*c).ok()
    }

    #[must_use]
    pub fn is_digit(&self) -> bool {
        matches!(self, Self::Digit(_))
    }

    /// True for the key that submits a buffered code.
    #[must_use]
    pub fn is_submit(&self) -> bool {
        self.as_char() == KEY_SUBMIT
    }

    /// True for the key that clears a buffered code.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.as_char() == KEY_CLEAR
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl std::str::FromStr for KeySymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            (Some(c), Some(_)) => Err(Error::InvalidKeySymbol(c)),
            (None, _) => Err(Error::InvalidKeySymbol(' ')),
        }
    }
}

/// Electrical level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    /// Level that asserts an active-low relay or sensor.
    pub const ASSERTED: PinLevel = PinLevel::Low;

    /// Level of an idle active-low relay or sensor.
    pub const RELEASED: PinLevel = PinLevel::High;

    /// Convert from the raw `0`/`1` value used by GPIO interfaces.
    #[must_use]
    pub fn from_raw(value: u8) -> Self {
        if value == 0 { Self::Low } else { Self::High }
    }

    #[must_use]
    pub fn as_raw(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    /// Active-low interpretation: `Low` means triggered/energised.
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        *self == Self::ASSERTED
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// Internal bias resistor configuration for an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pull {
    #[default]
    None,
    Up,
    Down,
}

/// One of the two LCD lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayLine {
    Top,
    Bottom,
}

impl DisplayLine {
    /// Zero-based line index.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Top => 0,
            Self::Bottom => 1,
        }
    }
}

/// Identifier of a tamper sensor: its position in the configured sensor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId(pub u8);

impl fmt::Display for SensorId {
    // Sensors are numbered from 1 on the enclosure labels.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sensor {}", self.0 + 1)
    }
}

/// Secret one-time password (exactly [`OTP_LENGTH`] ASCII digits).
///
/// # Security
/// Comparison is constant-time and the digits are wiped when the value is
/// dropped. `Debug` never prints the digits.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OtpCode(String);

impl OtpCode {
    /// Create a code from its digit string.
    ///
    /// # Errors
    /// Returns `Error::InvalidOtp` if the string is not exactly six ASCII digits.
    pub fn new(digits: &str) -> Result<Self> {
        if digits.len() != OTP_LENGTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidOtp(format!(
                "expected {OTP_LENGTH} digits, got {} characters",
                digits.len()
            )));
        }
        Ok(Self(digits.to_string()))
    }

    /// Format a numeric code with leading zeros.
    ///
    /// # Errors
    /// Returns `Error::InvalidOtp` if the value has more than six digits.
    pub fn from_value(value: u32) -> Result<Self> {
        Self::new(&format!("{value:0width$}", width = OTP_LENGTH))
    }

    /// The digits, for delivery to the owner.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a typed candidate.
    ///
    /// Length mismatches return `false` without leaking where they differ.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl PartialEq for OtpCode {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for OtpCode {}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('0', KeySymbol::Digit(0))]
    #[case('7', KeySymbol::Digit(7))]
    #[case('A', KeySymbol::A)]
    #[case('D', KeySymbol::D)]
    #[case('*', KeySymbol::Star)]
    #[case('#', KeySymbol::Hash)]
    fn test_key_symbol_from_char(#[case] input: char, #[case] expected: KeySymbol) {
        let symbol = KeySymbol::from_char(input).unwrap();
        assert_eq!(symbol, expected);
        assert_eq!(symbol.as_char(), input);
    }

    #[rstest]
    #[case('E')]
    #[case('a')]
    #[case(' ')]
    fn test_key_symbol_invalid(#[case] input: char) {
        assert!(KeySymbol::from_char(input).is_err());
    }

    #[test]
    fn test_key_symbol_layout_positions() {
        assert_eq!(KeySymbol::at(0, 0), Some(KeySymbol::Digit(1)));
        assert_eq!(KeySymbol::at(0, 3), Some(KeySymbol::A));
        assert_eq!(KeySymbol::at(3, 1), Some(KeySymbol::Digit(0)));
        assert_eq!(KeySymbol::at(3, 2), Some(KeySymbol::Hash));
        assert_eq!(KeySymbol::at(4, 0), None);
    }

    #[test]
    fn test_submit_and_clear_keys() {
        assert!(KeySymbol::Hash.is_submit());
        assert!(KeySymbol::Star.is_clear());
        assert!(!KeySymbol::Digit(5).is_submit());
    }

    #[test]
    fn test_key_symbol_from_str() {
        assert_eq!("9".parse::<KeySymbol>().unwrap(), KeySymbol::Digit(9));
        assert!("12".parse::<KeySymbol>().is_err());
        assert!("".parse::<KeySymbol>().is_err());
    }

    #[test]
    fn test_pin_level_active_low() {
        assert!(PinLevel::Low.is_asserted());
        assert!(!PinLevel::High.is_asserted());
        assert_eq!(PinLevel::from_raw(0), PinLevel::Low);
        assert_eq!(PinLevel::from_raw(1), PinLevel::High);
        assert_eq!(PinLevel::High.as_raw(), 1);
    }

    #[test]
    fn test_sensor_id_display_is_one_based() {
        assert_eq!(SensorId(0).to_string(), "sensor 1");
    }

    #[rstest]
    #[case("000000")]
    #[case("123456")]
    #[case("999999")]
    fn test_otp_code_valid(#[case] input: &str) {
        let code = OtpCode::new(input).unwrap();
        assert_eq!(code.expose(), input);
        assert!(code.matches(input));
    }

    #[rstest]
    #[case("12345")] // too short
    #[case("1234567")] // too long
    #[case("12a456")] // non-digit
    fn test_otp_code_invalid(#[case] input: &str) {
        assert!(OtpCode::new(input).is_err());
    }

    #[test]
    fn test_otp_code_from_value_pads() {
        assert_eq!(OtpCode::from_value(42).unwrap().expose(), "000042");
        assert!(OtpCode::from_value(1_000_000).is_err());
    }

    #[test]
    fn test_otp_code_debug_is_redacted() {
        let code = OtpCode::new("314159").unwrap();
        assert!(!format!("{code:?}").contains("314159"));
    }

    #[test]
    fn test_otp_code_mismatch() {
        let code = OtpCode::new("314159").unwrap();
        assert!(!code.matches("314158"));
        assert!(!code.matches("31415"));
    }
}
