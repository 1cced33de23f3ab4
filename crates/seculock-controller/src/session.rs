//! Per-attempt session data.

use chrono::{DateTime, Utc};
use seculock_core::KeySymbol;
use seculock_core::constants::OTP_LENGTH;
use seculock_face::FaceMatch;
use seculock_otp::TicketId;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// What a key press did to the entry buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEvent {
    /// Digit stored, more expected.
    Digit,
    /// Buffer emptied by the clear key.
    Cleared,
    /// Buffer complete or terminator pressed; the entered digits.
    Submit(String),
    /// Key has no meaning during entry.
    Ignored,
}

/// Digits typed on the keypad, wiped on drop.
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct KeyBuffer {
    digits: String,
}

impl KeyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one key press.
    ///
    /// Digits accumulate up to the code length; the last one submits. `#`
    /// submits whatever was typed, `*` clears and `A`-`D` are ignored.
    pub fn feed(&mut self, key: KeySymbol) -> EntryEvent {
        if key.is_submit() {
            return EntryEvent::Submit(self.take());
        }
        if key.is_clear() {
            self.clear();
            return EntryEvent::Cleared;
        }
        if !key.is_digit() {
            return EntryEvent::Ignored;
        }

        self.digits.push(key.as_char());
        if self.digits.len() >= OTP_LENGTH {
            EntryEvent::Submit(self.take())
        } else {
            EntryEvent::Digit
        }
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn clear(&mut self) {
        self.digits.zeroize();
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.digits)
    }
}

/// State of one authentication attempt.
///
/// Created on wake and dropped when the session reaches its outcome.
#[derive(Debug)]
pub struct AuthSession {
    id: Uuid,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    pub face: Option<FaceMatch>,
    /// Cropped probe saved by this session's verification.
    pub probe: Option<PathBuf>,
    pub ticket: Option<TicketId>,
    pub otp_attempts: u8,
    pub keys: KeyBuffer,
    pub alert_sent: bool,
}

impl AuthSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            started_wall: Utc::now(),
            face: None,
            probe: None,
            ticket: None,
            otp_attempts: 0,
            keys: KeyBuffer::new(),
            alert_sent: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn started_wall(&self) -> DateTime<Utc> {
        self.started_wall
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(buffer: &mut KeyBuffer, keys: &str) -> Vec<EntryEvent> {
        keys.chars()
            .map(|c| buffer.feed(KeySymbol::from_char(c).unwrap()))
            .collect()
    }

    #[test]
    fn test_sixth_digit_submits() {
        let mut buffer = KeyBuffer::new();
        let events = feed_all(&mut buffer, "123456");

        assert_eq!(events[..5], vec![EntryEvent::Digit; 5][..]);
        assert_eq!(events[5], EntryEvent::Submit("123456".into()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_terminator_submits_partial_entry() {
        let mut buffer = KeyBuffer::new();
        let events = feed_all(&mut buffer, "12#");

        assert_eq!(events[2], EntryEvent::Submit("12".into()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_and_letters() {
        let mut buffer = KeyBuffer::new();
        let events = feed_all(&mut buffer, "12*A9");

        assert_eq!(events[2], EntryEvent::Cleared);
        assert_eq!(events[3], EntryEvent::Ignored);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = AuthSession::new();
        let b = AuthSession::new();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().get_version_num(), 4);
        assert!(a.face.is_none());
    }
}
