//! Display text fitting and the shared display handle.
//!
//! The LCD shows two lines of sixteen ASCII characters. Every write goes
//! through [`fit_line`], which strips control characters, replaces
//! characters the display ROM cannot show, truncates and pads.
//!
//! # Examples
//!
//! ```
//! use seculock_hardware::display::{Alignment, align_text, fit_line};
//!
//! assert_eq!(fit_line("Access Granted"), "Access Granted  ");
//! assert_eq!(fit_line("Authentication failed"), "Authentication f");
//! assert_eq!(align_text("OK", 6, Alignment::Center), "  OK  ");
//! ```

use crate::error::Result;
use crate::traits::CharacterDisplay;
use seculock_core::DisplayLine;
use seculock_core::constants::DISPLAY_COLUMNS;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Text alignment options for display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Left-aligned text (default).
    #[default]
    Left,
    /// Center-aligned text.
    Center,
    /// Right-aligned text.
    Right,
}

/// Truncate text to a maximum number of characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Align text within the given width, truncating if longer.
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let char_count = text.chars().count();

    if char_count >= width {
        return truncate_text(text, width);
    }

    let padding = width - char_count;

    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

/// Fit text to one left-aligned display line.
pub fn fit_line(text: &str) -> String {
    align_text(&sanitize_text(text), DISPLAY_COLUMNS, Alignment::Left)
}

fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Display shared between the authenticator and the intrusion monitor.
///
/// [`show`](Self::show) writes both lines under one lock, so concurrent
/// writers never interleave their lines.
#[derive(Debug)]
pub struct SharedDisplay<D: CharacterDisplay> {
    inner: Arc<Mutex<D>>,
}

impl<D: CharacterDisplay> SharedDisplay<D> {
    pub fn new(display: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(display)),
        }
    }

    /// Replace both lines.
    pub async fn show(&self, top: &str, bottom: &str) -> Result<()> {
        let mut display = self.inner.lock().await;
        display.write_line(DisplayLine::Top, &fit_line(top)).await?;
        display.write_line(DisplayLine::Bottom, &fit_line(bottom)).await
    }

    /// Blank the display.
    pub async fn clear(&self) -> Result<()> {
        self.inner.lock().await.clear().await
    }
}

impl<D: CharacterDisplay> Clone for SharedDisplay<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Display that writes its lines to the log.
///
/// Used when the board has no LCD attached, and by `--check-config` runs.
#[derive(Debug, Default)]
pub struct LogDisplay {
    lines: [String; 2],
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of a line.
    pub fn line(&self, line: DisplayLine) -> &str {
        &self.lines[line.index()]
    }
}

impl CharacterDisplay for LogDisplay {
    async fn write_line(&mut self, line: DisplayLine, text: &str) -> Result<()> {
        self.lines[line.index()] = text.to_string();
        if line == DisplayLine::Bottom {
            info!(
                top = self.lines[0].trim_end(),
                bottom = self.lines[1].trim_end(),
                "display"
            );
        }
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.lines = Default::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDisplay;
    use rstest::rstest;

    #[rstest]
    #[case("Access Granted", "Access Granted  ")]
    #[case("", "                ")]
    #[case("exactly sixteen!", "exactly sixteen!")]
    #[case("Incorrect OTP, 2 attempts left", "Incorrect OTP, 2")]
    #[case("  padded  ", "padded          ")]
    #[case("tab\there", "tabhere         ")]
    #[case("caf\u{e9}", "caf?            ")]
    fn test_fit_line(#[case] input: &str, #[case] expected: &str) {
        let fitted = fit_line(input);
        assert_eq!(fitted, expected);
        assert_eq!(fitted.len(), DISPLAY_COLUMNS);
    }

    #[rstest]
    #[case(Alignment::Left, "ab    ")]
    #[case(Alignment::Right, "    ab")]
    #[case(Alignment::Center, "  ab  ")]
    fn test_align_text(#[case] alignment: Alignment, #[case] expected: &str) {
        assert_eq!(align_text("ab", 6, alignment), expected);
    }

    #[test]
    fn test_align_text_odd_padding() {
        assert_eq!(align_text("abc", 6, Alignment::Center), " abc  ");
    }

    #[tokio::test]
    async fn test_shared_display_writes_both_lines() {
        let (display, handle) = MockDisplay::new();
        let shared = SharedDisplay::new(display);

        shared.show("Face not", "recognized").await.unwrap();

        assert_eq!(handle.lines(), ["Face not", "recognized"]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_interleave() {
        let (display, handle) = MockDisplay::new();
        let shared = SharedDisplay::new(display);
        let other = shared.clone();

        let a = tokio::spawn(async move { shared.show("Intrusion", "Alarm on").await });
        let b = tokio::spawn(async move { other.show("Enter OTP:", "").await });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let history = handle.history();
        assert_eq!(history.len(), 4);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].0, DisplayLine::Top);
            assert_eq!(pair[1].0, DisplayLine::Bottom);
        }
    }

    #[tokio::test]
    async fn test_log_display_keeps_lines() {
        let mut display = LogDisplay::new();
        display
            .write_line(DisplayLine::Top, &fit_line("Welcome"))
            .await
            .unwrap();
        assert_eq!(display.line(DisplayLine::Top).trim_end(), "Welcome");

        display.clear().await.unwrap();
        assert_eq!(display.line(DisplayLine::Top), "");
    }
}
