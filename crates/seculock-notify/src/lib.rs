//! Owner notifications for the SecuLock locker controller.
//!
//! A [`Notifier`] sends [`Notification`]s (subject, body and an optional
//! image attachment) from a fixed sender to the locker owner through a
//! [`MailTransport`]. The production transport is an authenticated
//! STARTTLS SMTP session; tests use [`MockTransport`](mock::MockTransport).
//!
//! ```
//! use seculock_notify::Notifier;
//! use seculock_notify::mock::MockTransport;
//! use seculock_notify::transport::AnyTransport;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> seculock_core::Result<()> {
//!     let (transport, outbox) = MockTransport::new();
//!     let notifier = Notifier::new(
//!         AnyTransport::Mock(transport),
//!         "locker@example.com",
//!         "owner@example.com",
//!         Duration::from_secs(15),
//!     );
//!
//!     notifier.send_plain("Theft Detected", "Vibration sensors activated").await?;
//!     assert_eq!(outbox.sent()[0].notification.subject, "Theft Detected");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod message;
pub mod mock;
pub mod notifier;
pub mod smtp;
pub mod transport;

pub use config::{SmtpConfig, TransportKind};
pub use message::{Attachment, Notification};
pub use notifier::Notifier;
pub use transport::{AnyTransport, Envelope, MailTransport};
