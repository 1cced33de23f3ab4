//! Mail transport abstraction.

#![allow(async_fn_in_trait)]

use crate::message::Notification;
use crate::mock::MockTransport;
use crate::smtp::SmtpTransport;
use seculock_core::Result;
use tracing::info;

/// Sender and recipient of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
}

/// Something that can deliver a notification.
pub trait MailTransport: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `Error::Delivery` when the message is rejected or the
    /// connection fails.
    async fn deliver(&self, envelope: &Envelope, notification: &Notification) -> Result<()>;
}

/// Transport that writes notifications to the log.
///
/// The body is logged verbatim, OTP codes included, so this is only meant
/// for bench setups without mail access.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    async fn deliver(&self, envelope: &Envelope, notification: &Notification) -> Result<()> {
        info!(
            to = %envelope.to,
            subject = %notification.subject,
            body = %notification.body,
            attachment = notification.attachment.as_ref().map(|a| a.filename.as_str()),
            "notification"
        );
        Ok(())
    }
}

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    Smtp(SmtpTransport),
    Log(LogTransport),
    Mock(MockTransport),
}

impl MailTransport for AnyTransport {
    async fn deliver(&self, envelope: &Envelope, notification: &Notification) -> Result<()> {
        match self {
            Self::Smtp(transport) => transport.deliver(envelope, notification).await,
            Self::Log(transport) => transport.deliver(envelope, notification).await,
            Self::Mock(transport) => transport.deliver(envelope, notification).await,
        }
    }
}
