//! Composes notifications and sends them to the owner.

use crate::message::{Attachment, Notification};
use crate::transport::{AnyTransport, Envelope, MailTransport};
use seculock_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Sends notifications from a fixed sender to a fixed recipient.
///
/// Cheap to clone; clones share the transport. Every delivery runs under
/// the configured send timeout.
#[derive(Debug, Clone)]
pub struct Notifier {
    transport: Arc<AnyTransport>,
    envelope: Envelope,
    send_timeout: Duration,
}

impl Notifier {
    pub fn new(
        transport: AnyTransport,
        from: impl Into<String>,
        to: impl Into<String>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            envelope: Envelope {
                from: from.into(),
                to: to.into(),
            },
            send_timeout,
        }
    }

    /// Recipient address.
    pub fn recipient(&self) -> &str {
        &self.envelope.to
    }

    /// Send a notification.
    ///
    /// # Errors
    ///
    /// Returns `Error::Delivery` if the transport fails or the send timeout
    /// elapses.
    pub async fn send(&self, notification: &Notification) -> Result<()> {
        tokio::time::timeout(
            self.send_timeout,
            self.transport.deliver(&self.envelope, notification),
        )
        .await
        .map_err(|_| {
            Error::Delivery(format!(
                "no response within {}ms",
                self.send_timeout.as_millis()
            ))
        })??;

        info!(
            to = %self.envelope.to,
            subject = %notification.subject,
            attachment = notification.attachment.is_some(),
            "notification sent"
        );
        Ok(())
    }

    /// Send a text-only notification.
    pub async fn send_plain(&self, subject: &str, body: &str) -> Result<()> {
        self.send(&Notification::plain(subject, body)).await
    }

    /// Send a notification with the image at `image` attached.
    ///
    /// If the image cannot be read the notification is still sent, without
    /// the attachment.
    pub async fn send_with_image(&self, subject: &str, body: &str, image: &Path) -> Result<()> {
        let mut notification = Notification::plain(subject, body);
        match tokio::fs::read(image).await {
            Ok(bytes) => {
                notification = notification.with_attachment(Attachment::from_path(image, bytes));
            }
            Err(e) => {
                warn!(path = %image.display(), error = %e, "sending alert without image");
            }
        }
        self.send(&notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockOutbox, MockTransport};

    fn notifier() -> (Notifier, MockOutbox) {
        let (transport, outbox) = MockTransport::new();
        (
            Notifier::new(
                AnyTransport::Mock(transport),
                "locker@example.com",
                "owner@example.com",
                Duration::from_secs(15),
            ),
            outbox,
        )
    }

    #[tokio::test]
    async fn test_send_plain_uses_fixed_envelope() {
        let (notifier, outbox) = notifier();

        notifier.send_plain("Theft Detected", "sensor 1").await.unwrap();

        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].envelope.from, "locker@example.com");
        assert_eq!(sent[0].envelope.to, "owner@example.com");
        assert_eq!(sent[0].notification.body, "sensor 1");
        assert!(sent[0].notification.attachment.is_none());
    }

    #[tokio::test]
    async fn test_send_with_image_attaches_file() {
        let (notifier, outbox) = notifier();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured_face.png");
        std::fs::write(&path, b"png bytes").unwrap();

        notifier
            .send_with_image("Theft detected !!", "Unauthorized access attempt detected.", &path)
            .await
            .unwrap();

        let attachment = outbox.sent()[0].notification.attachment.clone().unwrap();
        assert_eq!(attachment.filename, "captured_face.png");
        assert_eq!(attachment.content_type, "image/png");
        assert_eq!(attachment.bytes, b"png bytes");
    }

    #[tokio::test]
    async fn test_missing_image_sends_without_attachment() {
        let (notifier, outbox) = notifier();
        let dir = tempfile::tempdir().unwrap();

        notifier
            .send_with_image("Theft detected !!", "body", &dir.path().join("missing.png"))
            .await
            .unwrap();

        assert!(outbox.sent()[0].notification.attachment.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_delivery_error() {
        let (notifier, outbox) = notifier();
        outbox.set_failing(true);

        let error = notifier.send_plain("s", "b").await.unwrap_err();
        assert!(matches!(error, Error::Delivery(_)));
        assert_eq!(outbox.attempts(), 1);
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transport_times_out() {
        let (notifier, outbox) = notifier();
        outbox.set_delay(Some(Duration::from_secs(60)));

        let error = notifier.send_plain("s", "b").await.unwrap_err();
        assert!(matches!(error, Error::Delivery(ref m) if m.contains("15000ms")));
    }
}
