//! SMTP transport over an authenticated STARTTLS session.

use crate::config::SmtpConfig;
use crate::message::Notification;
use crate::transport::{Envelope, MailTransport};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use seculock_core::{Error, Result};
use tracing::debug;

/// Mail relay client.
///
/// Connections are opened per delivery by the underlying pool; building the
/// transport does not contact the relay.
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
    port: u16,
}

impl SmtpTransport {
    /// Build a transport for the configured relay.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the relay name cannot be used for TLS.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let inner = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.relay)
            .map_err(|e| Error::Config(format!("smtp relay {}: {e}", config.relay)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.send_timeout()))
            .build();
        Ok(Self {
            inner,
            relay: config.relay.clone(),
            port: config.port,
        })
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("relay", &self.relay)
            .field("port", &self.port)
            .finish()
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::Delivery(format!("invalid address {address:?}: {e}")))
}

/// Compose the MIME message for a notification.
pub(crate) fn build_message(envelope: &Envelope, notification: &Notification) -> Result<Message> {
    let builder = Message::builder()
        .from(mailbox(&envelope.from)?)
        .to(mailbox(&envelope.to)?)
        .subject(notification.subject.clone());

    let message = match &notification.attachment {
        None => builder.singlepart(SinglePart::plain(notification.body.clone())),
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                Error::Delivery(format!(
                    "invalid content type {:?}: {e}",
                    attachment.content_type
                ))
            })?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(notification.body.clone()))
                    .singlepart(
                        lettre::message::Attachment::new(attachment.filename.clone())
                            .body(attachment.bytes.clone(), content_type),
                    ),
            )
        }
    };

    message.map_err(|e| Error::Delivery(format!("failed to build message: {e}")))
}

impl MailTransport for SmtpTransport {
    async fn deliver(&self, envelope: &Envelope, notification: &Notification) -> Result<()> {
        let message = build_message(envelope, notification)?;
        let response = self
            .inner
            .send(message)
            .await
            .map_err(|e| Error::Delivery(format!("{}:{}: {e}", self.relay, self.port)))?;
        debug!(relay = %self.relay, code = %response.code(), "message accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Attachment;

    fn envelope() -> Envelope {
        Envelope {
            from: "locker@example.com".into(),
            to: "owner@example.com".into(),
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_plain_message() {
        let notification = Notification::plain("Your OTP for Verification", "Your OTP is: 123456");
        let text = formatted(&build_message(&envelope(), &notification).unwrap());

        assert!(text.contains("Subject: Your OTP for Verification"));
        assert!(text.contains("To: owner@example.com"));
        assert!(text.contains("Your OTP is: 123456"));
        assert!(!text.contains("multipart"));
    }

    #[test]
    fn test_message_with_attachment() {
        let notification = Notification::plain("Theft detected !!", "Unauthorized access attempt detected.")
            .with_attachment(Attachment::new("captured_face.png", "image/png", vec![0x89, b'P', b'N', b'G']));
        let text = formatted(&build_message(&envelope(), &notification).unwrap());

        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("image/png"));
        assert!(text.contains("captured_face.png"));
        assert!(text.contains("Unauthorized access attempt detected."));
    }

    #[test]
    fn test_invalid_address_is_delivery_error() {
        let envelope = Envelope {
            from: "nobody".into(),
            to: "owner@example.com".into(),
        };
        let result = build_message(&envelope, &Notification::plain("s", "b"));
        assert!(matches!(result, Err(Error::Delivery(_))));
    }

    #[tokio::test]
    async fn test_transport_builds_without_connecting() {
        let config = SmtpConfig {
            username: "locker@example.com".into(),
            password: "secret".into(),
            to: "owner@example.com".into(),
            ..SmtpConfig::default()
        };
        let transport = SmtpTransport::new(&config).unwrap();
        assert!(!format!("{transport:?}").contains("secret"));
    }
}
