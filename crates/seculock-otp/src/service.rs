//! OTP issuing and delivery.

use crate::ledger::{OtpSettings, OtpVerdict, TicketId, TicketInfo, TicketLedger};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use seculock_core::constants::OTP_SUBJECT;
use seculock_core::{Clock, Error, Result};
use seculock_notify::Notifier;
use std::sync::Arc;
use tracing::{info, warn};

/// Issues tickets and mails their codes to the owner.
#[derive(Debug)]
pub struct OtpService {
    ledger: TicketLedger,
    notifier: Notifier,
}

impl OtpService {
    /// Create a service drawing codes from an OS-seeded RNG.
    pub fn new(settings: OtpSettings, notifier: Notifier, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(settings, notifier, clock, Box::new(StdRng::from_entropy()))
    }

    pub fn with_rng(
        settings: OtpSettings,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send + Sync>,
    ) -> Self {
        Self {
            ledger: TicketLedger::new(settings, clock, rng),
            notifier,
        }
    }

    /// Issue a ticket and deliver its code.
    ///
    /// # Errors
    ///
    /// Returns `Error::Delivery` if the code could not be sent; the ticket
    /// is revoked before returning.
    pub async fn issue(&mut self) -> Result<TicketId> {
        let issued = self.ledger.issue()?;
        let body = format!("Your OTP is: {}", issued.code.expose());

        if let Err(e) = self.notifier.send_plain(OTP_SUBJECT, &body).await {
            self.ledger.revoke(issued.id);
            warn!(ticket = %issued.id, error = %e, "OTP delivery failed, ticket revoked");
            return Err(match e {
                Error::Delivery(_) => e,
                other => Error::Delivery(other.to_string()),
            });
        }

        info!(ticket = %issued.id, to = %self.notifier.recipient(), "OTP sent");
        Ok(issued.id)
    }

    pub fn verify(&mut self, id: TicketId, candidate: &str) -> Result<OtpVerdict> {
        self.ledger.verify(id, candidate)
    }

    pub fn revoke(&mut self, id: TicketId) {
        self.ledger.revoke(id);
    }

    pub fn outstanding(&self) -> Option<TicketInfo> {
        self.ledger.outstanding()
    }

    pub fn settings(&self) -> &OtpSettings {
        self.ledger.settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use seculock_core::ManualClock;
    use seculock_notify::AnyTransport;
    use seculock_notify::mock::{MockOutbox, MockTransport};
    use std::time::Duration;

    fn service() -> (OtpService, MockOutbox) {
        let (transport, outbox) = MockTransport::new();
        let notifier = Notifier::new(
            AnyTransport::Mock(transport),
            "locker@example.com",
            "owner@example.com",
            Duration::from_secs(15),
        );
        let service = OtpService::with_rng(
            OtpSettings::default(),
            notifier,
            Arc::new(ManualClock::new()),
            Box::new(ChaCha20Rng::seed_from_u64(3)),
        );
        (service, outbox)
    }

    fn mailed_code(outbox: &MockOutbox) -> String {
        let sent = outbox.with_subject(OTP_SUBJECT);
        let body = &sent.last().unwrap().notification.body;
        body.strip_prefix("Your OTP is: ").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_issue_mails_code() {
        let (mut service, outbox) = service();

        let id = service.issue().await.unwrap();

        let code = mailed_code(&outbox);
        assert_eq!(code.len(), 6);
        assert_eq!(outbox.sent()[0].envelope.to, "owner@example.com");
        assert_eq!(service.verify(id, &code).unwrap(), OtpVerdict::Valid);
    }

    #[tokio::test]
    async fn test_delivery_failure_revokes_ticket() {
        let (mut service, outbox) = service();
        outbox.set_failing(true);

        let error = service.issue().await.unwrap_err();

        assert!(matches!(error, Error::Delivery(_)));
        assert!(service.outstanding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_timeout_revokes_ticket() {
        let (mut service, outbox) = service();
        outbox.set_delay(Some(Duration::from_secs(60)));

        assert!(matches!(service.issue().await, Err(Error::Delivery(_))));
        assert!(service.outstanding().is_none());
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let (mut service, outbox) = service();
        let first = service.issue().await.unwrap();
        let first_code = mailed_code(&outbox);
        let second = service.issue().await.unwrap();

        assert!(matches!(
            service.verify(first, &first_code),
            Err(Error::Protocol(_))
        ));
        assert_eq!(outbox.with_subject(OTP_SUBJECT).len(), 2);
        assert!(service.outstanding().is_some_and(|t| t.id == second));
    }
}
