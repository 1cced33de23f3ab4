//! The single outstanding OTP ticket.
//!
//! Issuing replaces whatever ticket was outstanding. A ticket answers
//! [`OtpVerdict::Valid`] once and is then consumed; wrong guesses use up
//! its attempts, after which it only ever answers [`OtpVerdict::Expired`],
//! as it does once its validity window has passed.
//!
//! ```
//! use seculock_otp::{OtpVerdict, TicketLedger, OtpSettings};
//! use seculock_core::ManualClock;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use std::sync::Arc;
//!
//! let clock = ManualClock::new();
//! let mut ledger = TicketLedger::new(
//!     OtpSettings::default(),
//!     Arc::new(clock.clone()),
//!     Box::new(StdRng::seed_from_u64(42)),
//! );
//!
//! let issued = ledger.issue().unwrap();
//! let code = issued.code.expose().to_string();
//! assert_eq!(ledger.verify(issued.id, &code).unwrap(), OtpVerdict::Valid);
//! assert!(ledger.verify(issued.id, &code).is_err());
//! ```

use crate::policy::CodePolicy;
use rand::RngCore;
use seculock_core::constants::{DEFAULT_OTP_ATTEMPTS, DEFAULT_OTP_TTL};
use seculock_core::{Clock, Error, OtpCode, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Opaque identifier of an issued ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of checking a candidate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerdict {
    Valid,
    Invalid { remaining: u8 },
    Expired,
}

/// Ticket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSettings {
    pub ttl: Duration,
    pub max_attempts: u8,
    pub policy: CodePolicy,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_OTP_TTL,
            max_attempts: DEFAULT_OTP_ATTEMPTS,
            policy: CodePolicy::default(),
        }
    }
}

/// A freshly issued ticket, with the code for delivery.
#[derive(Debug)]
pub struct IssuedTicket {
    pub id: TicketId,
    pub code: OtpCode,
    pub expires_at: Instant,
}

/// Public view of the outstanding ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketInfo {
    pub id: TicketId,
    pub issued_at: Instant,
    pub expires_at: Instant,
    pub remaining_attempts: u8,
}

#[derive(Debug)]
struct Ticket {
    id: TicketId,
    code: OtpCode,
    issued_at: Instant,
    expires_at: Instant,
    remaining: u8,
}

/// Holder of the one outstanding ticket.
pub struct TicketLedger {
    settings: OtpSettings,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send + Sync>,
    next_id: u64,
    current: Option<Ticket>,
}

impl TicketLedger {
    pub fn new(
        settings: OtpSettings,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            clock,
            rng,
            next_id: 1,
            current: None,
        }
    }

    pub fn settings(&self) -> &OtpSettings {
        &self.settings
    }

    /// Issue a new ticket, invalidating any outstanding one.
    pub fn issue(&mut self) -> Result<IssuedTicket> {
        let code = self.settings.policy.generate(&mut self.rng)?;
        let issued_at = self.clock.now();
        let id = TicketId(self.next_id);
        self.next_id += 1;

        if let Some(previous) = self.current.take() {
            debug!(previous = %previous.id, "superseding outstanding ticket");
        }

        let expires_at = issued_at + self.settings.ttl;
        self.current = Some(Ticket {
            id,
            code: code.clone(),
            issued_at,
            expires_at,
            remaining: self.settings.max_attempts,
        });
        debug!(ticket = %id, "ticket issued");

        Ok(IssuedTicket {
            id,
            code,
            expires_at,
        })
    }

    /// Check `candidate` against ticket `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if `id` is not the outstanding ticket
    /// (never issued, superseded, consumed or revoked).
    pub fn verify(&mut self, id: TicketId, candidate: &str) -> Result<OtpVerdict> {
        let now = self.clock.now();
        let ticket = match self.current.as_mut() {
            Some(ticket) if ticket.id == id => ticket,
            _ => {
                return Err(Error::Protocol(format!("ticket {id} is not outstanding")));
            }
        };

        if ticket.remaining == 0 || now >= ticket.expires_at {
            return Ok(OtpVerdict::Expired);
        }

        if ticket.code.matches(candidate) {
            self.current = None;
            debug!(ticket = %id, "ticket consumed");
            return Ok(OtpVerdict::Valid);
        }

        ticket.remaining -= 1;
        Ok(OtpVerdict::Invalid {
            remaining: ticket.remaining,
        })
    }

    /// Withdraw ticket `id` if it is still outstanding.
    pub fn revoke(&mut self, id: TicketId) {
        if self.current.as_ref().is_some_and(|ticket| ticket.id == id) {
            self.current = None;
            debug!(ticket = %id, "ticket revoked");
        }
    }

    pub fn outstanding(&self) -> Option<TicketInfo> {
        self.current.as_ref().map(|ticket| TicketInfo {
            id: ticket.id,
            issued_at: ticket.issued_at,
            expires_at: ticket.expires_at,
            remaining_attempts: ticket.remaining,
        })
    }
}

impl fmt::Debug for TicketLedger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TicketLedger")
            .field("settings", &self.settings)
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}
