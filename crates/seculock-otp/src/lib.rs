//! One-time passwords for the SecuLock locker controller.
//!
//! [`OtpService`] issues six-digit codes, mails them to the owner through a
//! [`Notifier`](seculock_notify::Notifier) and checks keypad entries against
//! the single outstanding ticket kept by [`TicketLedger`].

pub mod ledger;
pub mod policy;
pub mod service;

pub use ledger::{IssuedTicket, OtpSettings, OtpVerdict, TicketId, TicketInfo, TicketLedger};
pub use policy::CodePolicy;
pub use service::OtpService;
