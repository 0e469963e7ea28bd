//! Upstream service clients.
//!
//! Each service sits behind a trait so handlers receive it by injection.

pub mod email;
pub mod kit;
pub mod turnstile;

pub use email::{DeliveryReceipt, EmailError, EmailSender, OutgoingEmail, ResendMailer, SmtpMailer};
pub use kit::{KitClient, MailingList, MailingListError};
pub use turnstile::{HumanVerifier, TurnstileVerifier};
