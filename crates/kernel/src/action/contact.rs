//! Contact form action.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::input::{ContactInput, FormFields};
use super::{Action, ActionResult};
use crate::error::{ActionError, Service};
use crate::sanitize::{escape_html, nl2br, safe_reply_to, strip_control};
use crate::services::{EmailError, EmailSender, HumanVerifier, OutgoingEmail};

pub const CONTACT_ACTION: &str = "contact";

/// Fixed addressing for contact email.
#[derive(Debug, Clone)]
pub struct ContactSettings {
    pub from: String,
    pub to: String,
    /// Empty means any domain may be used as `Reply-To`.
    pub reply_to_allowed_domains: Vec<String>,
}

/// Sends contact form submissions to the site owner.
pub struct ContactHandler {
    verifier: Arc<dyn HumanVerifier>,
    mailer: Arc<dyn EmailSender>,
    settings: ContactSettings,
}

impl ContactHandler {
    pub fn new(
        verifier: Arc<dyn HumanVerifier>,
        mailer: Arc<dyn EmailSender>,
        settings: ContactSettings,
    ) -> Self {
        Self {
            verifier,
            mailer,
            settings,
        }
    }

    /// Handle an already validated submission.
    pub async fn handle(&self, input: ContactInput) -> ActionResult {
        match self.deliver(input).await {
            Ok(()) => ActionResult::success("Your message has been sent!"),
            Err(e) => {
                warn!(action = CONTACT_ACTION, reason = %e, "contact submission failed");
                e.into()
            }
        }
    }

    async fn deliver(&self, input: ContactInput) -> Result<(), ActionError> {
        if input.honeypot.as_deref().is_some_and(|h| !h.is_empty()) {
            return Err(ActionError::Honeypot);
        }

        if !self.verifier.verify(&input.verification_token).await {
            return Err(ActionError::Verification);
        }

        let email = self.compose(&input);
        match self.mailer.send(&email).await {
            Ok(receipt) => {
                info!(message_id = %receipt.id, "contact email sent");
                Ok(())
            }
            Err(EmailError::NotConfigured(missing)) => {
                error!(%missing, "contact email not sent");
                Err(ActionError::NotConfigured(Service::Email))
            }
            Err(e) => {
                error!(error = %e, "contact email not sent");
                Err(ActionError::EmailDelivery)
            }
        }
    }

    fn compose(&self, input: &ContactInput) -> OutgoingEmail {
        let name = strip_control(&input.name);
        let address = strip_control(&input.email);
        let message = strip_control(&input.message);

        let safe_name = escape_html(&name);
        let safe_email = escape_html(&address);
        let safe_message = nl2br(&escape_html(&message));

        let html = format!(
            "<p>You have a new contact form submission:</p>\n\
             <p><strong>Name:</strong> {safe_name}</p>\n\
             <p><strong>Email:</strong> <a href=\"mailto:{safe_email}\">{safe_email}</a></p>\n\
             <p><strong>Message:</strong></p>\n\
             <p>{safe_message}</p>\n"
        );

        let text = format!(
            "You have a new contact form submission:\n\n\
             Name: {name}\n\
             Email: {address}\n\n\
             Message:\n{message}\n"
        );

        OutgoingEmail {
            from: self.settings.from.clone(),
            to: self.settings.to.clone(),
            subject: format!("New Contact Form Submission from {safe_name}"),
            reply_to: safe_reply_to(&address, &self.settings.reply_to_allowed_domains),
            html,
            text,
        }
    }
}

#[async_trait]
impl Action for ContactHandler {
    fn name(&self) -> &'static str {
        CONTACT_ACTION
    }

    async fn run(&self, fields: FormFields) -> ActionResult {
        match ContactInput::parse(&fields) {
            Ok(input) => self.handle(input).await,
            Err(e) => ActionError::from(e).into(),
        }
    }
}
