//! Newsletter signup action.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::input::{FormFields, NewsletterInput};
use super::{Action, ActionResult};
use crate::error::{ActionError, Service};
use crate::sanitize::sanitize_upstream_message;
use crate::services::{HumanVerifier, MailingList, MailingListError};

pub const NEWSLETTER_ACTION: &str = "newsletterSubscribe";

/// Subscribes an address and attaches it to the configured list.
pub struct NewsletterHandler {
    verifier: Arc<dyn HumanVerifier>,
    mailing_list: Arc<dyn MailingList>,
}

impl NewsletterHandler {
    pub fn new(verifier: Arc<dyn HumanVerifier>, mailing_list: Arc<dyn MailingList>) -> Self {
        Self {
            verifier,
            mailing_list,
        }
    }

    /// Handle an already validated signup.
    pub async fn handle(&self, input: NewsletterInput) -> ActionResult {
        match self.subscribe(input).await {
            Ok(()) => {
                ActionResult::success("You're in! Check your email to confirm your subscription.")
            }
            Err(e) => {
                warn!(action = NEWSLETTER_ACTION, reason = %e, "newsletter signup failed");
                e.into()
            }
        }
    }

    async fn subscribe(&self, input: NewsletterInput) -> Result<(), ActionError> {
        if input.honeypot.as_deref().is_some_and(|h| !h.is_empty()) {
            return Err(ActionError::Honeypot);
        }

        if !self.verifier.verify(&input.verification_token).await {
            return Err(ActionError::Verification);
        }

        match self.mailing_list.create_subscriber(&input.email).await {
            Ok(()) => {}
            Err(MailingListError::NotConfigured(missing)) => {
                error!(%missing, "mailing list not configured");
                return Err(ActionError::NotConfigured(Service::MailingList));
            }
            Err(e) => {
                error!(error = %e, "create subscriber failed");
                let detail = e.provider_message().map(sanitize_upstream_message);
                return Err(ActionError::SubscribeRejected { detail });
            }
        }

        // The subscriber exists from here on; any failure is partial.
        if let Err(e) = self.mailing_list.add_to_form(&input.email).await {
            error!(error = %e, "add subscriber to form failed");
            return Err(ActionError::PartialSubscription);
        }

        info!("newsletter subscriber added");
        Ok(())
    }
}

#[async_trait]
impl Action for NewsletterHandler {
    fn name(&self) -> &'static str {
        NEWSLETTER_ACTION
    }

    async fn run(&self, fields: FormFields) -> ActionResult {
        match NewsletterInput::parse(&fields) {
            Ok(input) => self.handle(input).await,
            Err(e) => ActionError::from(e).into(),
        }
    }
}
