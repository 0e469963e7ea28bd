//! Application state shared across all handlers.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

use crate::action::{ActionRegistry, ContactHandler, ContactSettings, NewsletterHandler};
use crate::config::{Config, EmailTransport};
use crate::secrets::{SecretKey, SecretProvider};
use crate::services::{
    EmailSender, HumanVerifier, KitClient, MailingList, ResendMailer, SmtpMailer,
    TurnstileVerifier,
};

/// Upstream services the actions depend on.
#[derive(Clone)]
pub struct Services {
    pub verifier: Arc<dyn HumanVerifier>,
    pub mailer: Arc<dyn EmailSender>,
    pub mailing_list: Arc<dyn MailingList>,
}

impl Services {
    /// Build the production clients.
    pub fn from_config(config: &Config, secrets: Arc<dyn SecretProvider>) -> Result<Self> {
        let verifier = TurnstileVerifier::new(&config.turnstile_verify_url, secrets.as_ref());

        let mailer: Arc<dyn EmailSender> = match config.email_transport {
            EmailTransport::Resend => {
                Arc::new(ResendMailer::new(&config.resend_api_url, secrets.clone()))
            }
            EmailTransport::Smtp => {
                let host = config
                    .smtp_host
                    .as_deref()
                    .context("SMTP_HOST is required when EMAIL_TRANSPORT=smtp")?;
                let mailer = SmtpMailer::new(
                    host,
                    config.smtp_port,
                    config.smtp_username.as_deref(),
                    &config.smtp_encryption,
                    secrets.as_ref(),
                )
                .context("failed to create SMTP transport")?;
                Arc::new(mailer)
            }
        };

        let mailing_list = KitClient::new(&config.kit_api_url, secrets.as_ref());

        for key in [
            SecretKey::TurnstileSecretKey,
            SecretKey::ResendApiKey,
            SecretKey::KitApiKey,
            SecretKey::KitFormId,
        ] {
            if secrets.get(key).is_none() {
                info!(secret = %key, "secret not configured");
            }
        }

        Ok(Self {
            verifier: Arc::new(verifier),
            mailer,
            mailing_list: Arc::new(mailing_list),
        })
    }
}

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Public site URL, the origin fallback.
    site_url: Url,

    /// Paths served as precomputed pages.
    prerendered: HashSet<String>,

    /// Turnstile widget site key, rendered into forms when set.
    turnstile_site_key: Option<String>,

    actions: ActionRegistry,
}

impl AppState {
    /// State serving the contact and newsletter actions.
    pub fn new(config: &Config, services: Services) -> Self {
        let contact = ContactHandler::new(
            services.verifier.clone(),
            services.mailer,
            ContactSettings {
                from: config.contact_from.clone(),
                to: config.contact_to.clone(),
                reply_to_allowed_domains: config.reply_to_allowed_domains.clone(),
            },
        );
        let newsletter = NewsletterHandler::new(services.verifier, services.mailing_list);

        let actions = ActionRegistry::new()
            .register(Arc::new(contact))
            .register(Arc::new(newsletter));

        Self::with_actions(config, actions)
    }

    /// State serving an arbitrary set of actions.
    pub fn with_actions(config: &Config, actions: ActionRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                site_url: config.site_url.clone(),
                prerendered: config.prerendered_paths.iter().cloned().collect(),
                turnstile_site_key: config.turnstile_site_key.clone(),
                actions,
            }),
        }
    }

    pub fn site_url(&self) -> &Url {
        &self.inner.site_url
    }

    pub fn is_prerendered(&self, path: &str) -> bool {
        self.inner.prerendered.contains(path)
    }

    pub fn turnstile_site_key(&self) -> Option<&str> {
        self.inner.turnstile_site_key.as_deref()
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.inner.actions
    }
}
