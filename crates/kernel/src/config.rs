//! Configuration loaded from environment variables.
//!
//! Secrets are not part of [`Config`]; they are resolved through
//! [`crate::secrets::SecretProvider`].

use std::env;

use anyhow::{Context, Result};
use url::Url;

/// Default Turnstile verification endpoint.
pub const DEFAULT_TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Default Resend email API endpoint.
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Default Kit (mailing list) API base URL.
pub const DEFAULT_KIT_API_URL: &str = "https://api.kit.com/v4";

/// Which transport delivers contact form email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTransport {
    /// Resend HTTP API.
    Resend,
    /// SMTP relay via lettre.
    Smtp,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Public site URL. Used as the origin fallback when a request carries
    /// no usable `Host` header.
    pub site_url: Url,

    /// Sender of contact form email.
    pub contact_from: String,

    /// Recipient of contact form email.
    pub contact_to: String,

    /// Domains allowed as contact `Reply-To` (comma-separated, default: any).
    pub reply_to_allowed_domains: Vec<String>,

    /// Paths served as precomputed pages (comma-separated, default: "/about").
    pub prerendered_paths: Vec<String>,

    /// Email transport: "resend" (default) or "smtp".
    pub email_transport: EmailTransport,

    /// SMTP host, required when `email_transport` is SMTP.
    pub smtp_host: Option<String>,

    /// SMTP port (default: 587).
    pub smtp_port: u16,

    /// SMTP username for authentication.
    pub smtp_username: Option<String>,

    /// SMTP encryption mode: "starttls" (default), "tls", or "none".
    pub smtp_encryption: String,

    /// Turnstile widget site key. Public; forms render the widget when set.
    pub turnstile_site_key: Option<String>,

    pub turnstile_verify_url: String,
    pub resend_api_url: String,
    pub kit_api_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));
        let site_url = Url::parse(&site_url).context("SITE_URL must be an absolute URL")?;

        let contact_from = env::var("CONTACT_FROM")
            .unwrap_or_else(|_| "Contact Form <contact@localhost>".to_string());
        let contact_to = env::var("CONTACT_TO").unwrap_or_else(|_| "owner@localhost".to_string());

        let reply_to_allowed_domains = env::var("REPLY_TO_ALLOWED_DOMAINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let prerendered_paths = env::var("PRERENDERED_PATHS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| vec!["/about".to_string()]);

        let email_transport = match env::var("EMAIL_TRANSPORT")
            .unwrap_or_else(|_| "resend".to_string())
            .to_lowercase()
            .as_str()
        {
            "resend" => EmailTransport::Resend,
            "smtp" => EmailTransport::Smtp,
            other => anyhow::bail!("EMAIL_TRANSPORT must be \"resend\" or \"smtp\", got {other:?}"),
        };

        let smtp_host = env::var("SMTP_HOST").ok().filter(|h| !h.is_empty());

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("SMTP_PORT must be a valid u16")?;

        let smtp_username = env::var("SMTP_USERNAME").ok();

        let smtp_encryption = env::var("SMTP_ENCRYPTION")
            .unwrap_or_else(|_| "starttls".to_string())
            .to_lowercase();

        let turnstile_site_key = env::var("TURNSTILE_SITE_KEY").ok().filter(|k| !k.is_empty());

        let turnstile_verify_url = env::var("TURNSTILE_VERIFY_URL")
            .unwrap_or_else(|_| DEFAULT_TURNSTILE_VERIFY_URL.to_string());
        let resend_api_url =
            env::var("RESEND_API_URL").unwrap_or_else(|_| DEFAULT_RESEND_API_URL.to_string());
        let kit_api_url =
            env::var("KIT_API_URL").unwrap_or_else(|_| DEFAULT_KIT_API_URL.to_string());

        Ok(Self {
            port,
            site_url,
            contact_from,
            contact_to,
            reply_to_allowed_domains,
            prerendered_paths,
            email_transport,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_encryption,
            turnstile_site_key,
            turnstile_verify_url,
            resend_api_url,
            kit_api_url,
        })
    }

    /// Configuration for local development and tests.
    ///
    /// Points every upstream at its public default and treats
    /// `site_url` as the request origin fallback.
    pub fn for_site(site_url: Url) -> Self {
        Self {
            port: site_url.port_or_known_default().unwrap_or(3000),
            site_url,
            contact_from: "Contact Form <contact@localhost>".to_string(),
            contact_to: "owner@localhost".to_string(),
            reply_to_allowed_domains: Vec::new(),
            prerendered_paths: vec!["/about".to_string()],
            email_transport: EmailTransport::Resend,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_encryption: "starttls".to_string(),
            turnstile_site_key: None,
            turnstile_verify_url: DEFAULT_TURNSTILE_VERIFY_URL.to_string(),
            resend_api_url: DEFAULT_RESEND_API_URL.to_string(),
            kit_api_url: DEFAULT_KIT_API_URL.to_string(),
        }
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
