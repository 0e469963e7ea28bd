//! Email delivery: Resend HTTP API or SMTP via lettre.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secrets::{MissingSecret, SecretKey, SecretProvider};

/// Upper bound on one email API round trip.
const EMAIL_TIMEOUT: Duration = Duration::from_secs(8);

/// A fully composed message, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub reply_to: Option<String>,
    pub html: String,
    pub text: String,
}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error(transparent)]
    NotConfigured(#[from] MissingSecret),

    #[error("email API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("email API accepted the message without an id")]
    MissingId,

    #[error("invalid message: {0}")]
    Message(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends one composed email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, EmailError>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    html: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

struct ResendClient {
    http: reqwest::Client,
    api_key: String,
}

/// Resend API mailer.
///
/// The HTTP client is built on first send and reused. Two concurrent first
/// sends may each build one; only the first stored is kept.
pub struct ResendMailer {
    endpoint: String,
    secrets: Arc<dyn SecretProvider>,
    client: OnceLock<ResendClient>,
}

impl ResendMailer {
    pub fn new(endpoint: impl Into<String>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secrets,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&ResendClient, EmailError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let api_key = self.secrets.require(SecretKey::ResendApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(EMAIL_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(self.client.get_or_init(move || ResendClient { http, api_key }))
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, EmailError> {
        let client = self.client()?;

        let request = ResendRequest {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            reply_to: email.reply_to.as_deref(),
            html: &email.html,
            text: &email.text,
        };

        let response = client
            .http
            .post(&self.endpoint)
            .bearer_auth(&client.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: ResendResponse = response.json().await?;
        match body.id {
            Some(id) if !id.is_empty() => Ok(DeliveryReceipt { id }),
            _ => Err(EmailError::MissingId),
        }
    }
}

/// SMTP mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a new SMTP mailer.
    ///
    /// `encryption` controls the SMTP transport mode:
    /// - `"starttls"` (default): Opportunistic STARTTLS on port 587
    /// - `"tls"`: Implicit TLS (SMTPS) on port 465
    /// - `"none"`: Unencrypted (for local dev only)
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: Option<&str>,
        encryption: &str,
        secrets: &dyn SecretProvider,
    ) -> Result<Self, EmailError> {
        let mut builder = match encryption {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port),
            "none" => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(smtp_port)
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)?.port(smtp_port),
        };

        if let (Some(user), Some(pass)) = (smtp_username, secrets.get(SecretKey::SmtpPassword)) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Build the lettre message for an [`OutgoingEmail`].
fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
    let mailbox = |field: &str, value: &str| -> Result<Mailbox, EmailError> {
        value
            .parse()
            .map_err(|e| EmailError::Message(format!("invalid {field} address: {e}")))
    };

    let mut builder = Message::builder()
        .from(mailbox("from", &email.from)?)
        .to(mailbox("to", &email.to)?)
        .subject(email.subject.clone());

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(mailbox("reply-to", reply_to)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(|e| EmailError::Message(e.to_string()))
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, EmailError> {
        let message = build_message(email)?;
        let response = self.transport.send(message).await?;

        let id = response.message().collect::<Vec<_>>().join(" ");
        if id.is_empty() {
            return Ok(DeliveryReceipt {
                id: response.code().to_string(),
            });
        }
        Ok(DeliveryReceipt { id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::secrets::StaticSecrets;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "Contact Form <contact@example.com>".to_string(),
            to: "owner@example.com".to_string(),
            subject: "Hello".to_string(),
            reply_to: Some("alice@example.com".to_string()),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
        }
    }

    #[tokio::test]
    async fn resend_without_key_is_not_configured() {
        let mailer = ResendMailer::new("http://127.0.0.1:9/emails", Arc::new(StaticSecrets::new()));
        let err = mailer.send(&email()).await.unwrap_err();
        assert!(matches!(
            err,
            EmailError::NotConfigured(MissingSecret(SecretKey::ResendApiKey))
        ));
    }

    #[test]
    fn resend_request_omits_absent_reply_to() {
        let request = ResendRequest {
            from: "a@example.com",
            to: ["b@example.com"],
            subject: "s",
            reply_to: None,
            html: "h",
            text: "t",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("reply_to").is_none());
        assert_eq!(json["to"], serde_json::json!(["b@example.com"]));
    }

    #[test]
    fn builds_multipart_message_with_reply_to() {
        let message = build_message(&email()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Reply-To: alice@example.com"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_invalid_sender() {
        let mut bad = email();
        bad.from = "not an address".to_string();
        assert!(matches!(build_message(&bad), Err(EmailError::Message(_))));
    }

    #[test]
    fn smtp_mailer_supports_all_modes() {
        let secrets = StaticSecrets::new();
        // Construction is lazy; no connection is attempted.
        for mode in ["starttls", "tls", "none"] {
            assert!(SmtpMailer::new("localhost", 25, None, mode, &secrets).is_ok());
        }
    }
}
