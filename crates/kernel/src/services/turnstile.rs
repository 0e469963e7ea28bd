//! Cloudflare Turnstile human verification.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::secrets::{SecretKey, SecretProvider};

/// Upper bound on one siteverify round trip.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides whether a submission came from a human.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
    /// Returns `true` only on a positive verdict. Errors and timeouts are
    /// negative verdicts.
    async fn verify(&self, token: &str) -> bool;
}

#[derive(Deserialize)]
struct SiteverifyResponse {
    #[serde(default)]
    success: bool,
}

/// Turnstile siteverify client.
///
/// Without a configured secret every request is treated as human, so local
/// development works without Cloudflare credentials.
pub struct TurnstileVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl TurnstileVerifier {
    pub fn new(endpoint: impl Into<String>, secrets: &dyn SecretProvider) -> Self {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
            secret: secrets.get(SecretKey::TurnstileSecretKey),
        }
    }
}

#[async_trait]
impl HumanVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str) -> bool {
        let Some(secret) = &self.secret else {
            debug!("TURNSTILE_SECRET_KEY not configured, skipping verification");
            return true;
        };

        if token.is_empty() {
            return false;
        }

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("secret", secret.as_str()), ("response", token)])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "turnstile request failed");
                return false;
            }
        };

        match response.json::<SiteverifyResponse>().await {
            Ok(body) => body.success,
            Err(e) => {
                warn!(error = %e, "unreadable turnstile response");
                false
            }
        }
    }
}
