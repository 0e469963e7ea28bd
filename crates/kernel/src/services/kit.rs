//! Kit mailing-list API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secrets::{MissingSecret, SecretKey, SecretProvider};

/// Upper bound on one Kit round trip.
const KIT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Error)]
pub enum MailingListError {
    #[error(transparent)]
    NotConfigured(#[from] MissingSecret),

    #[error("mailing list request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `errors` holds the provider's error strings,
    /// unsanitized.
    #[error("mailing list returned {status}: {errors:?}")]
    Status { status: u16, errors: Vec<String> },
}

impl MailingListError {
    /// First error string reported by the provider, if any.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            MailingListError::Status { errors, .. } => errors.first().map(String::as_str),
            _ => None,
        }
    }
}

/// Subscriber management on a mailing-list provider.
#[async_trait]
pub trait MailingList: Send + Sync {
    /// Create the subscriber, or update it if it already exists.
    async fn create_subscriber(&self, email: &str) -> Result<(), MailingListError>;

    /// Attach an existing subscriber to the configured form/list.
    async fn add_to_form(&self, email: &str) -> Result<(), MailingListError>;
}

#[derive(Serialize)]
struct SubscriberRequest<'a> {
    email_address: &'a str,
}

#[derive(Default, Deserialize)]
struct KitErrorBody {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

struct KitCredentials {
    api_key: String,
    form_id: String,
}

/// Kit v4 API client.
pub struct KitClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Result<KitCredentials, MissingSecret>,
}

impl KitClient {
    pub fn new(base_url: impl Into<String>, secrets: &dyn SecretProvider) -> Self {
        let client = reqwest::Client::builder()
            .timeout(KIT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        let credentials = secrets.require(SecretKey::KitApiKey).and_then(|api_key| {
            let form_id = secrets.require(SecretKey::KitFormId)?;
            Ok(KitCredentials { api_key, form_id })
        });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn credentials(&self) -> Result<&KitCredentials, MailingListError> {
        self.credentials
            .as_ref()
            .map_err(|missing| MailingListError::NotConfigured(*missing))
    }

    async fn post_subscriber(
        &self,
        url: String,
        api_key: &str,
        email: &str,
    ) -> Result<(), MailingListError> {
        let response = self
            .client
            .post(url)
            .header("X-Kit-Api-Key", api_key)
            .json(&SubscriberRequest {
                email_address: email,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: KitErrorBody = response.json().await.unwrap_or_default();
        let errors = body
            .errors
            .into_iter()
            .filter_map(|e| e.as_str().map(str::to_string))
            .collect();

        Err(MailingListError::Status {
            status: status.as_u16(),
            errors,
        })
    }
}

#[async_trait]
impl MailingList for KitClient {
    async fn create_subscriber(&self, email: &str) -> Result<(), MailingListError> {
        let credentials = self.credentials()?;
        let url = format!("{}/subscribers", self.base_url);
        self.post_subscriber(url, &credentials.api_key, email).await
    }

    async fn add_to_form(&self, email: &str) -> Result<(), MailingListError> {
        let credentials = self.credentials()?;
        let url = format!(
            "{}/forms/{}/subscribers",
            self.base_url,
            encode_segment(&credentials.form_id)
        );
        self.post_subscriber(url, &credentials.api_key, email).await
    }
}

/// Percent-encode a single path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
