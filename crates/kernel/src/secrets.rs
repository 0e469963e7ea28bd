//! Secret lookup behind a single provider interface.
//!
//! Handlers never read the environment directly. Every secret a service
//! needs is named by a [`SecretKey`] and resolved through a
//! [`SecretProvider`], which reports absence explicitly.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Every secret the kernel knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKey {
    ResendApiKey,
    KitApiKey,
    KitFormId,
    TurnstileSecretKey,
    SmtpPassword,
}

impl SecretKey {
    /// Environment variable name for this secret.
    pub fn env_name(self) -> &'static str {
        match self {
            SecretKey::ResendApiKey => "RESEND_API_KEY",
            SecretKey::KitApiKey => "KIT_API_KEY",
            SecretKey::KitFormId => "KIT_FORM_ID",
            SecretKey::TurnstileSecretKey => "TURNSTILE_SECRET_KEY",
            SecretKey::SmtpPassword => "SMTP_PASSWORD",
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_name())
    }
}

/// A required secret is not configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not configured")]
pub struct MissingSecret(pub SecretKey);

/// Source of secret values.
pub trait SecretProvider: Send + Sync {
    /// Look up a secret. Empty values count as absent.
    fn get(&self, key: SecretKey) -> Option<String>;

    /// Look up a secret that must be present.
    fn require(&self, key: SecretKey) -> Result<String, MissingSecret> {
        self.get(key).ok_or(MissingSecret(key))
    }
}

/// Secrets read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn get(&self, key: SecretKey) -> Option<String> {
        std::env::var(key.env_name())
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

/// Secrets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<SecretKey, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret.
    pub fn with(mut self, key: SecretKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn get(&self, key: SecretKey) -> Option<String> {
        self.values
            .get(&key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
