//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::action::{FailureCode, ValidationError};

/// Upstream service a handler depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Email,
    MailingList,
}

/// Why a form action failed.
///
/// Every variant maps to one user-facing message and one [`FailureCode`].
/// Internal detail stays in logs; only [`ActionError::user_message`]
/// reaches the browser.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("honeypot field was filled")]
    Honeypot,

    #[error("human verification failed")]
    Verification,

    #[error("{0:?} service is not configured")]
    NotConfigured(Service),

    #[error("email delivery failed")]
    EmailDelivery,

    /// The mailing list refused the subscriber. `detail` is already
    /// sanitized for display.
    #[error("subscriber create rejected")]
    SubscribeRejected { detail: Option<String> },

    #[error("subscriber created but not attached to the list")]
    PartialSubscription,

    #[error("unexpected error")]
    Unexpected,
}

impl ActionError {
    /// Message shown to the submitter.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Invalid(e) => e.user_message(),
            ActionError::Honeypot | ActionError::Verification => {
                "Verification failed. Please try again.".to_string()
            }
            ActionError::NotConfigured(Service::Email) => {
                "Email service is not configured.".to_string()
            }
            ActionError::NotConfigured(Service::MailingList) => {
                "Subscription service is not configured.".to_string()
            }
            ActionError::EmailDelivery => "Email could not be sent.".to_string(),
            ActionError::SubscribeRejected { detail } => detail
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Could not subscribe. Please try again.".to_string()),
            ActionError::PartialSubscription => "You've been subscribed, but we couldn't add you \
                                                 to the list. Please contact support."
                .to_string(),
            ActionError::Unexpected => "An unexpected error occurred.".to_string(),
        }
    }

    pub fn code(&self) -> FailureCode {
        match self {
            ActionError::Invalid(_) => FailureCode::Validation,
            ActionError::Honeypot | ActionError::Verification => FailureCode::Verification,
            ActionError::NotConfigured(_) => FailureCode::Configuration,
            ActionError::EmailDelivery | ActionError::SubscribeRejected { .. } => {
                FailureCode::Upstream
            }
            ActionError::PartialSubscription => FailureCode::PartialSuccess,
            ActionError::Unexpected => FailureCode::Unexpected,
        }
    }
}

/// Page route errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
        };

        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            AppError::NotFound => self.to_string(),
        };

        (status, body).into_response()
    }
}
