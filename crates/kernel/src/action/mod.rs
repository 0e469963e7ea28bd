//! Form actions.
//!
//! An action validates untrusted form fields against its input schema,
//! runs its handler and produces exactly one [`ActionResult`]. The relay
//! middleware and the RPC route both dispatch through [`ActionRegistry`].

mod contact;
mod input;
mod newsletter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ActionError;

pub use contact::{CONTACT_ACTION, ContactHandler, ContactSettings};
pub use input::{
    ContactInput, FormFields, HONEYPOT_FIELD, NewsletterInput, TOKEN_FIELD, ValidationError,
};
pub use newsletter::{NEWSLETTER_ACTION, NewsletterHandler};

/// Machine-readable failure category, for pages that render differently
/// per failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    Validation,
    Verification,
    Configuration,
    Upstream,
    PartialSuccess,
    Unexpected,
}

/// Outcome of one action invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResult {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failure {
        error: String,
        code: FailureCode,
    },
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        ActionResult::Success {
            message: Some(message.into()),
        }
    }

    pub fn failure(error: impl Into<String>, code: FailureCode) -> Self {
        ActionResult::Failure {
            error: error.into(),
            code,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionResult::Failure { .. })
    }
}

impl From<ActionError> for ActionResult {
    fn from(err: ActionError) -> Self {
        ActionResult::failure(err.user_message(), err.code())
    }
}

/// A named form action.
#[async_trait]
pub trait Action: Send + Sync {
    /// Name used in `?_action=` and `/_actions/{name}`.
    fn name(&self) -> &'static str;

    /// Validate `fields` and run the handler.
    async fn run(&self, fields: FormFields) -> ActionResult;
}

/// Registered actions, keyed by name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its own name, replacing any previous one.
    pub fn register(mut self, action: Arc<dyn Action>) -> Self {
        self.actions.insert(action.name(), action);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Run the named action, or `None` if no such action is registered.
    ///
    /// The action runs on its own task so that a panicking handler still
    /// yields a structured failure.
    pub async fn dispatch(&self, name: &str, fields: FormFields) -> Option<ActionResult> {
        let action = self.actions.get(name)?.clone();
        let action_name = action.name();

        let result = match tokio::spawn(async move { action.run(fields).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(action = action_name, error = %e, "action handler aborted");
                ActionError::Unexpected.into()
            }
        };

        Some(result)
    }
}
