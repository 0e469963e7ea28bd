//! Hand-off of a relayed action result to the page handler.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::action::ActionResult;

/// Result recovered from the slot for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingActionResult {
    pub action_name: String,
    pub result: ActionResult,
}

/// Extractor exposing the pending action result, if any.
#[derive(Debug, Clone, Default)]
pub struct ActionChannel(Option<PendingActionResult>);

impl ActionChannel {
    /// The pending result, only if it came from `action_name`.
    pub fn result_for(&self, action_name: &str) -> Option<&ActionResult> {
        self.0
            .as_ref()
            .filter(|p| p.action_name == action_name)
            .map(|p| &p.result)
    }

    pub fn pending(&self) -> Option<&PendingActionResult> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ActionChannel {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<PendingActionResult>().cloned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn exposes_result_only_for_matching_action() {
        let mut request = Request::new(());
        request.extensions_mut().insert(PendingActionResult {
            action_name: "contact".to_string(),
            result: ActionResult::success("sent"),
        });
        let (mut parts, ()) = request.into_parts();

        let channel = ActionChannel::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(channel.result_for("contact"), Some(&ActionResult::success("sent")));
        assert_eq!(channel.result_for("newsletterSubscribe"), None);
    }

    #[tokio::test]
    async fn empty_without_extension() {
        let (mut parts, ()) = Request::new(()).into_parts();
        let channel = ActionChannel::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(channel.pending().is_none());
    }
}
