//! Action result relay middleware.
//!
//! Implements Post/Redirect/Get for form actions: a form `POST` runs its
//! action, stashes the result in a single-use cookie and redirects with
//! 303; the following request consumes the cookie and exposes the result
//! to the page through [`ActionChannel`]. Every response gets the baseline
//! security headers.

pub mod channel;
pub mod headers;
pub mod redirect;
pub mod slot;

use axum::body::Body;
use axum::extract::{Form, FromRequest, State};
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::action::{ActionRegistry, ActionResult, FormFields, ValidationError};
use crate::error::ActionError;
use crate::state::AppState;

pub use channel::{ActionChannel, PendingActionResult};
pub use headers::ensure_security_headers;
pub use redirect::{failure_redirect_target, request_origin, success_redirect_target};
pub use slot::{
    ACTION_PAYLOAD_COOKIE, CookiePayload, CookieSlot, DiscardReason, MAX_PAYLOAD_BYTES,
    MemorySlot, ResultSlot, SlotError, SlotRead,
};

/// Query parameter naming the action a form posts to.
pub const ACTION_QUERY_PARAM: &str = "_action";

/// How the middleware treats one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    /// Precomputed page: headers only.
    Prerendered,
    /// The request carries a result cookie to consume.
    CookiePresent,
    /// A form posted to the named action.
    FormActionTriggered(String),
    PassThrough,
}

/// Classify a request. Checks run in a fixed order; the first match wins.
pub fn classify(request: &Request<Body>, state: &AppState, slot: &CookieSlot) -> RelayState {
    if state.is_prerendered(request.uri().path()) {
        return RelayState::Prerendered;
    }
    if slot.is_occupied() {
        return RelayState::CookiePresent;
    }
    match form_action_name(request, state.actions()) {
        Some(name) => RelayState::FormActionTriggered(name),
        None => RelayState::PassThrough,
    }
}

/// The registered action a form `POST` targets, if any.
fn form_action_name(request: &Request<Body>, actions: &ActionRegistry) -> Option<String> {
    if request.method() != Method::POST {
        return None;
    }
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ACTION_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|name| actions.contains(name))
}

/// The action a form `POST` names when a pending cookie keeps it from running.
fn dropped_submission(
    request: &Request<Body>,
    actions: &ActionRegistry,
    slot: &CookieSlot,
) -> Option<String> {
    if !slot.is_occupied() {
        return None;
    }
    form_action_name(request, actions)
}

/// Middleware entry point.
pub async fn relay_action_result(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request_origin(request.uri(), request.headers(), state.site_url());
    let secure = origin.scheme() == "https";
    let slot = CookieSlot::new(CookieJar::from_headers(request.headers()), secure);

    let relay_state = classify(&request, &state, &slot);
    debug!(path = %request.uri().path(), state = ?relay_state, "relay");

    let mut response = match relay_state {
        RelayState::Prerendered | RelayState::PassThrough => next.run(request).await,
        RelayState::CookiePresent => {
            if let Some(name) = dropped_submission(&request, state.actions(), &slot) {
                warn!(
                    action = %name,
                    "form submitted while a result cookie was pending; action not run"
                );
            }
            consume_pending(slot, request, next).await
        }
        RelayState::FormActionTriggered(name) => {
            let failure_target = failure_redirect_target(request.headers(), &origin);
            let success_target = success_redirect_target(request.uri());
            run_form_action(&state, slot, &name, request, failure_target, success_target).await
        }
    };

    ensure_security_headers(response.headers_mut());
    response
}

/// Read and clear the slot, hand any valid result to the page, continue.
async fn consume_pending(mut slot: CookieSlot, mut request: Request<Body>, next: Next) -> Response {
    match slot.take() {
        SlotRead::Delivered(payload) => {
            request.extensions_mut().insert(PendingActionResult {
                action_name: payload.action_name,
                result: payload.action_result,
            });
        }
        SlotRead::Discarded(reason) => {
            debug!(?reason, "discarding action payload cookie");
        }
        SlotRead::Empty => {}
    }

    let response = next.run(request).await;
    (slot.into_jar(), response).into_response()
}

/// Run the action, stash its result, and redirect. The downstream handler
/// is not invoked.
async fn run_form_action(
    state: &AppState,
    mut slot: CookieSlot,
    name: &str,
    request: Request<Body>,
    failure_target: String,
    success_target: String,
) -> Response {
    let result = match Form::<FormFields>::from_request(request, &()).await {
        Ok(Form(fields)) => state
            .actions()
            .dispatch(name, fields)
            .await
            .unwrap_or_else(|| ActionError::Unexpected.into()),
        Err(rejection) => {
            warn!(action = name, error = %rejection, "unreadable form submission");
            ActionError::Invalid(ValidationError::malformed()).into()
        }
    };

    let payload = CookiePayload::new(name, result);
    if let Err(e) = slot.put(&payload) {
        warn!(action = name, error = %e, "action result not relayed");
    }

    let target = match &payload.action_result {
        ActionResult::Failure { .. } => failure_target,
        ActionResult::Success { .. } => success_target,
    };

    (slot.into_jar(), Redirect::to(&target)).into_response()
}
