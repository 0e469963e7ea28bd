//! JSON action endpoint for script-driven form submission.
//!
//! `POST /_actions/{name}` runs the same registered actions as the
//! form relay but answers with the [`ActionResult`] directly instead of
//! redirecting.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::warn;

use crate::action::{ActionResult, FailureCode, FormFields, ValidationError};
use crate::error::ActionError;
use crate::state::AppState;

async fn run_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    form: Result<Form<FormFields>, FormRejection>,
) -> (StatusCode, Json<ActionResult>) {
    if !state.actions().contains(&name) {
        return (
            StatusCode::NOT_FOUND,
            Json(ActionResult::failure("Unknown action.", FailureCode::Validation)),
        );
    }

    let result = match form {
        Ok(Form(fields)) => state
            .actions()
            .dispatch(&name, fields)
            .await
            .unwrap_or_else(|| ActionError::Unexpected.into()),
        Err(rejection) => {
            warn!(action = %name, error = %rejection, "unreadable action request");
            ActionError::Invalid(ValidationError::malformed()).into()
        }
    };

    let status = if result.is_failure() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    (status, Json(result))
}

/// Create the action endpoint router.
pub fn router() -> Router<AppState> {
    Router::new().route("/_actions/{name}", post(run_action))
}
