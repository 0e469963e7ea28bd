//! HTTP route handlers.

pub mod actions;
pub mod health;
pub mod pages;

use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::error::AppError;
use crate::relay::relay_action_result;
use crate::state::AppState;

/// Build the site router.
///
/// The relay middleware wraps the fully routed site rather than each
/// route, so it sees a form `POST` to a page that only answers `GET`.
pub fn app(state: AppState) -> Router {
    let site = Router::new()
        .merge(pages::router())
        .merge(actions::router())
        .merge(health::router())
        .fallback(not_found)
        .with_state(state.clone());

    Router::new()
        .fallback_service(site)
        .layer(from_fn_with_state(state, relay_action_result))
}

async fn not_found() -> AppError {
    AppError::NotFound
}
