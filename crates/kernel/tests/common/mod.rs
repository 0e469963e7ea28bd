#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] runs the real router, relay middleware and action handlers
//! against the scripted upstream fakes from `folio-test-utils`.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, header};
use axum::response::Response;
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt;
use tower::ServiceExt;

use folio_kernel::action::ActionRegistry;
use folio_kernel::relay::ACTION_PAYLOAD_COOKIE;
use folio_kernel::{AppState, Config};
use folio_test_utils::{TestServices, test_config};

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub fakes: TestServices,
}

impl TestApp {
    /// App whose upstreams all accept.
    pub fn new() -> Self {
        Self::with(TestServices::accepting(), test_config())
    }

    pub fn with_services(fakes: TestServices) -> Self {
        Self::with(fakes, test_config())
    }

    pub fn with(fakes: TestServices, config: Config) -> Self {
        let state = fakes.app_state(&config);
        let router = folio_kernel::app(state.clone());
        Self {
            router,
            state,
            fakes,
        }
    }

    /// App serving only `actions`.
    pub fn with_actions(actions: ActionRegistry) -> Self {
        let state = AppState::with_actions(&test_config(), actions);
        let router = folio_kernel::app(state.clone());
        Self {
            router,
            state,
            fakes: TestServices::accepting(),
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// `GET` carrying a raw `Cookie` header.
    pub async fn get_with_cookies(&self, uri: &str, cookies: &str) -> Response {
        self.request(
            Request::get(uri)
                .header(header::COOKIE, cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Submit a urlencoded form, optionally with a `Referer`.
    pub async fn post_form(&self, uri: &str, body: String, referer: Option<&str>) -> Response {
        let mut builder = Request::post(uri)
            .header(header::HOST, "example.com")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(referer) = referer {
            builder = builder.header(header::REFERER, referer);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }
}

pub async fn response_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).to_string()
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body);
        panic!("Failed to parse JSON: {text}");
    })
}

/// Every `Set-Cookie` header for the payload cookie.
pub fn payload_set_cookies(headers: &HeaderMap) -> Vec<String> {
    let prefix = format!("{ACTION_PAYLOAD_COOKIE}=");
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&prefix))
        .map(str::to_string)
        .collect()
}

/// The `name=value` pair of a `Set-Cookie` header, ready to send back.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// A `Cookie` header carrying `raw` as the payload cookie value.
pub fn payload_cookie(raw: &str) -> String {
    Cookie::new(ACTION_PAYLOAD_COOKIE, raw.to_string()).encoded().to_string()
}

/// Whether a `Set-Cookie` header clears its cookie.
pub fn is_removal(set_cookie: &str) -> bool {
    set_cookie.contains("Max-Age=0")
}
