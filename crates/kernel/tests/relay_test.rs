#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Post/Redirect/Get relay through the real router.

mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header};
use folio_kernel::action::{Action, ActionRegistry, ActionResult, FailureCode, FormFields};
use folio_kernel::relay::MAX_PAYLOAD_BYTES;
use folio_test_utils::{FakeVerifier, TestServices, contact_form_body, newsletter_form_body};

use common::{TestApp, cookie_pair, is_removal, payload_cookie, payload_set_cookies, response_text};

fn assert_security_headers(headers: &axum::http::HeaderMap) {
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_XSS_PROTECTION], "0");
    assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    assert_eq!(
        headers[header::STRICT_TRANSPORT_SECURITY],
        "max-age=31536000; includeSubDomains; preload"
    );
    assert_eq!(headers["permissions-policy"], "geolocation=()");
}

// =============================================================================
// Headers and pass-through
// =============================================================================

#[tokio::test]
async fn plain_page_passes_through_with_headers() {
    let app = TestApp::new();
    let response = app.get("/contact").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_security_headers(response.headers());
    assert!(payload_set_cookies(response.headers()).is_empty());

    let html = response_text(response).await;
    assert!(html.contains(r#"action="/contact?_action=contact""#));
    assert!(html.contains(r#"name="website""#));
}

#[tokio::test]
async fn prerendered_page_gets_headers_only() {
    let app = TestApp::new();
    let response = app.get("/about").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_security_headers(response.headers());
}

#[tokio::test]
async fn prerendered_page_leaves_payload_cookie_alone() {
    let app = TestApp::new();
    let cookie = payload_cookie(
        r#"{"actionName":"contact","actionResult":{"type":"success","message":"hi"}}"#,
    );
    let response = app.get_with_cookies("/about", &cookie).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(payload_set_cookies(response.headers()).is_empty());
}

#[tokio::test]
async fn not_found_still_gets_headers() {
    let app = TestApp::new();
    let response = app.get("/no-such-page").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_security_headers(response.headers());
}

#[tokio::test]
async fn unregistered_action_is_not_intercepted() {
    let app = TestApp::new();
    let response = app
        .post_form("/contact?_action=doesNotExist", String::new(), None)
        .await;

    assert_ne!(response.status(), StatusCode::SEE_OTHER);
    assert!(payload_set_cookies(response.headers()).is_empty());
    assert_security_headers(response.headers());
}

// =============================================================================
// Cookie consumption
// =============================================================================

#[tokio::test]
async fn valid_cookie_is_delivered_once_and_cleared() {
    let app = TestApp::new();
    let cookie = payload_cookie(
        r#"{"actionName":"contact","actionResult":{"type":"success","message":"Thanks <friend>"}}"#,
    );
    let response = app.get_with_cookies("/contact", &cookie).await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookies = payload_set_cookies(response.headers());
    assert_eq!(set_cookies.len(), 1);
    assert!(is_removal(&set_cookies[0]));
    assert_security_headers(response.headers());

    let html = response_text(response).await;
    assert!(html.contains("Thanks &lt;friend&gt;"));
}

#[tokio::test]
async fn result_only_shown_by_its_own_action() {
    let app = TestApp::new();
    let cookie = payload_cookie(
        r#"{"actionName":"contact","actionResult":{"type":"success","message":"contact done"}}"#,
    );
    let response = app.get_with_cookies("/", &cookie).await;

    let set_cookies = payload_set_cookies(response.headers());
    assert!(is_removal(&set_cookies[0]));
    let html = response_text(response).await;
    assert!(!html.contains("contact done"));
}

#[tokio::test]
async fn oversized_cookie_is_cleared_and_ignored() {
    let app = TestApp::new();
    let message = "x".repeat(4000);
    let raw = format!(
        r#"{{"actionName":"contact","actionResult":{{"type":"success","message":"{message}"}}}}"#
    );
    let response = app.get_with_cookies("/contact", &payload_cookie(&raw)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookies = payload_set_cookies(response.headers());
    assert_eq!(set_cookies.len(), 1);
    assert!(is_removal(&set_cookies[0]));

    let html = response_text(response).await;
    assert!(!html.contains("xxxxxxxxxx"));
    assert!(!html.contains("notice"));
}

#[tokio::test]
async fn malformed_cookie_is_cleared_and_ignored() {
    let app = TestApp::new();
    let response = app
        .get_with_cookies("/contact", &payload_cookie("{not json"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookies = payload_set_cookies(response.headers());
    assert!(is_removal(&set_cookies[0]));
    assert!(!response_text(response).await.contains("notice"));
}

#[tokio::test]
async fn wrong_shape_cookie_is_cleared_and_ignored() {
    let app = TestApp::new();
    let response = app
        .get_with_cookies(
            "/contact",
            &payload_cookie(r#"{"actionName":42,"actionResult":{"type":"success"}}"#),
        )
        .await;

    let set_cookies = payload_set_cookies(response.headers());
    assert!(is_removal(&set_cookies[0]));
    assert!(!response_text(response).await.contains("notice"));

    let response = app
        .get_with_cookies(
            "/contact",
            &payload_cookie(r#"{"actionName":"contact","actionResult":{"ok":true}}"#),
        )
        .await;
    let set_cookies = payload_set_cookies(response.headers());
    assert!(is_removal(&set_cookies[0]));
    assert!(!response_text(response).await.contains("notice"));
}

// =============================================================================
// Form actions
// =============================================================================

#[tokio::test]
async fn successful_action_redirects_to_current_path() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/contact?_action=contact",
            contact_form_body("Ada", "ada@example.org", "Hello there"),
            Some("https://example.com/contact?from=nav"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/contact");
    assert_security_headers(response.headers());

    let set_cookies = payload_set_cookies(response.headers());
    assert_eq!(set_cookies.len(), 1);
    let set_cookie = &set_cookies[0];
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=15"));

    // The page handler did not run; the redirect has no page body.
    let body = response_text(response).await;
    assert!(!body.contains("<form"));

    assert_eq!(app.fakes.mailer.sent().len(), 1);
}

#[tokio::test]
async fn relayed_result_renders_on_the_next_request() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/contact?_action=contact",
            contact_form_body("Ada", "ada@example.org", "Hello there"),
            None,
        )
        .await;
    let set_cookies = payload_set_cookies(response.headers());
    let cookie = cookie_pair(&set_cookies[0]);

    let response = app.get_with_cookies("/contact", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(is_removal(&payload_set_cookies(response.headers())[0]));

    let html = response_text(response).await;
    assert!(html.contains("Your message has been sent!"));
}

#[tokio::test]
async fn failure_returns_to_same_origin_referer() {
    let app = TestApp::with_services(TestServices {
        verifier: FakeVerifier::failing(),
        ..TestServices::accepting()
    });
    let response = app
        .post_form(
            "/contact?_action=contact",
            contact_form_body("Ada", "ada@example.org", "Hello there"),
            Some("https://example.com/contact?failed=true"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/contact?failed=true");
    assert_eq!(payload_set_cookies(response.headers()).len(), 1);
    assert!(app.fakes.mailer.sent().is_empty());
}

#[tokio::test]
async fn failure_ignores_cross_origin_referer() {
    let app = TestApp::with_services(TestServices {
        verifier: FakeVerifier::failing(),
        ..TestServices::accepting()
    });
    let response = app
        .post_form(
            "/?_action=newsletterSubscribe",
            newsletter_form_body("ada@example.org"),
            Some("https://evil.example/phish"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn failure_without_referer_goes_home() {
    let app = TestApp::with_services(TestServices {
        verifier: FakeVerifier::failing(),
        ..TestServices::accepting()
    });
    let response = app
        .post_form(
            "/contact?_action=contact",
            contact_form_body("Ada", "ada@example.org", "Hello there"),
            None,
        )
        .await;

    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn validation_failure_is_relayed_without_calling_upstreams() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/contact?_action=contact",
            contact_form_body("Ada", "not-an-email", "Hello there"),
            Some("https://example.com/contact"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/contact");
    assert_eq!(app.fakes.verifier.calls(), 0);
    assert!(app.fakes.mailer.sent().is_empty());

    let cookie = cookie_pair(&payload_set_cookies(response.headers())[0]);
    let html = response_text(app.get_with_cookies("/contact", &cookie).await).await;
    assert!(html.contains("Please enter a valid email address."));
}

struct Verbose;

#[async_trait::async_trait]
impl Action for Verbose {
    fn name(&self) -> &'static str {
        "verbose"
    }

    async fn run(&self, _fields: FormFields) -> ActionResult {
        ActionResult::failure("e".repeat(MAX_PAYLOAD_BYTES), FailureCode::Upstream)
    }
}

#[tokio::test]
async fn oversized_result_still_redirects_without_cookie() {
    let app = TestApp::with_actions(ActionRegistry::new().register(Arc::new(Verbose)));
    let response = app
        .post_form(
            "/contact?_action=verbose",
            String::new(),
            Some("https://example.com/contact"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/contact");
    assert!(payload_set_cookies(response.headers()).is_empty());
    assert_security_headers(response.headers());
}

#[tokio::test]
async fn leftover_cookie_is_consumed_before_any_action_runs() {
    let app = TestApp::new();
    let cookie = payload_cookie(
        r#"{"actionName":"contact","actionResult":{"type":"success","message":"old"}}"#,
    );
    let response = app
        .request(
            axum::http::Request::post("/contact?_action=contact")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(axum::body::Body::from(contact_form_body(
                    "Ada",
                    "ada@example.org",
                    "Hello",
                )))
                .unwrap(),
        )
        .await;

    assert_ne!(response.status(), StatusCode::SEE_OTHER);
    assert!(is_removal(&payload_set_cookies(response.headers())[0]));
    assert!(app.fakes.mailer.sent().is_empty());
}
