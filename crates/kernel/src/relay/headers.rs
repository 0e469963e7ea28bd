//! Baseline security headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "0"),
    ("referrer-policy", "no-referrer"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains; preload",
    ),
    // Site-specific policies are set by the page; this is only a floor.
    ("permissions-policy", "geolocation=()"),
];

/// Add each security header the response does not already carry.
pub fn ensure_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert_with(|| HeaderValue::from_static(value));
    }
}
