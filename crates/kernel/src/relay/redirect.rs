//! Redirect targets for the Post/Redirect/Get step.

use axum::http::header::{HOST, REFERER};
use axum::http::{HeaderMap, Uri};
use url::Url;

/// Origin of the current request.
///
/// Uses the absolute request URI when there is one. Otherwise the host
/// comes from `Host` and the scheme from `X-Forwarded-Proto`, each falling
/// back to `site_url`.
pub fn request_origin(uri: &Uri, headers: &HeaderMap, site_url: &Url) -> Url {
    if uri.scheme().is_some()
        && uri.authority().is_some()
        && let Ok(url) = Url::parse(&uri.to_string())
    {
        return url;
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| site_url.scheme().to_string());

    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|host| Url::parse(&format!("{scheme}://{host}/")).ok())
        .unwrap_or_else(|| site_url.clone())
}

/// Where to send the browser after a failed action.
///
/// The `Referer` is honoured only when it shares `origin`; only its path,
/// query and fragment are kept. Anything else yields `/`.
pub fn failure_redirect_target(headers: &HeaderMap, origin: &Url) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .filter(|referer| referer.origin() == origin.origin())
        .map(|referer| local_target(&referer))
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| "/".to_string())
}

/// Where to send the browser after a successful action: the current path
/// without query or fragment.
pub fn success_redirect_target(uri: &Uri) -> String {
    let path = uri.path();
    if is_local_path(path) {
        path.to_string()
    } else {
        "/".to_string()
    }
}

fn local_target(url: &Url) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        target.push('#');
        target.push_str(fragment);
    }
    target
}

/// A path the browser resolves against the current origin. `//host` would
/// be read as a scheme-relative URL.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}
