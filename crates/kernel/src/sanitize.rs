//! Text sanitization for user-supplied and provider-supplied strings.
//!
//! Form values and upstream error payloads are untrusted. Anything that ends
//! up in an HTML email body or a rendered page goes through [`escape_html`];
//! anything that ends up in a header or plain-text body goes through
//! [`strip_control`].

/// Maximum length (in characters) of provider error text shown to users.
const UPSTREAM_MESSAGE_MAX_CHARS: usize = 200;

/// HTML-escape the five reserved characters.
///
/// `& < > " '` become named/numeric entities; every other character passes
/// through unchanged.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove control characters, keeping newlines and tabs.
///
/// `\r\n` and lone `\r` are normalized to `\n` before filtering.
pub fn strip_control(s: &str) -> String {
    s.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Convert newlines to `<br>` for an already-escaped HTML fragment.
pub fn nl2br(s: &str) -> String {
    s.replace('\n', "<br>")
}

/// Return the address if it may be used as a `Reply-To`.
///
/// An empty allow-list admits every syntactically plausible address. A
/// non-empty allow-list admits only addresses whose lower-cased domain is
/// listed.
pub fn safe_reply_to(email: &str, allowed_domains: &[String]) -> Option<String> {
    let lower = email.to_lowercase();
    let (local, domain) = lower.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || lower.chars().any(char::is_whitespace)
    {
        return None;
    }

    if !allowed_domains.is_empty()
        && !allowed_domains
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(domain))
    {
        return None;
    }

    Some(email.to_string())
}

/// Make provider error text safe to show to a user.
pub fn sanitize_upstream_message(s: &str) -> String {
    let stripped: String = strip_control(s)
        .replace('\n', " ")
        .chars()
        .take(UPSTREAM_MESSAGE_MAX_CHARS)
        .collect();
    escape_html(stripped.trim())
}
