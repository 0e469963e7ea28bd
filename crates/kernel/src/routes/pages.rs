//! Site pages hosting the forms.

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;

use crate::action::{ActionResult, CONTACT_ACTION, FailureCode, HONEYPOT_FIELD, NEWSLETTER_ACTION};
use crate::relay::{ACTION_QUERY_PARAM, ActionChannel};
use crate::sanitize::escape_html;
use crate::state::AppState;

/// Render a pending result as a notice.
fn notice(result: Option<&ActionResult>) -> String {
    match result {
        None => String::new(),
        Some(ActionResult::Success { message }) => format!(
            r#"<p class="notice success" role="status">{}</p>"#,
            escape_html(message.as_deref().unwrap_or("Done."))
        ),
        Some(ActionResult::Failure { error, code }) => {
            let class = match code {
                FailureCode::PartialSuccess => "notice warning",
                _ => "notice error",
            };
            // Provider text arrives already escaped; escaping again shows it literally.
            format!(r#"<p class="{class}" role="alert">{}</p>"#, escape_html(error))
        }
    }
}

fn turnstile_widget(state: &AppState) -> String {
    state
        .turnstile_site_key()
        .map(|key| {
            format!(
                r#"<div class="cf-turnstile" data-sitekey="{}"></div>"#,
                escape_html(key)
            )
        })
        .unwrap_or_default()
}

fn honeypot() -> String {
    format!(
        r#"<input type="text" name="{HONEYPOT_FIELD}" tabindex="-1" autocomplete="off" hidden>"#
    )
}

fn layout(title: &str, body: &str, with_turnstile: bool) -> Html<String> {
    let script = if with_turnstile {
        r#"<script src="https://challenges.cloudflare.com/turnstile/v0/api.js" async defer></script>"#
    } else {
        ""
    };
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n{script}\n</head>\n<body>\n<main>\n{body}\n</main>\n</body>\n</html>\n",
        escape_html(title)
    ))
}

async fn home(State(state): State<AppState>, channel: ActionChannel) -> Html<String> {
    let body = format!(
        r#"<h1>Hello</h1>
<section id="newsletter">
<h2>Newsletter</h2>
{notice}
<form method="post" action="/?{ACTION_QUERY_PARAM}={NEWSLETTER_ACTION}">
<label>Email <input type="email" name="email" required maxlength="254"></label>
{honeypot}
{widget}
<button type="submit">Subscribe</button>
</form>
</section>"#,
        notice = notice(channel.result_for(NEWSLETTER_ACTION)),
        honeypot = honeypot(),
        widget = turnstile_widget(&state),
    );
    layout("Home", &body, state.turnstile_site_key().is_some())
}

async fn contact(State(state): State<AppState>, channel: ActionChannel) -> Html<String> {
    let body = format!(
        r#"<h1>Contact</h1>
{notice}
<form method="post" action="/contact?{ACTION_QUERY_PARAM}={CONTACT_ACTION}">
<label>Name <input type="text" name="name" required maxlength="100"></label>
<label>Email <input type="email" name="email" required maxlength="254"></label>
<label>Message <textarea name="message" required maxlength="5000"></textarea></label>
{honeypot}
{widget}
<button type="submit">Send</button>
</form>"#,
        notice = notice(channel.result_for(CONTACT_ACTION)),
        honeypot = honeypot(),
        widget = turnstile_widget(&state),
    );
    layout("Contact", &body, state.turnstile_site_key().is_some())
}

async fn about() -> Html<String> {
    layout(
        "About",
        "<h1>About</h1>\n<p>Writing, projects and artwork.</p>",
        false,
    )
}

/// Create the pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/contact", get(contact))
        .route("/about", get(about))
}
