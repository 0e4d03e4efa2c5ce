//! Axum middleware applying gate decisions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CACHE_CONTROL, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use balagate_core::SessionToken;

use super::config::GateConfig;
use super::gate::{DenyReason, Gate, GateAction, GateRequest};

/// Read the session token from the request cookies.
///
/// An empty or whitespace-only cookie counts as absent.
#[must_use]
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<SessionToken> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .and_then(|cookie| SessionToken::from_cookie_value(cookie.value()))
}

/// Gate every request before it reaches the inner service.
///
/// Install with `axum::middleware::from_fn_with_state(gate, gate_middleware)`.
pub async fn gate_middleware(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let config = gate.config();
    let token = session_token(request.headers(), &config.cookie_name);

    let decision = gate
        .decide(GateRequest {
            path: request.uri().path(),
            method: request.method(),
            token: token.as_ref(),
        })
        .await;

    match decision.action {
        GateAction::Proceed => {
            let mut response = next.run(request).await;
            if decision.clear_session {
                append_cookie(response.headers_mut(), &removal_cookie(config));
            }
            response
        }
        GateAction::Redirect { location, reason } => {
            let mut jar = CookieJar::new().add(flash_cookie(config, reason));
            if decision.clear_session {
                jar = jar.add(removal_cookie(config));
            }
            (
                [(CACHE_CONTROL, "no-store")],
                jar,
                Redirect::temporary(&location),
            )
                .into_response()
        }
    }
}

/// Short-lived cookie telling the destination page why the visitor landed
/// there.
fn flash_cookie(config: &GateConfig, reason: DenyReason) -> Cookie<'static> {
    let max_age = i64::try_from(config.message_max_age.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((
        config.message_cookie.clone(),
        urlencoding::encode(reason.message()).into_owned(),
    ))
    .path("/")
    .same_site(SameSite::Lax)
    .max_age(time::Duration::seconds(max_age))
    .build()
}

/// Cookie expiring the session token in the browser.
pub(crate) fn removal_cookie(config: &GateConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

pub(crate) fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Dropping unencodable Set-Cookie"),
    }
}
