//! Gateway middleware.

use axum::{
    Router,
    http::{
        HeaderValue,
        header::{X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION},
    },
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Add the response hardening headers and request tracing to a router.
///
/// The headers are set on every response, including gate redirects and
/// proxied upstream pages.
pub fn harden(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(TraceLayer::new_for_http())
}
