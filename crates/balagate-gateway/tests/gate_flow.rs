//! End-to-end tests: a fake backend and a fake upstream run as real servers,
//! the gateway sits between them and is driven over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Request},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
};
use balagate_core::Config;
use balagate_gateway::Gateway;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use serde_json::json;

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn user_info(headers: HeaderMap) -> (StatusCode, Json<serde_json::Value>) {
    match bearer(&headers) {
        "Bearer admintoken" => (StatusCode::OK, Json(json!({"user": {"id": 1, "role": "admin"}}))),
        "Bearer usertoken" => (StatusCode::OK, Json(json!({"user": {"id": 2, "role": "user"}}))),
        "Bearer slowtoken" => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            (StatusCode::OK, Json(json!({"user": {"role": "admin"}})))
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid token"}))),
    }
}

async fn course(Path(id): Path<String>, headers: HeaderMap) -> StatusCode {
    match (bearer(&headers), id.as_str()) {
        ("Bearer usertoken", "42") => StatusCode::OK,
        ("Bearer usertoken", "500") => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn logout(headers: HeaderMap) -> (StatusCode, String) {
    let cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if cookie.contains("access_token=usertoken") {
        (StatusCode::OK, "bye".to_string())
    } else {
        (StatusCode::UNAUTHORIZED, "no session".to_string())
    }
}

/// Upstream page echoing what it received.
async fn page(request: Request) -> String {
    format!("upstream {} {}", request.method(), request.uri())
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Harness {
    base: String,
    client: reqwest::Client,
}

impl Harness {
    async fn start() -> Self {
        let backend = spawn(
            Router::new()
                .route("/api/v1/auth/user-info", get(user_info))
                .route("/api/v1/auth/course/get/{id}", get(course))
                .route("/api/v1/auth/logout", delete(logout)),
        )
        .await;
        let upstream = spawn(Router::new().fallback(page)).await;

        let mut config = Config::default();
        config.backend.base_url = format!("http://{backend}");
        config.backend.timeout_secs = 1;
        config.gateway.upstream_url = format!("http://{upstream}");

        let gateway = Gateway::new(config).unwrap();
        let addr = spawn(gateway.router()).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base: format!("http://{addr}"),
            client,
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{path}", self.base));
        if let Some(token) = token {
            request = request.header(COOKIE, format!("access_token={token}"));
        }
        request.send().await.unwrap()
    }
}

fn location(response: &reqwest::Response) -> Option<&str> {
    response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn clears_session(response: &reqwest::Response) -> bool {
    set_cookies(response).iter().any(|c| {
        c.starts_with("access_token=;") && c.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT")
    })
}

#[tokio::test]
async fn admin_without_cookie_goes_to_sign_in() {
    let h = Harness::start().await;
    let response = h.get("/admin", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/auth"));
    assert!(!clears_session(&response));
}

#[tokio::test]
async fn encoded_admin_path_is_still_gated() {
    let h = Harness::start().await;

    for path in ["/%61dmin", "/%61dmin/%FF", "/%2e%2e/admin/%C0"] {
        let response = h.get(path, None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), Some("/auth"), "{path}");
    }

    let response = h.get("/pr%6Ffile/%C0", Some("usertoken")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_token_is_cleared() {
    let h = Harness::start().await;
    let response = h.get("/admin", Some("deadtoken")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/auth"));
    assert!(clears_session(&response));
}

#[tokio::test]
async fn user_on_admin_page_goes_to_landing() {
    let h = Harness::start().await;
    let response = h.get("/admin", Some("usertoken")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/courses"));
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("auth_message=No%20admin%20access"))
    );
}

#[tokio::test]
async fn admin_reaches_upstream() {
    let h = Harness::start().await;
    let response = h.get("/admin/courses?page=2", Some("admintoken")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(
        response.text().await.unwrap(),
        "upstream GET /admin/courses?page=2"
    );
}

#[tokio::test]
async fn signed_in_visitor_skips_sign_in_page() {
    let h = Harness::start().await;
    let response = h.get("/auth", Some("admintoken")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/courses"));

    let anonymous = h.get("/auth", None).await;
    assert_eq!(anonymous.status(), StatusCode::OK);
}

#[tokio::test]
async fn foreign_course_goes_to_course_list() {
    let h = Harness::start().await;

    let denied = h.get("/courses/99", Some("usertoken")).await;
    assert_eq!(denied.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&denied), Some("/courses"));
    assert!(!clears_session(&denied));

    let failed = h.get("/courses/500", Some("usertoken")).await;
    assert_eq!(location(&failed), Some("/courses"));

    let own = h.get("/courses/42", Some("usertoken")).await;
    assert_eq!(own.status(), StatusCode::OK);
}

#[tokio::test]
async fn slow_identity_service_fails_closed() {
    let h = Harness::start().await;
    let response = h.get("/profile", Some("slowtoken")).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/auth"));
    assert!(!clears_session(&response));
}

#[tokio::test]
async fn public_pages_pass_untouched() {
    let h = Harness::start().await;
    let response = h.get("/checklists", Some("deadtoken")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn logout_expires_session() {
    let h = Harness::start().await;

    let response = h
        .client
        .delete(format!("{}/api/auth/logout", h.base))
        .header(COOKIE, "access_token=usertoken")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(clears_session(&response));

    let refused = h
        .client
        .delete(format!("{}/api/auth/logout", h.base))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = refused.json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["details"], "no session");
}

#[tokio::test]
async fn health_is_never_gated() {
    let h = Harness::start().await;
    let response = h.get("/healthz", Some("deadtoken")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
