use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Json, Router,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{test_app, test_app_with, test_config, TestApp};
use crate::api::with_admission_layers;
use crate::config::RateLimitKeySource;

fn healthcheck_from(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/v1/healthcheck");
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

async fn limited_app(burst: u32, key_source: RateLimitKeySource) -> TestApp {
    let mut config = test_config();
    config.limiter.enabled = true;
    config.limiter.burst = burst;
    config.limiter.rps = 0.01;
    config.limiter.key_source = key_source;
    test_app_with(config).await
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst() {
    let app = limited_app(2, RateLimitKeySource::Peer).await;

    for _ in 0..2 {
        let response = app.send(healthcheck_from("10.0.0.1:4000", None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers["x-ratelimit-limit"], "2");
    }

    let response = app.send(healthcheck_from("10.0.0.1:4000", None)).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    let retry_after: u64 = response.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert_eq!(response.body["error"]["retry_after"], retry_after);

    // Another peer has its own bucket
    let response = app.send(healthcheck_from("10.0.0.2:4000", None)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_runs_before_authentication() {
    let app = limited_app(1, RateLimitKeySource::Peer).await;

    let malformed = |peer: &str| {
        let mut request = healthcheck_from(peer, None);
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        request
    };

    let first = app.send(malformed("10.0.0.3:1")).await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);

    let second = app.send(malformed("10.0.0.3:1")).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_key_source_uses_first_hop() {
    let app = limited_app(1, RateLimitKeySource::Forwarded).await;

    let first = app
        .send(healthcheck_from("10.0.0.9:1", Some("198.51.100.1, 10.0.0.9")))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    // Same proxy peer, different original client
    let other_client = app
        .send(healthcheck_from("10.0.0.9:1", Some("198.51.100.2")))
        .await;
    assert_eq!(other_client.status, StatusCode::OK);

    let repeat = app
        .send(healthcheck_from("10.0.0.9:2", Some("198.51.100.1")))
        .await;
    assert_eq!(repeat.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_anonymous_request_passes_public_route_and_varies_on_authorization() {
    let app = test_app().await;

    let response = app.request(Method::GET, "/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::VARY], "Authorization");
}

#[tokio::test]
async fn test_malformed_authorization_header_is_rejected() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/v1/healthcheck")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["code"], "MALFORMED_CREDENTIAL");
    assert_eq!(response.headers[header::WWW_AUTHENTICATE], "Bearer");
    assert_eq!(response.headers[header::VARY], "Authorization");
}

#[tokio::test]
async fn test_unknown_token_is_rejected_even_on_public_routes() {
    let app = test_app().await;

    let response = app
        .request(Method::GET, "/v1/healthcheck", None, Some("not-a-real-token"))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_gate_on_protected_route() {
    let app = test_app().await;
    let (_, inactive_token) = app.user_with_token("inactive@example.com", false).await;
    let (_, active_token) = app.user_with_token("active@example.com", true).await;

    let anonymous = app.request(Method::GET, "/v1/comments", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"]["code"], "UNAUTHENTICATED");

    let inactive = app
        .request(Method::GET, "/v1/comments", None, Some(&inactive_token))
        .await;
    assert_eq!(inactive.status, StatusCode::FORBIDDEN);
    assert_eq!(inactive.body["error"]["code"], "NOT_ACTIVATED");

    let active = app
        .request(Method::GET, "/v1/comments", None, Some(&active_token))
        .await;
    assert_eq!(active.status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_stops_working_after_expiry() {
    let app = test_app().await;
    let (_, token) = app.user_with_token("alice@example.com", true).await;

    let before = app
        .request(Method::GET, "/v1/comments", None, Some(&token))
        .await;
    assert_eq!(before.status, StatusCode::OK);

    app.clock.advance(chrono::Duration::hours(2));

    let after = app
        .request(Method::GET, "/v1/comments", None, Some(&token))
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_logout_revokes_callers_tokens() {
    let app = test_app().await;
    let (_, token) = app.user_with_token("alice@example.com", true).await;

    let anonymous = app
        .request(Method::DELETE, "/v1/tokens/authentication", None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let logout = app
        .request(Method::DELETE, "/v1/tokens/authentication", None, Some(&token))
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let reuse = app
        .request(Method::GET, "/v1/comments", None, Some(&token))
        .await;
    assert_eq!(reuse.status, StatusCode::UNAUTHORIZED);
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_panic_becomes_500_and_server_keeps_serving() {
    let app = test_app().await;
    let router = with_admission_layers(
        Router::new()
            .route("/boom", get(explode))
            .route("/fine", get(|| async { Json(json!({ "ok": true })) })),
        &app.state,
    );
    let app = TestApp { router, ..app };

    let crashed = app.request(Method::GET, "/boom", None, None).await;
    assert_eq!(crashed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(crashed.headers[header::CONNECTION], "close");
    assert_eq!(crashed.body["error"]["code"], "INTERNAL_ERROR");
    assert!(!crashed.body.to_string().contains("handler exploded"));

    let response = app
        .send(Request::builder().uri("/fine").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status, StatusCode::OK);
}
