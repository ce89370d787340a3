use axum::http::{Method, StatusCode};
use parley_core::APP_VERSION;

use super::test_app;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = test_app().await;

    let response = app
        .request(Method::GET, "/v1/healthcheck", None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "available");
    assert_eq!(response.body["system_info"]["environment"], "development");
    assert_eq!(response.body["system_info"]["version"], APP_VERSION);
}

#[tokio::test]
async fn test_unknown_route_is_a_json_404() {
    let app = test_app().await;

    let response = app.request(Method::GET, "/v1/nothing-here", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_wrong_method_is_a_json_405() {
    let app = test_app().await;

    let response = app.request(Method::PUT, "/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.body["error"]["code"], "METHOD_NOT_ALLOWED");
}
