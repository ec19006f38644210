//! OAuth authorization URL and token endpoint tests

use gowalla_client::{models::TokenResponse, ApiErrorKind};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_authorization_url_points_at_configured_server() {
    let (server, _) = common::setup_gowalla_mock().await;
    let client = common::client_for(&server);

    let url = client.authorization_url("http://localhost:8400/callback");

    assert_eq!(
        url,
        format!(
            "{}/api/oauth/new?client_id=test-client-id&response_type=code&redirect_uri=http%3A%2F%2Flocalhost%3A8400%2Fcallback",
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_exchange_code_posts_form_and_parses_token() {
    let (server, _) = common::setup_gowalla_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("client_id=test-client-id"))
        .and(body_string_contains("client_secret=test-client-secret"))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8400%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "refresh_token": "refresh-1",
            "expires_in": 1209600,
            "username": "sco"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client_for(&server);
    let response = client
        .exchange_code("auth-code-1", "http://localhost:8400/callback")
        .await;

    let token: TokenResponse = response.parse().await.expect("token parse failed");
    assert_eq!(token.access_token, "fresh-token");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(token.username.as_deref(), Some("sco"));
}

#[tokio::test]
async fn test_token_requests_never_carry_oauth_token() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "x"})),
        )
        .mount(&server)
        .await;

    client.exchange_code("c", "http://localhost/cb").await.check().await.unwrap();
    client.refresh_access_token("r").await.check().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        let body = String::from_utf8(request.body).unwrap();
        assert!(!body.contains("oauth_token"), "unexpected oauth_token in {body}");
        assert!(request.url.query().is_none());
    }
}

#[tokio::test]
async fn test_refresh_sends_refresh_grant() {
    let (server, _) = common::setup_gowalla_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "rotated",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client_for(&server);
    let response = client.refresh_access_token("refresh-1").await;

    assert_eq!(
        response.field::<String>("access_token").await.unwrap().as_deref(),
        Some("rotated")
    );
    assert_eq!(response.field::<u64>("expires_in").await.unwrap(), Some(3600));
}

#[tokio::test]
async fn test_rejected_code_is_unauthorized() {
    let (server, _) = common::setup_gowalla_mock().await;
    common::mount_status(&server, "/api/oauth/token", 401, r#"{"error":"invalid_grant"}"#).await;

    let client = common::client_for(&server);
    let response = client.exchange_code("stale", "http://localhost/cb").await;

    let err = response.get("access_token").await.unwrap_err();
    let api = err.api_error().expect("expected an API error");
    assert_eq!(api.kind(), ApiErrorKind::Unauthorized);
    assert_eq!(api.message(), r#"{"error":"invalid_grant"}"#);
}
