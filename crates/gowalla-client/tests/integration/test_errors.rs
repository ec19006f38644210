//! Error classification and transport failures

use std::time::Duration;

use gowalla_client::{ApiErrorKind, GowallaClient, GowallaError, Params, TransportError};
use wiremock::matchers::path;
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let (server, client) = common::setup_gowalla_mock().await;

    let cases = [
        ("/bad", 400, ApiErrorKind::BadRequest),
        ("/unauthorized", 401, ApiErrorKind::Unauthorized),
        ("/forbidden", 403, ApiErrorKind::Forbidden),
        ("/missing", 404, ApiErrorKind::NotFound),
        ("/conflict", 409, ApiErrorKind::Generic),
        ("/broken", 500, ApiErrorKind::Generic),
        ("/unavailable", 503, ApiErrorKind::Generic),
    ];
    for (route, status, _) in cases {
        common::mount_status(&server, route, status, &format!("body for {status}")).await;
    }

    for (route, status, kind) in cases {
        let response = client.get(route, Params::new()).await;
        let err = response.get("anything").await.unwrap_err();
        let api = err.api_error().expect("expected an API error");

        assert_eq!(api.kind(), kind, "status {status}");
        assert_eq!(api.status(), status);
        assert_eq!(api.message(), format!("body for {status}"));
    }
}

#[tokio::test]
async fn test_metadata_survives_error_status() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(path("/spots/0"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Error", "spot")
                .set_body_string("Spot not found"),
        )
        .mount(&server)
        .await;

    let response = client.get("/spots/0", Params::new()).await;

    assert_eq!(response.status_code().await.unwrap(), 404);
    assert_eq!(response.response_text().await.unwrap(), "Spot not found");
    assert_eq!(response.header("x-error").await.unwrap().as_deref(), Some("spot"));
    assert_eq!(response.count().await.unwrap_err().api_kind(), Some(ApiErrorKind::NotFound));
    assert_eq!(response.check().await.unwrap_err().api_kind(), Some(ApiErrorKind::NotFound));
}

#[tokio::test]
async fn test_invalid_json_on_success() {
    let (server, client) = common::setup_gowalla_mock().await;
    common::mount_status(&server, "/html", 200, "<html>maintenance</html>").await;

    let response = client.get("/html", Params::new()).await;
    let err = response.get("id").await.unwrap_err();

    assert!(matches!(err, GowallaError::InvalidResponse { status: 200, .. }));
    assert_eq!(
        response.response_text().await.unwrap(),
        "<html>maintenance</html>"
    );
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let (server, mut client) = common::setup_gowalla_mock().await;

    Mock::given(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    client.set_timeout(Some(Duration::from_millis(200)), None);
    let response = client.get("/slow", Params::new()).await;

    let err = response.check().await.unwrap_err();
    assert!(
        matches!(err, GowallaError::Transport(TransportError::Timeout(_))),
        "unexpected error: {err:?}"
    );
    assert!(response.status_code().await.is_err());
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    // Bind and release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GowallaClient::new(common::CLIENT_ID, common::CLIENT_SECRET)
        .with_endpoints(gowalla_client::Endpoints::with_base(format!("http://{addr}")));

    let response = client.get("/spots", Params::new()).await;
    let err = response.get("id").await.unwrap_err();

    assert!(matches!(err, GowallaError::Transport(_)), "unexpected error: {err:?}");
    assert!(err.api_error().is_none());
}
