//! Background dispatch: requests run while the caller keeps going

use std::time::Duration;

use gowalla_client::{ApiErrorKind, DispatchMode, Params, Phase};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_background_request_resolves_on_access() {
    let (server, mut client) = common::setup_gowalla_mock().await;
    client.set_asynchronous(true);
    assert_eq!(client.dispatch_mode(), DispatchMode::Background);

    Mock::given(method("GET"))
        .and(path("/spots/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(100))
                .set_body_json(serde_json::json!({"id": 7, "name": "Cafe"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client.get("/spots/7", Params::new()).await;
    assert_eq!(response.phase(), Phase::Pending);

    assert_eq!(
        response.field::<String>("name").await.unwrap().as_deref(),
        Some("Cafe")
    );
    assert_eq!(response.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_concurrent_background_requests() {
    let (server, mut client) = common::setup_gowalla_mock().await;
    client.set_asynchronous(true);

    for id in 1..=3u64 {
        Mock::given(method("GET"))
            .and(path(format!("/spots/{id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(50))
                    .set_body_json(serde_json::json!({"id": id})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut responses = Vec::new();
    for id in 1..=3u64 {
        responses.push(client.get(&format!("/spots/{id}"), Params::new()).await);
    }
    assert_eq!(client.pending_count(), 3);

    for (expected, response) in (1..=3u64).zip(&responses) {
        assert_eq!(response.field::<u64>("id").await.unwrap(), Some(expected));
    }
}

#[tokio::test]
async fn test_dropped_response_still_completes() {
    let (server, mut client) = common::setup_gowalla_mock().await;
    client.set_asynchronous(true);

    Mock::given(method("POST"))
        .and(path("/checkins"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_delay(Duration::from_millis(50))
                .set_body_string("checkin failed"),
        )
        .expect(1)
        .mount(&server)
        .await;

    drop(client.post("/checkins", Params::from([("spot_id", "7")])).await);
    client.drain_pending().await;

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_background_error_raised_on_access() {
    let (server, mut client) = common::setup_gowalla_mock().await;
    client.set_asynchronous(true);
    common::mount_status(&server, "/spots/404", 404, "nope").await;

    let response = client.get("/spots/404", Params::new()).await;
    let err = response.finish().await.unwrap_err();
    assert_eq!(err.api_kind(), Some(ApiErrorKind::NotFound));
}

#[tokio::test]
async fn test_switching_back_to_blocking() {
    let (server, mut client) = common::setup_gowalla_mock().await;
    common::mount_spot(&server, 7, "Cafe").await;

    client.set_asynchronous(true);
    client.set_asynchronous(false);

    let response = client.get("/spots/7", Params::new()).await;
    assert_eq!(client.pending_count(), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(response.field::<u64>("id").await.unwrap(), Some(7));
}
