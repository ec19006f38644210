//! Request composition and lazy response behavior against a live socket

use gowalla_client::{models::Spot, Entry, Params, Phase};
use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_get_with_token_sends_oauth_token_only() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/sco"))
        .and(header("accept", "application/json"))
        .and(query_param("oauth_token", common::ACCESS_TOKEN))
        .and(query_param_is_missing("client_id"))
        .and(query_param_is_missing("client_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "/users/sco",
            "first_name": "Scott",
            "last_name": "Raymond"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client.get("/users/sco", Params::new()).await;
    let user: gowalla_client::models::User = response.parse().await.unwrap();
    assert_eq!(user.display_name().as_deref(), Some("Scott Raymond"));
}

#[tokio::test]
async fn test_anonymous_get_sends_client_credentials() {
    let (server, _) = common::setup_gowalla_mock().await;

    Mock::given(method("GET"))
        .and(path("/spots"))
        .and(query_param("client_id", common::CLIENT_ID))
        .and(query_param("client_secret", common::CLIENT_SECRET))
        .and(query_param("lat", "30.2672"))
        .and(query_param_is_missing("oauth_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 1, "name": "Cafe"},
            {"id": 2, "name": "Park"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client_for(&server);
    let spots = client
        .get("/spots", Params::from([("lat", "30.2672")]))
        .await;

    let names: Vec<String> = spots
        .entries()
        .await
        .unwrap()
        .filter_map(|entry| match entry {
            Entry::Item(value) => value["name"].as_str().map(str::to_string),
            Entry::Field(..) => None,
        })
        .collect();
    assert_eq!(names, vec!["Cafe", "Park"]);
}

#[tokio::test]
async fn test_post_sends_form_body() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("POST"))
        .and(path("/checkins"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("spot_id=7"))
        .and(body_string_contains("comment=great+coffee"))
        .and(body_string_contains("oauth_token=test-access-token"))
        .and(query_param_is_missing("spot_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client
        .post(
            "/checkins",
            Params::new().with("spot_id", "7").with("comment", "great coffee"),
        )
        .await;
    assert_eq!(response.field::<u64>("id").await.unwrap(), Some(99));
    assert_eq!(response.status_code().await.unwrap(), 201);
}

#[tokio::test]
async fn test_delete_sends_query_parameters() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/trips/3"))
        .and(query_param("oauth_token", common::ACCESS_TOKEN))
        .and(query_param("reason", "duplicate"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = client
        .delete("/trips/3", Params::from([("reason", "duplicate")]))
        .await;
    assert_eq!(response.count().await.unwrap(), 0);
    assert_eq!(response.status_code().await.unwrap(), 204);
}

#[tokio::test]
async fn test_absolute_url_bypasses_api_base() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("GET"))
        .and(path("/elsewhere/list"))
        .and(query_param("page", "2"))
        .and(query_param("oauth_token", common::ACCESS_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"page": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/elsewhere/list?page=2", server.uri());
    let response = client.get(&url, Params::new()).await;
    assert_eq!(response.field::<u32>("page").await.unwrap(), Some(2));
}

#[tokio::test]
async fn test_repeated_access_hits_network_once() {
    let (server, client) = common::setup_gowalla_mock().await;

    Mock::given(method("GET"))
        .and(path("/spots/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "req-7")
                .set_body_json(serde_json::json!({"id": 7, "name": "Cafe"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client.get("/spots/7", Params::new()).await;
    assert_eq!(response.phase(), Phase::Pending);

    for _ in 0..3 {
        assert_eq!(response.count().await.unwrap(), 2);
        assert!(response.contains_key("name").await.unwrap());
    }
    assert_eq!(
        response.header("x-request-id").await.unwrap().as_deref(),
        Some("req-7")
    );
    assert_eq!(response.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_parse_spot_view() {
    let (server, client) = common::setup_gowalla_mock().await;
    common::mount_spot(&server, 18568, "Gowalla HQ").await;

    let spot: Spot = client
        .get("/spots/18568", Params::new())
        .await
        .parse()
        .await
        .unwrap();

    assert_eq!(spot.id, Some(18568));
    assert_eq!(spot.name.as_deref(), Some("Gowalla HQ"));
    assert_eq!(spot.checkins_count, Some(42));
}

#[tokio::test]
async fn test_local_mutation_does_not_resend() {
    let (server, client) = common::setup_gowalla_mock().await;
    common::mount_spot(&server, 7, "Cafe").await;

    let response = client.get("/spots/7", Params::new()).await;
    response
        .set("name", serde_json::json!("Renamed"))
        .await
        .unwrap();
    response.remove("lat").await.unwrap();

    assert_eq!(
        response.field::<String>("name").await.unwrap().as_deref(),
        Some("Renamed")
    );
    assert!(response.get("lat").await.unwrap().is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
