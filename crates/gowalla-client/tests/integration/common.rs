//! Shared test helpers for Gowalla API integration tests
//!
//! Each helper mounts the endpoints a test needs and returns a client whose
//! API base, authorize URL and token URL all point at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gowalla_client::{Endpoints, GowallaClient};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Anonymous client (client credentials only) aimed at `server`.
pub fn client_for(server: &MockServer) -> GowallaClient {
    GowallaClient::new(CLIENT_ID, CLIENT_SECRET).with_endpoints(Endpoints::with_base(server.uri()))
}

/// Starts a mock server with no routes and an authenticated client.
pub async fn setup_gowalla_mock() -> (MockServer, GowallaClient) {
    let server = MockServer::start().await;
    let client = client_for(&server).with_access_token(ACCESS_TOKEN);
    (server, client)
}

/// Mounts `GET /spots/{id}` returning a small spot document.
pub async fn mount_spot(server: &MockServer, id: u64, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/spots/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "url": format!("/spots/{id}"),
            "name": name,
            "lat": 30.2672,
            "lng": -97.7431,
            "checkins_count": 42
        })))
        .mount(server)
        .await;
}

/// Mounts `path` answering every method with `status` and a raw body.
pub async fn mount_status(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(path(route.to_string()))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
        .mount(server)
        .await;
}
