use assert_matches::assert_matches;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_api::{ApiClient, ApiError};
use shared_models::error::AppError;
use shared_utils::test_utils::{MockApiResponses, TestConfig};

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&TestConfig::with_base_url(base_url).to_app_config()).expect("client should build")
}

#[tokio::test]
async fn test_get_sends_bearer_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/patient-appointments/available-slots"))
        .and(header("authorization", "Bearer abc"))
        .and(query_param("doctorId", "d1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockApiResponses::slots_response(&[("09:00", "09:30")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let body: Value = client
        .get("/api/patient-appointments/available-slots", "abc", &[("doctorId", "d1")])
        .await
        .unwrap();

    assert_eq!(body["slots"][0]["start"], "09:00");
}

#[tokio::test]
async fn test_post_without_token_and_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/patients/login"))
        .and(body_json(json!({ "emailOrMobile": "a@b.c", "password": "pw" })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&format!("{}/", mock_server.uri()));
    let body: Value = client
        .post("/patients/login", None, json!({ "emailOrMobile": "a@b.c", "password": "pw" }))
        .await
        .unwrap();

    assert!(body.is_null());
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_conflict_keeps_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/patient-appointments/book"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(MockApiResponses::error_response("Slot already booked")),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client
        .post::<Value>("/api/patient-appointments/book", Some("abc"), json!({}))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.backend_message(), Some("Slot already booked"));
    assert_eq!(AppError::from(err).user_message(), "This slot is already booked.");
}

#[tokio::test]
async fn test_status_mapping() {
    let mock_server = MockServer::start().await;

    for (route, status) in [("/unauthorized", 401), ("/forbidden", 403), ("/missing", 404), ("/broken", 500)] {
        Mock::given(method("PUT"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "error": "nope" })))
            .mount(&mock_server)
            .await;
    }

    let client = client_for(&mock_server.uri());

    assert_matches!(
        client.put::<Value>("/unauthorized", "t", json!({})).await,
        Err(ApiError::Unauthorized(m)) if m == "nope"
    );
    assert_matches!(
        client.put::<Value>("/forbidden", "t", json!({})).await,
        Err(ApiError::Unauthorized(_))
    );
    assert_matches!(
        client.put::<Value>("/missing", "t", json!({})).await,
        Err(ApiError::NotFound(_))
    );
    assert_matches!(
        client.put::<Value>("/broken", "t", json!({})).await,
        Err(ApiError::Status { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_unexpected_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hospital"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let result = client.get::<Vec<Value>>("/hospital", "t", &[]).await;

    assert_matches!(result, Err(ApiError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let client = client_for(&uri);
    let err = client.get::<Value>("/hospital", "t", &[]).await.unwrap_err();

    assert_matches!(err, ApiError::Transport(_));
    assert_matches!(AppError::from(err), AppError::Network(_));
}

#[test]
fn test_empty_base_url_is_rejected() {
    let config = TestConfig::with_base_url("").to_app_config();
    assert_matches!(ApiClient::new(&config), Err(ApiError::NotConfigured(_)));
}
