//! Integration tests for the agency REST client against a mock backend.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use visadesk_alerts::{AlertDeriver, ClientIndex, ClientNameResolver, TaskKind};
use visadesk_api::{AgencyClient, ApiError};
use visadesk_core::{ApiConfig, RetryConfig};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
    }
}

fn client_for(server: &MockServer, token: Option<&str>) -> AgencyClient {
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    };
    AgencyClient::from_config(&config, token.map(str::to_string))
        .unwrap()
        .with_retry(fast_retry())
}

#[tokio::test]
async fn test_fetch_tasks_flattens_collections() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tasks/all"))
        .and(matchers::header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "allData": {
                "graphicDesigns": [{ "_id": "g1", "status": "Design" }],
                "application": [
                    { "_id": "a1", "visaStatus": "Processing" },
                    { "_id": "a2", "visaStatus": "Completed" }
                ],
                "epassports": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("secret-token"));
    let tasks = client.fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].kind(), TaskKind::Application);
    assert_eq!(tasks[2].kind(), TaskKind::GraphicDesign);
}

#[tokio::test]
async fn test_unsuccessful_payload_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tasks/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let err = client_for(&server, None).fetch_tasks().await.unwrap_err();
    assert!(matches!(err, ApiError::Unsuccessful { ref endpoint } if endpoint == "/api/tasks/all"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/clients"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "clients": [
                { "_id": "c1", "name": "Hanako Yamada" },
                { "_id": "c2", "name": "Kenji Sato" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_for(&server, None).fetch_clients().await.unwrap();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[1].name, "Kenji Sato");
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tasks/all"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, None).fetch_tasks().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(err.friendly_message().contains("rejected"));
}

#[tokio::test]
async fn test_retries_give_up_after_limit() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tasks/all"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server, None).fetch_tasks().await.unwrap_err();
    assert!(matches!(err, ApiError::Transient(_)));
    assert!(err.is_network_error());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let client = AgencyClient::from_config(&config, None)
        .unwrap()
        .with_retry(RetryConfig::none());

    let err = client.fetch_tasks().await.unwrap_err();
    assert!(err.is_network_error(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_fetch_client_name() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/clients/c9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client": { "_id": "c9", "name": "Kenji Sato" }
        })))
        .mount(&server)
        .await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/clients/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Client not found"))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    assert_eq!(
        client.fetch_client_name("c9").await.unwrap().as_deref(),
        Some("Kenji Sato")
    );
    assert_eq!(client.fetch_client_name("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_client_serves_as_directory_for_derivation() {
    let server = MockServer::start().await;
    let deadline = (Utc::now() + chrono::Duration::hours(36)).to_rfc3339();

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tasks/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "allData": {
                "japanVisit": [{
                    "_id": "jv1",
                    "clientId": "c9",
                    "deadline": deadline,
                    "handledBy": "Alice",
                    "status": "Processing"
                }]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/clients/c9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client": { "name": "Kenji Sato" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let tasks = client.fetch_tasks().await.unwrap();

    let index = ClientIndex::default();
    let mut resolver = ClientNameResolver::new(&index, Some(&client));
    let derived = AlertDeriver::default()
        .derive(&tasks, Utc::now(), "Alice", &mut resolver)
        .await;

    assert_eq!(derived.deadline.len(), 1);
    assert_eq!(derived.deadline[0].client_name, "Kenji Sato");
    assert!(derived.deadline[0].message.starts_with("Kenji Sato's Japan Visit"));
}
