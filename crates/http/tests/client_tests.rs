//! Integration tests for the MedPort HTTP client

use medport_core::{
    AppointmentStatus, CoreError, CoreResult, MemoryTokenStore, NewAppointment, NewMessage,
    TokenPair, TokenStore,
};
use medport_http::{ApiClient, ClientError};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Store {}

    impl TokenStore for Store {
        fn get(&self) -> Option<TokenPair>;
        fn set(&self, tokens: &TokenPair) -> CoreResult<()>;
        fn remove(&self);
    }
}

fn client_with_tokens(uri: String, tokens: Option<TokenPair>) -> (ApiClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(tokens.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens));
    let client = ApiClient::builder()
        .base_url(uri)
        .token_store(store.clone())
        .build()
        .unwrap();
    (client, store)
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ApiClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_no_authorization_header_without_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doctors/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut store = MockStore::new();
    store.expect_get().returning(|| None);
    store.expect_set().never();
    store.expect_remove().never();

    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .token_store(Arc::new(store))
        .build()
        .unwrap();

    let doctors = client.doctors().await.unwrap();
    assert!(doctors.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments/"))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "patient": 5,
            "doctor": 2,
            "appointment_datetime": "2025-03-04T09:30:00Z",
            "status": "Requested",
            "notes": "",
            "created_at": "2025-03-01T12:00:00Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _store) = client_with_tokens(mock_server.uri(), Some(TokenPair::new("A", "R")));

    let appointments = client.appointments().await.unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Requested);
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "doctor": 2,
            "appointment_datetime": "2025-03-04T09:30:00Z",
            "notes": "annual check-up"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 12,
            "patient": 5,
            "doctor": 2,
            "appointment_datetime": "2025-03-04T09:30:00Z",
            "status": "Requested",
            "notes": "annual check-up",
            "created_at": "2025-03-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _store) = client_with_tokens(mock_server.uri(), Some(TokenPair::new("A", "R")));

    let created = client
        .create_appointment(&NewAppointment {
            doctor: 2,
            appointment_datetime: "2025-03-04T09:30:00Z".parse().unwrap(),
            notes: "annual check-up".to_string(),
            patient: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, 12);
}

#[tokio::test]
async fn test_error_detail_surfaces() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages/"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "detail": "You do not have permission to perform this action." })),
        )
        .mount(&mock_server)
        .await;

    let (client, store) = client_with_tokens(mock_server.uri(), Some(TokenPair::new("A", "R")));

    let result = client
        .send_message(&NewMessage {
            receiver: 3,
            message: "hello".to_string(),
        })
        .await;

    match result {
        Err(ClientError::Http { status, detail }) => {
            assert_eq!(status, 403);
            assert_eq!(detail, "You do not have permission to perform this action.");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    // Non-401 failures leave the session untouched
    assert_eq!(store.get(), Some(TokenPair::new("A", "R")));
}

#[tokio::test]
async fn test_obtain_tokens_is_not_stored_by_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token/"))
        .and(body_json(json!({ "username": "alice", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A", "refresh": "R" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store) = client_with_tokens(mock_server.uri(), None);

    let tokens = client.obtain_tokens("alice", "secret").await.unwrap();
    assert_eq!(tokens, TokenPair::new("A", "R"));
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn test_network_error() {
    // Nothing listens on port 1
    let (client, _store) = client_with_tokens("http://127.0.0.1:1".to_string(), None);
    let result = client.doctors().await;
    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_refresh_persistence_failure_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/emrs/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "NEW" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|| Some(TokenPair::new("OLD", "R")));
    store
        .expect_set()
        .times(1)
        .returning(|_| Err(CoreError::io_error("disk full")));

    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .token_store(Arc::new(store))
        .build()
        .unwrap();

    let result = client.emrs().await;
    assert!(matches!(result, Err(ClientError::Storage(_))));
}
