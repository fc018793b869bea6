//! Integration tests for phaseview-client API operations.
//!
//! These tests use wiremock to simulate the engine and verify that the
//! client speaks its REST contract and surfaces readable errors.

use phaseview_client::{ClientError, EngineClient};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> EngineClient {
    EngineClient::new(format!("{}/api/v1", server.uri()))
}

#[tokio::test]
async fn test_get_system() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "acme",
            "labels": {"env": "dev"}
        })))
        .mount(&mock_server)
        .await;

    let system = client_for(&mock_server).get_system().await.unwrap();
    assert_eq!(system.name, "acme");
    assert_eq!(system.labels.get("env").map(String::as_str), Some("dev"));
}

#[tokio::test]
async fn test_list_pipelines() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pipelines": [
                {
                    "name": "payments",
                    "phases": [
                        {"name": "A", "resource": {"digest": "sha256:1"}},
                        {"name": "B", "depends_on": "A", "resource": {"digest": "sha256:0"}}
                    ]
                },
                {"name": "checkout", "phases": []}
            ]
        })))
        .mount(&mock_server)
        .await;

    let pipelines = client_for(&mock_server).list_pipelines().await.unwrap();
    assert_eq!(pipelines.len(), 2);
    assert_eq!(pipelines[0].name, "payments");
    assert_eq!(pipelines[0].phases[1].dependency(), Some("A"));
    assert_eq!(pipelines[0].phases[0].digest(), Some("sha256:1"));
    assert!(pipelines[1].phases.is_empty());
}

#[tokio::test]
async fn test_get_pipeline_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pipelines/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("pipeline not found\n"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).get_pipeline("missing").await;

    match result {
        Err(err @ ClientError::ApiError { .. }) => {
            assert!(err.is_not_found());
            assert_eq!(err.user_message(), "pipeline not found");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_phase() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pipelines/payments/phases/B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "B",
            "depends_on": "A",
            "source": {"kind": "git"},
            "synced": true
        })))
        .mount(&mock_server)
        .await;

    let phase = client_for(&mock_server)
        .get_phase("payments", "B")
        .await
        .unwrap();
    assert_eq!(phase.name, "B");
    assert_eq!(phase.is_synced(), Some(true));
}

#[tokio::test]
async fn test_get_phase_history() {
    let mock_server = MockServer::start().await;
    let current = Uuid::new_v4();
    let previous = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/pipelines/payments/phases/B/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"version": current, "digest": "sha256:2", "recorded_at": "2024-05-02T10:00:00Z"},
            {"version": previous, "digest": "sha256:1", "recorded_at": "2024-05-01T10:00:00Z"}
        ])))
        .mount(&mock_server)
        .await;

    let history = client_for(&mock_server)
        .get_phase_history("payments", "B")
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, current);
    assert_eq!(history[1].digest.as_deref(), Some("sha256:1"));
}

#[tokio::test]
async fn test_get_phase_history_null_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pipelines/payments/phases/A/history"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let history = client_for(&mock_server)
        .get_phase_history("payments", "A")
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_promote_phase() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pipelines/payments/phases/B/promote"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    client_for(&mock_server)
        .promote_phase("payments", "B")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_perform_edge_with_proposal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pipelines/payments/from/A/to/B/perform"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "annotations": {"dev.getglu.git.proposal.url": "https://github.com/acme/app/pull/3"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .perform_edge("payments", "A", "B")
        .await
        .unwrap();
    assert_eq!(
        result.proposal_url(),
        Some("https://github.com/acme/app/pull/3")
    );
}

#[tokio::test]
async fn test_perform_edge_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pipelines/payments/from/A/to/B/perform"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .perform_edge("payments", "A", "B")
        .await
        .unwrap();
    assert_eq!(result.proposal_url(), None);
}

#[tokio::test]
async fn test_rollback_phase() {
    let mock_server = MockServer::start().await;
    let version = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/v1/pipelines/payments/phases/B/rollback/{}",
            version
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"annotations": null})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .rollback_phase("payments", "B", version)
        .await
        .unwrap();
    assert!(result.annotations.is_none());
}

#[tokio::test]
async fn test_rollback_server_error() {
    let mock_server = MockServer::start().await;
    let version = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/v1/pipelines/payments/phases/B/rollback/{}",
            version
        )))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "phase does not support rollback"
        })))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .rollback_phase("payments", "B", version)
        .await;

    match result {
        Err(ClientError::ApiError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "phase does not support rollback");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused() {
    let client = EngineClient::new("http://127.0.0.1:1/api/v1");

    let result = client.list_pipelines().await;
    assert!(matches!(result, Err(ClientError::RequestFailed(_))));
}
