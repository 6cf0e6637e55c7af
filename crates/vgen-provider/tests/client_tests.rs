//! Provider client tests against a mock prediction API.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vgen_models::{Orientation, Preset};
use vgen_provider::{ErrorKind, ProviderClient, ProviderConfig, ProviderError, VideoGenerator};

const SUBMIT: &str = "/v1/models/minimax/video-01/predictions";

fn config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        api_token: Some("test-token".to_string()),
        base_url: server.uri(),
        poll_interval: Duration::from_millis(5),
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(5),
        ..Default::default()
    }
}

fn client(server: &MockServer) -> ProviderClient {
    ProviderClient::new(config(server)).unwrap()
}

fn preset(orientation: Orientation) -> Preset {
    Preset {
        id: "promo".to_string(),
        name: "Product Promo".to_string(),
        description: "Short product spot".to_string(),
        fields: vec!["Product Name".to_string()],
        orientation,
        duration: 8,
        style: "energetic".to_string(),
    }
}

fn task(status: &str, extra: Value) -> ResponseTemplate {
    let mut body = json!({"id": "task-1", "status": status});
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        obj.extend(extra.clone());
    }
    ResponseTemplate::new(201).set_body_json(body)
}

async fn mount_submit(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submit_then_poll_until_succeeded() {
    let server = MockServer::start().await;
    mount_submit(&server, task("starting", json!({}))).await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/task-1"))
        .respond_with(task("processing", json!({})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/task-1"))
        .respond_with(task("succeeded", json!({"output": ["https://cdn.example/v.mp4"]})))
        .mount(&server)
        .await;

    let url = client(&server)
        .generate("Generate a 8 second landscape video.", &preset(Orientation::Landscape))
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example/v.mp4");
}

#[tokio::test]
async fn test_submission_carries_prompt_and_parameters() {
    let server = MockServer::start().await;
    mount_submit(&server, task("succeeded", json!({"output": "https://cdn.example/v.mp4"}))).await;

    client(&server)
        .generate("A prompt", &preset(Orientation::Portrait))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["input"]["prompt"], "A prompt");
    assert_eq!(body["input"]["aspect_ratio"], "9:16");
    assert_eq!(body["input"]["duration"], 5);
    assert!(body["input"]["seed"].is_u64());
}

#[tokio::test]
async fn test_seed_differs_between_calls() {
    let server = MockServer::start().await;
    mount_submit(&server, task("succeeded", json!({"output": {"video": "https://cdn.example/v.mp4"}}))).await;

    let c = client(&server);
    let p = preset(Orientation::Landscape);
    for _ in 0..4 {
        c.generate("same prompt", &p).await.unwrap();
    }

    let seeds: std::collections::HashSet<u64> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["input"]["seed"].as_u64().unwrap()
        })
        .collect();
    assert!(seeds.len() > 1);
}

#[tokio::test]
async fn test_task_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .respond_with(task("failed", json!({"error": "content policy violation"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TaskFailure);
    match err {
        ProviderError::TaskFailed { task_id, detail } => {
            assert_eq!(task_id, "task-1");
            assert_eq!(detail, "content policy violation");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_canceled_task_is_task_failure() {
    let server = MockServer::start().await;
    mount_submit(&server, task("canceled", json!({}))).await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::TaskFailed { .. }));
}

#[tokio::test]
async fn test_success_without_output_is_missing_output() {
    let server = MockServer::start().await;
    mount_submit(&server, task("succeeded", json!({"output": null}))).await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::MissingOutput(ref id) if id == "task-1"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_submit(&server, task("succeeded", json!({"output": "https://cdn.example/v.mp4"}))).await;

    let url = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example/v.mp4");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Server { status: 500, .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_submit(&server, task("succeeded", json!({"output": "https://cdn.example/v.mp4"}))).await;

    assert!(client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SUBMIT))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unauthorized { status: 401 }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_poll_failure_after_submit() {
    let server = MockServer::start().await;
    mount_submit(&server, task("starting", json!({}))).await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/task-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such prediction"))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_undecodable_body_is_invalid_response() {
    let server = MockServer::start().await;
    mount_submit(&server, ResponseTemplate::new(201).set_body_string("<html>oops</html>")).await;

    let err = client(&server)
        .generate("p", &preset(Orientation::Landscape))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_token_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let c = ProviderClient::new(ProviderConfig {
        api_token: None,
        ..config(&server)
    })
    .unwrap();

    let err = c.generate("p", &preset(Orientation::Landscape)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(server.received_requests().await.unwrap().is_empty());
}
