//! API testing worker relay over a real local WebSocket


use agentqa::workers::{ApiWorkerClient, ApiWorkerError};
use std::time::{Duration, Instant};
use test_helpers::{closed_url, spawn_api_worker, WorkerBehaviour};

#[tokio::test]
async fn test_relays_first_frame_verbatim() {
    let url = spawn_api_worker(WorkerBehaviour::Reply(
        "Collection run finished: 12 passed, 0 failed".to_string(),
    ))
    .await;

    let reply = ApiWorkerClient::new(url)
        .relay(r#"{"prompt":"run petstore"}"#.to_string())
        .await;
    assert_eq!(reply, "Collection run finished: 12 passed, 0 failed");
}

#[tokio::test]
async fn test_envelope_is_forwarded_as_sent() {
    let url = spawn_api_worker(WorkerBehaviour::Echo).await;
    let payload = r#"{"prompt":"run petstore","swagger_url":"http://x/swagger.json"}"#;

    let reply = ApiWorkerClient::new(url).relay(payload.to_string()).await;
    assert_eq!(reply, format!("received: {payload}"));
}

#[tokio::test]
async fn test_silent_worker_times_out_with_literal_message() {
    let url = spawn_api_worker(WorkerBehaviour::Silent).await;
    let client = ApiWorkerClient::new(url).with_receive_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let reply = client.relay("{}".to_string()).await;

    assert_eq!(reply, "Timeout Error: No response");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_worker_close_is_reported() {
    let url = spawn_api_worker(WorkerBehaviour::Close).await;
    let result = ApiWorkerClient::new(url).exchange("{}".to_string()).await;
    assert_eq!(result, Err(ApiWorkerError::ConnectionClosed));
}

#[tokio::test]
async fn test_unanswered_ping_closes_connection() {
    let url = spawn_api_worker(WorkerBehaviour::Stall).await;
    let client = ApiWorkerClient::new(url)
        .with_receive_timeout(Duration::from_secs(10))
        .with_keepalive(Duration::from_millis(100), Duration::from_millis(200));

    let result = client.exchange("{}".to_string()).await;
    assert_eq!(result, Err(ApiWorkerError::ConnectionClosed));
}

#[tokio::test]
async fn test_frequent_pings_do_not_disturb_reply() {
    let url = spawn_api_worker(WorkerBehaviour::Echo).await;
    let client = ApiWorkerClient::new(url)
        .with_keepalive(Duration::from_millis(10), Duration::from_secs(1));

    let reply = client.relay("ping heavy".to_string()).await;
    assert_eq!(reply, "received: ping heavy");
}

#[tokio::test]
async fn test_unreachable_worker() {
    let reply = ApiWorkerClient::new(closed_url("ws", "/ws"))
        .relay("{}".to_string())
        .await;
    assert!(reply.starts_with("Unexpected error: "), "got {reply}");
}
