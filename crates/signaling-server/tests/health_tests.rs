//! Health endpoint integration tests.
//!
//! Tests `/health`, `/ready` and `/metrics` using the `TestSignalingServer` harness.

use signaling_test_utils::TestSignalingServer;

/// Test that health endpoint returns 200 and ok status.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({"status": "ok"}));

    Ok(())
}

/// Test that health endpoint returns JSON content type.
#[tokio::test]
async fn test_health_endpoint_returns_json() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    Ok(())
}

/// Test that readiness flips to 503 once the server starts draining.
#[tokio::test]
async fn test_ready_endpoint_follows_health_state() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    server.state().health.start_draining();
    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "draining");

    Ok(())
}

/// Test that the metrics endpoint is served as text.
#[tokio::test]
async fn test_metrics_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;

    let response = reqwest::get(format!("{}/nonexistent", server.url())).await?;
    assert_eq!(response.status(), 404);

    Ok(())
}
