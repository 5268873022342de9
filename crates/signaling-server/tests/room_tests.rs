//! Room API integration tests.

use serde_json::{json, Value};
use signaling_test_utils::TestSignalingServer;

async fn create_room(
    client: &reqwest::Client,
    server: &TestSignalingServer,
    body: Value,
) -> Result<Value, anyhow::Error> {
    let response = client
        .post(format!("{}/rooms", server.url()))
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), 201);
    Ok(response.json().await?)
}

#[tokio::test]
async fn test_create_room_returns_empty_room() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let room = create_room(
        &client,
        &server,
        json!({"name": "standup", "description": "daily", "created_by": "alice"}),
    )
    .await?;

    assert!(room["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(room["name"], "standup");
    assert_eq!(room["description"], "daily");
    assert_eq!(room["created_by"], "alice");
    assert_eq!(room["users"], json!([null, null]));
    assert!(room["created_at"].is_i64());
    assert!(room.get("expired_at").is_none());

    Ok(())
}

#[tokio::test]
async fn test_create_room_ignores_preseeded_users() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let room = create_room(
        &client,
        &server,
        json!({"name": "x", "created_by": "alice", "users": ["alice", "bob"]}),
    )
    .await?;

    assert_eq!(room["users"], json!([null, null]));
    Ok(())
}

#[tokio::test]
async fn test_get_room_round_trip_and_404() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let room = create_room(&client, &server, json!({"name": "x"})).await?;
    let room_id = room["id"].as_str().unwrap_or_default();

    let response = client
        .get(format!("{}/rooms/{}", server.url(), room_id))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let fetched: Value = response.json().await?;
    assert_eq!(fetched["id"], room["id"]);

    let response = client
        .get(format!("{}/rooms/does-not-exist", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn test_delete_room_returns_204_then_404() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let room = create_room(&client, &server, json!({"name": "x"})).await?;
    let url = format!(
        "{}/rooms/{}",
        server.url(),
        room["id"].as_str().unwrap_or_default()
    );

    let response = client.delete(&url).send().await?;
    assert_eq!(response.status(), 204);

    let response = client.delete(&url).send().await?;
    assert_eq!(response.status(), 404);

    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_hides_expired_and_filters_owner() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();
    let now = chrono::Utc::now().timestamp();

    let first = create_room(&client, &server, json!({"name": "a", "created_by": "alice"})).await?;
    let second = create_room(
        &client,
        &server,
        json!({"name": "b", "created_by": "bob", "expired_at": now + 3600}),
    )
    .await?;
    let expired = create_room(
        &client,
        &server,
        json!({"name": "c", "created_by": "alice", "expired_at": now - 5}),
    )
    .await?;
    let stale = create_room(
        &client,
        &server,
        json!({"name": "d", "created_by": "alice", "expired_at": now - 3600}),
    )
    .await?;

    let listed: Vec<Value> = client
        .get(format!("{}/rooms", server.url()))
        .send()
        .await?
        .json()
        .await?;
    let ids: Vec<&Value> = listed.iter().map(|r| &r["id"]).collect();
    assert_eq!(ids, vec![&first["id"], &second["id"]]);

    // Soft-expired room still exists, the stale one was reclaimed by listing.
    let response = client
        .get(format!(
            "{}/rooms/{}",
            server.url(),
            expired["id"].as_str().unwrap_or_default()
        ))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let response = client
        .get(format!(
            "{}/rooms/{}",
            server.url(),
            stale["id"].as_str().unwrap_or_default()
        ))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    let own: Vec<Value> = client
        .get(format!("{}/rooms?owner_id=alice", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(own.len(), 1);
    assert_eq!(own.first().map(|r| &r["id"]), Some(&first["id"]));

    Ok(())
}

#[tokio::test]
async fn test_create_room_rejects_malformed_body() -> Result<(), anyhow::Error> {
    let server = TestSignalingServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rooms", server.url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert!(response.status().is_client_error());

    Ok(())
}
