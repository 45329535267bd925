//! Integration tests for the HTTP remote store against a mock server.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use strive::progress::engine::{LinkOutcome, ProgressEngine, WorkoutCompletion};
use strive::progress::ManualClock;
use strive::storage::{LocalStore, SyncSettings};
use strive::sync::{HttpRemoteStore, LeaderboardEntry, RemoteIdentity, RemoteStore, SyncError};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn store(server: &MockServer) -> HttpRemoteStore {
    HttpRemoteStore::new(server.uri(), Some(TOKEN.to_string())).unwrap()
}

#[tokio::test]
async fn test_fetch_user_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "xp": 640, "revision": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let document = store(&server).fetch_user("u1").await.unwrap().unwrap();
    assert_eq!(document["xp"], 640);
}

#[tokio::test]
async fn test_missing_user_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(store(&server).fetch_user("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_maps_to_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let remote = store(&server);
    assert!(matches!(remote.fetch_user("u1").await, Err(SyncError::NetworkError(_))));
    assert!(matches!(
        remote.merge_user("u1", json!({ "xp": 1 })).await,
        Err(SyncError::ApiError(_))
    ));
}

#[tokio::test]
async fn test_merge_user_patches_document() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/u1"))
        .and(body_json(json!({ "xp": 90 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).merge_user("u1", json!({ "xp": 90 })).await.unwrap();
}

#[tokio::test]
async fn test_leaderboard_round_trip() {
    let server = MockServer::start().await;
    let last_active = Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap();
    let entry = LeaderboardEntry {
        username: "Quinn".to_string(),
        xp: 2750,
        level: 6,
        last_active,
    };

    Mock::given(method("PUT"))
        .and(path("/leaderboard/u1"))
        .and(body_json(json!({
            "username": "Quinn",
            "xp": 2750,
            "level": 6,
            "lastActive": last_active,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leaderboard"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry])))
        .mount(&server)
        .await;

    let remote = store(&server);
    remote.upsert_leaderboard("u1", &entry).await.unwrap();
    let top = remote.top_leaderboard(3).await.unwrap();
    assert_eq!(top, vec![entry]);
}

#[tokio::test]
async fn test_upload_returns_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/files/profile-photos/u1/1"))
        .and(header("Content-Type", "image/jpeg"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "url": "https://cdn.test/profile-photos/u1/1" })),
        )
        .mount(&server)
        .await;

    let url = store(&server)
        .upload_file("profile-photos/u1/1", vec![0xFF, 0xD8], "image/jpeg")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.test/profile-photos/u1/1");
}

#[tokio::test]
async fn test_engine_creates_remote_document_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/leaderboard/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 6, 0, 0).unwrap()));
    let mut engine: ProgressEngine<HttpRemoteStore> = ProgressEngine::with_clock(
        LocalStore::open_in_memory().unwrap(),
        SyncSettings::default(),
        clock,
    );

    let outcome = engine
        .link_identity(
            RemoteIdentity::new("u1").with_display_name("Dana"),
            Arc::new(store(&server)),
        )
        .await
        .unwrap();
    assert_eq!(outcome, LinkOutcome::Created);

    engine.complete_workout(WorkoutCompletion::new("w1", 25));
    engine.flush().await;

    assert!(engine.record().last_sync_success);
    assert_eq!(
        engine.record().profile.as_ref().unwrap().name.as_deref(),
        Some("Dana")
    );
}
