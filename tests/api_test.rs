use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use arcanum_backend::assets::{self, AssetStatus};
use arcanum_backend::auth;
use arcanum_backend::config::AppConfig;
use arcanum_backend::db;
use arcanum_backend::serve::{build_router, AppState};
use arcanum_backend::validate::CreateAssetRequest;
use arcanum_backend::worker::WorkerClient;

const SERVICE_TOKEN: &str = "svc-secret";

struct TestServer {
    base_url: String,
    pool: SqlitePool,
    _guard: TempDir,
}

/// Spawn a stand-in worker that accepts every dispatch and whisper call
async fn spawn_mock_worker() -> String {
    let app = Router::new()
        .route("/jobs", post(|| async { Json(json!({ "accepted": true })) }))
        .route(
            "/whisper",
            post(|| async { Json(json!({ "ok": true, "model": "whisper-1" })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Spawn the API server against a fresh temp database
async fn spawn_server(worker_url: &str, billing: &str) -> TestServer {
    let (pool, guard) = db::create_test_pool_in_temporary_file().await.unwrap();

    let raw = format!(
        r#"
        database_name = "test"
        service_token = "{}"
        worker_url = "{}"
        {}

        [storage]
        root_dir = "{}"
        buckets = ["uploads", "results"]
        "#,
        SERVICE_TOKEN,
        worker_url,
        billing,
        guard.path().join("storage").display()
    );
    let config: AppConfig = toml::from_str(&raw).expect("Valid test config");
    config.validate().expect("Valid test config");

    let worker = WorkerClient::new(&config.worker_url, 2).unwrap();
    let state = Arc::new(AppState {
        pool: pool.clone(),
        config,
        worker,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        pool,
        _guard: guard,
    }
}

async fn default_server() -> TestServer {
    let worker_url = spawn_mock_worker().await;
    spawn_server(&worker_url, "").await
}

/// Helper to provision a user and an asset ready for transcription
async fn seed_user_with_asset(pool: &SqlitePool) -> (String, String, String) {
    let (user_id, token) = auth::create_user(pool, "tester").await.unwrap();
    let request = CreateAssetRequest {
        file_name: "take1.mp3".to_string(),
        mime_type: "audio/mpeg".to_string(),
    };
    let asset = assets::create(pool, &user_id, &request).await.unwrap();
    assets::update_status(pool, &user_id, &asset.id, AssetStatus::Uploaded, None)
        .await
        .unwrap();
    (user_id, token, asset.id)
}

#[tokio::test]
async fn transcribe_audio_end_to_end() {
    let server = default_server().await;
    let (_user_id, token, asset_id) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "assetId": asset_id, "language": "pt" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["language"], "pt");
    assert!(body["jobId"].is_string());
    assert!(body["transcriptionId"].is_string());

    // The row exists in queued state
    let status: String = sqlx::query_scalar("SELECT status FROM transcription_jobs WHERE id = ?")
        .bind(body["transcriptionId"].as_str().unwrap())
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(status, "queued");
}

#[tokio::test]
async fn transcribing_a_foreign_asset_returns_not_found() {
    let server = default_server().await;
    let (_owner, _owner_token, asset_id) = seed_user_with_asset(&server.pool).await;
    let (_intruder, intruder_token) = auth::create_user(&server.pool, "intruder").await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&intruder_token)
        .json(&json!({ "assetId": asset_id }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VAL_404");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transcription_jobs")
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unauthenticated_calls_are_rejected() {
    let server = default_server().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .json(&json!({ "assetId": "irrelevant" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AUTH_401");
}

#[tokio::test]
async fn wrong_method_on_a_function_route_is_405() {
    let server = default_server().await;

    let response = reqwest::Client::new()
        .get(format!("{}/functions/transcribe_audio", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VAL_405");
}

#[tokio::test]
async fn transformation_input_bounds_reject_before_any_row() {
    let server = default_server().await;
    let (_user_id, token, _asset) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/transformations", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "inputText": "too short",
            "kind": "post",
            "length": "short",
            "tone": "casual",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VAL_400");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transformation_jobs")
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn insufficient_balance_is_402_and_balance_stays_put() {
    let worker_url = spawn_mock_worker().await;
    // Grant less than one transcription costs
    let server = spawn_server(
        &worker_url,
        "[billing]\ntranscription_cost = 10\nstarting_grant = 5\n",
    )
    .await;
    let (_user_id, token, asset_id) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "assetId": asset_id }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 402);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BUS_402");

    let response = client
        .get(format!("{}/api/dracmas", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let balance: serde_json::Value = response.json().await.unwrap();
    assert_eq!(balance["balance"], 5);
}

#[tokio::test]
async fn trigger_whisper_rate_limits_the_eleventh_request() {
    let server = default_server().await;
    let (_user_id, token, _asset) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let mut statuses = Vec::new();

    for _ in 0..11 {
        let response = client
            .post(format!("{}/functions/trigger_whisper", server.base_url))
            .bearer_auth(&token)
            .json(&json!({ "audio": "ref" }))
            .send()
            .await
            .unwrap();

        let status = response.status().as_u16();
        let body: serde_json::Value = response.json().await.unwrap();
        if status == 200 {
            // Successful relays never carry a reset marker
            assert!(body.get("resetAt").is_none());
            assert_eq!(body["ok"], true);
        } else {
            assert_eq!(status, 429);
            assert_eq!(body["code"], "RATE_LIMIT");
            assert!(body["resetAt"].is_i64());
        }
        statuses.push(status);
    }

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 10);
    assert_eq!(statuses[10], 429);
}

#[tokio::test]
async fn cleanup_orphans_requires_the_service_credential() {
    let server = default_server().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/cleanup-orphans", server.base_url))
        .bearer_auth("not-the-service-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");

    // The real credential gets a report
    let response = client
        .post(format!("{}/functions/cleanup-orphans", server.base_url))
        .bearer_auth(SERVICE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let report: serde_json::Value = response.json().await.unwrap();
    assert_eq!(report["orphan_files_deleted"], 0);
    assert!(report["errors"].as_array().unwrap().is_empty());
    assert!(report["timestamp"].is_string());
}

#[tokio::test]
async fn worker_callback_completes_a_job() {
    let server = default_server().await;
    let (_user_id, token, asset_id) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let submitted: serde_json::Value = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "assetId": asset_id, "language": "en" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let transcription_id = submitted["transcriptionId"].as_str().unwrap();

    // Worker reports completion with the service credential
    let response = client
        .post(format!(
            "{}/api/jobs/transcription/{}/status",
            server.base_url, transcription_id
        ))
        .bearer_auth(SERVICE_TOKEN)
        .json(&json!({ "status": "completed", "resultText": "ola mundo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The owner polls the terminal state
    let job: serde_json::Value = client
        .get(format!(
            "{}/api/transcriptions/{}",
            server.base_url, transcription_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(job["status"], "completed");
    assert_eq!(job["resultText"], "ola mundo");

    // A reverse transition is refused
    let response = client
        .post(format!(
            "{}/api/jobs/transcription/{}/status",
            server.base_url, transcription_id
        ))
        .bearer_auth(SERVICE_TOKEN)
        .json(&json!({ "status": "processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Without the service credential the callback is forbidden
    let response = client
        .post(format!(
            "{}/api/jobs/transcription/{}/status",
            server.base_url, transcription_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "status": "failed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn brand_voice_round_trips_with_truncation() {
    let server = default_server().await;
    let (_user_id, token, _asset) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let samples: Vec<String> = vec!["short sample".to_string(), "y".repeat(12_000)];

    let response = client
        .put(format!("{}/api/brand-voice", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "tone": "warm",
            "style": "second person, short sentences",
            "samples": samples,
            "preferences": { "emoji": "never" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let stored: serde_json::Value = client
        .get(format!("{}/api/brand-voice", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let read_back = stored["samples"].as_array().unwrap();
    assert_eq!(read_back.len(), 2);
    assert_eq!(read_back[0], "short sample");
    assert_eq!(read_back[1].as_str().unwrap().chars().count(), 10_000);
    assert_eq!(stored["tone"], "warm");
}

#[tokio::test]
async fn brand_voice_rejects_out_of_range_sample_counts() {
    let server = default_server().await;
    let (_user_id, token, _asset) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/api/brand-voice", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "tone": "warm",
            "style": "plain",
            "samples": [],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VAL_400");
}

#[tokio::test]
async fn notifications_surface_and_mark_read() {
    let server = default_server().await;
    let (_user_id, token, asset_id) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let submitted: serde_json::Value = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "assetId": asset_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    client
        .post(format!(
            "{}/api/jobs/transcription/{}/status",
            server.base_url,
            submitted["transcriptionId"].as_str().unwrap()
        ))
        .bearer_auth(SERVICE_TOKEN)
        .json(&json!({ "status": "completed", "resultText": "done" }))
        .send()
        .await
        .unwrap();

    let unread: serde_json::Value = client
        .get(format!("{}/api/notifications?unread=true", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = unread.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["kind"], "transcription_completed");

    let id = list[0]["id"].as_str().unwrap();
    let response = client
        .post(format!("{}/api/notifications/{}/read", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let unread: serde_json::Value = client
        .get(format!("{}/api/notifications?unread=true", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(unread.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn submission_survives_an_unreachable_worker() {
    // Point dispatch at a port nothing listens on
    let server = spawn_server("http://127.0.0.1:9", "").await;
    let (_user_id, token, asset_id) = seed_user_with_asset(&server.pool).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/functions/transcribe_audio", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "assetId": asset_id }))
        .send()
        .await
        .unwrap();

    // Submission reports queued regardless of the worker being down
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queued");

    let status: String = sqlx::query_scalar("SELECT status FROM transcription_jobs WHERE id = ?")
        .bind(body["transcriptionId"].as_str().unwrap())
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(status, "queued");
}
