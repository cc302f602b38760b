use sqlx::SqlitePool;

use arcanum_backend::assets::{self, AssetStatus};
use arcanum_backend::auth;
use arcanum_backend::db;
use arcanum_backend::error::ApiError;
use arcanum_backend::jobs::{self, JobStatus};
use arcanum_backend::ledger;
use arcanum_backend::notifications;
use arcanum_backend::validate::{CreateAssetRequest, TranscribeRequest, TransformRequest};

const COST: i64 = 10;
const GRANT: i64 = 100;

/// Helper to create a pool with one user
async fn pool_with_user() -> (SqlitePool, String) {
    let pool = db::create_test_pool_in_memory().await;
    let (user_id, _token) = auth::create_user(&pool, "tester").await.unwrap();
    (pool, user_id)
}

/// Helper to seed an asset in `uploaded` state for a user
async fn seed_uploaded_asset(pool: &SqlitePool, user_id: &str) -> String {
    let request = CreateAssetRequest {
        file_name: "take1.mp3".to_string(),
        mime_type: "audio/mpeg".to_string(),
    };
    let asset = assets::create(pool, user_id, &request).await.unwrap();
    assets::update_status(pool, user_id, &asset.id, AssetStatus::Uploaded, None)
        .await
        .unwrap();
    asset.id
}

fn transcribe_request(asset_id: &str, language: Option<&str>) -> TranscribeRequest {
    TranscribeRequest {
        asset_id: asset_id.to_string(),
        language: language.map(str::to_string),
    }
}

/// Helper to count transcription rows
async fn count_transcriptions(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transcription_jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn submission_creates_a_queued_row_and_debits() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;

    let job = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, Some("pt")),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.language, "pt");
    assert_eq!(job.asset_id, asset_id);

    let stored = jobs::get_transcription_owned(&pool, &user_id, &job.id)
        .await
        .unwrap();
    assert_eq!(stored.status, JobStatus::Queued);
    assert_eq!(stored.language, "pt");

    // Asset entered processing, caller paid the cost
    let asset = assets::get_owned(&pool, &user_id, &asset_id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Processing);
    let view = ledger::balance(&pool, &user_id, GRANT).await.unwrap();
    assert_eq!(view.balance, GRANT - COST);
}

#[tokio::test]
async fn foreign_assets_read_as_not_found_and_create_no_row() {
    let (pool, owner_id) = pool_with_user().await;
    let (intruder_id, _) = auth::create_user(&pool, "intruder").await.unwrap();
    let asset_id = seed_uploaded_asset(&pool, &owner_id).await;

    let result = jobs::submit_transcription(
        &pool,
        &intruder_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(count_transcriptions(&pool).await, 0);

    // The intruder was not debited either
    let view = ledger::balance(&pool, &intruder_id, GRANT).await.unwrap();
    assert_eq!(view.balance, GRANT);
}

#[tokio::test]
async fn malformed_payloads_are_rejected_before_any_write() {
    let (pool, user_id) = pool_with_user().await;
    seed_uploaded_asset(&pool, &user_id).await;

    let result = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request("not-a-uuid", None),
        COST,
        GRANT,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert_eq!(count_transcriptions(&pool).await, 0);
}

#[tokio::test]
async fn pending_assets_cannot_be_transcribed() {
    let (pool, user_id) = pool_with_user().await;
    let request = CreateAssetRequest {
        file_name: "take1.mp3".to_string(),
        mime_type: "audio/mpeg".to_string(),
    };
    let asset = assets::create(&pool, &user_id, &request).await.unwrap();

    let result = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset.id, None),
        COST,
        GRANT,
    )
    .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn insufficient_balance_rejects_the_submission() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;

    let result = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, None),
        COST,
        5, // grant smaller than the cost
    )
    .await;

    assert!(matches!(result, Err(ApiError::InsufficientBalance)));
    assert_eq!(count_transcriptions(&pool).await, 0);

    // Asset untouched by the failed submission
    let asset = assets::get_owned(&pool, &user_id, &asset_id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Uploaded);
}

#[tokio::test]
async fn status_updates_move_forward_only() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;
    let job = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    let job = jobs::update_transcription_status(&pool, &job.id, JobStatus::Processing, None, None)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Processing);

    // Back to queued is a reverse transition
    let result =
        jobs::update_transcription_status(&pool, &job.id, JobStatus::Queued, None, None).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let job = jobs::update_transcription_status(
        &pool,
        &job.id,
        JobStatus::Completed,
        Some("the transcript"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_text.as_deref(), Some("the transcript"));

    // Terminal states are frozen
    let result =
        jobs::update_transcription_status(&pool, &job.id, JobStatus::Failed, None, None).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn completion_readies_the_asset_and_notifies_the_owner() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;
    let job = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    jobs::update_transcription_status(&pool, &job.id, JobStatus::Completed, Some("text"), None)
        .await
        .unwrap();

    let asset = assets::get_owned(&pool, &user_id, &asset_id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Ready);

    let unread = notifications::list(&pool, &user_id, true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].kind, "transcription_completed");
}

#[tokio::test]
async fn failure_refunds_the_debit() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;
    let job = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    jobs::update_transcription_status(
        &pool,
        &job.id,
        JobStatus::Failed,
        None,
        Some("worker exploded"),
    )
    .await
    .unwrap();

    let view = ledger::balance(&pool, &user_id, GRANT).await.unwrap();
    assert_eq!(view.balance, GRANT);

    let asset = assets::get_owned(&pool, &user_id, &asset_id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Failed);

    let job = jobs::get_transcription_owned(&pool, &user_id, &job.id)
        .await
        .unwrap();
    assert_eq!(job.error.as_deref(), Some("worker exploded"));
}

#[tokio::test]
async fn transformation_submission_and_completion() {
    let (pool, user_id) = pool_with_user().await;

    let request = TransformRequest {
        input_text: "A long enough input text for a transformation".to_string(),
        kind: "newsletter".to_string(),
        length: "medium".to_string(),
        tone: "mystical".to_string(),
    };
    let valid = request.validate().unwrap();

    let job = jobs::submit_transformation(&pool, &user_id, &valid, COST, GRANT)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.kind, "newsletter");

    let job = jobs::update_transformation_status(
        &pool,
        &job.id,
        JobStatus::Completed,
        Some("the newsletter"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(job.output_text.as_deref(), Some("the newsletter"));

    let unread = notifications::list(&pool, &user_id, true).await.unwrap();
    assert_eq!(unread[0].kind, "transformation_completed");
}

#[tokio::test]
async fn ownership_applies_to_reads_too() {
    let (pool, owner_id) = pool_with_user().await;
    let (other_id, _) = auth::create_user(&pool, "other").await.unwrap();
    let asset_id = seed_uploaded_asset(&pool, &owner_id).await;

    let job = jobs::submit_transcription(
        &pool,
        &owner_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    let result = jobs::get_transcription_owned(&pool, &other_id, &job.id).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn stale_sweep_sees_undispatched_jobs_only() {
    let (pool, user_id) = pool_with_user().await;
    let asset_id = seed_uploaded_asset(&pool, &user_id).await;

    let job = jobs::submit_transcription(
        &pool,
        &user_id,
        &transcribe_request(&asset_id, None),
        COST,
        GRANT,
    )
    .await
    .unwrap();

    // Never dispatched: stale regardless of threshold
    let stale = jobs::stale_transcriptions(&pool, 3600).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, job.id);

    // Freshly dispatched: no longer stale
    jobs::mark_transcription_dispatched(&pool, &job.id).await.unwrap();
    let stale = jobs::stale_transcriptions(&pool, 3600).await.unwrap();
    assert!(stale.is_empty());

    // Completed jobs never come back, even undispatched ones
    jobs::update_transcription_status(&pool, &job.id, JobStatus::Completed, Some("t"), None)
        .await
        .unwrap();
    let stale = jobs::stale_transcriptions(&pool, 0).await.unwrap();
    assert!(stale.is_empty());
}
