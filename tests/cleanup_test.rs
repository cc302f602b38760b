use std::path::Path;

use arcanum_backend::assets::{self, AssetStatus};
use arcanum_backend::auth;
use arcanum_backend::cleanup;
use arcanum_backend::config::AppConfig;
use arcanum_backend::db;
use arcanum_backend::validate::CreateAssetRequest;

/// Helper to build a config whose storage root lives under a temp dir
fn config_for(root: &Path) -> AppConfig {
    let raw = format!(
        r#"
        database_name = "test"
        service_token = "svc-secret"
        worker_url = "http://localhost:9"

        [storage]
        root_dir = "{}"
        buckets = ["uploads", "results"]
        "#,
        root.display()
    );
    toml::from_str(&raw).expect("Valid test config")
}

/// Helper to drop a file into a bucket
fn write_bucket_file(root: &Path, bucket: &str, name: &str) {
    let dir = root.join(bucket);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), b"data").unwrap();
}

#[tokio::test]
async fn sweep_deletes_unreferenced_files_and_keeps_referenced_ones() {
    let pool = db::create_test_pool_in_memory().await;
    let (user_id, _) = auth::create_user(&pool, "tester").await.unwrap();

    let storage = tempfile::tempdir().unwrap();
    let config = config_for(storage.path());

    // A referenced upload: row first, then the file at the row's path
    let request = CreateAssetRequest {
        file_name: "keep.mp3".to_string(),
        mime_type: "audio/mpeg".to_string(),
    };
    let asset = assets::create(&pool, &user_id, &request).await.unwrap();
    let file_name = asset.storage_path.strip_prefix("uploads/").unwrap();
    write_bucket_file(storage.path(), "uploads", file_name);

    // Two orphans across both buckets
    write_bucket_file(storage.path(), "uploads", "orphan-a.mp3");
    write_bucket_file(storage.path(), "results", "orphan-b.txt");

    let report = cleanup::cleanup_orphans(&pool, &config).await.unwrap();

    assert_eq!(report.orphan_files_deleted, 2);
    assert!(report.errors.is_empty());
    assert!(!report.timestamp.is_empty());

    assert!(storage.path().join("uploads").join(file_name).exists());
    assert!(!storage.path().join("uploads/orphan-a.mp3").exists());
    assert!(!storage.path().join("results/orphan-b.txt").exists());
}

#[tokio::test]
async fn sweep_tolerates_missing_bucket_directories() {
    let pool = db::create_test_pool_in_memory().await;

    let storage = tempfile::tempdir().unwrap();
    let config = config_for(storage.path());

    // Neither bucket directory exists yet
    let report = cleanup::cleanup_orphans(&pool, &config).await.unwrap();
    assert_eq!(report.orphan_files_deleted, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn sweep_ignores_subdirectories() {
    let pool = db::create_test_pool_in_memory().await;

    let storage = tempfile::tempdir().unwrap();
    let config = config_for(storage.path());

    std::fs::create_dir_all(storage.path().join("uploads/nested")).unwrap();
    write_bucket_file(storage.path(), "uploads", "orphan.mp3");

    let report = cleanup::cleanup_orphans(&pool, &config).await.unwrap();
    assert_eq!(report.orphan_files_deleted, 1);
    assert!(storage.path().join("uploads/nested").exists());
}

#[tokio::test]
async fn referenced_paths_cover_every_status() {
    let pool = db::create_test_pool_in_memory().await;
    let (user_id, _) = auth::create_user(&pool, "tester").await.unwrap();

    let storage = tempfile::tempdir().unwrap();
    let config = config_for(storage.path());

    // Even a failed asset still owns its file; the sweep must not take it
    let request = CreateAssetRequest {
        file_name: "broken.wav".to_string(),
        mime_type: "audio/wav".to_string(),
    };
    let asset = assets::create(&pool, &user_id, &request).await.unwrap();
    assets::update_status(&pool, &user_id, &asset.id, AssetStatus::Failed, None)
        .await
        .unwrap();

    let file_name = asset.storage_path.strip_prefix("uploads/").unwrap();
    write_bucket_file(storage.path(), "uploads", file_name);

    let report = cleanup::cleanup_orphans(&pool, &config).await.unwrap();
    assert_eq!(report.orphan_files_deleted, 0);
    assert!(storage.path().join("uploads").join(file_name).exists());
}
