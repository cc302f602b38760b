use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::assets::{self, AssetStatus};
use crate::auth;
use crate::brand_voice;
use crate::cleanup;
use crate::config::AppConfig;
use crate::constants::{RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_SECS};
use crate::db;
use crate::error::ApiError;
use crate::jobs::{self, JobStatus};
use crate::ledger;
use crate::notifications;
use crate::rate_limit;
use crate::validate::{CreateAssetRequest, TrainBrandVoiceRequest, TranscribeRequest, TransformRequest};
use crate::worker::{WorkerClient, WorkerJobPayload};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Shared state for all handlers
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AppConfig,
    pub worker: WorkerClient,
}

/// Response of the transcribe function
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub job_id: String,
    pub transcription_id: String,
    pub status: JobStatus,
    pub language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusUpdateRequest {
    status: String,
    result_text: Option<String>,
    output_text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAssetStatusRequest {
    status: String,
    duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceTransactionRequest {
    user_id: String,
    delta: i64,
    reason: String,
    reference_type: Option<String>,
    reference_id: Option<String>,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("invalid request body: {}", e)))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Build the application router with permissive CORS
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/functions/transcribe_audio",
            post(transcribe_audio_handler).fallback(method_not_allowed),
        )
        .route(
            "/functions/trigger_whisper",
            post(trigger_whisper_handler).fallback(method_not_allowed),
        )
        .route(
            "/functions/cleanup-orphans",
            post(cleanup_orphans_handler).fallback(method_not_allowed),
        )
        .route(
            "/functions/retry-stale",
            post(retry_stale_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/transformations",
            post(create_transformation_handler).get(list_transformations_handler),
        )
        .route("/api/transformations/{id}", get(get_transformation_handler))
        .route("/api/transcriptions", get(list_transcriptions_handler))
        .route("/api/transcriptions/{id}", get(get_transcription_handler))
        .route("/api/jobs/{kind}/{id}/status", post(job_status_handler))
        .route(
            "/api/assets",
            post(create_asset_handler).get(list_assets_handler),
        )
        .route(
            "/api/assets/{id}",
            patch(update_asset_handler).get(get_asset_handler),
        )
        .route("/api/dracmas", get(balance_handler))
        .route(
            "/api/dracmas/transactions",
            get(list_transactions_handler).post(service_transaction_handler),
        )
        .route("/api/notifications", get(list_notifications_handler))
        .route(
            "/api/notifications/{id}/read",
            post(mark_notification_read_handler),
        )
        .route(
            "/api/notifications/read-all",
            post(mark_all_notifications_read_handler),
        )
        .route(
            "/api/brand-voice",
            put(save_brand_voice_handler).get(get_brand_voice_handler),
        )
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Open the database and run the HTTP server until shutdown
pub async fn serve(config: AppConfig) -> Result<(), DynError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let pool = db::open_and_init(&config.data_dir, &config.database_name).await?;
    let worker = WorkerClient::new(&config.worker_url, config.worker_timeout_secs)?;

    let port = config.api_port;
    let state = Arc::new(AppState {
        pool,
        config,
        worker,
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("[::]:{}", port))
        .await
        .map_err(|e| format!("Failed to bind to port {}: {}", port, e))?;

    info!("Listening on http://[::]:{} (IPv4 + IPv6)", port);
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn transcribe_audio_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let request: TranscribeRequest = parse_body(&body)?;

    let job = jobs::submit_transcription(
        &state.pool,
        &user.id,
        &request,
        state.config.transcription_cost(),
        state.config.starting_grant(),
    )
    .await?;

    // Ownership was checked during submission; the asset row still exists
    let asset = assets::get_owned(&state.pool, &user.id, &job.asset_id).await?;
    crate::worker::spawn_dispatch(
        state.pool.clone(),
        state.worker.clone(),
        WorkerJobPayload::Transcription {
            transcription_id: job.id.clone(),
            job_id: job.job_id.clone(),
            storage_path: asset.storage_path,
            language: job.language.clone(),
        },
    );

    Ok(Json(TranscribeResponse {
        job_id: job.job_id,
        transcription_id: job.id,
        status: job.status,
        language: job.language,
    }))
}

async fn trigger_whisper_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;

    rate_limit::check_and_record(
        &state.pool,
        &user.id,
        "trigger_whisper",
        RATE_LIMIT_MAX_REQUESTS,
        RATE_LIMIT_WINDOW_SECS,
    )
    .await?;

    let payload: serde_json::Value = parse_body(&body)?;
    let relayed = state.worker.forward_whisper(&payload).await?;
    Ok(Json(relayed))
}

async fn cleanup_orphans_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<cleanup::CleanupReport>, ApiError> {
    auth::require_service_token(&state.config.service_token, &headers)?;
    let report = cleanup::cleanup_orphans(&state.pool, &state.config).await?;
    Ok(Json(report))
}

async fn retry_stale_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<cleanup::RetryReport>, ApiError> {
    auth::require_service_token(&state.config.service_token, &headers)?;
    let report = cleanup::retry_stale_jobs(&state.pool, &state.config, &state.worker).await?;
    Ok(Json(report))
}

async fn create_transformation_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<jobs::TransformationJob>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let request: TransformRequest = parse_body(&body)?;
    let valid = request.validate()?;

    let job = jobs::submit_transformation(
        &state.pool,
        &user.id,
        &valid,
        state.config.transformation_cost(),
        state.config.starting_grant(),
    )
    .await?;

    let voice = brand_voice::get(&state.pool, &user.id).await?;
    let prompt = crate::prompt::build_prompt(
        valid.kind,
        valid.tone,
        valid.length,
        voice.as_ref().map(|v| &v.profile),
    );

    crate::worker::spawn_dispatch(
        state.pool.clone(),
        state.worker.clone(),
        WorkerJobPayload::Transformation {
            transformation_id: job.id.clone(),
            prompt,
            input_text: job.input_text.clone(),
        },
    );

    Ok(Json(job))
}

async fn get_transformation_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<jobs::TransformationJob>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let job = jobs::get_transformation_owned(&state.pool, &user.id, &id).await?;
    Ok(Json(job))
}

async fn list_transformations_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<jobs::TransformationJob>>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let list = jobs::list_transformations(&state.pool, &user.id).await?;
    Ok(Json(list))
}

async fn get_transcription_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<jobs::TranscriptionJob>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let job = jobs::get_transcription_owned(&state.pool, &user.id, &id).await?;
    Ok(Json(job))
}

async fn list_transcriptions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<jobs::TranscriptionJob>>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let list = jobs::list_transcriptions(&state.pool, &user.id).await?;
    Ok(Json(list))
}

async fn job_status_handler(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<axum::response::Response, ApiError> {
    auth::require_service_token(&state.config.service_token, &headers)?;
    let request: JobStatusUpdateRequest = parse_body(&body)?;

    let next = JobStatus::parse(&request.status).ok_or_else(|| {
        ApiError::Validation(format!("status must be a job status, got '{}'", request.status))
    })?;

    match kind.as_str() {
        "transcription" => {
            let job = jobs::update_transcription_status(
                &state.pool,
                &id,
                next,
                request.result_text.as_deref(),
                request.error.as_deref(),
            )
            .await?;
            Ok(Json(job).into_response())
        }
        "transformation" => {
            let job = jobs::update_transformation_status(
                &state.pool,
                &id,
                next,
                request.output_text.as_deref(),
                request.error.as_deref(),
            )
            .await?;
            Ok(Json(job).into_response())
        }
        _ => Err(ApiError::NotFound("job kind")),
    }
}

async fn create_asset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<assets::Asset>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let request: CreateAssetRequest = parse_body(&body)?;
    let asset = assets::create(&state.pool, &user.id, &request).await?;
    Ok(Json(asset))
}

async fn list_assets_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<assets::Asset>>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let list = assets::list(&state.pool, &user.id).await?;
    Ok(Json(list))
}

async fn get_asset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<assets::Asset>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let asset = assets::get_owned(&state.pool, &user.id, &id).await?;
    Ok(Json(asset))
}

async fn update_asset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<assets::Asset>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let request: UpdateAssetStatusRequest = parse_body(&body)?;

    let next = AssetStatus::parse(&request.status).ok_or_else(|| {
        ApiError::Validation(format!(
            "status must be an asset status, got '{}'",
            request.status
        ))
    })?;

    let asset = assets::update_status(
        &state.pool,
        &user.id,
        &id,
        next,
        request.duration_seconds,
    )
    .await?;
    Ok(Json(asset))
}

async fn balance_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ledger::BalanceView>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let view = ledger::balance(&state.pool, &user.id, state.config.starting_grant()).await?;
    Ok(Json(view))
}

async fn list_transactions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ledger::LedgerEntry>>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    ledger::ensure_balance(&state.pool, &user.id, state.config.starting_grant()).await?;
    let entries = ledger::transactions(&state.pool, &user.id).await?;
    Ok(Json(entries))
}

/// Top-ups and corrections arrive from billing infrastructure with the
/// service credential, never from end-user clients
async fn service_transaction_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ledger::BalanceView>, ApiError> {
    auth::require_service_token(&state.config.service_token, &headers)?;
    let request: ServiceTransactionRequest = parse_body(&body)?;

    if request.reason.trim().is_empty() {
        return Err(ApiError::Validation("reason must not be empty".to_string()));
    }

    ledger::ensure_balance(&state.pool, &request.user_id, state.config.starting_grant()).await?;
    let reference = match (&request.reference_type, &request.reference_id) {
        (Some(kind), Some(id)) => Some((kind.as_str(), id.as_str())),
        _ => None,
    };
    ledger::apply(
        &state.pool,
        &request.user_id,
        request.delta,
        &request.reason,
        reference,
    )
    .await?;

    let view = ledger::balance(&state.pool, &request.user_id, state.config.starting_grant()).await?;
    Ok(Json(view))
}

async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Vec<notifications::Notification>>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let unread_only = params.get("unread").map(|v| v == "true").unwrap_or(false);
    let list = notifications::list(&state.pool, &user.id, unread_only).await?;
    Ok(Json(list))
}

async fn mark_notification_read_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    if !notifications::mark_read(&state.pool, &user.id, &id).await? {
        return Err(ApiError::NotFound("notification"));
    }
    Ok(Json(serde_json::json!({ "updated": 1 })))
}

async fn mark_all_notifications_read_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let updated = notifications::mark_all_read(&state.pool, &user.id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

async fn save_brand_voice_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<brand_voice::StoredBrandVoice>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let request: TrainBrandVoiceRequest = parse_body(&body)?;
    let profile = request.validate()?;
    let stored = brand_voice::save(&state.pool, &user.id, &profile).await?;
    Ok(Json(stored))
}

async fn get_brand_voice_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<brand_voice::StoredBrandVoice>, ApiError> {
    let user = auth::authenticate(&state.pool, &headers).await?;
    let stored = brand_voice::get(&state.pool, &user.id)
        .await?
        .ok_or(ApiError::NotFound("brand voice profile"))?;
    Ok(Json(stored))
}
