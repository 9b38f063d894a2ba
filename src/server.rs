//! HTTP server.
//!
//! Exposes the chat pipeline and the student/document management endpoints
//! as a JSON API for the web frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Welcome message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/students` | List students |
//! | `POST` | `/students` | Create a student |
//! | `GET`  | `/student/{id}` | Fetch one student |
//! | `POST` | `/chat`, `/ai/chat` | One chat turn with resource attachment |
//! | `GET`  | `/document-folders` | List folders with their documents |
//! | `POST` | `/document-folders` | Create a folder |
//! | `PUT`  | `/document-folders/{id}` | Rename a folder |
//! | `DELETE` | `/document-folders/{id}` | Delete a folder and its documents |
//! | `POST` | `/document-folders/{id}/documents` | Upload a document |
//! | `GET`  | `/documents/{id}` | Fetch a document |
//! | `PUT`  | `/documents/{id}` | Update a document |
//! | `DELETE` | `/documents/{id}` | Delete a document |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `completion_failed` (502),
//! `catalog_unavailable` (503), `timeout` (504), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser frontend
//! can call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::{ChatError, ChatOrchestrator, ChatRequest, ChatResponse};
use crate::completion::CompletionError;
use crate::config::Config;
use crate::db;
use crate::documents::{self, DocumentUpdate, NewDocument, NewFolder};
use crate::migrate;
use crate::models::{DocumentResponse, FolderResponse, Student};
use crate::students;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub chat: Arc<ChatOrchestrator>,
}

impl AppState {
    /// Builds the production state: the configured completion service and
    /// the SQLite-backed catalog.
    pub fn from_config(config: &Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let chat = ChatOrchestrator::from_config(config, pool.clone())?;
        Ok(Self {
            pool,
            chat: Arc::new(chat),
        })
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process ends.
///
/// Migrations are applied on startup, so a fresh database works without a
/// separate `init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    if !config.completion.is_enabled() {
        tracing::warn!("completion provider is disabled; chat requests will fail with 502");
    }

    let state = AppState::from_config(config, pool)?;
    tracing::info!(bind = %config.server.bind, model = %state.chat.model_name(), "server listening");

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The full route table over the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/students", get(handle_list_students).post(handle_create_student))
        .route("/student/{id}", get(handle_get_student))
        .route("/chat", post(handle_chat))
        .route("/ai/chat", post(handle_chat))
        .route(
            "/document-folders",
            get(handle_list_folders).post(handle_create_folder),
        )
        .route(
            "/document-folders/{id}",
            put(handle_rename_folder).delete(handle_delete_folder),
        )
        .route("/document-folders/{id}/documents", post(handle_create_document))
        .route(
            "/documents/{id}",
            get(handle_get_document)
                .put(handle_update_document)
                .delete(handle_delete_document),
        )
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        tracing::warn!(error = %err, "chat request failed");
        match &err {
            ChatError::Completion(CompletionError::Timeout { .. }) => {
                AppError::new(StatusCode::GATEWAY_TIMEOUT, "timeout", err.to_string())
            }
            ChatError::Completion(CompletionError::Failed(_)) => {
                AppError::new(StatusCode::BAD_GATEWAY, "completion_failed", err.to_string())
            }
            ChatError::CatalogUnavailable(_) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "catalog_unavailable",
                err.to_string(),
            ),
        }
    }
}

/// Maps storage-layer errors by message: "not found" → 404, validation
/// failures → 400, anything else → 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") {
        AppError::new(StatusCode::NOT_FOUND, "not_found", msg)
    } else if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(msg)
    } else {
        tracing::error!(error = %msg, "internal error");
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct WelcomeResponse {
    message: String,
}

async fn handle_root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to ExpertAgent API!".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Students ============

#[derive(Deserialize)]
struct NewStudent {
    name: String,
}

async fn handle_list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, AppError> {
    let list = students::list_students(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(list))
}

async fn handle_create_student(
    State(state): State<AppState>,
    Json(body): Json<NewStudent>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = students::create_student(&state.pool, &body.name)
        .await
        .map_err(classify_error)?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn handle_get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Student>, AppError> {
    let student = students::get_student(&state.pool, id)
        .await
        .map_err(classify_error)?;
    Ok(Json(student))
}

// ============ POST /chat ============

/// Runs one chat turn. `session_id` is accepted and ignored.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let response = state.chat.handle(&req.message).await?;
    Ok(Json(response))
}

// ============ Folders ============

async fn handle_list_folders(
    State(state): State<AppState>,
) -> Result<Json<Vec<FolderResponse>>, AppError> {
    let folders = documents::list_folders(&state.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(folders))
}

async fn handle_create_folder(
    State(state): State<AppState>,
    Json(body): Json<NewFolder>,
) -> Result<(StatusCode, Json<FolderResponse>), AppError> {
    let folder = documents::create_folder(&state.pool, &body)
        .await
        .map_err(classify_error)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn handle_rename_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NewFolder>,
) -> Result<Json<FolderResponse>, AppError> {
    let folder = documents::rename_folder(&state.pool, &id, &body)
        .await
        .map_err(classify_error)?;
    Ok(Json(folder))
}

async fn handle_delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    documents::delete_folder(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Documents ============

async fn handle_create_document(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    Json(body): Json<NewDocument>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let doc = documents::create_document(&state.pool, &folder_id, &body)
        .await
        .map_err(classify_error)?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = documents::get_document(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    Ok(Json(doc))
}

async fn handle_update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DocumentUpdate>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = documents::update_document(&state.pool, &id, &body)
        .await
        .map_err(classify_error)?;
    Ok(Json(doc))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    documents::delete_document(&state.pool, &id)
        .await
        .map_err(classify_error)?;
    Ok(StatusCode::NO_CONTENT)
}
