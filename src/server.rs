//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Welcome message with version |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/autocomplete?limit=&sort=` | Unique keywords across records |
//! | `POST` | `/upload?license_id=` | Raw PDF body, `x-file-name` header |
//! | `POST` | `/update` | `{ "id", "spell"?, "keywords"? }` |
//! | `POST` | `/search` | `{ "search_key": string or [string], "top"?, "order_matters"? }` |
//! | `POST` | `/alldocuments` | `{ "license_id" }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "bad query: search key is empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, also used for malformed JSON bodies), `not_found` (404, also used when a
//! query matches nothing), `extraction_failed` (422), `storage_error`
//! (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    body::Bytes,
    extract::{rejection::{JsonRejection, QueryRejection}, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::DocketError;
use crate::models::DocumentRecord;
use crate::pipeline::{run_update, upload, UpdateReport, UpdateRequest, UploadReport};
use crate::search::{autocomplete, list_documents, search_documents, SearchRequest, SearchResponse};
use crate::service::Docket;

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let docket = Arc::new(Docket::from_config(config.clone()).await?);
    let app = router(docket);

    tracing::info!(%bind_addr, "server listening");
    println!("Docket listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes, with CORS and an upload body limit taken from
/// `extraction.max_file_bytes`.
pub fn router(docket: Arc<Docket>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = docket.config.extraction.max_file_bytes;

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/autocomplete", get(handle_autocomplete))
        .route("/upload", post(handle_upload))
        .route("/update", post(handle_update))
        .route("/search", post(handle_search))
        .route("/alldocuments", post(handle_all_documents))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(docket)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<DocketError> for AppError {
    fn from(err: DocketError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            DocketError::BadQuery(_) | DocketError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            DocketError::NoResults | DocketError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            DocketError::Extraction { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed")
            }
            DocketError::Storage(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            DocketError::Store(_) | DocketError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

/// Malformed or mistyped JSON bodies get the same error contract as
/// domain errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct IndexResponse {
    message: String,
    version: String,
}

async fn handle_index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Welcome to Docket".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
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

// ============ GET /autocomplete ============

#[derive(Deserialize)]
struct AutocompleteParams {
    limit: Option<usize>,
    #[serde(default)]
    sort: bool,
}

#[derive(Serialize)]
struct AutocompleteResponse {
    keywords: Vec<String>,
}

async fn handle_autocomplete(
    State(docket): State<Arc<Docket>>,
    params: Result<Query<AutocompleteParams>, QueryRejection>,
) -> Result<Json<AutocompleteResponse>, AppError> {
    let Query(params) = params?;
    let keywords = autocomplete(&docket, params.limit, params.sort).await?;
    Ok(Json(AutocompleteResponse { keywords }))
}

// ============ POST /upload ============

#[derive(Deserialize)]
struct UploadParams {
    license_id: Option<String>,
}

async fn handle_upload(
    State(docket): State<Arc<Docket>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadReport>, AppError> {
    let license_id = params
        .license_id
        .ok_or_else(|| bad_request("license_id query parameter is required"))?;
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request("x-file-name header is required"))?;
    if body.is_empty() {
        return Err(bad_request("request body is empty"));
    }

    let report = upload(&docket, &license_id, file_name, body.to_vec()).await?;
    Ok(Json(report))
}

// ============ POST /update ============

async fn handle_update(
    State(docket): State<Arc<Docket>>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateReport>, AppError> {
    let Json(request) = payload?;
    if request.id.trim().is_empty() {
        return Err(bad_request("id must not be empty"));
    }
    let report = run_update(&docket, &request).await?;
    Ok(Json(report))
}

// ============ POST /search ============

async fn handle_search(
    State(docket): State<Arc<Docket>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(request) = payload?;
    let response = search_documents(&docket, &request).await?;
    Ok(Json(response))
}

// ============ POST /alldocuments ============

#[derive(Deserialize)]
struct AllDocumentsRequest {
    #[serde(default)]
    license_id: String,
}

#[derive(Serialize)]
struct AllDocumentsResponse {
    documents: Vec<DocumentRecord>,
}

async fn handle_all_documents(
    State(docket): State<Arc<Docket>>,
    payload: Result<Json<AllDocumentsRequest>, JsonRejection>,
) -> Result<Json<AllDocumentsResponse>, AppError> {
    let Json(request) = payload?;
    let documents = list_documents(&docket, &request.license_id).await?;
    Ok(Json(AllDocumentsResponse { documents }))
}
