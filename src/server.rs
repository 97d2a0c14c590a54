//! HTTP API for the tutor.
//!
//! Exposes the question-answering service and the ingestion pipeline over a
//! small JSON API so a browser front end can drive a session.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/greeting` | Session-opening greeting |
//! | `POST` | `/api/chat` | Answer one user turn |
//! | `POST` | `/api/ingest` | Run the ingestion pipeline |
//!
//! # Error Contract
//!
//! Error responses use a JSON body:
//!
//! ```json
//! { "error": { "code": "internal", "message": "..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a locally served
//! front end can call the API from any port.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest::{self, IngestSummary};
use crate::progress::NoProgress;
use crate::qa::{ChatReply, TutorService};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    service: Arc<TutorService>,
    /// Ingestion is exclusive: concurrent requests queue behind this lock.
    ingest_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Start the HTTP server on `[server].bind`.
///
/// The [`TutorService`] is constructed once here; missing credentials fail
/// at startup rather than on the first request.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let service = TutorService::new(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        service: Arc::new(service),
        ingest_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/greeting", get(handle_greeting))
        .route("/api/chat", post(handle_chat))
        .route("/api/ingest", post(handle_ingest))
        .layer(cors)
        .with_state(state);

    println!("Tutor API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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
    code: String,
    message: String,
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

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

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

// ============ GET /api/greeting ============

#[derive(Serialize)]
struct GreetingResponse {
    greeting: String,
}

async fn handle_greeting(
    State(state): State<AppState>,
) -> Result<Json<GreetingResponse>, AppError> {
    let greeting = state
        .service
        .greeting()
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(GreetingResponse { greeting }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    query: String,
}

/// Answer one user turn. An empty query is a no-op that returns the fixed
/// prompt-for-input message with status 200.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = state
        .service
        .answer(&request.query)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(reply))
}

// ============ POST /api/ingest ============

/// Run the ingestion pipeline and return its summary. Requests are
/// serialized: a second ingest waits for the first to finish.
async fn handle_ingest(State(state): State<AppState>) -> Result<Json<IngestSummary>, AppError> {
    let _guard = state.ingest_lock.lock().await;
    let summary = ingest::run_ingest(state.config.as_ref(), &NoProgress)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(summary))
}
