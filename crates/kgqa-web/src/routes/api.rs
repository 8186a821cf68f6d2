//! REST API endpoints for graph construction and question answering.

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kgqa::prelude::*;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A pipeline error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(KgError);

impl From<KgError> for ApiError {
    fn from(e: KgError) -> Self {
        ApiError(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(KgError::Store(e))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            KgError::Resolution(_) | KgError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            KgError::Store(StoreError::Connection(_) | StoreError::Disconnected) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            KgError::Store(StoreError::NodeNotFound(_)) => StatusCode::NOT_FOUND,
            KgError::Backend(_) => StatusCode::BAD_GATEWAY,
            KgError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Liveness and graph size.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub nodes: usize,
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let _guard = state.graph_lock.read().await;
    let store = state.pipeline.store();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        store: store.name().to_string(),
        nodes: store.node_count().await?,
    }))
}

/// Get all graph nodes.
pub async fn get_nodes(State(state): State<AppState>) -> ApiResult<Vec<NodeRecord>> {
    let _guard = state.graph_lock.read().await;
    Ok(Json(state.pipeline.store().list_nodes().await?))
}

/// Get all graph edges.
pub async fn get_edges(State(state): State<AppState>) -> ApiResult<Vec<EdgeRecord>> {
    let _guard = state.graph_lock.read().await;
    Ok(Json(state.pipeline.store().list_edges().await?))
}

/// Build request body.
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub corpus: String,
}

/// Replace the graph with one extracted from the posted corpus.
pub async fn build(
    State(state): State<AppState>,
    Json(req): Json<BuildRequest>,
) -> ApiResult<BuildReport> {
    if req.corpus.trim().is_empty() {
        return Err(ApiError(KgError::Config(ConfigError::MissingField(
            "corpus".to_string(),
        ))));
    }
    let corpus = normalize_text(&req.corpus);

    let _guard = state.graph_lock.write().await;
    let report = state.pipeline.build(&corpus).await?;
    tracing::info!(
        applied = report.applied,
        skipped = report.skipped.len(),
        "Graph rebuilt"
    );
    Ok(Json(report))
}

/// Ask request body.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Reference answers; when present the answer is also validated.
    #[serde(default)]
    pub expected: Vec<String>,
}

/// Ask response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(flatten)]
    pub attempt: AnswerAttempt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// Answer one question from the current graph.
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    if req.question.trim().is_empty() {
        return Err(ApiError(KgError::Config(ConfigError::MissingField(
            "question".to_string(),
        ))));
    }

    let _guard = state.graph_lock.read().await;
    let attempt = state.pipeline.ask(&req.question).await?;
    let correct = if req.expected.is_empty() {
        None
    } else {
        Some(state.pipeline.validate(&attempt, &req.expected).await?)
    };

    Ok(Json(AskResponse { attempt, correct }))
}
