use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query as QueryString, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::engine::{Engine, EngineError};
use crate::request::Request;
use crate::store::StoreError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub documents_dir: PathBuf,
}

#[derive(Deserialize)]
pub struct QueryParams {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<String>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    file: String,
    #[serde(rename = "type")]
    kind: String,
    result: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/query", get(query))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn query(
    State(state): State<AppState>,
    QueryString(params): QueryString<QueryParams>,
) -> Result<Response, ApiError> {
    if !is_bare_file_name(&params.file) {
        return Err(ApiError::bad_request(
            "file must be a file name inside the documents directory",
        ));
    }

    let mut args = vec![params.file.as_str(), params.kind.as_str()];
    if let Some(data) = params.data.as_deref() {
        args.extend(data.split_whitespace());
    }
    let mut request = Request::from_args(&args).map_err(|e| ApiError::bad_request(e.to_string()))?;
    request.document = state.documents_dir.join(&request.document);

    let engine = Arc::clone(&state.engine);
    let result = tokio::task::spawn_blocking(move || engine.process(&request))
        .await
        .map_err(|e| {
            error!("query task failed: {e}");
            ApiError::Internal
        })?
        .map_err(ApiError::from)?;

    Ok(Json(QueryResponse {
        file: params.file,
        kind: params.kind,
        result,
    })
    .into_response())
}

fn is_bare_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name().is_some_and(|n| n == name)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::Document { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ApiError::NotFound(err.to_string())
            }
            EngineError::Store(StoreError::Corrupt { .. }) | EngineError::Dictionary(_) => {
                error!("{err}");
                ApiError::Unprocessable(err.to_string())
            }
            EngineError::Store(StoreError::Io { .. }) | EngineError::Document { .. } => {
                error!("{err}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse { error: msg }),
            )
                .into_response(),
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
