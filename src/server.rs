//! HTTP layer: axum routes over a shared [`Extractor`].
//!
//! Each handler checks its required query parameter, runs one extraction, and
//! maps the outcome to a response. Status mapping for pipeline errors happens
//! in [`ApiError`]; the invoice route alone degrades to an empty result.
//!
//! Query parameters are read from the raw query string and the first
//! occurrence wins, so `?pdf_url=a.pdf&pdf_url=b.pdf` uses `a.pdf`.

use crate::error::{ErrorKind, ExtractError};
use crate::extract::Extractor;
use crate::output::PageResult;
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use url::form_urlencoded;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
}

impl AppState {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/extract-batch-number-from-image",
            get(extract_batch_number_from_image),
        )
        .route("/extract-text-from-image", get(extract_text_from_image))
        .route("/extract-text-from-pdf", get(extract_text_from_pdf))
        .route(
            "/extract-line-items-from-fusion-invoice",
            get(extract_line_items_from_fusion_invoice),
        )
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Success envelope shared by every data route.
#[derive(Debug, Serialize)]
pub struct Results<T> {
    pub results: T,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub count: u32,
}

/// Error returned from a handler.
#[derive(Debug)]
pub enum ApiError {
    /// A required query parameter is absent.
    MissingParam(&'static str),
    /// The pipeline failed.
    Extract(ExtractError),
    /// The pipeline failed on a route that reports every failure as a server
    /// error: 502 for upstream failures, 500 otherwise.
    Server(ExtractError),
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        ApiError::Extract(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingParam(name) => {
                (StatusCode::BAD_REQUEST, format!("{name} is required"))
            }
            ApiError::Extract(e) => {
                let status = match e.kind() {
                    ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
                    ErrorKind::InvalidDocument => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!("Extraction failed ({}): {}", status, e);
                (status, e.to_string())
            }
            ApiError::Server(e) => {
                let status = match e.kind() {
                    ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
                    ErrorKind::InvalidDocument | ErrorKind::Internal => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                error!("Extraction failed ({}): {}", status, e);
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// First value of `name` in the raw query string.
fn require(query: Option<&str>, name: &'static str) -> Result<String, ApiError> {
    query
        .and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        })
        .ok_or(ApiError::MissingParam(name))
}

async fn extract_batch_number_from_image(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Results<Value>>, ApiError> {
    let url = require(query.as_deref(), "image_url")?;
    let results = state
        .extractor
        .extract_batch_number(&url)
        .await
        .map_err(ApiError::Server)?;
    Ok(Json(Results { results }))
}

async fn extract_text_from_image(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Results<String>>, ApiError> {
    let url = require(query.as_deref(), "image_url")?;
    let results = state.extractor.extract_text_from_image(&url).await?;
    Ok(Json(Results { results }))
}

async fn extract_text_from_pdf(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Results<Vec<PageResult>>>, ApiError> {
    let url = require(query.as_deref(), "pdf_url")?;
    let results = state.extractor.extract_text_from_pdf(&url).await?;
    Ok(Json(Results { results }))
}

/// Pipeline failures are logged and answered with `{"results": []}`.
///
/// The URL is treated as a PDF when its path ends in `.pdf` (any case); a
/// query string such as a SAS signature does not change that.
async fn extract_line_items_from_fusion_invoice(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Results<Value>>, ApiError> {
    let url = require(query.as_deref(), "pdf_url")?;
    let results = match state.extractor.extract_invoice_line_items(&url).await {
        Ok(value) => value,
        Err(e) => {
            error!("Invoice line-item extraction failed for {}: {}", url, e);
            Value::Array(Vec::new())
        }
    };
    Ok(Json(Results { results }))
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        count: 1,
    })
}
