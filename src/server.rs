//! Warm-model HTTP server.
//!
//! Keeps the OCR model loaded so each request skips the load cost.
//!
//! | route          | body                                                   |
//! |----------------|--------------------------------------------------------|
//! | `GET /health`  | -                                                      |
//! | `POST /ocr`    | `{image, is_path}`                                     |
//! | `POST /find`   | `{image, is_path, target, exact, region, near}`        |

use crate::matcher::{FindQuery, Region};
use crate::ocr::remote::{FindRequest, FindResponse, OcrRequest, OcrResponse};
use crate::ocr::{build_text, FindOutcome, OcrWorker};
use crate::{Error, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::DynamicImage;
use serde_json::json;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct AppState {
    worker: OcrWorker,
}

/// An HTTP error with a FastAPI-style `{"detail": ...}` body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(e: Error) -> Self {
        warn!("request failed: {}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Build the router around a running worker.
pub fn router(worker: OcrWorker) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ocr", post(ocr))
        .route("/find", post(find))
        .with_state(AppState { worker })
}

/// Serve on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, worker: OcrWorker) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("OCR server listening on http://{}", addr);
    axum::serve(listener, router(worker))
        .await
        .map_err(|e| Error::Server(e.to_string()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ocr(
    State(state): State<AppState>,
    Json(req): Json<OcrRequest>,
) -> std::result::Result<Json<OcrResponse>, ApiError> {
    let image = load_image(&req.image, req.is_path)?;
    let items = state
        .worker
        .recognize(image)
        .await
        .map_err(ApiError::internal)?;
    let text = build_text(&items);
    Ok(Json(OcrResponse {
        ok: true,
        items,
        text,
        error: None,
    }))
}

async fn find(
    State(state): State<AppState>,
    Json(req): Json<FindRequest>,
) -> std::result::Result<Json<FindResponse>, ApiError> {
    let region = Region::parse_opt(req.region.as_deref())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let image = load_image(&req.image, req.is_path)?;
    let size = (image.width(), image.height());

    let items = state
        .worker
        .recognize(image)
        .await
        .map_err(ApiError::internal)?;

    let query = FindQuery::new(req.target)
        .exact(req.exact)
        .region(region)
        .near(req.near);

    let outcome = FindOutcome::from_items(&items, &query, Some(size));
    Ok(Json(match outcome.item {
        Some(item) => FindResponse {
            ok: true,
            item: Some(item),
            error: None,
            texts: Vec::new(),
        },
        None => {
            debug!("'{}' not found among {} items", query.target, items.len());
            FindResponse {
                ok: false,
                item: None,
                error: Some("not_found".into()),
                texts: outcome.seen,
            }
        }
    }))
}

/// Decode the request image from a file path or base64.
fn load_image(image: &str, is_path: bool) -> std::result::Result<DynamicImage, ApiError> {
    if is_path {
        if !Path::new(image).exists() {
            return Err(ApiError::bad_request(format!("File not found: {}", image)));
        }
        return image::open(image)
            .map_err(|e| ApiError::bad_request(format!("cannot decode {}: {}", image, e)));
    }

    let bytes = BASE64
        .decode(image.trim())
        .map_err(|e| ApiError::bad_request(format!("invalid base64 image: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| ApiError::bad_request(format!("cannot decode image: {}", e)))
}
