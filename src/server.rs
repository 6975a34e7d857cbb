//! Local HTTP endpoints for browser clients.
//!
//! - `GET /api/engines` — the engine catalog
//! - `POST /api/upload` — multipart `file`, responds `{url}`
//! - `POST /api/search` — multipart `file`, responds `{results: [...]}`
//!
//! Failures respond `{error}` with a non-2xx status and a short message.
//! Request bodies are capped at the configured upload limit (413 above it).

use crate::error::Error;
use crate::orchestrator::Services;
use crate::types::{ImagePayload, SearchEngineDescriptor, SearchMatch};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<SearchMatch>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

struct ApiError(StatusCode, &'static str);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        warn!("Request failed: {}", e);
        let status = match &e {
            Error::Configuration(_) | Error::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NoImageSelected | Error::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Error::SearchInProgress => StatusCode::CONFLICT,
            Error::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::UpstreamUnavailable(_)
            | Error::UpstreamSchema(_)
            | Error::Upload(_)
            | Error::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError(StatusCode::PAYLOAD_TOO_LARGE, "image is too large");
        }
        warn!("Rejected multipart body: {}", e);
        ApiError(StatusCode::BAD_REQUEST, "malformed upload")
    }
}

/// Pull the `file` field out of a multipart body.
async fn read_file(mut multipart: Multipart) -> Result<ImagePayload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let bytes = field.bytes().await?;
        return Ok(ImagePayload::from_bytes(bytes, file_name)?);
    }
    Err(ApiError(StatusCode::BAD_REQUEST, "no file uploaded"))
}

async fn list_engines(State(services): State<Services>) -> Json<Vec<SearchEngineDescriptor>> {
    Json(services.registry.list().to_vec())
}

async fn upload(
    State(services): State<Services>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let payload = read_file(multipart).await?;
    let result = services.uploader.resolve_url(&payload).await?;
    Ok(Json(UploadResponse { url: result.url }))
}

async fn search(
    State(services): State<Services>,
    multipart: Multipart,
) -> Result<Json<SearchResponse>, ApiError> {
    let payload = read_file(multipart).await?;
    let results = services.searcher.search(&payload).await?;
    Ok(Json(SearchResponse { results }))
}

pub fn router(services: Services, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/engines", get(list_engines))
        .route("/api/upload", post(upload))
        .route("/api/search", post(search))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(services)
}

pub async fn serve(
    addr: SocketAddr,
    services: Services,
    max_upload_bytes: usize,
) -> crate::error::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Listening on http://{} (uploads up to {} bytes)",
        listener.local_addr()?,
        max_upload_bytes
    );
    axum::serve(listener, router(services, max_upload_bytes)).await?;
    Ok(())
}
