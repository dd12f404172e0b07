//! Download proxy
//!
//! Streams objects from the asset bucket with attachment headers so browsers
//! download them instead of rendering inline.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    constants::DOWNLOAD_CACHE_CONTROL,
    services::download_service::StorageError,
    state::AppState,
    utils::{attachment_file_name, validate_file_path},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub file_path: Option<String>,
    pub file_name: Option<String>,
}

/// Proxy failures, mapped to the status codes clients branch on
#[derive(Debug)]
pub enum DownloadError {
    BadRequest(&'static str),
    Storage(StorageError),
}

impl From<StorageError> for DownloadError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Storage(StorageError::NotFound) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "File not found", "code": "OBJECT_NOT_FOUND" }),
            ),
            Self::Storage(StorageError::Forbidden) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Access denied", "code": "UNAUTHORIZED" }),
            ),
            Self::Storage(err) => {
                tracing::error!(error = %err, "Download proxy error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to download file" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// GET /api/download?filePath=&fileName=
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, DownloadError> {
    let file_path =
        validate_file_path(query.file_path.as_deref()).map_err(DownloadError::BadRequest)?;

    tracing::info!(file_path = %file_path, "Proxying download");

    let object = state.storage().fetch(file_path).await?;

    let file_name = attachment_file_name(file_path, query.file_name.as_deref());
    let disposition = format!("attachment; filename=\"{}\"", file_name);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        object
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_bytes(disposition.as_bytes())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"file\"")),
    );
    if let Some(length) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    Ok((StatusCode::OK, headers, object.body).into_response())
}
