//! NSFW pre-check endpoint
//!
//! Rate limited per `userId` by `nsfw_rate_limit_middleware`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    constants::ANONYMOUS_USER_KEY,
    middleware::rate_limit::RateLimitQuery,
    services::NsfwService,
    state::AppState,
};

struct UploadedImage {
    data: Vec<u8>,
    file_name: String,
}

/// First non-empty `file` field of the form
async fn read_image(multipart: Result<Multipart, MultipartRejection>) -> Option<UploadedImage> {
    let mut multipart = multipart.ok()?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse NSFW check form");
                return None;
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("file").to_string();
        return match field.bytes().await {
            Ok(data) if !data.is_empty() => Some(UploadedImage {
                data: data.to_vec(),
                file_name,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read NSFW check upload");
                None
            }
        };
    }
}

/// POST /api/nsfw-check?userId=
pub async fn nsfw_check(
    State(state): State<AppState>,
    Query(query): Query<RateLimitQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER_KEY.to_string());

    let Some(image) = read_image(multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No image provided", "code": "NO_IMAGE" })),
        )
            .into_response();
    };

    let result = NsfwService::check(
        state.detector(),
        state.nsfw_log(),
        image.data,
        &image.file_name,
        &user_id,
        state.clock().now(),
    )
    .await;

    match result {
        Ok(result) if result.is_nsfw => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Image rejected: contains prohibited content",
                "code": "NSFW_CONTENT_DETECTED",
                "details": {
                    "category": result.category,
                    "confidence": result.confidence,
                },
            })),
        )
            .into_response(),
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "approved": true,
                "category": result.category,
                "confidence": result.confidence,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "NSFW check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Image validation failed", "code": "VALIDATION_ERROR" })),
            )
                .into_response()
        }
    }
}
