// handlers/protected/uploads.rs - POST /api/uploads (multipart image upload)

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension,
};

use crate::domain::Actor;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::uploads::{UploadResult, UploadedFile};
use crate::state::AppState;

const FIELD_NAMES: [&str; 2] = ["image", "file"];

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Upload exceeds the size limit".to_string())
    } else {
        ApiError::bad_request(e.body_text())
    }
}

/// POST /api/uploads - Forward an image to the configured host, return its URL
///
/// Accepts the file under either the `image` or the `file` field.
pub async fn upload(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    mut multipart: Multipart,
) -> ApiResult<UploadResult> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if !field.name().is_some_and(|name| FIELD_NAMES.contains(&name)) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let file = UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        };
        let result = state.uploads().upload_image(&actor, file).await?;
        return Ok(ApiResponse::created(result));
    }

    Err(ApiError::validation_error("Missing `image` or `file` field", None))
}
