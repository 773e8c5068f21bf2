//! HTTP handlers for uploading and listing files.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use tracing::{debug, info};

use crate::AppState;
use crate::api::models::files::{ErrorResponse, FileEntry, UploadRequest, UploadResponse};
use crate::errors::{Error, MISSING_UPLOAD_FIELDS, Result};
use crate::upstream::path::ContentPath;

pub const UPLOAD_SUCCEEDED: &str = "File uploaded successfully!";
pub const UPLOAD_FAILED: &str = "Upload failed";
pub const LIST_FAILED: &str = "Failed to fetch files";

#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    summary = "Upload file",
    description = "Creates or replaces a file in the repository's upload folder. The commit message is `Upload <fileName>`.",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadResponse),
        (status = 400, description = "Missing fileName or fileContent, or an unusable fileName", body = ErrorResponse),
        (status = 413, description = "Request body exceeds the configured limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = "default", description = "Upstream rejected the write; its status and body are forwarded", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge {
            limit: state.config.max_body_bytes,
        },
        _ => Error::BadRequest {
            message: format!("Invalid request body: {}", rejection.body_text()),
        },
    })?;

    let request = parse_upload_request(&headers, &body)?;

    let (file_name, file_content) = request.into_parts().ok_or_else(|| Error::BadRequest {
        message: MISSING_UPLOAD_FIELDS.to_string(),
    })?;

    let path = ContentPath::new(&state.config.upstream.folder, &file_name).map_err(|e| Error::BadRequest {
        message: format!("Invalid fileName: {e}"),
    })?;

    let stored = state
        .store
        .put_file(&path, &format!("Upload {file_name}"), &file_content)
        .await
        .map_err(|e| e.into_api_error(UPLOAD_FAILED, format!("upload {path}")))?;

    info!(folder = path.folder(), name = path.name(), file_url = %stored.html_url, "File uploaded");

    Ok(Json(UploadResponse {
        message: UPLOAD_SUCCEEDED.to_string(),
        file_url: stored.html_url,
    }))
}

/// An empty body, or one that is not declared as JSON, counts as an empty object so that it
/// is reported as missing fields.
fn parse_upload_request(headers: &HeaderMap, body: &Bytes) -> Result<UploadRequest> {
    if body.iter().all(u8::is_ascii_whitespace) || !is_json_content_type(headers) {
        return Ok(UploadRequest::default());
    }

    let Json(request) = Json::<UploadRequest>::from_bytes(body).map_err(|rejection| Error::BadRequest {
        message: format!("Invalid request body: {}", rejection.body_text()),
    })?;
    Ok(request)
}

/// `application/json` or any `+json` media type, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(essence) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
    else {
        return false;
    };
    let essence = essence.trim().to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    summary = "List files",
    description = "Lists the files stored in the repository's upload folder, in the order the upstream returns them.",
    responses(
        (status = 200, description = "Files in the upload folder", body = [FileEntry]),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = "default", description = "Upstream rejected the listing; its status and body are forwarded", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileEntry>>> {
    let folder = &state.config.upstream.folder;

    let entries = state
        .store
        .list_folder(folder)
        .await
        .map_err(|e| e.into_api_error(LIST_FAILED, format!("list {folder}")))?;

    debug!(count = entries.len(), "Listed files");

    Ok(Json(entries.into_iter().map(FileEntry::from).collect()))
}
