//! OpenAPI documentation for the file endpoints.
//!
//! The document is served as JSON at `/api-docs/openapi.json` and rendered with Scalar at
//! `/api-docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GitHub File Upload API",
        description = "Upload files to a GitHub repository folder and list the files stored there."
    ),
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::list_files
    ),
    components(schemas(
        api::models::files::UploadRequest,
        api::models::files::UploadResponse,
        api::models::files::FileEntry,
        api::models::files::ErrorResponse
    )),
    tags(
        (name = "files", description = "Files stored in the repository's upload folder")
    )
)]
pub struct ApiDoc;
