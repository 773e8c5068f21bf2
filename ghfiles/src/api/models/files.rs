use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::upstream::FolderEntry;

/// Body of `POST /upload`.
///
/// Both fields are optional at the wire level so that a missing field and an empty one are
/// reported the same way.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "fileName": "notes.txt",
    "fileContent": "hello"
}))]
pub struct UploadRequest {
    /// Name of the file inside the upload folder
    #[serde(default)]
    #[schema(example = "notes.txt")]
    pub file_name: Option<String>,

    /// File content; raw text or base64 depending on the deployment's `content_encoding`
    #[serde(default)]
    #[schema(example = "hello")]
    pub file_content: Option<String>,
}

impl UploadRequest {
    /// Returns `(fileName, fileContent)` when both are present and non-empty.
    pub fn into_parts(self) -> Option<(String, String)> {
        match (self.file_name, self.file_content) {
            (Some(name), Some(content)) if !name.is_empty() && !content.is_empty() => Some((name, content)),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[schema(example = "File uploaded successfully!")]
    pub message: String,
    /// Browsable link to the stored file
    #[schema(example = "https://github.com/octocat/my-docs/blob/main/uploads/notes.txt")]
    pub file_url: String,
}

/// A file in the upload folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[schema(example = "notes.txt")]
    pub name: String,
    /// Browsable link to the file (not the raw content address)
    #[schema(example = "https://github.com/octocat/my-docs/blob/main/uploads/notes.txt")]
    pub download_url: String,
}

impl From<FolderEntry> for FileEntry {
    fn from(entry: FolderEntry) -> Self {
        Self {
            name: entry.name,
            download_url: entry.html_url.unwrap_or_default(),
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Upload failed")]
    pub error: String,
    /// Upstream response body, present only when the upstream rejected the call
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
}
