//! Outbound access to the upstream content API.
//!
//! Handlers talk to the [`ContentStore`] trait; [`github::GithubContents`] is the `reqwest`
//! implementation used in production and in tests (against a `wiremock` server).

pub mod github;
pub mod path;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error as ThisError;

use crate::errors::Error;
use path::ContentPath;

/// A file the upstream reports as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Browsable link to the stored artifact
    pub html_url: String,
}

/// One raw entry of an upstream folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    /// Absent for some entry kinds (e.g. submodules)
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, ThisError)]
pub enum UpstreamError {
    /// The upstream answered, but not with a success status
    #[error("upstream responded with {status}")]
    Status { status: StatusCode, body: Value },

    /// The request never completed (connection failure, timeout, ...)
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response that does not have the expected shape
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Converts into an API error. Status failures keep the upstream status and body; anything
    /// else becomes an internal error whose detail only reaches the logs.
    pub fn into_api_error(self, failure_message: &str, operation: impl Into<String>) -> Error {
        match self {
            UpstreamError::Status { status, body } => Error::Upstream {
                message: failure_message.to_string(),
                status,
                details: body,
            },
            other => Error::Internal {
                operation: format!("{}: {other}", operation.into()),
            },
        }
    }
}

/// The two operations the service needs from the upstream store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Creates or replaces the file at `path`.
    async fn put_file(&self, path: &ContentPath, message: &str, content: &str) -> Result<StoredFile, UpstreamError>;

    /// Lists the entries of `folder`, in upstream order.
    async fn list_folder(&self, folder: &str) -> Result<Vec<FolderEntry>, UpstreamError>;
}
