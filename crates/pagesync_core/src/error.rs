use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can stop a pagesync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("environment variable {name} is not set")]
    MissingEnv { name: &'static str },

    #[error("invalid BASE_URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode or decode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status} (expected {expected})\n{body}")]
    UnexpectedStatus {
        endpoint: String,
        expected: StatusCode,
        status: StatusCode,
        body: String,
    },

    #[error("invalid page id {id:?}")]
    InvalidPageId { id: String },

    #[error("the remote listing returned no pages")]
    EmptyListing,

    #[error("page record is missing string field `{field}`")]
    MissingField { field: &'static str },

    #[error("selection {choice} is out of range (1..={len})")]
    SelectionOutOfRange { choice: String, len: usize },

    #[error("input closed before a page was selected")]
    InputClosed,

    #[error("failed to launch editor `{editor}`: {source}")]
    Editor {
        editor: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Maps an I/O failure to [`SyncError::NotFound`] when the file is absent,
/// otherwise to [`SyncError::Io`] annotated with the path.
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::NotFound {
        SyncError::NotFound { path }
    } else {
        SyncError::Io { path, source }
    }
}
