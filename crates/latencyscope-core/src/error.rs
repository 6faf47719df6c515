//! Error types for document loading and telemetry fetches.

use std::path::PathBuf;

/// Failure to load the backing telemetry document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Valid JSON that is not a `{"messages": [...]}` snapshot.
    #[error("unexpected document shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Failure of one telemetry fetch. A failed fetch never touches the series.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("telemetry source answered HTTP {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
