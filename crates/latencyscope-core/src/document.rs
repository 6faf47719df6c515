//! The backing telemetry document: `{"messages": [RawRecord, ...]}`.
//!
//! Read fresh on every call. No caching, no diffing: every read returns the
//! entire history.

use std::path::Path;

use crate::error::DocumentError;
use crate::record::Snapshot;

/// Read and parse the document as untyped JSON.
pub async fn read_document(path: &Path) -> Result<serde_json::Value, DocumentError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&text).map_err(DocumentError::Parse)
}

/// Read the document and decode it as a [`Snapshot`].
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, DocumentError> {
    let value = read_document(path).await?;
    serde_json::from_value(value).map_err(DocumentError::Shape)
}

/// Blocking variant of [`load_snapshot`] for synchronous callers.
pub fn load_snapshot_blocking(path: &Path) -> Result<Snapshot, DocumentError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(DocumentError::Parse)?;
    serde_json::from_value(value).map_err(DocumentError::Shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn loads_snapshot() {
        let f = write_tmp(r#"{"messages":[{"id":1,"send_time":0,"recv_time":500}]}"#);
        let snap = load_snapshot(f.path()).await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.messages[0].id, 1);
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Read { .. }));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let f = write_tmp("{\"messages\": [");
        let err = load_snapshot(f.path()).await.unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[tokio::test]
    async fn wrong_shape_is_shape_error() {
        let f = write_tmp(r#"{"records": []}"#);
        assert!(read_document(f.path()).await.is_ok());
        let err = load_snapshot(f.path()).await.unwrap_err();
        assert!(matches!(err, DocumentError::Shape(_)));
    }

    #[test]
    fn blocking_matches_async_errors() {
        let f = write_tmp("not json");
        assert!(matches!(
            load_snapshot_blocking(f.path()),
            Err(DocumentError::Parse(_))
        ));
        let f = write_tmp(r#"{"messages":[]}"#);
        assert!(load_snapshot_blocking(f.path()).unwrap().is_empty());
    }
}
