//! Telemetry sources: where the poller gets its snapshots from.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_FETCH_TIMEOUT;
use crate::document;
use crate::error::FetchError;
use crate::record::Snapshot;

/// Anything that can produce a full snapshot of message records.
pub trait TelemetrySource: Send + Sync + 'static {
    /// Fetch the current snapshot. This is the poll cycle's only suspension point.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;

    /// Human-readable origin, for logs and the TUI header.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// HttpSource
// ---------------------------------------------------------------------------

/// Polls the data service over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(url, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TelemetrySource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(FetchError::Malformed)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// Reads the backing document directly, skipping the data service.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TelemetrySource for FileSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        Ok(document::load_snapshot(&self.path).await?)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and return the URL.
    async fn one_shot(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/data")
    }

    #[tokio::test]
    async fn http_ok_decodes_snapshot() {
        let url = one_shot(
            "200 OK",
            r#"{"messages":[{"id":1,"send_time":1000,"recv_time":3500}]}"#,
        )
        .await;
        let snap = HttpSource::new(url).unwrap().fetch().await.unwrap();
        assert_eq!(snap.ids(), vec![1]);
        assert_eq!(snap.messages[0].elapsed_ms(), 2500);
    }

    #[tokio::test]
    async fn http_error_status() {
        let url = one_shot("500 Internal Server Error", r#"{"error":"x"}"#).await;
        let err = HttpSource::new(url).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }

    #[tokio::test]
    async fn http_malformed_body() {
        let url = one_shot("200 OK", r#"{"messages":"nope"}"#).await;
        let err = HttpSource::new(url).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn http_fractional_timestamps_are_malformed() {
        let url = one_shot(
            "200 OK",
            r#"{"messages":[{"id":1,"send_time":1700000000.123,"recv_time":1700000000.456}]}"#,
        )
        .await;
        let err = HttpSource::new(url).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn http_connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpSource::new(format!("http://{addr}/data")).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Transport(_))
        ));
        assert!(source.describe().ends_with("/data"));
    }

    #[tokio::test]
    async fn file_source_reads_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let source = FileSource::new(&path);
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Document(DocumentError::Read { .. }))
        ));

        std::fs::write(&path, r#"{"messages":[{"id":4,"send_time":1,"recv_time":2}]}"#).unwrap();
        assert_eq!(source.fetch().await.unwrap().ids(), vec![4]);
    }
}
