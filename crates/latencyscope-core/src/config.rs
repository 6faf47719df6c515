//! Built-in defaults shared by the data service, the poller and the CLI.

use std::time::Duration;

/// Data service listen port.
pub const DEFAULT_PORT: u16 = 2000;

pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Backing document read by the data service on every request.
pub const DEFAULT_DOCUMENT_PATH: &str = "../server_stats.json";

/// Endpoint polled by the client.
pub const DEFAULT_DATA_URL: &str = "http://127.0.0.1:2000/data";

pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(5000);

/// Maximum points admitted into the series per poll.
pub const DEFAULT_SAMPLE_CAP: usize = 100;

/// Deadline reference line, seconds.
pub const DEFAULT_DEADLINE_SECS: f64 = 2.0;

/// Per-request timeout for the HTTP telemetry source.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
