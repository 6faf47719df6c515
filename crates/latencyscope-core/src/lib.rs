//! # latencyscope-core
//!
//! Client-side pipeline for live message-latency charts.
//!
//! A telemetry backend reports every message it has seen as
//! `{id, send_time, recv_time}`. This crate polls it, turns each record into
//! a chart point, caps each batch to a fixed point budget and appends the
//! result to a series that only ever grows.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use latencyscope_core::{HttpSource, PollConfig, Poller, SeriesAccumulator, UniformSampler};
//!
//! # async fn demo() -> Result<(), latencyscope_core::FetchError> {
//! let source = HttpSource::new("http://127.0.0.1:2000/data")?;
//! let series = Arc::new(Mutex::new(SeriesAccumulator::new()));
//! let poller = Poller::new(source, Box::new(UniformSampler::new()), series, PollConfig::default());
//!
//! let handle = poller.spawn();
//! // ... render poller.series() ...
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Source → [`project`] → [`Reducer`] → [`SeriesAccumulator::merge`]
//!
//! One [`Poller`] cycle runs that chain once. The fetch is the only
//! suspension point; the rest is synchronous. A failed fetch is logged and
//! leaves the series untouched.

pub mod config;
pub mod document;
pub mod error;
pub mod poller;
pub mod record;
pub mod sampling;
pub mod series;
pub mod source;
pub mod stats;

pub use document::{load_snapshot, load_snapshot_blocking, read_document};
pub use error::{DocumentError, FetchError};
pub use poller::{Overlap, PollConfig, PollHandle, PollOutcome, PollState, PollStats, Poller};
pub use record::{ChartPoint, RawRecord, Snapshot, project};
pub use sampling::{
    FnReducer, Reducer, ReservoirSampler, SamplerKind, UniformSampler, from_fn,
};
pub use series::{Retention, SeriesAccumulator};
pub use source::{FileSource, HttpSource, TelemetrySource};
pub use stats::LatencySummary;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
