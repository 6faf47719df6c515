//! Raw telemetry records and their chart projection.
//!
//! A [`RawRecord`] is what the telemetry backend reports for one message: its
//! id and the send/receive wall-clock timestamps in milliseconds. The chart
//! only needs the id and the elapsed delivery time, so [`project`] maps every
//! record to a [`ChartPoint`] carrying `(recv_time - send_time) / 1000`
//! seconds.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// One message timing record as reported by the telemetry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: i64,
    /// Send timestamp, milliseconds since the epoch.
    #[serde(deserialize_with = "timestamp_ms")]
    pub send_time: i64,
    /// Receive timestamp, milliseconds since the epoch.
    #[serde(deserialize_with = "timestamp_ms")]
    pub recv_time: i64,
}

impl RawRecord {
    pub fn new(id: i64, send_time: i64, recv_time: i64) -> Self {
        Self {
            id,
            send_time,
            recv_time,
        }
    }

    /// Elapsed delivery time in milliseconds. Not clamped: a receive stamp
    /// earlier than the send stamp yields a negative value.
    pub fn elapsed_ms(&self) -> i64 {
        self.recv_time.saturating_sub(self.send_time)
    }
}

/// Accepts whole milliseconds: JSON integers, or floats with no fractional
/// part such as `1500.0`. A fractional value cannot be stored without
/// changing the elapsed time, so it fails decoding like strings and nulls.
fn timestamp_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    match value.as_f64() {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Ok(v as i64)
        }
        _ => Err(serde::de::Error::custom(format!(
            "timestamp is not a whole number of milliseconds: {value}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Full set of records returned by one telemetry fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<RawRecord>,
}

impl Snapshot {
    /// Ids of every record, in source order.
    pub fn ids(&self) -> Vec<i64> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChartPoint
// ---------------------------------------------------------------------------

/// Chart-ready `(id, arrival_time)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub id: i64,
    /// Delivery time in seconds.
    pub arrival_time: f64,
}

impl ChartPoint {
    /// Whether this point lies strictly above `deadline_secs`.
    pub fn exceeds(&self, deadline_secs: f64) -> bool {
        self.arrival_time > deadline_secs
    }
}

impl From<&RawRecord> for ChartPoint {
    fn from(record: &RawRecord) -> Self {
        Self {
            id: record.id,
            arrival_time: record.elapsed_ms() as f64 / 1000.0,
        }
    }
}

/// Project raw records to chart points. Same length, same order.
pub fn project(records: &[RawRecord]) -> Vec<ChartPoint> {
    records.iter().map(ChartPoint::from).collect()
}
