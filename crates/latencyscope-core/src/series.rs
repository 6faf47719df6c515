//! The accumulated chart series and the ids seen so far.
//!
//! [`SeriesAccumulator`] is the only mutator of either collection. Each
//! successful poll calls [`SeriesAccumulator::merge`] exactly once; nothing
//! is sorted or deduplicated, so insertion order is merge order.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::record::ChartPoint;

/// How much history the accumulator keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Append forever.
    #[default]
    Unbounded,
    /// Ring buffer: keep at most this many points and this many seen ids,
    /// evicting the oldest first.
    Window(usize),
}

impl Retention {
    fn capacity(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Window(n) => Some(n),
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Window(n) => write!(f, "window:{n}"),
        }
    }
}

impl FromStr for Retention {
    type Err = String;

    /// `unbounded` or `window:<capacity>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unbounded" {
            return Ok(Self::Unbounded);
        }
        match s.strip_prefix("window:").map(str::parse::<usize>) {
            Some(Ok(n)) => Ok(Self::Window(n)),
            _ => Err(format!(
                "invalid retention '{s}' (expected unbounded or window:<N>)"
            )),
        }
    }
}

/// Growing chart series plus every id merged so far.
#[derive(Debug, Clone, Default)]
pub struct SeriesAccumulator {
    points: VecDeque<ChartPoint>,
    seen_ids: VecDeque<i64>,
    retention: Retention,
    merges: u64,
    evicted_points: u64,
    evicted_ids: u64,
}

impl SeriesAccumulator {
    /// Empty, unbounded accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    /// Append `batch_ids` to the seen ids and `sampled` to the series.
    ///
    /// Ids are appended as-is, duplicates included. Under
    /// [`Retention::Window`] the oldest entries beyond capacity are evicted
    /// after the append.
    pub fn merge(&mut self, batch_ids: &[i64], sampled: Vec<ChartPoint>) {
        self.seen_ids.extend(batch_ids.iter().copied());
        self.points.extend(sampled);
        self.merges += 1;

        if let Some(cap) = self.retention.capacity() {
            if self.points.len() > cap {
                let excess = self.points.len() - cap;
                self.points.drain(..excess);
                self.evicted_points += excess as u64;
            }
            if self.seen_ids.len() > cap {
                let excess = self.seen_ids.len() - cap;
                self.seen_ids.drain(..excess);
                self.evicted_ids += excess as u64;
            }
        }
    }

    /// Series in merge order.
    pub fn points(&self) -> &VecDeque<ChartPoint> {
        &self.points
    }

    /// Owned copy of the series for readers that must not hold a lock.
    pub fn snapshot(&self) -> Vec<ChartPoint> {
        self.points.iter().copied().collect()
    }

    pub fn seen_ids(&self) -> &VecDeque<i64> {
        &self.seen_ids
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Number of merges applied.
    pub fn merges(&self) -> u64 {
        self.merges
    }

    /// Points and ids dropped by window retention, in that order.
    pub fn evicted(&self) -> (u64, u64) {
        (self.evicted_points, self.evicted_ids)
    }
}
