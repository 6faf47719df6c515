//! Latency summary statistics and deadline-miss accounting.

use serde::Serialize;

use crate::record::ChartPoint;

/// Descriptive statistics over a set of arrival times (seconds).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1). Zero for a single point.
    pub std_dev: f64,
    pub p95: f64,
    pub deadline: f64,
    /// Points strictly above the deadline.
    pub over_deadline: usize,
}

impl LatencySummary {
    /// Summarise `points` against `deadline` seconds. `None` when empty.
    pub fn from_points(points: &[ChartPoint], deadline: f64) -> Option<Self> {
        let values: Vec<f64> = points.iter().map(|p| p.arrival_time).collect();
        Self::from_values(values, deadline)
    }

    pub fn from_values(mut values: Vec<f64>, deadline: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: n,
            mean,
            min: values[0],
            max: values[n - 1],
            std_dev,
            p95: quantile_sorted(&values, 0.95),
            deadline,
            over_deadline: values.iter().filter(|&&v| v > deadline).count(),
        })
    }

    /// Share of points above the deadline, in percent.
    pub fn over_deadline_pct(&self) -> f64 {
        self.over_deadline as f64 / self.count as f64 * 100.0
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
