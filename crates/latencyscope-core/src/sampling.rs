//! Sampling reducers: cap each polled batch to a fixed point budget.
//!
//! The telemetry backend returns its whole history on every fetch, so a
//! batch can be arbitrarily large. A [`Reducer`] bounds what one poll may
//! admit into the series. The scheduler holds a `Box<dyn Reducer>` so the
//! policy can be swapped without touching it.
//!
//! - [`UniformSampler`]: per-batch uniform sampling without replacement.
//! - [`ReservoirSampler`]: Algorithm R over every point ever offered.
//! - [`from_fn`]: wrap a closure.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::record::ChartPoint;

/// Reduces a projected batch to at most `cap` points.
pub trait Reducer: Send {
    /// Short policy name for logs and the TUI header.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Return at most `cap` points drawn from `points`.
    fn reduce(&mut self, points: Vec<ChartPoint>, cap: usize) -> Vec<ChartPoint>;
}

impl<R: Reducer + ?Sized> Reducer for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn reduce(&mut self, points: Vec<ChartPoint>, cap: usize) -> Vec<ChartPoint> {
        (**self).reduce(points, cap)
    }
}

// ---------------------------------------------------------------------------
// UniformSampler
// ---------------------------------------------------------------------------

/// Uniform random selection without replacement, independent per call.
///
/// Batches at or under the cap pass through unchanged.
pub struct UniformSampler {
    rng: StdRng,
}

impl UniformSampler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sampler for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for UniformSampler {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn reduce(&mut self, points: Vec<ChartPoint>, cap: usize) -> Vec<ChartPoint> {
        if cap == 0 {
            return Vec::new();
        }
        if points.len() <= cap {
            return points;
        }
        rand::seq::index::sample(&mut self.rng, points.len(), cap)
            .into_iter()
            .map(|i| points[i])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ReservoirSampler
// ---------------------------------------------------------------------------

/// Reservoir sampling (Algorithm R) across the whole observed history.
///
/// The reservoir holds `capacity` points. Each call feeds the batch through
/// the reservoir and returns the batch points still held once the batch is
/// done, in source order. Above `cap` a random subset of them is returned.
pub struct ReservoirSampler {
    rng: StdRng,
    capacity: usize,
    reservoir: Vec<ChartPoint>,
    offered: u64,
}

impl ReservoirSampler {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            rng,
            capacity,
            reservoir: Vec::with_capacity(capacity),
            offered: 0,
        }
    }

    /// Current reservoir contents.
    pub fn reservoir(&self) -> &[ChartPoint] {
        &self.reservoir
    }

    /// Total number of points ever offered.
    pub fn offered(&self) -> u64 {
        self.offered
    }
}

impl Reducer for ReservoirSampler {
    fn name(&self) -> &'static str {
        "reservoir"
    }

    fn reduce(&mut self, points: Vec<ChartPoint>, cap: usize) -> Vec<ChartPoint> {
        // Batch position of the point each slot holds from this batch.
        let mut written: Vec<Option<usize>> = vec![None; self.capacity];
        for (pos, point) in points.into_iter().enumerate() {
            self.offered += 1;
            if self.reservoir.len() < self.capacity {
                written[self.reservoir.len()] = Some(pos);
                self.reservoir.push(point);
                continue;
            }
            let j = self.rng.random_range(0..self.offered) as usize;
            if let Some(slot) = self.reservoir.get_mut(j) {
                *slot = point;
                written[j] = Some(pos);
            }
        }

        // Only survivors count: a slot overwritten later in the batch
        // reports the later point.
        let mut admitted: Vec<(usize, ChartPoint)> = written
            .iter()
            .zip(&self.reservoir)
            .filter_map(|(pos, point)| pos.map(|pos| (pos, *point)))
            .collect();
        if admitted.len() > cap {
            admitted = rand::seq::index::sample(&mut self.rng, admitted.len(), cap)
                .into_iter()
                .map(|i| admitted[i])
                .collect();
        }
        admitted.sort_unstable_by_key(|&(pos, _)| pos);
        admitted.into_iter().map(|(_, point)| point).collect()
    }
}

// ---------------------------------------------------------------------------
// Closures
// ---------------------------------------------------------------------------

/// Reducer backed by a closure. See [`from_fn`].
pub struct FnReducer<F> {
    f: F,
}

/// Adapt `f(points, cap)` into a [`Reducer`].
pub fn from_fn<F>(f: F) -> FnReducer<F>
where
    F: FnMut(Vec<ChartPoint>, usize) -> Vec<ChartPoint> + Send,
{
    FnReducer { f }
}

impl<F> Reducer for FnReducer<F>
where
    F: FnMut(Vec<ChartPoint>, usize) -> Vec<ChartPoint> + Send,
{
    fn reduce(&mut self, points: Vec<ChartPoint>, cap: usize) -> Vec<ChartPoint> {
        (self.f)(points, cap)
    }
}

// ---------------------------------------------------------------------------
// SamplerKind
// ---------------------------------------------------------------------------

/// Named sampling policies selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerKind {
    #[default]
    Uniform,
    Reservoir,
}

impl SamplerKind {
    /// Build the reducer. `cap` sizes the reservoir for [`SamplerKind::Reservoir`].
    pub fn build(self, cap: usize, seed: Option<u64>) -> Box<dyn Reducer> {
        match (self, seed) {
            (Self::Uniform, Some(s)) => Box::new(UniformSampler::seeded(s)),
            (Self::Uniform, None) => Box::new(UniformSampler::new()),
            (Self::Reservoir, Some(s)) => Box::new(ReservoirSampler::seeded(cap, s)),
            (Self::Reservoir, None) => Box::new(ReservoirSampler::new(cap)),
        }
    }
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Reservoir => write!(f, "reservoir"),
        }
    }
}

impl FromStr for SamplerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Self::Uniform),
            "reservoir" => Ok(Self::Reservoir),
            other => Err(format!("unknown sampler '{other}' (expected uniform|reservoir)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn points(n: i64) -> Vec<ChartPoint> {
        (0..n)
            .map(|id| ChartPoint {
                id,
                arrival_time: id as f64 / 10.0,
            })
            .collect()
    }

    fn ids(points: &[ChartPoint]) -> Vec<i64> {
        points.iter().map(|p| p.id).collect()
    }

    // -----------------------------------------------------------------------
    // UniformSampler
    // -----------------------------------------------------------------------

    #[test]
    fn uniform_under_cap_returns_everything() {
        let mut s = UniformSampler::seeded(1);
        let input = points(40);
        let out = s.reduce(input.clone(), 100);
        let a: HashSet<i64> = ids(&input).into_iter().collect();
        let b: HashSet<i64> = ids(&out).into_iter().collect();
        assert_eq!(out.len(), input.len());
        assert_eq!(a, b);
    }

    #[test]
    fn uniform_at_cap_returns_everything() {
        let mut s = UniformSampler::seeded(2);
        assert_eq!(s.reduce(points(100), 100).len(), 100);
    }

    #[test]
    fn uniform_over_cap_is_distinct_subset_of_size_cap() {
        let mut s = UniformSampler::seeded(3);
        let input = points(10_000);
        let out = s.reduce(input, 100);
        assert_eq!(out.len(), 100);
        let unique: HashSet<i64> = ids(&out).into_iter().collect();
        assert_eq!(unique.len(), 100, "no point may be selected twice");
        assert!(unique.iter().all(|id| (0..10_000).contains(id)));
        for p in &out {
            assert_eq!(p.arrival_time, p.id as f64 / 10.0);
        }
    }

    #[test]
    fn uniform_zero_cap_and_empty_input() {
        let mut s = UniformSampler::seeded(4);
        assert!(s.reduce(points(10), 0).is_empty());
        assert!(s.reduce(Vec::new(), 100).is_empty());
    }

    #[test]
    fn uniform_successive_calls_are_independent() {
        let mut s = UniformSampler::seeded(5);
        let a = ids(&s.reduce(points(1000), 50));
        let b = ids(&s.reduce(points(1000), 50));
        assert_ne!(a, b);
    }

    #[test]
    fn uniform_covers_whole_range_over_many_draws() {
        let mut s = UniformSampler::seeded(6);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(ids(&s.reduce(points(200), 10)));
        }
        assert!(seen.len() > 190, "only {} distinct ids drawn", seen.len());
    }

    // -----------------------------------------------------------------------
    // ReservoirSampler
    // -----------------------------------------------------------------------

    #[test]
    fn reservoir_fills_then_caps() {
        let mut s = ReservoirSampler::seeded(10, 7);
        let out = s.reduce(points(4), 100);
        assert_eq!(ids(&out), vec![0, 1, 2, 3]);
        assert_eq!(s.reservoir().len(), 4);

        let out = s.reduce(points(100), 100);
        assert!(out.len() >= 6, "remaining slots are always admitted");
        assert_eq!(s.reservoir().len(), 10);
        assert_eq!(s.offered(), 104);
    }

    #[test]
    fn reservoir_respects_call_cap() {
        let mut s = ReservoirSampler::seeded(1000, 8);
        assert_eq!(s.reduce(points(500), 20).len(), 20);
    }

    #[test]
    fn reservoir_admission_rate_falls_off() {
        let mut s = ReservoirSampler::seeded(50, 9);
        s.reduce(points(50), 1000);
        let mut late = 0;
        for _ in 0..20 {
            late += s.reduce(points(500), 1000).len();
        }
        // Expected admissions ~ 50 * ln(10050/50) ~ 265, far below 10000 offered.
        assert!(late < 1000, "admitted {late}");
    }

    #[test]
    fn reservoir_returns_only_surviving_points() {
        for seed in 0..5 {
            let mut s = ReservoirSampler::seeded(100, seed);
            let out = s.reduce(points(1000), 100);
            assert_eq!(out.len(), 100);

            let kept: HashSet<i64> = ids(s.reservoir()).into_iter().collect();
            assert!(out.iter().all(|p| kept.contains(&p.id)));
            assert_ne!(ids(&out), (0..100).collect::<Vec<_>>(), "seed {seed}");
            assert!(out.windows(2).all(|w| w[0].id < w[1].id), "source order");
        }
    }

    #[test]
    fn reservoir_later_batches_return_survivors_only() {
        let mut s = ReservoirSampler::seeded(50, 11);
        s.reduce(points(50), 50);
        for _ in 0..5 {
            let batch: Vec<ChartPoint> = points(500)
                .into_iter()
                .map(|p| ChartPoint { id: p.id + 10_000, ..p })
                .collect();
            let out = s.reduce(batch, 50);
            let kept: HashSet<i64> = ids(s.reservoir()).into_iter().collect();
            assert!(out.iter().all(|p| kept.contains(&p.id)));
        }
    }

    #[test]
    fn reservoir_cap_below_survivors_is_random_subset() {
        let mut s = ReservoirSampler::seeded(1000, 12);
        let out = s.reduce(points(500), 20);
        assert_eq!(out.len(), 20);
        assert_ne!(ids(&out), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn reservoir_kind_is_not_a_prefix() {
        let out = SamplerKind::Reservoir.build(100, Some(3)).reduce(points(1000), 100);
        assert_eq!(out.len(), 100);
        assert_ne!(ids(&out), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn reservoir_zero_capacity() {
        let mut s = ReservoirSampler::seeded(0, 10);
        assert!(s.reduce(points(10), 10).is_empty());
    }

    // -----------------------------------------------------------------------
    // from_fn / SamplerKind
    // -----------------------------------------------------------------------

    #[test]
    fn closure_reducer() {
        let mut head = from_fn(|mut p: Vec<ChartPoint>, cap| {
            p.truncate(cap);
            p
        });
        assert_eq!(ids(&head.reduce(points(10), 3)), vec![0, 1, 2]);
        assert_eq!(head.name(), "custom");
    }

    #[test]
    fn sampler_kind_roundtrip() {
        for kind in [SamplerKind::Uniform, SamplerKind::Reservoir] {
            assert_eq!(kind.to_string().parse::<SamplerKind>(), Ok(kind));
        }
        assert!("nope".parse::<SamplerKind>().is_err());
    }

    #[test]
    fn sampler_kind_builds_named_reducer() {
        assert_eq!(SamplerKind::Uniform.build(10, Some(1)).name(), "uniform");
        assert_eq!(SamplerKind::Reservoir.build(10, None).name(), "reservoir");
    }
}
