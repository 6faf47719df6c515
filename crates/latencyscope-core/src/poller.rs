//! Poll scheduler: drives fetch → project → sample → merge on a fixed period.
//!
//! State machine per cycle: `Idle → Fetching → Merging → Idle`, with
//! `Stopped` terminal once [`PollHandle::stop`] returns.
//!
//! At most one cycle is in flight. A tick that fires while a cycle is
//! outstanding is handled by the [`Overlap`] policy: dropped (`Skip`) or
//! remembered once and run as soon as the outstanding cycle finishes
//! (`Queue`). A failed fetch logs and leaves the series untouched.
//!
//! The fetch is the only `.await` in a cycle. Projection, sampling and the
//! merge run synchronously under `std::sync::Mutex` guards that are never
//! held across a suspension point.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::config::{DEFAULT_POLL_PERIOD, DEFAULT_SAMPLE_CAP};
use crate::error::FetchError;
use crate::record::project;
use crate::sampling::Reducer;
use crate::series::SeriesAccumulator;
use crate::source::TelemetrySource;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do with a tick that fires while a cycle is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlap {
    /// Drop the tick.
    #[default]
    Skip,
    /// Remember one tick and run it right after the in-flight cycle.
    Queue,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

impl FromStr for Overlap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "queue" => Ok(Self::Queue),
            other => Err(format!("unknown overlap policy '{other}' (expected skip|queue)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub period: Duration,
    /// Maximum points admitted per cycle.
    pub sample_cap: usize,
    pub overlap: Overlap,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_POLL_PERIOD,
            sample_cap: DEFAULT_SAMPLE_CAP,
            overlap: Overlap::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// State / outcome / counters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Fetching,
    Merging,
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Result of a single cycle.
#[derive(Debug)]
pub enum PollOutcome {
    Merged { fetched: usize, sampled: usize },
    /// The fetch failed; nothing was merged.
    Failed(FetchError),
    /// Another cycle held the in-flight slot.
    Busy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub merged: u64,
    pub failed: u64,
    pub ticks_skipped: u64,
    pub ticks_queued: u64,
    /// Records fetched by the most recent successful cycle.
    pub last_fetched: usize,
    /// Points admitted by the most recent successful cycle.
    pub last_sampled: usize,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

struct Inner<S> {
    source: S,
    reducer: Mutex<Box<dyn Reducer>>,
    series: Arc<Mutex<SeriesAccumulator>>,
    config: PollConfig,
    state: Mutex<PollState>,
    stats: Mutex<PollStats>,
    last_error: Mutex<Option<String>>,
    in_flight: AtomicBool,
    pending: AtomicBool,
    stopping: AtomicBool,
}

/// Owns one poll pipeline. Cheap to clone; clones share all state.
pub struct Poller<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Poller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TelemetrySource> Poller<S> {
    pub fn new(
        source: S,
        reducer: Box<dyn Reducer>,
        series: Arc<Mutex<SeriesAccumulator>>,
        config: PollConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                reducer: Mutex::new(reducer),
                series,
                config,
                state: Mutex::new(PollState::Idle),
                stats: Mutex::new(PollStats::default()),
                last_error: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    /// Shared series; readers should lock briefly and copy out.
    pub fn series(&self) -> Arc<Mutex<SeriesAccumulator>> {
        Arc::clone(&self.inner.series)
    }

    pub fn config(&self) -> PollConfig {
        self.inner.config
    }

    pub fn state(&self) -> PollState {
        *lock(&self.inner.state)
    }

    pub fn stats(&self) -> PollStats {
        *lock(&self.inner.stats)
    }

    /// Message of the most recent failed cycle, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    pub fn source_description(&self) -> String {
        self.inner.source.describe()
    }

    pub fn reducer_name(&self) -> &'static str {
        lock(&self.inner.reducer).name()
    }

    /// Run one cycle in the caller's task, bypassing the timer.
    ///
    /// Returns [`PollOutcome::Busy`] without fetching when a cycle is already
    /// in flight.
    pub async fn poll_once(&self) -> PollOutcome {
        if !self.inner.try_begin(false) {
            return PollOutcome::Busy;
        }
        let outcome = self.inner.run_cycle().await;
        self.inner.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    /// Start the periodic timer. The first tick fires immediately.
    ///
    /// Dropping the returned handle without calling [`PollHandle::stop`] also
    /// ends the timer loop, but does not wait for it.
    pub fn spawn(&self) -> PollHandle<S> {
        let (shutdown, mut rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycles = JoinSet::new();
            info!(
                "poller started: source={} period={:?} cap={} overlap={}",
                inner.source.describe(),
                inner.config.period,
                inner.config.sample_cap,
                inner.config.overlap
            );

            loop {
                tokio::select! {
                    biased;
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if inner.try_begin(true) {
                            let inner = Arc::clone(&inner);
                            cycles.spawn(async move { inner.drive().await });
                        }
                    }
                    Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                        if let Err(e) = joined {
                            warn!("poll cycle task failed: {e}");
                            inner.in_flight.store(false, Ordering::SeqCst);
                        }
                    }
                }
            }

            inner.stopping.store(true, Ordering::SeqCst);
            while cycles.join_next().await.is_some() {}
            inner.set_state(PollState::Stopped);
            info!("poller stopped");
        });

        PollHandle {
            shutdown,
            task,
            poller: self.clone(),
        }
    }
}

impl<S: TelemetrySource> Inner<S> {
    /// Claim the in-flight slot. On failure a timer tick goes through the
    /// overlap policy.
    fn try_begin(&self, from_tick: bool) -> bool {
        if self.claim() {
            return true;
        }
        if !from_tick {
            return false;
        }

        match self.config.overlap {
            Overlap::Queue if !self.pending.swap(true, Ordering::SeqCst) => self.queue_tick(),
            _ => {
                lock(&self.stats).ticks_skipped += 1;
                debug!("tick skipped, cycle still in flight");
                false
            }
        }
    }

    fn claim(&self) -> bool {
        let claimed = self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            self.pending.store(false, Ordering::SeqCst);
        }
        claimed
    }

    /// Called with `pending` freshly set. The in-flight cycle may have
    /// released the slot and checked `pending` before it was set, so try
    /// the slot once more before leaving the tick queued.
    fn queue_tick(&self) -> bool {
        if self.claim() {
            return true;
        }
        lock(&self.stats).ticks_queued += 1;
        debug!("tick queued behind in-flight cycle");
        false
    }

    /// Run cycles until no queued tick remains, then release the slot.
    async fn drive(&self) {
        loop {
            self.run_cycle().await;
            self.in_flight.store(false, Ordering::SeqCst);
            if self.stopping.load(Ordering::SeqCst) || !self.pending.swap(false, Ordering::SeqCst)
            {
                break;
            }
            if !self.try_begin(false) {
                break;
            }
        }
    }

    async fn run_cycle(&self) -> PollOutcome {
        lock(&self.stats).cycles += 1;
        self.set_state(PollState::Fetching);

        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("poll of {} failed: {e}", self.source.describe());
                lock(&self.stats).failed += 1;
                *lock(&self.last_error) = Some(e.to_string());
                self.set_state(PollState::Idle);
                return PollOutcome::Failed(e);
            }
        };

        self.set_state(PollState::Merging);
        let fetched = snapshot.len();
        let points = project(&snapshot.messages);
        let sampled = lock(&self.reducer).reduce(points, self.config.sample_cap);
        let n_sampled = sampled.len();
        let new_ids = snapshot.ids();
        lock(&self.series).merge(&new_ids, sampled);

        {
            let mut stats = lock(&self.stats);
            stats.merged += 1;
            stats.last_fetched = fetched;
            stats.last_sampled = n_sampled;
        }
        *lock(&self.last_error) = None;
        debug!("merged {n_sampled} of {fetched} records");
        self.set_state(PollState::Idle);

        PollOutcome::Merged {
            fetched,
            sampled: n_sampled,
        }
    }

    fn set_state(&self, next: PollState) {
        let mut state = lock(&self.state);
        if *state != PollState::Stopped {
            *state = next;
        }
    }
}

// ---------------------------------------------------------------------------
// PollHandle
// ---------------------------------------------------------------------------

/// Running timer loop. Call [`PollHandle::stop`] to shut it down.
pub struct PollHandle<S> {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    poller: Poller<S>,
}

impl<S: TelemetrySource> PollHandle<S> {
    pub fn poller(&self) -> &Poller<S> {
        &self.poller
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Deregister the timer and wait for any in-flight cycle to complete.
    /// No tick fires after this returns.
    pub async fn stop(self) {
        self.poller.inner.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("poller task ended abnormally: {e}");
            self.poller.inner.set_state(PollState::Stopped);
        }
    }
}
