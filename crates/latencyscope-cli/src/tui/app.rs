//! TUI application state and event loop.
//!
//! Design: the poller runs on a tokio runtime in the background and merges
//! into the shared series. The UI thread only ever copies the series out
//! under a short lock, so drawing never blocks a merge for long.

use std::io;
use std::sync::PoisonError;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;

use latencyscope_core::{ChartPoint, LatencySummary, PollState, PollStats, Poller, Retention};

use crate::commands::AnySource;

/// Narrowest brush the zoom keys will produce.
pub const MIN_BRUSH: usize = 10;

// ---------------------------------------------------------------------------
// Brush
// ---------------------------------------------------------------------------

/// Range selection over the x-axis (series positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    start: usize,
    /// `None` selects the whole series.
    width: Option<usize>,
    /// Pin the window to the newest points as the series grows.
    follow: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            start: 0,
            width: None,
            follow: true,
        }
    }
}

impl Brush {
    /// Selected `[start, end)` for a series of `len` points.
    pub fn range(&self, len: usize) -> (usize, usize) {
        let Some(width) = self.width else {
            return (0, len);
        };
        let width = width.min(len);
        let start = if self.follow {
            len - width
        } else {
            self.start.min(len - width)
        };
        (start, start + width)
    }

    /// Move the window by `delta` points. Panning detaches from the tail.
    pub fn pan(&mut self, delta: isize, len: usize) {
        let (start, end) = self.range(len);
        let width = end - start;
        if width == len {
            return;
        }
        let max_start = len - width;
        let next = start.saturating_add_signed(delta).min(max_start);
        self.start = next;
        self.width = Some(width);
        self.follow = next == max_start;
    }

    pub fn zoom_in(&mut self, len: usize) {
        let (start, end) = self.range(len);
        let width = ((end - start) / 2).max(MIN_BRUSH);
        if width >= len {
            return;
        }
        // Keep the right edge anchored.
        self.start = end.saturating_sub(width);
        self.width = Some(width);
    }

    pub fn zoom_out(&mut self, len: usize) {
        let Some(width) = self.width else {
            return;
        };
        let (_, end) = self.range(len);
        let width = width.saturating_mul(2);
        if width >= len {
            self.width = None;
        } else {
            self.start = end.saturating_sub(width);
            self.width = Some(width);
        }
    }

    pub fn toggle_follow(&mut self, len: usize) {
        let (start, _) = self.range(len);
        self.start = start;
        self.follow = !self.follow;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }
}

// ---------------------------------------------------------------------------
// Frame snapshot
// ---------------------------------------------------------------------------

/// Everything one frame needs, copied out of the shared state.
pub struct Snapshot {
    pub points: Vec<ChartPoint>,
    pub seen_ids: usize,
    pub evicted_points: u64,
    pub retention: Retention,
    pub state: PollState,
    pub stats: PollStats,
    pub last_error: Option<String>,
    pub summary: Option<LatencySummary>,
    pub brush: (usize, usize),
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    poller: Poller<AnySource>,
    runtime: Runtime,
    deadline: f64,
    brush: Brush,
    running: bool,
}

impl App {
    pub fn new(poller: Poller<AnySource>, runtime: Runtime, deadline: f64) -> Self {
        Self {
            poller,
            runtime,
            deadline,
            brush: Brush::default(),
            running: true,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let handle = {
            let _guard = self.runtime.enter();
            self.poller.spawn()
        };

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before a panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        self.runtime.block_on(handle.stop());
        let stats = self.poller.stats();
        println!(
            "Stopped after {} polls ({} merged, {} failed); {} points charted",
            stats.cycles,
            stats.merged,
            stats.failed,
            self.series_len()
        );

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            let snap = self.snapshot();
            terminal.draw(|f| super::ui::draw(f, self, &snap))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        let len = self.series_len();
        let step = self.pan_step(len);
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Left | KeyCode::Char('h') => self.brush.pan(-step, len),
            KeyCode::Right | KeyCode::Char('l') => self.brush.pan(step, len),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => {
                self.brush.zoom_in(len)
            }
            KeyCode::Char('-') | KeyCode::Char('[') => self.brush.zoom_out(len),
            KeyCode::Char('0') => self.brush.reset(),
            KeyCode::Char('f') => self.brush.toggle_follow(len),
            KeyCode::Char('r') => self.refresh_now(),
            _ => {}
        }
    }

    /// A tenth of the current window, at least one point.
    fn pan_step(&self, len: usize) -> isize {
        let (start, end) = self.brush.range(len);
        ((end - start) / 10).max(1) as isize
    }

    /// Trigger an immediate poll; a no-op while one is in flight.
    fn refresh_now(&self) {
        let poller = self.poller.clone();
        self.runtime.spawn(async move {
            poller.poll_once().await;
        });
    }

    fn series_len(&self) -> usize {
        let series = self.poller.series();
        let len = series.lock().unwrap_or_else(PoisonError::into_inner).len();
        len
    }

    pub fn snapshot(&self) -> Snapshot {
        let series = self.poller.series();
        let (points, seen_ids, evicted_points, retention) = {
            let acc = series.lock().unwrap_or_else(PoisonError::into_inner);
            (
                acc.snapshot(),
                acc.seen_ids().len(),
                acc.evicted().0,
                acc.retention(),
            )
        };
        let summary = LatencySummary::from_points(&points, self.deadline);
        let brush = self.brush.range(points.len());
        Snapshot {
            points,
            seen_ids,
            evicted_points,
            retention,
            state: self.poller.state(),
            stats: self.poller.stats(),
            last_error: self.poller.last_error(),
            summary,
            brush,
        }
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn source(&self) -> String {
        self.poller.source_description()
    }

    pub fn sampler(&self) -> &'static str {
        self.poller.reducer_name()
    }

    pub fn period(&self) -> Duration {
        self.poller.config().period
    }

    pub fn is_following(&self) -> bool {
        self.brush.is_following()
    }
}
