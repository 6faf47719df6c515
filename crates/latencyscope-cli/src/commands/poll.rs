//! `latencyscope poll`: run the poll pipeline headless and log each cycle.

use std::sync::PoisonError;
use std::time::Duration;

use log::info;
use tokio::sync::watch;

use latencyscope_core::{ChartPoint, LatencySummary, PollStats};

use super::{PollArgs, make_poller};

/// How often the progress loop looks at the poller counters.
const PROGRESS_TICK: Duration = Duration::from_millis(100);

pub fn run(args: &PollArgs, deadline: f64, max_cycles: Option<u64>) {
    let poller = match make_poller(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let (stop_tx, mut stop_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    }) {
        eprintln!("Warning: cannot install Ctrl+C handler: {e}");
    }

    println!(
        "Polling {} every {:?} (cap {}, sampler {}, retention {}, overlap {})",
        poller.source_description(),
        args.interval,
        args.sample_cap,
        args.sampler,
        args.retention,
        args.overlap
    );
    println!("Press Ctrl+C to stop.");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let handle = poller.spawn();
        let mut last = PollStats::default();
        loop {
            tokio::select! {
                Ok(()) = stop_rx.changed() => break,
                _ = tokio::time::sleep(PROGRESS_TICK) => {}
            }
            let stats = poller.stats();
            if stats.merged + stats.failed == last.merged + last.failed {
                continue;
            }
            let (points, seen) = {
                let series = poller.series();
                let acc = series.lock().unwrap_or_else(PoisonError::into_inner);
                (acc.snapshot(), acc.seen_ids().len())
            };
            let line = progress_line(&stats, &last, seen, &points, deadline, poller.last_error());
            println!("{line}");
            last = stats;

            if max_cycles.is_some_and(|n| stats.merged + stats.failed >= n) {
                break;
            }
        }
        info!("stopping poller");
        handle.stop().await;
    });

    let stats = poller.stats();
    println!(
        "Stopped after {} cycles ({} merged, {} failed, {} ticks skipped, {} queued)",
        stats.cycles, stats.merged, stats.failed, stats.ticks_skipped, stats.ticks_queued
    );
}

fn progress_line(
    stats: &PollStats,
    last: &PollStats,
    seen: usize,
    points: &[ChartPoint],
    deadline: f64,
    last_error: Option<String>,
) -> String {
    if stats.failed > last.failed {
        return format!(
            "#{:<4} failed: {}",
            stats.cycles,
            last_error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    let late = LatencySummary::from_points(points, deadline)
        .map(|s| format!("{:.1}%", s.over_deadline_pct()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "#{:<4} fetched {:>6}  sampled {:>4}  series {:>7}  seen {:>8}  over {deadline}s {late}",
        stats.cycles,
        stats.last_fetched,
        stats.last_sampled,
        points.len(),
        seen
    )
}
