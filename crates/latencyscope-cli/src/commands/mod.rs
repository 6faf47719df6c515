pub mod poll;
pub mod serve;
pub mod summary;
pub mod watch;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Args;

use latencyscope_core::config::{DEFAULT_DATA_URL, DEFAULT_SAMPLE_CAP};
use latencyscope_core::{
    FetchError, FileSource, HttpSource, Overlap, PollConfig, Poller, Retention, SamplerKind,
    SeriesAccumulator, Snapshot, TelemetrySource,
};

/// Poll pipeline options shared by `watch` and `poll`.
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Data service endpoint
    #[arg(long, default_value = DEFAULT_DATA_URL)]
    pub url: String,

    /// Read the telemetry document directly instead of polling --url
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Poll period (e.g. "5s", "500ms", "1m")
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Maximum points admitted into the series per poll
    #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
    pub sample_cap: usize,

    /// Sampling policy: uniform (per poll) or reservoir (whole history)
    #[arg(long, default_value = "uniform")]
    pub sampler: SamplerKind,

    /// History retention: unbounded or window:<N>
    #[arg(long, default_value = "unbounded")]
    pub retention: Retention,

    /// Tick arriving while a poll is in flight: skip or queue
    #[arg(long, default_value = "skip")]
    pub overlap: Overlap,

    /// Seed the sampler for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PollArgs {
    pub fn config(&self) -> PollConfig {
        PollConfig {
            period: self.interval,
            sample_cap: self.sample_cap,
            overlap: self.overlap,
        }
    }
}

/// Either telemetry source, chosen at startup.
pub enum AnySource {
    Http(HttpSource),
    File(FileSource),
}

impl TelemetrySource for AnySource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        match self {
            Self::Http(s) => s.fetch().await,
            Self::File(s) => s.fetch().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Http(s) => s.describe(),
            Self::File(s) => s.describe(),
        }
    }
}

/// Build a poller from command-line options. Nothing runs until it is
/// spawned inside a tokio runtime.
pub fn make_poller(args: &PollArgs) -> Result<Poller<AnySource>, FetchError> {
    let source = match &args.file {
        Some(path) => AnySource::File(FileSource::new(path)),
        None => AnySource::Http(HttpSource::new(&args.url)?),
    };
    let reducer = args.sampler.build(args.sample_cap, args.seed);
    let series = Arc::new(Mutex::new(SeriesAccumulator::with_retention(args.retention)));
    Ok(Poller::new(source, reducer, series, args.config()))
}

/// Parse "500ms", "5s", "2m", "1h"; a bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;
    if value == 0 {
        return Err(format!("duration must be positive: {s}"));
    }

    let millis = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("invalid duration: {s}"))?;
    Ok(Duration::from_millis(millis))
}

/// Install the global logger. `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        poll: PollArgs,
    }

    // -----------------------------------------------------------------------
    // parse_duration tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn test_parse_duration_bare_number_is_seconds() {
        assert_eq!(parse_duration(" 7 "), Ok(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage_and_zero() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert_eq!(
            parse_duration("5124095576030432h"),
            Err("invalid duration: 5124095576030432h".to_string())
        );
        assert_eq!(
            parse_duration("18446744073709551ms"),
            Ok(Duration::from_millis(18_446_744_073_709_551))
        );
    }

    // -----------------------------------------------------------------------
    // PollArgs tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_poll_args_defaults() {
        let h = Harness::try_parse_from(["x"]).unwrap();
        let cfg = h.poll.config();
        assert_eq!(cfg, PollConfig::default());
        assert_eq!(h.poll.url, DEFAULT_DATA_URL);
        assert_eq!(h.poll.sampler, SamplerKind::Uniform);
        assert_eq!(h.poll.retention, Retention::Unbounded);
        assert!(h.poll.file.is_none());
    }

    #[test]
    fn test_poll_args_overrides() {
        let h = Harness::try_parse_from([
            "x",
            "--interval",
            "250ms",
            "--sample-cap",
            "10",
            "--sampler",
            "reservoir",
            "--retention",
            "window:1000",
            "--overlap",
            "queue",
            "--seed",
            "3",
        ])
        .unwrap();
        let cfg = h.poll.config();
        assert_eq!(cfg.period, Duration::from_millis(250));
        assert_eq!(cfg.sample_cap, 10);
        assert_eq!(cfg.overlap, Overlap::Queue);
        assert_eq!(h.poll.sampler, SamplerKind::Reservoir);
        assert_eq!(h.poll.retention, Retention::Window(1000));
        assert_eq!(h.poll.seed, Some(3));
    }

    #[test]
    fn test_poll_args_reject_bad_values() {
        assert!(Harness::try_parse_from(["x", "--retention", "ring"]).is_err());
        assert!(Harness::try_parse_from(["x", "--sampler", "best"]).is_err());
        assert!(Harness::try_parse_from(["x", "--interval", "soon"]).is_err());
    }

    #[test]
    fn test_make_poller_file_source() {
        let h = Harness::try_parse_from(["x", "--file", "stats.json"]).unwrap();
        let poller = make_poller(&h.poll).unwrap();
        assert_eq!(poller.source_description(), "file://stats.json");
        assert_eq!(poller.reducer_name(), "uniform");
    }
}
