//! CLI for latencyscope: live message-latency charts.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use latencyscope_core::config::{
    DEFAULT_DEADLINE_SECS, DEFAULT_DOCUMENT_PATH, DEFAULT_HOST, DEFAULT_PORT,
};

use commands::PollArgs;

#[derive(Parser)]
#[command(name = "latencyscope")]
#[command(about = "latencyscope: live message-latency charts")]
#[command(version = latencyscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the telemetry document over HTTP at /data
    Serve {
        /// Telemetry document to serve (re-read on every request)
        #[arg(long, default_value = DEFAULT_DOCUMENT_PATH)]
        document: PathBuf,

        /// Bind address
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Live chart of arrival times, polled from the data service
    Watch {
        #[command(flatten)]
        poll: PollArgs,

        /// Arrival-time deadline in seconds, drawn as a reference line
        #[arg(long, default_value_t = DEFAULT_DEADLINE_SECS)]
        deadline: f64,
    },

    /// Run the poll pipeline without a UI and log every cycle
    Poll {
        #[command(flatten)]
        poll: PollArgs,

        /// Arrival-time deadline in seconds
        #[arg(long, default_value_t = DEFAULT_DEADLINE_SECS)]
        deadline: f64,

        /// Stop after this many completed polls (default: until Ctrl+C)
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Latency statistics over every record in a telemetry document
    Summary {
        /// Telemetry document to read
        #[arg(long, default_value = DEFAULT_DOCUMENT_PATH)]
        document: PathBuf,

        /// Arrival-time deadline in seconds
        #[arg(long, default_value_t = DEFAULT_DEADLINE_SECS)]
        deadline: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Log lines would tear the alternate screen.
    let filter = match cli.command {
        Commands::Watch { .. } => "off",
        _ => "info",
    };
    commands::init_logging(filter);

    match cli.command {
        Commands::Serve {
            document,
            host,
            port,
        } => commands::serve::run(&document, &host, port),
        Commands::Watch { poll, deadline } => commands::watch::run(&poll, deadline),
        Commands::Poll {
            poll,
            deadline,
            cycles,
        } => commands::poll::run(&poll, deadline, cycles),
        Commands::Summary {
            document,
            deadline,
            json,
        } => commands::summary::run(&document, deadline, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["latencyscope", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                document,
                host,
                port,
            } => {
                assert_eq!(document, PathBuf::from(DEFAULT_DOCUMENT_PATH));
                assert_eq!(host, DEFAULT_HOST);
                assert_eq!(port, 2000);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_poll_flags() {
        let cli = Cli::try_parse_from([
            "latencyscope",
            "poll",
            "--file",
            "stats.json",
            "--cycles",
            "3",
            "--deadline",
            "1.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Poll {
                poll,
                deadline,
                cycles,
            } => {
                assert_eq!(poll.file, Some(PathBuf::from("stats.json")));
                assert_eq!(deadline, 1.5);
                assert_eq!(cycles, Some(3));
            }
            _ => panic!("expected poll"),
        }
    }

    #[test]
    fn test_watch_uses_poll_defaults() {
        let cli = Cli::try_parse_from(["latencyscope", "watch"]).unwrap();
        match cli.command {
            Commands::Watch { poll, deadline } => {
                assert_eq!(poll.config(), latencyscope_core::PollConfig::default());
                assert_eq!(deadline, DEFAULT_DEADLINE_SECS);
            }
            _ => panic!("expected watch"),
        }
    }
}
