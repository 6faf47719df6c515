//! `latencyscope watch`: live latency chart in the terminal.

use super::{PollArgs, make_poller};
use crate::tui::app::App;

pub fn run(args: &PollArgs, deadline: f64) {
    let poller = match make_poller(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new(poller, rt, deadline);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
