//! `latencyscope summary`: latency statistics over the full document.
//!
//! Unlike the live chart this reads every record, unsampled.

use std::path::Path;

use latencyscope_core::{LatencySummary, load_snapshot_blocking, project};

pub fn run(document: &Path, deadline: f64, json: bool) {
    let snapshot = match load_snapshot_blocking(document) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let points = project(&snapshot.messages);

    let Some(summary) = LatencySummary::from_points(&points, deadline) else {
        println!("No messages in {}", document.display());
        return;
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: cannot encode summary: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    print!("{}", render(&summary));
}

/// Human-readable report; latencies in milliseconds.
fn render(s: &LatencySummary) -> String {
    let ms = |secs: f64| secs * 1000.0;
    let mut out = String::new();
    out.push_str(&format!("Total messages:        {}\n", s.count));
    out.push_str(&format!("Average latency:       {:.2} ms\n", ms(s.mean)));
    out.push_str(&format!("Min latency:           {:.4} ms\n", ms(s.min)));
    out.push_str(&format!("Max latency:           {:.4} ms\n", ms(s.max)));
    out.push_str(&format!("Standard deviation:    {:.2} ms\n", ms(s.std_dev)));
    out.push_str(&format!("95th percentile:       {:.2} ms\n", ms(s.p95)));
    out.push_str(&format!(
        "Out of deadline ({}s):  {} ({:.2}%)\n",
        s.deadline,
        s.over_deadline,
        s.over_deadline_pct()
    ));
    out
}
