//! `latencyscope serve`: expose the telemetry document over HTTP.

use std::path::Path;

pub fn run(document: &Path, host: &str, port: u16) {
    let base = format!("http://{host}:{port}");

    println!("latencyscope data service v{}", latencyscope_core::VERSION);
    println!("   {base}");
    println!("   document: {}", document.display());
    println!();
    println!("   Endpoints:");
    println!("     GET /        API index");
    println!("     GET /data    Full telemetry snapshot (re-read on every request)");
    println!();
    println!("   Example:");
    println!("     curl {base}/data");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(latencyscope_server::run_server(document, host, port)) {
        eprintln!("Error: server on {base} failed: {e}");
        std::process::exit(1);
    }
}
