//! Script worker process; see `superpowers_sandbox::worker`

use std::process::ExitCode;

fn main() -> ExitCode {
    let level = std::env::var("SUPERPOWERS_ISOLATE_LOG").unwrap_or_else(|_| "info".to_string());
    if let Err(e) = superpowers_logging::init_logging(&level, false) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    superpowers_sandbox::worker::serve()
}
