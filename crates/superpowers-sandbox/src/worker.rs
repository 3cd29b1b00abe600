//! Worker side of process isolation
//!
//! The `superpowers-isolate` binary reads one job as JSON on stdin, runs it and
//! writes the JSON-encoded `Result` to stdout. If the runtime takes the
//! process down, the host sees a failed exit status instead of a reply.

use crate::error::SandboxError;
use crate::isolate::{self, IsolateJob};
use crate::Result;
use std::io::{Read, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use tracing::error;

/// File name of the worker binary, without the platform suffix
pub const WORKER_BIN: &str = "superpowers-isolate";

/// Serve a single job over stdin/stdout
pub fn serve() -> ExitCode {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        error!("Failed to read isolate job: {}", e);
        return ExitCode::FAILURE;
    }
    let job: IsolateJob = match serde_json::from_str(&input) {
        Ok(job) => job,
        Err(e) => {
            error!("Malformed isolate job: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reply = match serde_json::to_string(&run(job)) {
        Ok(reply) => reply,
        Err(e) => {
            error!("Failed to encode script result: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(reply.as_bytes()).and_then(|_| stdout.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to write script result: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(job: IsolateJob) -> Result<String> {
    let (tx, rx) = mpsc::channel();
    isolate::spawn(job, move |result| {
        let _ = tx.send(result);
    })?;
    rx.recv().unwrap_or(Err(SandboxError::Crashed))
}
