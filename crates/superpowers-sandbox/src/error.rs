use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Ways a script run can fail
///
/// The `Display` text is what the model sees after the
/// `Error running script: ` prefix. Worker processes send it back to the host
/// as JSON.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum SandboxError {
    /// The script never defined a callable `main`
    #[error("Script must define a main(params) function")]
    MissingEntryPoint,

    /// A value was thrown while evaluating or running the script
    #[error("{0}")]
    Exception(String),

    /// The promise returned by `main` was rejected
    #[error("{0}")]
    Rejected(String),

    /// The synchronous phase ran past its budget
    #[error("Script execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The returned promise did not settle within its budget
    #[error("Script async execution timed out after {}ms", .0.as_millis())]
    AsyncTimeout(Duration),

    /// The runtime heap limit was reached
    #[error("Script exceeded the memory limit of {0} MB")]
    MemoryLimit(usize),

    /// Parameters were not valid JSON
    #[error("Invalid paramsJson: {0}")]
    InvalidParams(String),

    /// The runtime could not be created
    #[error("Failed to start script runtime: {0}")]
    Runtime(String),

    /// The isolate thread or worker process died without reporting a result
    #[error("Script isolate terminated unexpectedly")]
    Crashed,
}

impl From<rquickjs::Error> for SandboxError {
    fn from(err: rquickjs::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}
