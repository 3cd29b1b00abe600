//! Async entry point for script runs

use crate::config::{Isolation, SandboxConfig};
use crate::error::SandboxError;
use crate::isolate::{self, IsolateJob};
use crate::worker::WORKER_BIN;
use crate::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Extra time the watchdog grants beyond both phase budgets
const WATCHDOG_GRACE: Duration = Duration::from_secs(2);

/// Stateless script runner; every call gets a fresh runtime
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    config: SandboxConfig,
    worker: Option<PathBuf>,
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl ScriptExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        let worker = match config.isolation {
            Isolation::Thread => None,
            Isolation::Process => {
                let found = config.worker_path.clone().or_else(find_worker);
                if found.is_none() {
                    warn!(
                        "{} not found next to the executable; scripts will run in-process",
                        WORKER_BIN
                    );
                }
                found
            }
        };
        Self { config, worker }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Worker binary used for runs, `None` when scripts run in-process
    pub fn worker(&self) -> Option<&Path> {
        self.worker.as_deref()
    }

    /// Run `source`'s `main(params)` and return its JSON-encoded result
    pub async fn run(&self, name: &str, source: &str, params: &Value) -> Result<String> {
        let started = Instant::now();
        let job = IsolateJob {
            name: name.to_string(),
            source: source.to_string(),
            params_json: params.to_string(),
            config: self.config.clone(),
        };

        let result = match &self.worker {
            Some(worker) => self.run_in_process(worker, job).await,
            None => self.run_on_thread(job).await,
        };

        match &result {
            Ok(json) => info!(
                "Script '{}' finished in {:?} ({} bytes)",
                name,
                started.elapsed(),
                json.len()
            ),
            Err(e) => warn!("Script '{}' failed after {:?}: {}", name, started.elapsed(), e),
        }
        result
    }

    fn watchdog(&self) -> Duration {
        self.config.timeout() * 2 + WATCHDOG_GRACE
    }

    async fn run_on_thread(&self, job: IsolateJob) -> Result<String> {
        let name = job.name.clone();
        let (tx, rx) = oneshot::channel();
        isolate::spawn(job, move |result| {
            let _ = tx.send(result);
        })?;
        debug!("Script '{}' started on isolate thread", name);

        match tokio::time::timeout(self.watchdog(), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SandboxError::Crashed),
            Err(_) => {
                warn!("Script '{}' did not report back; abandoning isolate", name);
                Err(SandboxError::Timeout(self.config.timeout()))
            }
        }
    }

    async fn run_in_process(&self, worker: &Path, job: IsolateJob) -> Result<String> {
        let name = job.name.clone();
        let payload = serde_json::to_vec(&job)
            .map_err(|e| SandboxError::Runtime(format!("failed to encode isolate job: {}", e)))?;

        let mut child = Command::new(worker)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SandboxError::Runtime(format!("failed to start {}: {}", worker.display(), e))
            })?;
        debug!("Script '{}' started in worker process {:?}", name, child.id());

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that dies early shows up in its exit status below
            if let Err(e) = stdin.write_all(&payload).await {
                debug!("Could not hand script '{}' to its worker: {}", name, e);
            }
        }

        let output = match tokio::time::timeout(self.watchdog(), child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SandboxError::Runtime(format!("worker process failed: {}", e)))
            }
            Err(_) => {
                warn!("Script '{}' did not report back; killed its worker", name);
                return Err(SandboxError::Timeout(self.config.timeout()));
            }
        };

        if !output.status.success() {
            warn!("Worker for script '{}' exited with {}", name, output.status);
            return Err(SandboxError::Crashed);
        }
        serde_json::from_slice::<Result<String>>(&output.stdout).unwrap_or_else(|e| {
            warn!("Unreadable reply from worker for script '{}': {}", name, e);
            Err(SandboxError::Crashed)
        })
    }
}

/// Look for the worker next to the running executable, or one directory up
/// for test binaries under `deps/`
fn find_worker() -> Option<PathBuf> {
    let file = format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe().ok()?;
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&file))
        .find(|path| path.is_file())
}
