use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where script runtimes live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// One `superpowers-isolate` worker process per run; a runtime crash only
    /// kills the worker
    #[default]
    Process,
    /// One thread of the host process per run
    Thread,
}

/// Limits applied to every script run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Budget in milliseconds, applied separately to the synchronous and the
    /// asynchronous phase
    pub timeout_ms: u64,
    /// Heap limit of the runtime in MB
    pub memory_limit_mb: usize,
    /// Maximum JS stack size in KB
    pub max_stack_kb: usize,
    /// Whether `fetch` may reach the network
    pub allow_network: bool,
    pub isolation: Isolation,
    /// Worker binary; looked up next to the running executable when unset
    pub worker_path: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 50_000,
            memory_limit_mb: 64,
            max_stack_kb: 1024,
            allow_network: true,
            isolation: Isolation::Process,
            worker_path: None,
        }
    }
}

impl SandboxConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn with_network(mut self, allow: bool) -> Self {
        self.allow_network = allow;
        self
    }

    pub fn with_memory_limit_mb(mut self, mb: usize) -> Self {
        self.memory_limit_mb = mb;
        self
    }

    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_worker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_path = Some(path.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb.max(1) * 1024 * 1024
    }

    pub fn max_stack_bytes(&self) -> usize {
        self.max_stack_kb.max(64) * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_partial_config() {
        let config = SandboxConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(50));
        assert!(config.allow_network);

        let partial: SandboxConfig = serde_json::from_str(r#"{"allow_network": false}"#).unwrap();
        assert!(!partial.allow_network);
        assert_eq!(partial.timeout_ms, 50_000);
        assert_eq!(partial.isolation, Isolation::Process);

        let thread: SandboxConfig = serde_json::from_str(r#"{"isolation": "thread"}"#).unwrap();
        assert_eq!(thread.isolation, Isolation::Thread);
        assert!(thread.worker_path.is_none());
    }
}
