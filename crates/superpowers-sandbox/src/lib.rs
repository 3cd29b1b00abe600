//! Superpowers Sandbox
//!
//! Runs skill scripts in a fresh QuickJS runtime per invocation. A script is
//! plain JavaScript defining `main(params)`; its return value (or the value
//! its promise settles with) comes back as a JSON string.
//!
//! The runtime exposes nothing beyond a small allow-list installed by the
//! prelude: `console`, `fetch`, `setTimeout`/`clearTimeout`, `URL` and
//! `URLSearchParams`. There is no module loader, filesystem or process access.
//!
//! By default each run happens in a short-lived `superpowers-isolate` worker
//! process, so a script that brings the runtime down only costs that run.

pub mod config;
pub mod error;
pub mod executor;
mod host;
mod isolate;
pub mod worker;

pub use config::{Isolation, SandboxConfig};
pub use error::SandboxError;
pub use executor::ScriptExecutor;

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, SandboxError>;
