//! One script run inside a fresh QuickJS runtime
//!
//! Runs to completion on the calling thread. Every run gets its own OS thread
//! (inside a worker process or the host), so blocking here (timers, host
//! fetch) never touches the async runtime.

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::host::{self, Deadline};
use crate::Result;
use rquickjs::{CatchResultExt, CaughtError, Context, FromJs, Function, Runtime};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PRELUDE: &str = include_str!("prelude.js");

/// Native stack for isolate threads, kept well above the JS stack limit
const MIN_THREAD_STACK: usize = 8 * 1024 * 1024;

/// Everything a run needs, owned so it can move onto the isolate thread
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IsolateJob {
    pub name: String,
    pub source: String,
    pub params_json: String,
    pub config: SandboxConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome {
    Ok { json: String },
    Error { message: String },
    Rejected { message: String },
    Missing,
    Pending,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Sync,
    Async,
}

impl Phase {
    fn timeout(self, budget: Duration) -> SandboxError {
        match self {
            Phase::Sync => SandboxError::Timeout(budget),
            Phase::Async => SandboxError::AsyncTimeout(budget),
        }
    }
}

/// Evaluation state shared by both phases
struct Isolate {
    context: Context,
    runtime: Runtime,
    deadline: Deadline,
    budget: Duration,
    memory_limit_mb: usize,
}

impl Isolate {
    fn new(job: &IsolateJob) -> Result<Self> {
        let budget = job.config.timeout();
        let deadline = Deadline::new(budget);

        let runtime = Runtime::new()?;
        runtime.set_memory_limit(job.config.memory_limit_bytes());
        runtime.set_max_stack_size(job.config.max_stack_bytes());
        let watched = deadline.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || watched.expired())));

        let context = Context::full(&runtime)?;
        let isolate = Self {
            context,
            runtime,
            deadline,
            budget,
            memory_limit_mb: job.config.memory_limit_mb,
        };
        isolate.install(job)?;
        Ok(isolate)
    }

    /// Bind host functions and inputs, then evaluate the prelude
    fn install(&self, job: &IsolateJob) -> Result<()> {
        let script = job.name.clone();
        let allow_network = job.config.allow_network;
        let deadline = self.deadline.clone();

        self.context.with(|ctx| -> Result<()> {
            let globals = ctx.globals();
            globals.set(
                "__hostLog",
                Function::new(ctx.clone(), move |level: String, message: String| {
                    host::log(&script, &level, &message)
                })?,
            )?;
            globals.set(
                "__hostFetch",
                Function::new(ctx.clone(), move |url: String, init: String| {
                    host::fetch(&url, &init, allow_network, &deadline)
                })?,
            )?;
            globals.set(
                "__hostUrlParse",
                Function::new(ctx.clone(), |input: String, base: String| {
                    host::url_parse(&input, &base)
                })?,
            )?;
            globals.set("__source", job.source.as_str())?;
            globals.set("__params_json", job.params_json.as_str())?;

            ctx.eval::<rquickjs::Value, _>(PRELUDE)
                .catch(&ctx)
                .map_err(|e| SandboxError::Runtime(format!("prelude failed: {}", e)))?;
            Ok(())
        })
    }

    /// Evaluate `code` and convert the result, mapping JS failures for `phase`
    fn eval<T>(&self, code: &str, phase: Phase) -> Result<T>
    where
        T: for<'js> FromJs<'js>,
    {
        self.context.with(|ctx| {
            ctx.eval::<T, _>(code)
                .catch(&ctx)
                .map_err(|caught| self.failure(caught, phase))
        })
    }

    fn failure(&self, caught: CaughtError<'_>, phase: Phase) -> SandboxError {
        if self.deadline.expired() {
            return phase.timeout(self.budget);
        }
        let message = match caught {
            CaughtError::Exception(e) => e.message().unwrap_or_else(|| e.to_string()),
            CaughtError::Value(v) => v
                .as_string()
                .and_then(|s| s.to_string().ok())
                .unwrap_or_else(|| format!("{:?}", v)),
            CaughtError::Error(e) => e.to_string(),
        };
        if message.contains("out of memory") {
            SandboxError::MemoryLimit(self.memory_limit_mb)
        } else {
            SandboxError::Exception(message)
        }
    }

    fn outcome(raw: &str) -> Result<Outcome> {
        serde_json::from_str(raw)
            .map_err(|e| SandboxError::Runtime(format!("unreadable script outcome: {}", e)))
    }

    /// Map a prelude outcome to a result, `None` while the promise is pending
    ///
    /// The prelude catches QuickJS's own out-of-memory error like any other
    /// throw, so the heap limit is recognised by its message here.
    fn settle(&self, outcome: Outcome) -> Option<Result<String>> {
        let out_of_memory = |message: &str| message.contains("out of memory");
        match outcome {
            Outcome::Ok { json } => Some(Ok(json)),
            Outcome::Error { message } | Outcome::Rejected { message }
                if out_of_memory(&message) =>
            {
                Some(Err(SandboxError::MemoryLimit(self.memory_limit_mb)))
            }
            Outcome::Error { message } => Some(Err(SandboxError::Exception(message))),
            Outcome::Rejected { message } => Some(Err(SandboxError::Rejected(message))),
            Outcome::Missing => Some(Err(SandboxError::MissingEntryPoint)),
            Outcome::Pending => None,
        }
    }

    /// Drive jobs and timers until the returned promise settles
    fn event_loop(&self) -> Result<String> {
        self.deadline.reset(self.budget);

        loop {
            while self.runtime.is_job_pending() {
                if self.deadline.expired() {
                    return Err(SandboxError::AsyncTimeout(self.budget));
                }
                if let Err(job_err) = self.runtime.execute_pending_job() {
                    // The error wraps our context without taking a reference;
                    // dropping it would free the context a second time.
                    std::mem::forget(job_err);
                    let failure = self.context.with(|ctx| {
                        match Err::<(), _>(rquickjs::Error::Exception).catch(&ctx) {
                            Err(caught) => self.failure(caught, Phase::Async),
                            Ok(()) => SandboxError::Crashed,
                        }
                    });
                    return Err(failure);
                }
            }

            let settled: Option<String> = self.eval("globalThis.__settled", Phase::Async)?;
            if let Some(raw) = settled {
                if let Some(result) = self.settle(Self::outcome(&raw)?) {
                    // An interrupted job can surface as a rejection
                    if result.is_err() && self.deadline.expired() {
                        return Err(SandboxError::AsyncTimeout(self.budget));
                    }
                    return result;
                }
            }

            let next: String = self.eval("String(__nextTimer())", Phase::Async)?;
            let next: i64 = next.parse().unwrap_or(-1);
            if next < 0 {
                debug!("Promise pending with nothing left to run");
                return Err(SandboxError::AsyncTimeout(self.budget));
            }

            let wait = Duration::from_millis(next as u64);
            if wait > self.deadline.remaining() {
                debug!("Next timer is due after the deadline");
                return Err(SandboxError::AsyncTimeout(self.budget));
            }
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            let thrown: Option<String> = self.eval("__fireDue()", Phase::Async)?;
            if let Some(message) = thrown {
                return Err(SandboxError::Exception(message));
            }
        }
    }
}

/// Run a script to completion and return its JSON-encoded result
pub(crate) fn run(job: IsolateJob) -> Result<String> {
    let isolate = Isolate::new(&job)?;

    let raw: String = isolate.eval(
        "__run(globalThis.__source, globalThis.__params_json)",
        Phase::Sync,
    )?;

    match isolate.settle(Isolate::outcome(&raw)?) {
        Some(result) => result,
        None => isolate.event_loop(),
    }
}

/// Run `job` on a fresh thread and hand its result to `report`
pub(crate) fn spawn<F>(job: IsolateJob, report: F) -> Result<()>
where
    F: FnOnce(Result<String>) + Send + 'static,
{
    let stack = MIN_THREAD_STACK.max(job.config.max_stack_bytes() * 4);
    std::thread::Builder::new()
        .name("script-isolate".to_string())
        .stack_size(stack)
        .spawn(move || report(run(job)))
        .map(|_| ())
        .map_err(|e| SandboxError::Runtime(format!("failed to spawn isolate thread: {}", e)))
}
