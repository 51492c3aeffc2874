//! Single-shot snippet execution under a wall-clock budget.
//!
//! Each run gets its own OS thread and its own [`Sandbox`]; the caller waits
//! on a oneshot reply under `tokio::time::timeout`. When the budget runs out
//! the interrupt flag is raised, the run is marked `TimedOut`, and the thread
//! is left to unwind on its own.

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use crate::fsm::RunFsm;
use crate::logging::append_run_log;
use crate::runtime::{Clock, ProductionRuntime, Terminal};
use crate::sandbox::{Sandbox, SandboxOptions};
use crate::snippet::Snippet;
use crate::types::{RunState, ThrownError};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// How long an interrupted run gets to hand back its partial transcript.
const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub timeout: Duration,
    pub capture_console: bool,
    pub simulate_timers: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            capture_console: true,
            simulate_timers: true,
        }
    }
}

impl From<&RunnerConfig> for RunOptions {
    fn from(cfg: &RunnerConfig) -> Self {
        Self {
            timeout: Duration::from_millis(cfg.timeout_ms),
            capture_console: cfg.capture_console,
            simulate_timers: cfg.simulate_timers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub lines: Vec<String>,
    pub state: RunState,
    pub error: Option<ThrownError>,
    pub elapsed_virtual_ms: u64,
}

impl ExecutionResult {
    /// SHA-256 over everything observable about the run.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "state={};elapsed={}\n",
                self.state.as_str(),
                self.elapsed_virtual_ms
            )
            .as_bytes(),
        );
        if let Some(error) = &self.error {
            hasher.update(format!("error={error}\n").as_bytes());
        }
        for line in &self.lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// What the run thread hands back.
struct Finished {
    lines: Vec<String>,
    error: Option<ThrownError>,
    elapsed_virtual_ms: u64,
}

pub struct Runner {
    clock: Arc<dyn Clock>,
    terminal: Arc<dyn Terminal>,
}

impl Runner {
    pub fn new(clock: Arc<dyn Clock>, terminal: Arc<dyn Terminal>) -> Self {
        Self { clock, terminal }
    }

    pub fn from_runtime(runtime: &ProductionRuntime) -> Self {
        Self::new(Arc::clone(&runtime.clock), Arc::clone(&runtime.terminal))
    }

    pub fn run(
        &self,
        snippet: &'static Snippet,
        options: &RunOptions,
    ) -> Result<ExecutionResult, RunnerError> {
        let mut fsm = RunFsm::default();
        fsm.start()?;
        append_run_log(
            "info",
            "runner.run_started",
            json!({
                "snippet": snippet.name,
                "timeout_ms": options.timeout.as_millis() as u64,
                "simulate_timers": options.simulate_timers,
                "capture_console": options.capture_console,
            }),
        );

        let interrupt = Arc::new(AtomicBool::new(false));
        let sandbox_options = SandboxOptions {
            simulate_timers: options.simulate_timers,
            capture_console: options.capture_console,
            clock: Arc::clone(&self.clock),
            terminal: Arc::clone(&self.terminal),
            interrupt: Arc::clone(&interrupt),
        };
        let (reply_tx, mut reply_rx) = oneshot::channel();
        thread::Builder::new()
            .name(format!("snippet-{}", snippet.name))
            .spawn(move || {
                let _ = reply_tx.send(execute(snippet, sandbox_options));
            })
            .map_err(|e| RunnerError::Fault(format!("could not start {}: {e}", snippet.name)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| RunnerError::Io(e.to_string()))?;
        let waited =
            runtime.block_on(async { tokio::time::timeout(options.timeout, &mut reply_rx).await });

        let finished = match waited {
            Ok(Ok(finished)) => {
                match finished.error.clone() {
                    None => fsm.complete()?,
                    Some(error) => fsm.throw(error)?,
                }
                finished
            }
            Ok(Err(_)) => {
                append_run_log(
                    "error",
                    "runner.run_fault",
                    json!({ "snippet": snippet.name }),
                );
                return Err(RunnerError::Fault(format!(
                    "snippet {} panicked before reporting a result",
                    snippet.name
                )));
            }
            Err(_) => {
                interrupt.store(true, Ordering::SeqCst);
                fsm.time_out()?;
                append_run_log(
                    "warn",
                    "runner.run_timed_out",
                    json!({
                        "snippet": snippet.name,
                        "timeout_ms": options.timeout.as_millis() as u64,
                    }),
                );
                let partial = runtime
                    .block_on(async { tokio::time::timeout(INTERRUPT_GRACE, reply_rx).await });
                match partial {
                    Ok(Ok(finished)) => Finished {
                        error: None,
                        ..finished
                    },
                    _ => Finished {
                        lines: Vec::new(),
                        error: None,
                        elapsed_virtual_ms: 0,
                    },
                }
            }
        };

        let result = ExecutionResult {
            lines: finished.lines,
            state: fsm.state,
            error: fsm.error,
            elapsed_virtual_ms: finished.elapsed_virtual_ms,
        };
        append_run_log(
            "info",
            "runner.run_finished",
            json!({
                "snippet": snippet.name,
                "state": result.state.as_str(),
                "error": result.error.as_ref().map(ToString::to_string),
                "lines": result.lines,
                "elapsed_virtual_ms": result.elapsed_virtual_ms,
                "fingerprint": result.fingerprint(),
            }),
        );
        Ok(result)
    }
}

/// Runs the body, then the event loop. A body that throws never reaches its
/// timers.
fn execute(snippet: &Snippet, options: SandboxOptions) -> Finished {
    let mut sandbox = Sandbox::new(options);
    let outcome = (snippet.body)(&mut sandbox).and_then(|()| sandbox.run_event_loop());
    Finished {
        elapsed_virtual_ms: sandbox.elapsed_virtual_ms(),
        error: outcome.err(),
        lines: sandbox.into_lines(),
    }
}
