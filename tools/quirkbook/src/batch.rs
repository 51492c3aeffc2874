use crate::errors::RunnerError;
use crate::logging::append_run_log;
use crate::runner::{ExecutionResult, RunOptions, Runner};
use crate::snippet::{Expectation, Snippet};
use crate::verdict::{judge, Failure, Verdict};
use serde::Serialize;
use serde_json::json;

/// Exit codes are process statuses, so the failure count saturates here.
const MAX_EXIT_CODE: usize = 255;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub exclude: Vec<String>,
    pub verify_determinism: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnippetOutcome {
    pub name: &'static str,
    pub topic: &'static str,
    pub result: ExecutionResult,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<SnippetOutcome>,
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.verdict.is_pass())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn exit_code(&self) -> i32 {
        self.failed().min(MAX_EXIT_CODE) as i32
    }
}

/// Runs one snippet and judges it.
pub fn run_one(
    runner: &Runner,
    snippet: &'static Snippet,
    options: &RunOptions,
) -> Result<SnippetOutcome, RunnerError> {
    let result = runner.run(snippet, options)?;
    let verdict = judge(
        &snippet.expected,
        &result,
        options.timeout.as_millis() as u64,
        options.capture_console,
    );
    Ok(SnippetOutcome {
        name: snippet.name,
        topic: snippet.topic,
        result,
        verdict,
    })
}

/// Runs every snippet in order. Per-snippet failures are recorded and the
/// batch carries on; a runner fault aborts it.
pub fn run_batch(
    runner: &Runner,
    snippets: &[&'static Snippet],
    run_options: &RunOptions,
    batch_options: &BatchOptions,
) -> Result<BatchReport, RunnerError> {
    for name in &batch_options.exclude {
        if !snippets.iter().any(|snippet| snippet.name == name) {
            return Err(RunnerError::UnknownSnippet(name.clone()));
        }
    }

    append_run_log(
        "info",
        "batch.started",
        json!({
            "snippets": snippets.len(),
            "excluded": batch_options.exclude,
            "verify_determinism": batch_options.verify_determinism,
        }),
    );

    let mut outcomes = Vec::with_capacity(snippets.len());
    let mut skipped = Vec::new();
    for &snippet in snippets {
        if batch_options.exclude.iter().any(|name| name == snippet.name) {
            skipped.push(snippet.name.to_string());
            continue;
        }
        let mut outcome = run_one(runner, snippet, run_options)?;
        if batch_options.verify_determinism && outcome.verdict.is_pass() {
            outcome.verdict = recheck_determinism(runner, snippet, run_options, &outcome)?;
        }
        outcomes.push(outcome);
    }

    let report = BatchReport { outcomes, skipped };
    append_run_log(
        "info",
        "batch.finished",
        json!({
            "passed": report.passed(),
            "failed": report.failed(),
            "skipped": report.skipped,
        }),
    );
    Ok(report)
}

/// Re-runs a deterministic snippet and fails it when the second run is not
/// observably identical to the first.
fn recheck_determinism(
    runner: &Runner,
    snippet: &'static Snippet,
    options: &RunOptions,
    first: &SnippetOutcome,
) -> Result<Verdict, RunnerError> {
    if !snippet.deterministic || snippet.expected == Expectation::Hang {
        return Ok(first.verdict.clone());
    }
    let second = runner.run(snippet, options)?;
    if second.fingerprint() == first.result.fingerprint() {
        return Ok(first.verdict.clone());
    }
    append_run_log(
        "warn",
        "batch.nondeterministic",
        json!({
            "snippet": snippet.name,
            "first": first.result.fingerprint(),
            "second": second.fingerprint(),
        }),
    );
    Ok(Verdict::Fail(Failure::AssertionMismatch {
        expected: first.result.lines.clone(),
        actual: second.lines,
    }))
}

#[cfg(test)]
mod tests {
    use super::{run_batch, BatchOptions, BatchReport, SnippetOutcome};
    use crate::catalog::{catalog, find};
    use crate::errors::RunnerError;
    use crate::runner::{ExecutionResult, RunOptions, Runner};
    use crate::runtime::{FakeClock, FakeTerminal};
    use crate::types::RunState;
    use crate::verdict::{Failure, Verdict};
    use std::sync::Arc;

    fn runner() -> Runner {
        Runner::new(Arc::new(FakeClock::default()), Arc::new(FakeTerminal::new()))
    }

    fn failing(n: usize) -> BatchReport {
        let outcome = SnippetOutcome {
            name: "x",
            topic: "t",
            result: ExecutionResult {
                lines: Vec::new(),
                state: RunState::Completed,
                error: None,
                elapsed_virtual_ms: 0,
            },
            verdict: Verdict::Fail(Failure::Hang { budget_ms: 1 }),
        };
        BatchReport {
            outcomes: vec![outcome; n],
            skipped: Vec::new(),
        }
    }

    #[test]
    fn exit_code_counts_failures_and_saturates() {
        assert_eq!(failing(0).exit_code(), 0);
        assert_eq!(failing(3).exit_code(), 3);
        assert_eq!(failing(300).exit_code(), 255);
    }

    #[test]
    fn excluded_snippets_are_skipped_not_run() {
        let snippets = vec![
            find("timer_ordering").expect("snippet"),
            find("busy_wait_hang").expect("snippet"),
        ];
        let report = run_batch(
            &runner(),
            &snippets,
            &RunOptions::default(),
            &BatchOptions {
                exclude: vec!["busy_wait_hang".to_string()],
                verify_determinism: true,
            },
        )
        .expect("batch");
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.skipped, vec!["busy_wait_hang"]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn excluding_an_unknown_name_is_a_fault() {
        let err = run_batch(
            &runner(),
            &catalog(),
            &RunOptions::default(),
            &BatchOptions {
                exclude: vec!["nope".to_string()],
                verify_determinism: false,
            },
        )
        .expect_err("unknown");
        assert!(matches!(err, RunnerError::UnknownSnippet(name) if name == "nope"));
    }
}
