//! Human and JSON renderings of run outcomes. Everything here returns lines;
//! writing them is the caller's job.

use crate::batch::{BatchReport, SnippetOutcome};
use crate::errors::RunnerError;
use crate::snippet::Snippet;
use crate::verdict::{first_divergence, Failure, Verdict};
use serde::Serialize;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct RunEnvelope<'a> {
    schema_version: u32,
    #[serde(flatten)]
    outcome: &'a SnippetOutcome,
    fingerprint: String,
}

#[derive(Debug, Serialize)]
struct BatchEnvelope<'a> {
    schema_version: u32,
    passed: usize,
    failed: usize,
    exit_code: i32,
    #[serde(flatten)]
    report: &'a BatchReport,
}

pub fn render_run(outcome: &SnippetOutcome, show_transcript: bool) -> Vec<String> {
    let mut lines = vec![format!("== {} [{}]", outcome.name, outcome.topic)];
    if show_transcript {
        lines.extend(outcome.result.lines.iter().map(|line| format!("  {line}")));
    }
    if let Some(error) = &outcome.result.error {
        lines.push(format!("  !! {error}"));
    }
    lines.push(format!(
        "-- {} ({} ms virtual)",
        outcome.result.state.as_str(),
        outcome.result.elapsed_virtual_ms
    ));
    lines.extend(render_verdict(&outcome.verdict));
    lines
}

fn render_verdict(verdict: &Verdict) -> Vec<String> {
    let failure = match verdict {
        Verdict::Pass => return vec!["PASS".to_string()],
        Verdict::Fail(failure) => failure,
    };
    let mut lines = vec![format!("FAIL ({})", failure.label())];
    match failure {
        Failure::AssertionMismatch { expected, actual } => {
            if let Some(at) = first_divergence(expected, actual) {
                lines.push(format!("  first difference at line {}", at + 1));
                lines.push(format!(
                    "  expected: {}",
                    expected.get(at).map(String::as_str).unwrap_or("<end of output>")
                ));
                lines.push(format!(
                    "  actual:   {}",
                    actual.get(at).map(String::as_str).unwrap_or("<end of output>")
                ));
            }
        }
        Failure::UnexpectedError { detail } => lines.push(format!("  {detail}")),
        Failure::Hang { budget_ms } => {
            lines.push(format!("  no result within {budget_ms} ms"));
        }
    }
    lines
}

pub fn render_batch(report: &BatchReport) -> Vec<String> {
    let width = report
        .outcomes
        .iter()
        .map(|outcome| outcome.name.len())
        .max()
        .unwrap_or(0);
    let mut lines = Vec::with_capacity(report.outcomes.len() + report.skipped.len() + 1);
    for outcome in &report.outcomes {
        lines.push(match &outcome.verdict {
            Verdict::Pass => format!("PASS  {}", outcome.name),
            Verdict::Fail(failure) => {
                format!("FAIL  {:<width$}  {}", outcome.name, failure.label())
            }
        });
    }
    for name in &report.skipped {
        lines.push(format!("SKIP  {name}"));
    }
    lines.push(format!(
        "{} passed, {} failed, {} skipped",
        report.passed(),
        report.failed(),
        report.skipped.len()
    ));
    lines
}

pub fn render_list(snippets: &[&'static Snippet]) -> Vec<String> {
    let width = snippets.iter().map(|s| s.name.len()).max().unwrap_or(0);
    snippets
        .iter()
        .map(|snippet| {
            format!(
                "{:<width$}  {:<10}  {}",
                snippet.name, snippet.topic, snippet.summary
            )
        })
        .collect()
}

pub fn run_json(outcome: &SnippetOutcome) -> Result<String, RunnerError> {
    serde_json::to_string_pretty(&RunEnvelope {
        schema_version: REPORT_SCHEMA_VERSION,
        outcome,
        fingerprint: outcome.result.fingerprint(),
    })
    .map_err(|e| RunnerError::Io(e.to_string()))
}

pub fn batch_json(report: &BatchReport) -> Result<String, RunnerError> {
    serde_json::to_string_pretty(&BatchEnvelope {
        schema_version: REPORT_SCHEMA_VERSION,
        passed: report.passed(),
        failed: report.failed(),
        exit_code: report.exit_code(),
        report,
    })
    .map_err(|e| RunnerError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{batch_json, render_batch, render_run, run_json};
    use crate::batch::{BatchReport, SnippetOutcome};
    use crate::runner::ExecutionResult;
    use crate::types::RunState;
    use crate::verdict::{Failure, Verdict};

    fn outcome(verdict: Verdict) -> SnippetOutcome {
        SnippetOutcome {
            name: "timer_ordering",
            topic: "timers",
            result: ExecutionResult {
                lines: vec!["Three".to_string(), "Two".to_string()],
                state: RunState::Completed,
                error: None,
                elapsed_virtual_ms: 1000,
            },
            verdict,
        }
    }

    #[test]
    fn passing_run_prints_transcript_then_verdict() {
        let lines = render_run(&outcome(Verdict::Pass), true);
        assert_eq!(
            lines,
            vec![
                "== timer_ordering [timers]",
                "  Three",
                "  Two",
                "-- completed (1000 ms virtual)",
                "PASS",
            ]
        );
    }

    #[test]
    fn mismatch_points_at_the_first_differing_line() {
        let verdict = Verdict::Fail(Failure::AssertionMismatch {
            expected: vec!["Three".to_string(), "One".to_string()],
            actual: vec!["Three".to_string(), "Two".to_string()],
        });
        let lines = render_run(&outcome(verdict), false);
        assert!(lines.contains(&"FAIL (mismatch)".to_string()));
        assert!(lines.contains(&"  first difference at line 2".to_string()));
        assert!(lines.contains(&"  expected: One".to_string()));
    }

    #[test]
    fn batch_summary_counts_each_bucket() {
        let report = BatchReport {
            outcomes: vec![
                outcome(Verdict::Pass),
                outcome(Verdict::Fail(Failure::Hang { budget_ms: 100 })),
            ],
            skipped: vec!["busy_wait_hang".to_string()],
        };
        let lines = render_batch(&report);
        assert_eq!(lines.last().map(String::as_str), Some("1 passed, 1 failed, 1 skipped"));
        assert!(lines.contains(&"SKIP  busy_wait_hang".to_string()));
    }

    #[test]
    fn json_reports_carry_schema_and_verdict() {
        let text = run_json(&outcome(Verdict::Pass)).expect("json");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["name"], "timer_ordering");
        assert_eq!(value["verdict"]["verdict"], "pass");
        assert_eq!(value["result"]["state"], "completed");

        let report = BatchReport {
            outcomes: vec![outcome(Verdict::Fail(Failure::UnexpectedError {
                detail: "boom".to_string(),
            }))],
            skipped: Vec::new(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&batch_json(&report).expect("json")).expect("parse");
        assert_eq!(value["failed"], 1);
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["outcomes"][0]["verdict"]["kind"], "unexpected_error");
    }
}
