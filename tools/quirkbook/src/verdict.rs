//! Judging an [`ExecutionResult`] against what its snippet was recorded to do.

use crate::runner::ExecutionResult;
use crate::snippet::Expectation;
use crate::types::{RunState, ThrownError};
use serde::Serialize;

pub const EXIT_PASS: i32 = 0;
pub const EXIT_MISMATCH: i32 = 1;
pub const EXIT_UNEXPECTED_ERROR: i32 = 2;
pub const EXIT_TIMEOUT: i32 = 3;
/// Harness faults: unknown snippet, bad config, CLI misuse.
pub const EXIT_FAULT: i32 = 4;

/// Per-snippet failures. None of these stop a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    AssertionMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    UnexpectedError {
        detail: String,
    },
    Hang {
        budget_ms: u64,
    },
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AssertionMismatch { .. } => EXIT_MISMATCH,
            Self::UnexpectedError { .. } => EXIT_UNEXPECTED_ERROR,
            Self::Hang { .. } => EXIT_TIMEOUT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AssertionMismatch { .. } => "mismatch",
            Self::UnexpectedError { .. } => "unexpected error",
            Self::Hang { .. } => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Failure),
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pass => EXIT_PASS,
            Self::Fail(failure) => failure.exit_code(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// With `compare_lines` off (console not captured) only the terminal state
/// and error are judged.
pub fn judge(
    expected: &Expectation,
    result: &ExecutionResult,
    budget_ms: u64,
    compare_lines: bool,
) -> Verdict {
    match (expected, result.state) {
        (Expectation::Hang, RunState::TimedOut) => Verdict::Pass,
        (_, RunState::TimedOut) => Verdict::Fail(Failure::Hang { budget_ms }),
        (Expectation::Hang, _) => Verdict::Fail(Failure::UnexpectedError {
            detail: format!(
                "expected the run to hang, but it ended as {}{}",
                result.state.as_str(),
                describe_error(result.error.as_ref())
            ),
        }),
        (Expectation::Transcript(lines), RunState::Completed) => {
            compare(&[*lines], &result.lines, compare_lines)
        }
        (Expectation::OneOf(options), RunState::Completed) => {
            compare(options, &result.lines, compare_lines)
        }
        (Expectation::Transcript(_) | Expectation::OneOf(_), _) => {
            Verdict::Fail(Failure::UnexpectedError {
                detail: format!(
                    "expected the run to complete, but it threw{}",
                    describe_error(result.error.as_ref())
                ),
            })
        }
        (Expectation::Throws { .. }, RunState::Completed) => {
            Verdict::Fail(Failure::UnexpectedError {
                detail: format!("expected the run to throw: {}", expected.describe()),
            })
        }
        (
            Expectation::Throws {
                kind,
                message,
                transcript,
            },
            _,
        ) => {
            let error_matches = result
                .error
                .as_ref()
                .is_some_and(|error| error.kind == *kind && error.message == *message);
            if !error_matches {
                return Verdict::Fail(Failure::AssertionMismatch {
                    expected: vec![format!("{}: {message}", kind.as_str())],
                    actual: vec![result
                        .error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "no error".to_string())],
                });
            }
            compare(&[*transcript], &result.lines, compare_lines)
        }
    }
}

fn compare(options: &[&[&str]], actual: &[String], compare_lines: bool) -> Verdict {
    if !compare_lines {
        return Verdict::Pass;
    }
    if options.iter().any(|option| lines_equal(option, actual)) {
        return Verdict::Pass;
    }
    Verdict::Fail(Failure::AssertionMismatch {
        expected: options
            .first()
            .map(|option| option.iter().map(|line| line.to_string()).collect())
            .unwrap_or_default(),
        actual: actual.to_vec(),
    })
}

fn lines_equal(expected: &[&str], actual: &[String]) -> bool {
    expected.len() == actual.len() && expected.iter().zip(actual).all(|(e, a)| *e == a)
}

fn describe_error(error: Option<&ThrownError>) -> String {
    error.map(|e| format!(" ({e})")).unwrap_or_default()
}

/// First line where two transcripts diverge, for mismatch reports.
pub fn first_divergence(expected: &[String], actual: &[String]) -> Option<usize> {
    let shared = expected.len().min(actual.len());
    (0..shared)
        .find(|&i| expected[i] != actual[i])
        .or((expected.len() != actual.len()).then_some(shared))
}

#[cfg(test)]
mod tests {
    use super::{first_divergence, judge, Failure, Verdict};
    use crate::runner::ExecutionResult;
    use crate::snippet::Expectation;
    use crate::types::{ErrorKind, RunState, ThrownError};

    fn completed(lines: &[&str]) -> ExecutionResult {
        ExecutionResult {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            state: RunState::Completed,
            error: None,
            elapsed_virtual_ms: 0,
        }
    }

    fn threw(kind: ErrorKind, message: &str, lines: &[&str]) -> ExecutionResult {
        ExecutionResult {
            state: RunState::Threw,
            error: Some(ThrownError::new(kind, message)),
            ..completed(lines)
        }
    }

    #[test]
    fn matching_transcript_passes_and_differing_one_is_a_mismatch() {
        let expected = Expectation::Transcript(&["Three", "Two"]);
        assert_eq!(judge(&expected, &completed(&["Three", "Two"]), 100, true), Verdict::Pass);

        let verdict = judge(&expected, &completed(&["Two", "Three"]), 100, true);
        assert_eq!(verdict.exit_code(), 1);
        assert!(matches!(verdict, Verdict::Fail(Failure::AssertionMismatch { .. })));
    }

    #[test]
    fn any_listed_outcome_satisfies_one_of() {
        let expected = Expectation::OneOf(&[&["done"], &["Error: ..."]]);
        assert!(judge(&expected, &completed(&["Error: ..."]), 100, true).is_pass());
        assert!(!judge(&expected, &completed(&["maybe"]), 100, true).is_pass());
    }

    #[test]
    fn throwing_instead_of_completing_is_an_unexpected_error() {
        let expected = Expectation::Transcript(&["5"]);
        let verdict = judge(&expected, &threw(ErrorKind::TypeError, "boom", &[]), 100, true);
        assert_eq!(verdict.exit_code(), 2);
    }

    #[test]
    fn expected_errors_must_match_kind_and_message() {
        let expected = Expectation::Throws {
            kind: ErrorKind::ReferenceError,
            message: "Cannot access 'number' before initialization",
            transcript: &[],
        };
        let right = threw(
            ErrorKind::ReferenceError,
            "Cannot access 'number' before initialization",
            &[],
        );
        assert!(judge(&expected, &right, 100, true).is_pass());

        let wrong = threw(ErrorKind::TypeError, "number is not a function", &[]);
        assert_eq!(judge(&expected, &wrong, 100, true).exit_code(), 1);
        assert_eq!(judge(&expected, &completed(&[]), 100, true).exit_code(), 2);
    }

    #[test]
    fn timeouts_fail_unless_a_hang_was_expected() {
        let timed_out = ExecutionResult {
            state: RunState::TimedOut,
            ..completed(&[])
        };
        assert!(judge(&Expectation::Hang, &timed_out, 100, true).is_pass());
        let verdict = judge(&Expectation::Transcript(&[]), &timed_out, 100, true);
        assert_eq!(verdict, Verdict::Fail(Failure::Hang { budget_ms: 100 }));
        assert_eq!(verdict.exit_code(), 3);
        assert_eq!(judge(&Expectation::Hang, &completed(&[]), 100, true).exit_code(), 2);
    }

    #[test]
    fn uncaptured_runs_skip_transcript_comparison() {
        let expected = Expectation::Transcript(&["Three"]);
        assert!(judge(&expected, &completed(&[]), 100, false).is_pass());
    }

    #[test]
    fn divergence_points_at_the_first_differing_line() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["x".to_string(), "z".to_string()];
        assert_eq!(first_divergence(&a, &b), Some(1));
        assert_eq!(first_divergence(&a, &a[..1]), Some(1));
        assert_eq!(first_divergence(&a, &a), None);
    }
}
