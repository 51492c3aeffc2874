use quirkbook::batch::{run_batch, run_one, BatchOptions};
use quirkbook::catalog::{catalog, find};
use quirkbook::errors::RunnerError;
use quirkbook::runner::{RunOptions, Runner};
use quirkbook::runtime::{FakeClock, FakeTerminal};
use quirkbook::sandbox::{Sandbox, Thrown};
use quirkbook::snippet::{Expectation, Snippet};
use quirkbook::types::{ErrorKind, RunState};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

static PANICS: Snippet = Snippet {
    name: "panics",
    topic: "harness",
    summary: "A body that panics instead of throwing",
    deterministic: true,
    body: panicking_body,
    expected: Expectation::Transcript(&[]),
};

fn panicking_body(sb: &mut Sandbox) -> Result<(), Thrown> {
    sb.log_str("before panic")?;
    panic!("snippet body blew up");
}

fn runner() -> Runner {
    Runner::new(Arc::new(FakeClock::default()), Arc::new(FakeTerminal::new()))
}

fn fast() -> RunOptions {
    RunOptions {
        timeout: Duration::from_millis(150),
        ..RunOptions::default()
    }
}

#[test]
fn every_snippet_matches_its_recorded_outcome() {
    let runner = runner();
    for snippet in catalog() {
        let outcome = run_one(&runner, snippet, &fast()).expect("run");
        assert!(
            outcome.verdict.is_pass(),
            "{} failed: {:?} with lines {:?}",
            snippet.name,
            outcome.verdict,
            outcome.result.lines
        );
    }
}

#[test]
fn deterministic_snippets_repeat_exactly() {
    let runner = runner();
    for snippet in catalog()
        .into_iter()
        .filter(|s| s.deterministic && s.expected != Expectation::Hang)
    {
        let first = runner.run(snippet, &fast()).expect("first");
        let second = runner.run(snippet, &fast()).expect("second");
        assert_eq!(first, second, "{} changed between runs", snippet.name);
    }
}

#[test]
fn var_loop_closures_share_one_binding_let_loop_does_not() {
    let runner = runner();
    let var_loop = runner
        .run(find("closure_var_loop").expect("snippet"), &fast())
        .expect("run");
    let let_loop = runner
        .run(find("closure_let_loop").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(var_loop.lines, ["5", "5"]);
    assert_eq!(let_loop.lines, ["0"]);
}

#[test]
fn async_body_without_await_finishes_before_the_caller_resumes() {
    let result = runner()
        .run(find("async_without_await").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(
        result.lines,
        ["async body start", "async body end", "after call", "then: done", "timer"]
    );
}

#[test]
fn shallow_copy_shares_nested_objects_deep_copy_does_not() {
    let runner = runner();
    let shallow = runner
        .run(find("shallow_copy").expect("snippet"), &fast())
        .expect("run");
    let deep = runner
        .run(find("deep_copy").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(shallow.lines[1], "New Key");
    assert_eq!(deep.lines[1], "key");
}

#[test]
fn login_styles_agree_except_where_the_chain_falls_through() {
    let runner = runner();
    let run = |name| {
        runner
            .run(find(name).expect("snippet"), &fast())
            .expect("run")
    };
    let callbacks = run("login_callbacks");
    let chain = run("login_promise_chain");
    let awaited = run("login_async_await");

    assert_eq!(callbacks.lines, awaited.lines);
    assert_eq!(callbacks.lines[1], "#2 401 Incorrect Password");
    assert_eq!(
        callbacks.lines.last().map(String::as_str),
        Some("#1 200 { token: 'signed:ada@example.com' }")
    );
    assert!(chain.lines.contains(&"#2 401 Incorrect Password".to_string()));
    assert!(chain
        .lines
        .contains(&"#2 callback Error: Cannot set headers after they are sent to the client".to_string()));
    for result in [&callbacks, &chain, &awaited] {
        assert_eq!(result.state, RunState::Completed);
        assert_eq!(result.elapsed_virtual_ms, 30);
    }
}

#[test]
fn busy_wait_is_cut_off_at_the_budget() {
    let options = RunOptions {
        timeout: Duration::from_millis(100),
        ..RunOptions::default()
    };
    let started = std::time::Instant::now();
    let result = runner()
        .run(find("busy_wait_hang").expect("snippet"), &options)
        .expect("run");
    assert_eq!(result.state, RunState::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn globals_do_not_leak_between_runs() {
    let runner = runner();
    let leak = find("iife_global_leak").expect("snippet");
    let first = runner.run(leak, &fast()).expect("first");
    let second = runner.run(leak, &fast()).expect("second");
    assert_eq!(first.lines, second.lines);

    let extension = runner
        .run(find("array_prototype_extension").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(extension.state, RunState::Completed);
    let plain = runner
        .run(find("map_vs_foreach").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(plain.state, RunState::Completed);
}

#[test]
fn top_level_this_is_undefined_then_throws() {
    let result = runner()
        .run(find("this_top_level").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(result.state, RunState::Threw);
    assert_eq!(result.lines.first().map(String::as_str), Some("undefined"));
    assert_eq!(result.error.expect("error").kind, ErrorKind::TypeError);
}

#[test]
fn invalid_assignment_target_fails_before_any_output() {
    let result = runner()
        .run(find("syntax_invalid_assignment_target").expect("snippet"), &fast())
        .expect("run");
    assert_eq!(result.state, RunState::Threw);
    assert!(result.lines.is_empty());
    assert_eq!(result.error.expect("error").kind, ErrorKind::SyntaxError);
}

#[test]
fn real_timers_wait_on_the_clock() {
    let clock = FakeClock::default();
    let runner = Runner::new(Arc::new(clock.clone()), Arc::new(FakeTerminal::new()));
    let options = RunOptions {
        simulate_timers: false,
        ..RunOptions::default()
    };
    let result = runner
        .run(find("timer_ordering").expect("snippet"), &options)
        .expect("run");
    assert_eq!(result.lines, ["Three", "Two", "Four", "Five", "One"]);
    assert_eq!(
        clock.sleeps().last().copied(),
        Some(UNIX_EPOCH + Duration::from_millis(1000))
    );
}

#[test]
fn uncaptured_console_goes_to_the_terminal() {
    let terminal = FakeTerminal::new();
    let runner = Runner::new(Arc::new(FakeClock::default()), Arc::new(terminal.clone()));
    let options = RunOptions {
        capture_console: false,
        ..fast()
    };
    let outcome = run_one(&runner, find("closure_var_loop").expect("snippet"), &options)
        .expect("run");
    assert!(outcome.result.lines.is_empty());
    assert!(outcome.verdict.is_pass());
    assert_eq!(terminal.written_lines(), ["5", "5"]);
}

#[test]
fn batch_with_determinism_check_passes_the_catalog() {
    let report = run_batch(
        &runner(),
        &catalog(),
        &fast(),
        &BatchOptions {
            exclude: Vec::new(),
            verify_determinism: true,
        },
    )
    .expect("batch");
    assert_eq!(report.failed(), 0, "{:?}", report.outcomes);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.outcomes.len(), catalog().len());
}

#[test]
fn panicking_body_is_a_runner_fault() {
    let err = runner().run(&PANICS, &fast()).expect_err("fault");
    assert!(matches!(err, RunnerError::Fault(message) if message.contains("panics")));
}

#[test]
fn runner_fault_aborts_the_batch() {
    let snippets = vec![
        find("timer_ordering").expect("snippet"),
        &PANICS,
        find("closure_var_loop").expect("snippet"),
    ];
    let err = run_batch(&runner(), &snippets, &fast(), &BatchOptions::default())
        .expect_err("fault aborts");
    assert!(matches!(err, RunnerError::Fault(_)));
}
