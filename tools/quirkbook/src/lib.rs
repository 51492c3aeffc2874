pub mod batch;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod fsm;
pub mod log_retention;
pub mod logging;
pub mod report;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod snippet;
pub mod types;
pub mod verdict;

use batch::{run_batch, run_one, BatchOptions};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use config::{load_config, CliOverrides, EnvMap};
use errors::RunnerError;
use logging::{append_run_log, install_run_log, JsonlLogger};
use runner::{RunOptions, Runner};
use runtime::ProductionRuntime;
use serde_json::json;

#[derive(Debug, Clone, Parser)]
#[command(name = "quirkbook", version)]
#[command(about = "Runs JavaScript concept snippets and checks them against their recorded transcripts")]
pub struct Cli {
    /// TOML config file; defaults to ./quirkbook.toml when present.
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
    /// Wall-clock budget per snippet. Overrides TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
    /// Actually wait on timers instead of fast-forwarding them.
    #[arg(long, global = true, default_value_t = false)]
    pub real_timers: bool,
    /// Let console output through to the terminal; transcripts are not compared.
    #[arg(long, global = true, default_value_t = false)]
    pub no_capture: bool,
    #[arg(long, global = true)]
    pub log_file: Option<std::path::PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one snippet by name, or every snippet with --all.
    Run(RunArgs),
    /// List every registered snippet.
    List,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,
    #[arg(long, default_value_t = false)]
    pub all: bool,
    /// Skip a snippet in batch mode. Repeatable.
    #[arg(long)]
    pub exclude: Vec<String>,
    /// Re-run deterministic snippets and fail any whose result changes.
    #[arg(long, default_value_t = false)]
    pub verify_determinism: bool,
}

pub fn run() -> Result<i32, RunnerError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let env = std::env::vars_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| RunnerError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &env, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    env: &[(std::ffi::OsString, std::ffi::OsString)],
    cwd: &std::path::Path,
    runtime: &ProductionRuntime,
) -> Result<i32, RunnerError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(RunnerError::Cli(error.to_string())),
        },
    };

    if let Command::Run(run) = &cli.command {
        if run.name.is_some() && (!run.exclude.is_empty() || run.verify_determinism) {
            return Err(RunnerError::Cli(
                "--exclude and --verify-determinism only apply to run --all".to_string(),
            ));
        }
    }

    let env_map = env_to_map(env);
    let (exclude, verify_determinism) = match &cli.command {
        Command::Run(run) => (run.exclude.clone(), run.verify_determinism),
        Command::List => (Vec::new(), false),
    };
    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        timeout_ms: cli.timeout_ms,
        real_timers: cli.real_timers,
        no_capture: cli.no_capture,
        log_file: cli.log_file.clone(),
        exclude,
        verify_determinism,
    };
    let cfg = load_config(&overrides, cwd, &env_map, runtime.file_system.as_ref())?;

    if let Some(path) = &cfg.logging.path {
        let mut logger = JsonlLogger::new(path);
        logger.max_payload_bytes = cfg.logging.max_payload_bytes;
        logger.budget_bytes = cfg.logging.budget_bytes;
        install_run_log(logger);
    }
    append_run_log(
        "info",
        "cli.invoked",
        json!({
            "command": format!("{:?}", cli.command),
            "timeout_ms": cfg.runner.timeout_ms,
            "simulate_timers": cfg.runner.simulate_timers,
            "capture_console": cfg.runner.capture_console,
        }),
    );

    let terminal = runtime.terminal.as_ref();
    let runner = Runner::from_runtime(runtime);
    let options = RunOptions::from(&cfg.runner);

    match cli.command {
        Command::List => {
            for line in report::render_list(&catalog::catalog()) {
                terminal.write_line(&line)?;
            }
            Ok(0)
        }
        Command::Run(RunArgs {
            name: Some(name), ..
        }) => {
            let snippet = catalog::find(&name)?;
            let outcome = run_one(&runner, snippet, &options)?;
            if cli.json {
                terminal.write_line(&report::run_json(&outcome)?)?;
            } else {
                for line in report::render_run(&outcome, options.capture_console) {
                    terminal.write_line(&line)?;
                }
            }
            Ok(outcome.verdict.exit_code())
        }
        Command::Run(_) => {
            let batch_options = BatchOptions {
                exclude: cfg.batch.exclude.clone(),
                verify_determinism: cfg.batch.verify_determinism,
            };
            let report = run_batch(&runner, &catalog::catalog(), &options, &batch_options)?;
            if cli.json {
                terminal.write_line(&report::batch_json(&report)?)?;
            } else {
                for line in report::render_batch(&report) {
                    terminal.write_line(&line)?;
                }
            }
            Ok(report.exit_code())
        }
    }
}

pub fn render_help() -> String {
    let mut cmd = Cli::command();
    cmd.render_long_help().to_string()
}

fn env_to_map(env: &[(std::ffi::OsString, std::ffi::OsString)]) -> EnvMap {
    let mut map = EnvMap::new();
    for (key, value) in env {
        if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::{render_help, run_with_runtime, Cli, Command};
    use crate::errors::RunnerError;
    use crate::runtime::{FakeClock, FakeFileSystem, FakeTerminal, ProductionRuntime};
    use clap::Parser;
    use std::ffi::OsString;
    use std::path::Path;
    use std::sync::Arc;

    fn fake_runtime(terminal: &FakeTerminal) -> ProductionRuntime {
        ProductionRuntime {
            clock: Arc::new(FakeClock::default()),
            file_system: Arc::new(FakeFileSystem::default()),
            terminal: Arc::new(terminal.clone()),
        }
    }

    fn invoke(args: &[&str], terminal: &FakeTerminal) -> Result<i32, RunnerError> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        run_with_runtime(&args, &[], Path::new("/work"), &fake_runtime(terminal))
    }

    #[test]
    fn run_requires_a_name_or_all() {
        assert!(Cli::try_parse_from(["quirkbook", "run"]).is_err());
        assert!(Cli::try_parse_from(["quirkbook", "run", "timer_ordering", "--all"]).is_err());

        let cli = Cli::try_parse_from(["quirkbook", "--timeout-ms", "100", "run", "--all", "--exclude", "busy_wait_hang"])
            .expect("parse");
        assert_eq!(cli.timeout_ms, Some(100));
        match cli.command {
            Command::Run(run) => {
                assert!(run.all);
                assert_eq!(run.exclude, vec!["busy_wait_hang"]);
            }
            Command::List => panic!("expected run"),
        }
    }

    #[test]
    fn batch_only_flags_are_rejected_for_a_single_run() {
        let terminal = FakeTerminal::new();
        for args in [
            ["quirkbook", "run", "timer_ordering", "--exclude", "nope"].as_slice(),
            ["quirkbook", "run", "timer_ordering", "--verify-determinism"].as_slice(),
        ] {
            let err = invoke(args, &terminal).expect_err("batch-only flag");
            assert!(matches!(err, RunnerError::Cli(_)), "{err:?}");
        }
        assert!(terminal.written_lines().is_empty());
    }

    #[test]
    fn single_run_writes_its_report_to_the_terminal() {
        let terminal = FakeTerminal::new();
        let code = invoke(&["quirkbook", "run", "closure_var_loop"], &terminal).expect("run");
        assert_eq!(code, 0);
        let lines = terminal.written_lines();
        assert_eq!(lines.first().map(String::as_str), Some("== closure_var_loop [closures]"));
        assert_eq!(lines.last().map(String::as_str), Some("PASS"));
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["quirkbook", "run", "timer_ordering", "--real-timers", "--json"])
            .expect("parse");
        assert!(cli.real_timers);
        assert!(cli.json);
    }

    #[test]
    fn help_mentions_both_subcommands() {
        let help = render_help();
        assert!(help.contains("run"));
        assert!(help.contains("list"));
    }
}
