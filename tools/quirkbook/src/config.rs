use crate::errors::RunnerError;
use crate::logging::{DEFAULT_DISK_BUDGET_BYTES, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type EnvMap = BTreeMap<String, String>;

pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
pub const TIMEOUT_ENV_VAR: &str = "TIMEOUT_MS";
/// Read from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "quirkbook.toml";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub real_timers: bool,
    pub no_capture: bool,
    pub log_file: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub verify_determinism: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub runner: RunnerConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    pub timeout_ms: u64,
    pub capture_console: bool,
    pub simulate_timers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchConfig {
    pub exclude: Vec<String>,
    pub verify_determinism: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig {
                timeout_ms: DEFAULT_TIMEOUT_MS,
                capture_console: true,
                simulate_timers: true,
            },
            batch: BatchConfig::default(),
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
                budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    runner: Option<PartialRunnerConfig>,
    batch: Option<PartialBatchConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialRunnerConfig {
    timeout_ms: Option<u64>,
    capture_console: Option<bool>,
    simulate_timers: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialBatchConfig {
    exclude: Option<Vec<String>>,
    verify_determinism: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

/// Defaults, then the TOML file, then `TIMEOUT_MS`, then CLI flags.
pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    env: &EnvMap,
    fs: &dyn FileSystem,
) -> Result<AppConfig, RunnerError> {
    let mut cfg = AppConfig::default();

    let config_path = match &overrides.config_path {
        Some(path) => Some(absolutize_path(process_cwd, path)),
        None => {
            let implicit = process_cwd.join(DEFAULT_CONFIG_FILE);
            fs.exists(&implicit).then_some(implicit)
        }
    };
    if let Some(path) = config_path {
        let file_contents = fs.read_to_string(&path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| RunnerError::ConfigParse(format!("{}: {e}", path.display())))?;
        merge_partial_config(&mut cfg, partial);
        if let Some(log_path) = cfg.logging.path.take() {
            let base = path.parent().unwrap_or(process_cwd);
            cfg.logging.path = Some(absolutize_path(base, &log_path));
        }
    }

    apply_env_overrides(&mut cfg, env)?;
    apply_cli_overrides(&mut cfg, overrides, process_cwd);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(runner) = partial.runner {
        if let Some(timeout_ms) = runner.timeout_ms {
            cfg.runner.timeout_ms = timeout_ms;
        }
        if let Some(capture_console) = runner.capture_console {
            cfg.runner.capture_console = capture_console;
        }
        if let Some(simulate_timers) = runner.simulate_timers {
            cfg.runner.simulate_timers = simulate_timers;
        }
    }

    if let Some(batch) = partial.batch {
        if let Some(exclude) = batch.exclude {
            cfg.batch.exclude = exclude;
        }
        if let Some(verify_determinism) = batch.verify_determinism {
            cfg.batch.verify_determinism = verify_determinism;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(max_payload_bytes) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = max_payload_bytes;
        }
        if let Some(budget_bytes) = logging.budget_bytes {
            cfg.logging.budget_bytes = budget_bytes;
        }
    }
}

fn apply_env_overrides(cfg: &mut AppConfig, env: &EnvMap) -> Result<(), RunnerError> {
    let Some(raw) = env.get(TIMEOUT_ENV_VAR) else {
        return Ok(());
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }
    cfg.runner.timeout_ms = raw.parse().map_err(|_| {
        RunnerError::InvalidConfig(format!(
            "{TIMEOUT_ENV_VAR} must be a whole number of milliseconds, got {raw:?}"
        ))
    })?;
    Ok(())
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides, process_cwd: &Path) {
    if let Some(timeout_ms) = overrides.timeout_ms {
        cfg.runner.timeout_ms = timeout_ms;
    }
    if overrides.real_timers {
        cfg.runner.simulate_timers = false;
    }
    if overrides.no_capture {
        cfg.runner.capture_console = false;
    }
    if let Some(log_file) = &overrides.log_file {
        cfg.logging.path = Some(absolutize_path(process_cwd, log_file));
    }
    for name in &overrides.exclude {
        if !cfg.batch.exclude.contains(name) {
            cfg.batch.exclude.push(name.clone());
        }
    }
    if overrides.verify_determinism {
        cfg.batch.verify_determinism = true;
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), RunnerError> {
    if cfg.runner.timeout_ms == 0 {
        return Err(RunnerError::InvalidConfig(
            "runner.timeout_ms must be greater than zero".to_string(),
        ));
    }
    if cfg.logging.max_payload_bytes == 0 {
        return Err(RunnerError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }
    if cfg
        .batch
        .exclude
        .iter()
        .any(|name| name.trim().is_empty())
    {
        return Err(RunnerError::InvalidConfig(
            "batch.exclude entries must be snippet names".to_string(),
        ));
    }
    Ok(())
}
