use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use vigil_executor::ExecutorConfig;
use vigil_scheduler::SchedulerConfig;
use vigil_stats::StatsConfig;

/// The whole YAML config file. Both services read the same file; `mode`
/// decides which one this process becomes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// `scheduler` | `executor`; may be omitted when the invocation name
    /// ends in one of them.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `stdout`, `stderr` or file paths; logs go to all of them.
    #[serde(default = "default_output_paths")]
    pub output_paths: Vec<String>,
    /// debug | info | warning | error
    #[serde(default = "default_level")]
    pub level: String,
    /// console | json
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            output_paths: default_output_paths(),
            level: default_level(),
            encoding: default_encoding(),
        }
    }
}

fn default_output_paths() -> Vec<String> {
    vec!["stdout".to_string()]
}

fn default_level() -> String {
    "info".to_string()
}

fn default_encoding() -> String {
    "console".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file '{}'", path.display()))?;
        Ok(config)
    }
}
