use serde::Deserialize;
use vigil_common::Duration;

/// `stats` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Carbon endpoint, `tcp://host:port`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Prepended to every sample name; `{host}` is replaced by the local
    /// hostname with dots dashed.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_interval")]
    pub interval: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            enabled: default_enabled(),
            url: default_url(),
            prefix: default_prefix(),
            interval: default_interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "tcp://127.0.0.1:2003".to_string()
}

fn default_prefix() -> String {
    "vigil.{host}.".to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

impl StatsConfig {
    pub fn resolved_prefix(&self) -> String {
        let host = sysinfo::System::host_name()
            .unwrap_or_else(|| "unknown".to_string())
            .replace('.', "-");
        self.prefix.replace("{host}", &host)
    }
}
