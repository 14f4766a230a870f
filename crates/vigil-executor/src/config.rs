use serde::Deserialize;

/// `executor` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_broker_lookup_addr")]
    pub broker_lookup_addr: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Consumer channel shared by every worker of this executor; a second
    /// executor with its own channel sees the full task stream again.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub emit: EmitConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            num_workers: default_num_workers(),
            broker_lookup_addr: default_broker_lookup_addr(),
            topic: default_topic(),
            channel: default_channel(),
            emit: EmitConfig::default(),
        }
    }
}

/// Where surviving events go.
#[derive(Debug, Clone, Deserialize)]
pub struct EmitConfig {
    /// `file` | `topic` | `queue`.
    #[serde(rename = "type", default = "default_emit_type")]
    pub kind: String,
    #[serde(default)]
    pub filter_mode: u8,

    // file sink
    #[serde(default = "default_filename")]
    pub filename: String,

    // topic and queue sinks
    #[serde(default = "default_broker_lookup_addr")]
    pub broker_publish_addr: String,
    #[serde(default = "default_emit_topic")]
    pub topic: String,
    #[serde(default = "default_emit_queue")]
    pub queue: String,
}

impl Default for EmitConfig {
    fn default() -> Self {
        EmitConfig {
            kind: default_emit_type(),
            filter_mode: 0,
            filename: default_filename(),
            broker_publish_addr: default_broker_lookup_addr(),
            topic: default_emit_topic(),
            queue: default_emit_queue(),
        }
    }
}

fn default_num_workers() -> usize {
    1
}

fn default_broker_lookup_addr() -> String {
    "127.0.0.1:4222".to_string()
}

fn default_topic() -> String {
    "vigil_tasks".to_string()
}

fn default_channel() -> String {
    "vigil_task_executor".to_string()
}

fn default_emit_type() -> String {
    "file".to_string()
}

fn default_filename() -> String {
    "/dev/stdout".to_string()
}

fn default_emit_topic() -> String {
    "vigil_events".to_string()
}

fn default_emit_queue() -> String {
    "vigil_events".to_string()
}
