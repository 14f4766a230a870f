use serde::Deserialize;

/// `scheduler` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// SQLite database file holding the rule collection.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_db_collection")]
    pub db_collection: String,
    #[serde(default = "default_broker_publish_addr")]
    pub broker_publish_addr: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            listen_address: default_listen_address(),
            db_path: default_db_path(),
            db_collection: default_db_collection(),
            broker_publish_addr: default_broker_publish_addr(),
            topic: default_topic(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_path() -> String {
    "./var/rules.db".to_string()
}

fn default_db_collection() -> String {
    "rules".to_string()
}

fn default_broker_publish_addr() -> String {
    "127.0.0.1:4222".to_string()
}

fn default_topic() -> String {
    "vigil_tasks".to_string()
}
