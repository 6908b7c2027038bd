use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Number of concurrent report workers.
    #[serde(default = "default_report_workers")]
    pub report_workers: usize,
    /// Shared secret for HMAC-SHA256 request signing.
    pub hash_key: Option<String>,
    /// PEM public key for RSA payload encryption.
    pub public_key_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_server_address() -> String {
    "localhost:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_report_workers() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Build the server base URL from server_address, defaulting the scheme.
    pub fn server_url(&self) -> String {
        let addr = self.server_address.trim();
        if addr.contains("://") {
            return addr.to_string();
        }
        format!("http://{addr}")
    }
}
