use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_address")]
    pub http_address: String,
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// SQLite database path; when set, the relational backend replaces the
    /// in-memory store and snapshotting is skipped.
    pub database_path: Option<PathBuf>,
    /// Shared secret for HMAC-SHA256 request verification.
    pub hash_key: Option<String>,
    /// PEM private key for RSA payload decryption.
    pub private_key_path: Option<PathBuf>,
    /// CIDR that gRPC callers must originate from, e.g. "10.0.0.0/8".
    pub trusted_subnet: Option<String>,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot file; `None` disables snapshotting entirely.
    pub path: Option<PathBuf>,
    /// Seconds between periodic saves; 0 disables the periodic task.
    #[serde(default = "default_snapshot_interval")]
    pub interval_secs: u64,
    /// Restore from the snapshot at startup.
    #[serde(default = "default_restore")]
    pub restore: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: None,
            interval_secs: default_snapshot_interval(),
            restore: default_restore(),
        }
    }
}

fn default_http_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_grpc_address() -> String {
    "0.0.0.0:3200".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_snapshot_interval() -> u64 {
    300
}

fn default_restore() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_address, "0.0.0.0:8080");
        assert_eq!(config.grpc_address, "0.0.0.0:3200");
        assert_eq!(config.shutdown_grace_secs, 30);
        assert!(config.snapshot.path.is_none());
        assert_eq!(config.snapshot.interval_secs, 300);
        assert!(config.snapshot.restore);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn snapshot_section_parses() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_address = "127.0.0.1:9000"

            [snapshot]
            path = "/tmp/metrics.json"
            interval_secs = 0
            restore = false
            "#,
        )
        .unwrap();
        assert_eq!(config.http_address, "127.0.0.1:9000");
        assert_eq!(
            config.snapshot.path.as_deref(),
            Some(std::path::Path::new("/tmp/metrics.json"))
        );
        assert_eq!(config.snapshot.interval_secs, 0);
        assert!(!config.snapshot.restore);
    }
}
