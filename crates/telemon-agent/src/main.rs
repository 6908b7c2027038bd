mod config;
mod pool;
mod reporter;
mod sampler;
mod scheduler;

use anyhow::{Context, Result};
use sampler::SystemSampler;
use scheduler::Agent;
use std::sync::Arc;
use telemon_payload::{PayloadCodec, RsaProcessor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = config::AgentConfig::load(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("telemon={}", config.log_level).parse()?),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server_url(),
        "telemon-agent starting"
    );

    // Key material problems surface here, not per request.
    let crypto = match &config.public_key_path {
        Some(path) => Some(Arc::new(
            RsaProcessor::from_public_key_file(path)
                .with_context(|| format!("loading public key from {}", path.display()))?,
        )),
        None => None,
    };
    let codec = PayloadCodec::new(config.hash_key.clone(), crypto);
    let reporter = reporter::Reporter::new(&config.server_url(), codec);

    Agent::new(config, Box::new(SystemSampler::new()), reporter)
        .run()
        .await
}
