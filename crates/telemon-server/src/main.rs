use anyhow::{Context, Result};
use ipnet::IpNet;
use std::net::SocketAddr;
use std::sync::Arc;
use telemon_common::proto::metrics_service_server::MetricsServiceServer;
use telemon_payload::RsaProcessor;
use telemon_server::config::ServerConfig;
use telemon_server::state::AppState;
use telemon_server::{app, grpc};
use telemon_storage::memory::MemoryStore;
use telemon_storage::sqlite::SqliteStore;
use telemon_storage::MetricStore;
use tokio::signal;
use tokio::time::{interval, timeout, Duration};
use tonic::transport::Server as TonicServer;
use tracing_subscriber::EnvFilter;

fn build_store(config: &ServerConfig) -> Result<Arc<dyn MetricStore>> {
    if let Some(path) = &config.database_path {
        let store = SqliteStore::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        tracing::info!(path = %path.display(), "using SQLite storage");
        return Ok(Arc::new(store));
    }
    match &config.snapshot.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using in-memory storage with snapshots");
            Ok(Arc::new(MemoryStore::with_snapshot(path)))
        }
        None => {
            tracing::info!("using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("telemon={}", config.log_level).parse()?),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        http = %config.http_address,
        grpc = %config.grpc_address,
        "telemon-server starting"
    );

    let store = build_store(&config)?;
    if config.snapshot.restore {
        store.load().context("restoring snapshot")?;
    }

    // Key material problems surface here, not per request.
    let crypto = match &config.private_key_path {
        Some(path) => Some(Arc::new(
            RsaProcessor::from_private_key_file(path)
                .with_context(|| format!("loading private key from {}", path.display()))?,
        )),
        None => None,
    };
    let trusted_subnet: Option<IpNet> = match &config.trusted_subnet {
        Some(raw) => Some(
            raw.parse()
                .with_context(|| format!("parsing trusted_subnet '{raw}'"))?,
        ),
        None => None,
    };

    let state = AppState::new(store.clone(), config.hash_key.clone(), crypto);

    // Periodic snapshot task; a no-op for the SQLite backend.
    let snapshot_handle = if config.snapshot.interval_secs > 0 {
        let store = store.clone();
        let mut tick = interval(Duration::from_secs(config.snapshot.interval_secs));
        Some(tokio::spawn(async move {
            loop {
                tick.tick().await;
                if let Err(e) = store.save() {
                    tracing::error!(error = %e, "periodic snapshot failed");
                }
            }
        }))
    } else {
        None
    };

    let (shutdown_tx, _) = tokio::sync::watch::channel(false);

    let http_addr: SocketAddr = config.http_address.parse()?;
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let mut http_rx = shutdown_tx.subscribe();
    let http_app = app::build_http_app(state.clone());
    let http_handle = tokio::spawn(async move {
        axum::serve(
            http_listener,
            http_app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            http_rx.changed().await.ok();
        })
        .await
    });

    let grpc_addr: SocketAddr = config.grpc_address.parse()?;
    let grpc_service =
        MetricsServiceServer::new(grpc::MetricsServiceImpl::new(state, trusted_subnet));
    let mut grpc_rx = shutdown_tx.subscribe();
    let grpc_handle = tokio::spawn(async move {
        TonicServer::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, async move {
                grpc_rx.changed().await.ok();
            })
            .await
    });

    tracing::info!(http = %http_addr, grpc = %grpc_addr, "server started");

    signal::ctrl_c().await?;
    tracing::info!("shutting down gracefully");
    shutdown_tx.send(true).ok();

    let grace = Duration::from_secs(config.shutdown_grace_secs);
    let drained = timeout(grace, async {
        let http = http_handle.await;
        let grpc = grpc_handle.await;
        (http, grpc)
    })
    .await;

    match drained {
        Ok((http, grpc)) => {
            if let Ok(Err(e)) = http {
                tracing::error!(error = %e, "HTTP server error");
            }
            if let Ok(Err(e)) = grpc {
                tracing::error!(error = %e, "gRPC server error");
            }
        }
        Err(_) => {
            tracing::error!(grace_secs = config.shutdown_grace_secs, "listeners did not stop in time");
            anyhow::bail!("shutdown grace period expired");
        }
    }

    if let Some(handle) = snapshot_handle {
        handle.abort();
    }
    store.save().context("final snapshot")?;
    tracing::info!("server stopped");
    Ok(())
}
