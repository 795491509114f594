pub mod api;
pub mod client;
pub mod config;
pub mod core_state;
pub mod db;
pub mod format;
pub mod models;
pub mod telemetry;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Failed to open store: {0}")]
    Store(#[from] core_state::CoreError),
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Server(String),
}

/// Start the API server and block until Ctrl-C or SIGTERM.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = config::Config::load()?;
    tracing::info!(
        environment = %config.environment,
        "{} starting v{}",
        config::APP_NAME,
        config::APP_VERSION
    );
    tracing::info!(uri = %config.store.redacted_uri(), "Connecting to store");

    let core = match core_state::CoreState::open(&config.store.database_path()) {
        Ok(core) => Arc::new(core),
        Err(e) => {
            tracing::error!("Store connection error: {e}");
            return Err(e.into());
        }
    };

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            port: config.port,
            source,
        })?;
    tracing::info!(
        %addr,
        trace = config.trace_requests,
        "Server is running on port {}",
        config.port
    );

    api::server::serve(
        listener,
        core,
        config.trace_requests,
        api::shutdown_signal(),
    )
    .await
    .map_err(StartupError::Server)?;

    tracing::info!("Server stopped");
    Ok(())
}
