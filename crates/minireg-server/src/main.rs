//! minireg-server — registration lookup service binary.
//!
//! Bootstrap order:
//! 1. Install the tracing subscriber
//! 2. Load and validate configuration (file + environment overrides)
//! 3. Connect the record store and run migrations
//! 4. Build the Telegram identity bridge
//! 5. Serve the HTTP adapter until shutdown

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use minireg_server::{router, AppState};
use minireg_store::PgRegistrationStore;
use minireg_telegram::TelegramIdentityBridge;
use minireg_types::config::MiniregConfig;
use minireg_types::config_loader;

/// Environment variable naming the config file path.
const ENV_CONFIG_PATH: &str = "MINIREG_CONFIG";

/// Config file looked for when `MINIREG_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "minireg.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let bind_addr = config.server.bind_addr.clone();

    let store = PgRegistrationStore::connect(
        &config.store.database_url,
        config.store.max_connections,
    )
    .await?;
    info!("record store connected");

    let bridge = TelegramIdentityBridge::new(&config.telegram);
    let state = AppState::new(
        Arc::new(store),
        Arc::new(bridge),
        Duration::from_secs(config.store.lookup_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "minireg-server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolve configuration: explicit path, default file, or environment only.
fn load_config() -> Result<MiniregConfig, Box<dyn std::error::Error>> {
    let config = match env::var(ENV_CONFIG_PATH) {
        Ok(path) => config_loader::load(&PathBuf::from(path))?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            config_loader::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        Err(_) => config_loader::load_from_env()?,
    };
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
    }
    info!("shutdown signal received");
}
