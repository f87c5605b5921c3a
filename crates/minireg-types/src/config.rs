/// Configuration types for the minireg registration service.
///
/// Parsed from `minireg.yaml` by the loader in [`crate::config_loader`],
/// with environment overrides for deployment secrets.
use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiniregConfig {
    /// HTTP adapter settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Telegram identity bridge settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// HTTP adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP adapter binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Record store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// PostgreSQL connection URL. Usually supplied via the
    /// `MINIREG_DATABASE_URL` environment override rather than the file.
    #[serde(default)]
    pub database_url: String,
    /// Maximum connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound on a single lookup query, in seconds. Elapse is treated
    /// as store unavailability, never as "not found".
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Telegram identity bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token used to verify Mini App init data signatures. Usually
    /// supplied via the `MINIREG_BOT_TOKEN` environment override. When
    /// absent, every identity resolution yields `None` (with a warning)
    /// and linkage is skipped.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Maximum accepted age of the init data `auth_date`, in seconds.
    #[serde(default = "default_auth_max_age_secs")]
    pub auth_max_age_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            auth_max_age_secs: default_auth_max_age_secs(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

fn default_auth_max_age_secs() -> u64 {
    86_400
}
