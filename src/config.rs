use serde::Deserialize;
use std::{env, fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Postgres connection string. Env override: `DATABASE_URL`.
    pub uri: String,
    pub max_connections: u32,
    pub connect_max_attempts: u32,
    pub connect_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: "postgres://localhost:5432/balance".to_string(),
            max_connections: 4,
            connect_max_attempts: 5,
            connect_backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address for the query API. Env override: `BIND_ADDR`.
    pub bind_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apidatos.ree.es/en/datos".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub window_hours: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub upstream: UpstreamConfig,
    pub refresh: RefreshConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Reads the TOML file at `$BALANCE_CONFIG` (default
    /// `balance-config.toml`). A missing file is not an error: the defaults
    /// above apply. `DATABASE_URL` and `BIND_ADDR` env vars override the file.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var("BALANCE_CONFIG").unwrap_or_else(|_| "balance-config.toml".to_string());

        let mut cfg: AppConfig = if Path::new(&path).exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            AppConfig::default()
        };

        if let Ok(uri) = env::var("DATABASE_URL") {
            cfg.storage.uri = uri;
        }
        if let Ok(addr) = env::var("BIND_ADDR") {
            cfg.api.bind_addr = addr;
        }

        Ok(cfg)
    }
}
