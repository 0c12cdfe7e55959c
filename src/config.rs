// config.rs
// Process settings, read from the environment (after `.env` is loaded).

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};

use crate::models::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Mongo,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            other => bail!("unknown STORE_BACKEND {other:?}, expected memory or mongo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub seed_dir: Option<PathBuf>,
    /// Author recorded on activities created by the API itself.
    pub audit_user_id: Id,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store_backend: StoreBackend::Memory,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "echeancier".to_string(),
            seed_dir: None,
            audit_user_id: 1,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid BIND_ADDR {raw:?}"))?,
            None => defaults.bind_addr,
        };
        let store_backend = match var("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.store_backend,
        };
        let audit_user_id = match var("AUDIT_USER_ID") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid AUDIT_USER_ID {raw:?}"))?,
            None => defaults.audit_user_id,
        };
        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Settings {
            bind_addr,
            store_backend,
            mongodb_uri: var("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            mongodb_db: var("MONGODB_DB").unwrap_or(defaults.mongodb_db),
            seed_dir: var("SEED_DIR").map(PathBuf::from),
            audit_user_id,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
        })
    }
}
