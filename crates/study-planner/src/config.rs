// study-planner/crates/study-planner/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use crate::planner_db::UserContext;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub database_path: PathBuf,
    pub db_pool_size: u32,
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
    pub default_user_id: String,
    pub default_user_name: String,
    pub default_user_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to the
    /// defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        Ok(Self {
            api_host: text("API_HOST", "127.0.0.1"),
            api_port: parse_var(&lookup, "API_PORT", "8000")?,
            database_path: PathBuf::from(text("DATABASE_PATH", "./data/planner.db")),
            db_pool_size: parse_var(&lookup, "DB_POOL_SIZE", "10")?,
            request_timeout_seconds: parse_var(&lookup, "REQUEST_TIMEOUT_SECONDS", "30")?,
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", "1048576")?,
            default_user_id: text("DEFAULT_USER_ID", "default-user"),
            default_user_name: text("DEFAULT_USER_NAME", "Study User"),
            default_user_email: text("DEFAULT_USER_EMAIL", "user@example.com"),
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Database: {}", self.database_path.display());
        info!("- Pool Size: {}", self.db_pool_size);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- Max Body: {} bytes", self.max_body_bytes);
        info!("- User: {} <{}>", self.default_user_id, self.default_user_email);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }

    /// Identity every request acts as
    pub fn user_context(&self) -> UserContext {
        UserContext::new(
            self.default_user_id.clone(),
            self.default_user_name.clone(),
            self.default_user_email.clone(),
        )
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key).unwrap_or_else(|| default.into());
    raw.trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
}
