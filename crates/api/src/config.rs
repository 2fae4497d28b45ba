//! Process configuration, loaded from the environment at startup (§6, §11).
//!
//! Matches the teacher's direct `std::env::var` style: no config-file
//! framework. Missing `DATABASE_URL`/`REDIS_URL` is not fatal — callers
//! fall back to in-memory/no-op backends (§12 dual-mode backends).

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub debug: bool,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub redis_url: Option<String>,
    pub api_key: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "strym".to_string()),
            debug: parse_bool(env::var("DEBUG").ok()),
            database_url: env::var("DATABASE_URL").ok(),
            database_pool_size: env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            redis_url: env::var("REDIS_URL").ok(),
            api_key: env::var("API_KEY").unwrap_or_else(|_| {
                tracing::warn!("API_KEY not set; using insecure dev default");
                "strym-dev-key-change-in-production".to_string()
            }),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

fn parse_bool(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(|v| v.to_ascii_lowercase()),
        Some(ref v) if v == "1" || v == "true" || v == "yes"
    )
}
