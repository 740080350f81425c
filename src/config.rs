use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream credential. Absent is allowed at startup; every proxied
    /// request is then answered with a configuration error.
    pub api_key: Option<String>,
    pub upstream_base: String,
    pub language: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            upstream_base: DEFAULT_TMDB_BASE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind = env::var("CATALOG_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .context("CATALOG_BIND must be a socket address like 0.0.0.0:3000")?;

        let api_key = env::var("TMDB_API_KEY").ok().filter(|k| !k.trim().is_empty());
        match api_key {
            Some(_) => info!("TMDB_API_KEY is set"),
            None => warn!("TMDB_API_KEY is not set - catalog requests will fail until it is"),
        }

        let upstream_base = env::var("TMDB_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string());

        let timeout = match env::var("TMDB_TIMEOUT_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .map(Duration::from_secs)
                .context("TMDB_TIMEOUT_SECS must be an integer")?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            bind,
            gateway: GatewayConfig {
                api_key,
                upstream_base: upstream_base.trim_end_matches('/').to_string(),
                language: DEFAULT_LANGUAGE.to_string(),
                timeout,
            },
        })
    }
}
