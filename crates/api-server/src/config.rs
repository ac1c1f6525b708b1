use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server settings read from the environment (after `.env` is loaded)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Providers
    pub finnhub_api_key: Option<String>, // Finnhub skipped when unset
    pub finnhub_base_url: Option<String>,
    pub sec_data_base_url: Option<String>,
    pub sec_www_base_url: Option<String>,
    pub sec_user_agent: Option<String>,
    pub epa_base_url: Option<String>,
    pub fetch_timeout: Duration, // 10s

    // Scoring
    pub forecast_file: Option<PathBuf>,
    pub default_framework: String, // GRI

    // HTTP
    pub bind_addr: SocketAddr,     // 0.0.0.0:3000
    pub cors_origins: Vec<String>, // empty = any origin
    pub json_logging: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let fetch_timeout_secs: u64 = var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("FETCH_TIMEOUT_SECS must be a whole number of seconds")?;

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let default_framework = var("DEFAULT_FRAMEWORK").unwrap_or_else(|| "GRI".to_string());
        if esg_core::framework_by_name(&default_framework).is_none() {
            anyhow::bail!("DEFAULT_FRAMEWORK '{}' is not a built-in framework", default_framework);
        }

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            finnhub_api_key: var("FINNHUB_API_KEY"),
            finnhub_base_url: var("FINNHUB_BASE_URL"),
            sec_data_base_url: var("SEC_DATA_BASE_URL"),
            sec_www_base_url: var("SEC_WWW_BASE_URL"),
            sec_user_agent: var("SEC_USER_AGENT"),
            epa_base_url: var("EPA_BASE_URL"),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            forecast_file: var("ESG_FORECAST_FILE").map(PathBuf::from),
            default_framework,
            bind_addr,
            cors_origins,
            json_logging: var("RUST_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}
