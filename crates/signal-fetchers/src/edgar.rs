use async_trait::async_trait;
use esg_core::{CompanyIdentity, DisclosureProvider, EsgError};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::rate_limit::RateLimiter;
use crate::{build_http_client, decode_json, send_checked};

const PROVIDER: &str = "SEC EDGAR";
const DATA_BASE_URL: &str = "https://data.sec.gov";
const WWW_BASE_URL: &str = "https://www.sec.gov";
const DEFAULT_USER_AGENT: &str = "ESG-Platform contact@example.com";

/// SEC EDGAR company facts and ticker lookup
#[derive(Clone)]
pub struct EdgarClient {
    data_base_url: String,
    www_base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    /// Upper-cased ticker -> identity, loaded once per client
    tickers: Arc<OnceCell<HashMap<String, CompanyIdentity>>>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
    title: String,
}

impl EdgarClient {
    /// SEC rejects requests without a descriptive User-Agent.
    pub fn new(user_agent: Option<&str>, timeout: Duration) -> Self {
        let agent = user_agent
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(DEFAULT_USER_AGENT);
        Self {
            data_base_url: DATA_BASE_URL.to_string(),
            www_base_url: WWW_BASE_URL.to_string(),
            client: build_http_client(timeout, Some(agent)),
            rate_limiter: RateLimiter::new(10, Duration::from_secs(1)),
            tickers: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_base_urls(mut self, data_base_url: impl Into<String>, www_base_url: impl Into<String>) -> Self {
        self.data_base_url = data_base_url.into().trim_end_matches('/').to_string();
        self.www_base_url = www_base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pad a CIK to the 10 digits EDGAR paths expect. Accepts an optional `CIK` prefix.
    pub fn normalize_cik(cik: &str) -> Result<String, EsgError> {
        let trimmed = cik.trim();
        let digits = trimmed
            .strip_prefix("CIK")
            .or_else(|| trimmed.strip_prefix("cik"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(EsgError::MalformedSignal(format!("invalid CIK '{}'", cik)));
        }
        Ok(format!("{:0>10}", digits))
    }

    /// Get the XBRL company-facts document for a CIK
    pub async fn get_company_facts(&self, cik: &str) -> Result<serde_json::Value, EsgError> {
        let cik = Self::normalize_cik(cik)?;
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", self.data_base_url, cik);
        tracing::debug!("Fetching EDGAR company facts for CIK{}", cik);

        self.rate_limiter.acquire().await;
        let response = send_checked(PROVIDER, self.client.get(&url)).await?;
        decode_json(PROVIDER, response).await
    }

    /// Resolve a ticker to its CIK and registrant name via the SEC ticker file.
    ///
    /// The ticker file is downloaded on first use and kept for the life of the client.
    /// A failed download is not cached.
    pub async fn lookup_ticker(&self, ticker: &str) -> Result<CompanyIdentity, EsgError> {
        let tickers = self
            .tickers
            .get_or_try_init(|| self.load_tickers())
            .await?;

        tickers
            .get(&ticker.trim().to_uppercase())
            .cloned()
            .ok_or_else(|| EsgError::fetch(PROVIDER, format!("ticker {} not found", ticker)))
    }

    async fn load_tickers(&self) -> Result<HashMap<String, CompanyIdentity>, EsgError> {
        let url = format!("{}/files/company_tickers.json", self.www_base_url);
        tracing::info!("Loading SEC ticker file");

        self.rate_limiter.acquire().await;
        let response = send_checked(PROVIDER, self.client.get(&url)).await?;
        let entries: HashMap<String, TickerEntry> = decode_json(PROVIDER, response).await?;

        Ok(entries
            .into_values()
            .map(|e| {
                let ticker = e.ticker.to_uppercase();
                let identity = CompanyIdentity {
                    ticker: ticker.clone(),
                    cik: format!("{:0>10}", e.cik_str),
                    title: e.title,
                };
                (ticker, identity)
            })
            .collect())
    }
}

#[async_trait]
impl DisclosureProvider for EdgarClient {
    async fn fetch_disclosures(&self, cik: &str) -> Result<serde_json::Value, EsgError> {
        self.get_company_facts(cik).await
    }

    async fn resolve_company(&self, ticker: &str) -> Result<CompanyIdentity, EsgError> {
        self.lookup_ticker(ticker).await
    }
}
