use async_trait::async_trait;
use esg_core::{EsgError, FinancialEsgProvider, FinancialEsgScores};
use reqwest::Client;
use std::time::Duration;

use crate::{build_http_client, decode_json, send_checked};

const PROVIDER: &str = "Finnhub";
const BASE_URL: &str = "https://finnhub.io";

/// Finnhub company ESG score endpoint
#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl FinnhubClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client: build_http_client(timeout, None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get per-pillar ESG scores for a symbol
    pub async fn get_esg_scores(&self, symbol: &str) -> Result<FinancialEsgScores, EsgError> {
        let url = format!("{}/api/v1/stock/esg", self.base_url);
        tracing::debug!("Fetching Finnhub ESG scores for {}", symbol);

        let response = send_checked(
            PROVIDER,
            self.client
                .get(&url)
                .query(&[("symbol", symbol), ("token", self.api_key.as_str())]),
        )
        .await?;

        let scores: FinancialEsgScores = decode_json(PROVIDER, response).await?;
        if !scores.has_any() {
            tracing::debug!("Finnhub returned no pillar scores for {}", symbol);
        }
        Ok(scores)
    }
}

#[async_trait]
impl FinancialEsgProvider for FinnhubClient {
    async fn fetch_financial_esg(&self, symbol: &str) -> Result<FinancialEsgScores, EsgError> {
        self.get_esg_scores(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn client_for(server: &MockServer) -> FinnhubClient {
        FinnhubClient::new("test-key".to_string(), Duration::from_secs(5)).with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_get_esg_scores() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/stock/esg")
                    .query_param("symbol", "AAPL")
                    .query_param("token", "test-key");
                then.status(200).json_body(json!({
                    "symbol": "AAPL",
                    "environmentScore": 64.5,
                    "socialScore": 71.0,
                    "governanceScore": 80.2,
                    "totalESGScore": 72.1
                }));
            })
            .await;

        let scores = client_for(&server).get_esg_scores("AAPL").await.unwrap();
        mock.assert_async().await;
        assert_eq!(scores.environment_score, Some(64.5));
        assert_eq!(scores.social_score, Some(71.0));
        assert_eq!(scores.governance_score, Some(80.2));
        assert_eq!(scores.total_score, Some(72.1));
    }

    #[tokio::test]
    async fn test_non_2xx_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/stock/esg");
                then.status(401).body("invalid token");
            })
            .await;

        let err = client_for(&server).get_esg_scores("AAPL").await.unwrap_err();
        match err {
            EsgError::FetchError { provider, message } => {
                assert_eq!(provider, "Finnhub");
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_body_yields_no_scores() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/stock/esg");
                then.status(200).json_body(json!({}));
            })
            .await;

        let scores = client_for(&server).fetch_financial_esg("ZZZZ").await.unwrap();
        assert!(!scores.has_any());
    }

    #[tokio::test]
    async fn test_transport_error_omits_token() {
        let client = FinnhubClient::new("SECRET-TOKEN-123".to_string(), Duration::from_secs(2))
            .with_base_url("http://127.0.0.1:9");

        let err = client.get_esg_scores("AAPL").await.unwrap_err();
        let text = err.to_string();
        assert!(matches!(err, EsgError::FetchError { .. }));
        assert!(!text.contains("SECRET-TOKEN-123"), "token leaked: {}", text);
    }

    #[tokio::test]
    async fn test_decode_error_omits_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/stock/esg");
                then.status(200).body("not json");
            })
            .await;

        let client = FinnhubClient::new("SECRET-TOKEN-123".to_string(), Duration::from_secs(5))
            .with_base_url(server.base_url());
        let text = client.get_esg_scores("AAPL").await.unwrap_err().to_string();
        assert!(text.contains("invalid JSON body"));
        assert!(!text.contains("SECRET-TOKEN-123"), "token leaked: {}", text);
    }
}
