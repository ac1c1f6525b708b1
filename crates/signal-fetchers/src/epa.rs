use async_trait::async_trait;
use esg_core::{EmissionsProvider, EsgError, FacilityEmission};
use reqwest::{Client, Url};
use std::time::Duration;

use crate::{build_http_client, decode_json, send_checked};

const PROVIDER: &str = "EPA Envirofacts";
const BASE_URL: &str = "https://data.epa.gov";

/// EPA Envirofacts Toxics Release Inventory facility lookup
#[derive(Clone)]
pub struct EpaClient {
    base_url: String,
    client: Client,
}

impl EpaClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            client: build_http_client(timeout, None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn facility_url(&self, company: &str) -> Result<Url, EsgError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| EsgError::fetch(PROVIDER, format!("bad base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| EsgError::fetch(PROVIDER, format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend([
                "efservice",
                "tri_facility",
                "parent_co_name",
                "CONTAINING",
                company.trim(),
                "JSON",
            ]);
        Ok(url)
    }

    /// Get facility release rows for a parent company name (or ticker).
    /// Rows are returned as-is; numeric validation happens during inference.
    pub async fn get_facilities(&self, company: &str) -> Result<Vec<FacilityEmission>, EsgError> {
        if company.trim().is_empty() {
            return Err(EsgError::fetch(PROVIDER, "empty company name"));
        }
        let url = self.facility_url(company)?;
        tracing::debug!("Fetching EPA facility emissions for {}", company);

        let response = send_checked(PROVIDER, self.client.get(url)).await?;
        let facilities: Vec<FacilityEmission> = decode_json(PROVIDER, response).await?;
        tracing::debug!("EPA returned {} facility rows for {}", facilities.len(), company);
        Ok(facilities)
    }
}

#[async_trait]
impl EmissionsProvider for EpaClient {
    async fn fetch_facility_emissions(&self, company: &str) -> Result<Vec<FacilityEmission>, EsgError> {
        self.get_facilities(company).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn client_for(server: &MockServer) -> EpaClient {
        EpaClient::new(Duration::from_secs(5)).with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_get_facilities_keeps_malformed_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/efservice/tri_facility/parent_co_name/CONTAINING/ACME/JSON");
                then.status(200).json_body(json!([
                    {"facilityName": "ACME North", "totalReleases": "12000"},
                    {"facilityName": "ACME South", "totalReleases": "8000.5"},
                    {"facilityName": "ACME Lab", "totalReleases": "redacted"}
                ]));
            })
            .await;

        let rows = client_for(&server).fetch_facility_emissions("ACME").await.unwrap();
        mock.assert_async().await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.releases().is_ok()).count(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(503);
            })
            .await;

        let err = client_for(&server).get_facilities("ACME").await.unwrap_err();
        assert!(matches!(err, EsgError::FetchError { .. }));
    }

    #[tokio::test]
    async fn test_empty_company_rejected_without_request() {
        let client = EpaClient::new(Duration::from_secs(1)).with_base_url("http://127.0.0.1:9");
        assert!(client.get_facilities("  ").await.is_err());
    }

    #[test]
    fn test_facility_url_encodes_company() {
        let client = EpaClient::new(Duration::from_secs(1));
        let url = client.facility_url("Apple Inc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://data.epa.gov/efservice/tri_facility/parent_co_name/CONTAINING/Apple%20Inc/JSON"
        );
    }
}
