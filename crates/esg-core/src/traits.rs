use async_trait::async_trait;
use crate::{CompanyIdentity, EsgError, FacilityEmission, FinancialEsgScores};

/// Source of per-pillar ESG scores (Finnhub)
#[async_trait]
pub trait FinancialEsgProvider: Send + Sync {
    async fn fetch_financial_esg(&self, symbol: &str) -> Result<FinancialEsgScores, EsgError>;
}

/// Source of company disclosure documents (SEC EDGAR)
#[async_trait]
pub trait DisclosureProvider: Send + Sync {
    /// Opaque document, searched as text by the inference engine
    async fn fetch_disclosures(&self, cik: &str) -> Result<serde_json::Value, EsgError>;

    async fn resolve_company(&self, ticker: &str) -> Result<CompanyIdentity, EsgError>;
}

/// Source of per-facility release records (EPA Envirofacts)
#[async_trait]
pub trait EmissionsProvider: Send + Sync {
    async fn fetch_facility_emissions(&self, company: &str) -> Result<Vec<FacilityEmission>, EsgError>;
}
