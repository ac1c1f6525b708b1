use chrono::Utc;
use esg_core::{
    framework_by_name, CompanyIdentity, CompositeScore, DisclosureProvider, EmissionsProvider, EsgError,
    EsgSnapshot, FinancialEsgProvider, Framework, Industry, RawSignals, SeededRandom,
};
use esg_scoring::{ForecastGenerator, MetricInferenceEngine, RatingPolicy, ScoreAggregator, DEFAULT_HORIZON};
use signal_fetchers::ForecastOverrides;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub mod record;
pub use record::{EsgRecord, EsgRequest, ForecastReport, ForecastSource, RefreshOutcome, SignalCoverage};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest forecast served; larger requests are truncated
pub const MAX_FORECAST_HORIZON: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Esg(#[from] EsgError),

    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No ESG record has been published yet")]
    NoRecord,
}

/// Runs fetch → infer → score and holds the published snapshot-of-record
pub struct EsgOrchestrator {
    financial: Option<Arc<dyn FinancialEsgProvider>>,
    disclosures: Option<Arc<dyn DisclosureProvider>>,
    emissions: Option<Arc<dyn EmissionsProvider>>,
    engine: MetricInferenceEngine,
    aggregator: ScoreAggregator,
    generator: ForecastGenerator,
    overrides: ForecastOverrides,
    default_framework: Framework,
    fetch_timeout: Duration,
    /// Bumped by every refresh; only the latest may publish
    generation: AtomicU64,
    record: RwLock<Option<Arc<EsgRecord>>>,
}

impl EsgOrchestrator {
    /// Orchestrator with no providers attached: every refresh yields the default snapshot
    pub fn new(default_framework: Framework) -> Self {
        Self {
            financial: None,
            disclosures: None,
            emissions: None,
            engine: MetricInferenceEngine::new(),
            aggregator: ScoreAggregator::new(),
            generator: ForecastGenerator::new(),
            overrides: ForecastOverrides::empty(),
            default_framework,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            generation: AtomicU64::new(0),
            record: RwLock::new(None),
        }
    }

    pub fn with_financial_provider(mut self, provider: Arc<dyn FinancialEsgProvider>) -> Self {
        self.financial = Some(provider);
        self
    }

    pub fn with_disclosure_provider(mut self, provider: Arc<dyn DisclosureProvider>) -> Self {
        self.disclosures = Some(provider);
        self
    }

    pub fn with_emissions_provider(mut self, provider: Arc<dyn EmissionsProvider>) -> Self {
        self.emissions = Some(provider);
        self
    }

    pub fn with_overrides(mut self, overrides: ForecastOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_rating_policy(mut self, policy: RatingPolicy) -> Self {
        self.aggregator = ScoreAggregator::with_policy(policy);
        self
    }

    pub fn default_framework(&self) -> &Framework {
        &self.default_framework
    }

    /// Built-in framework by name, or the default when `name` is `None`
    pub fn resolve_framework(&self, name: Option<&str>) -> Result<Framework, OrchestratorError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => framework_by_name(n).ok_or_else(|| OrchestratorError::UnknownFramework(n.to_string())),
            None => Ok(self.default_framework.clone()),
        }
    }

    /// Fetch all signals concurrently, infer a snapshot, score it and publish.
    ///
    /// Provider failures and timeouts never fail the refresh; they drop the
    /// signal and inference falls back. A refresh overtaken by a later one
    /// returns `Superseded` and leaves the record untouched.
    pub async fn refresh(&self, request: EsgRequest) -> Result<RefreshOutcome, OrchestratorError> {
        let symbol = request.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(OrchestratorError::InvalidRequest("symbol is required".to_string()));
        }
        let framework = self.resolve_framework(request.framework.as_deref())?;
        framework.validate()?;
        let industry = request
            .industry
            .as_deref()
            .map(Industry::from_name)
            .unwrap_or(Industry::Other);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            "Refreshing ESG data for {} (generation {}, framework {}, industry {})",
            symbol,
            generation,
            framework.name,
            industry.as_str()
        );

        let identity = match request.cik.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(_) => None,
            None => self.resolve_company(&symbol).await,
        };
        let cik = request
            .cik
            .filter(|c| !c.trim().is_empty())
            .or_else(|| identity.as_ref().map(|i| i.cik.clone()));
        let company_name = request
            .company_name
            .filter(|c| !c.trim().is_empty())
            .or_else(|| identity.map(|i| i.title))
            .unwrap_or_else(|| symbol.clone());

        let (financial, disclosures, emissions) = tokio::join!(
            self.fetch_financial(&symbol),
            self.fetch_disclosures(cik.as_deref()),
            self.fetch_emissions(&company_name),
        );

        let coverage = SignalCoverage {
            financial: financial.is_some(),
            disclosures: disclosures.is_some(),
            emissions: emissions.is_some(),
        };
        let signals = RawSignals {
            financial,
            disclosures,
            emissions,
        };

        let mut rng = SeededRandom::from_os();
        let snapshot = self.engine.infer(&signals, industry, &mut rng);
        let composite = self.aggregator.score(&snapshot, &framework)?;

        let record = Arc::new(EsgRecord {
            symbol: symbol.clone(),
            company_name,
            cik,
            industry,
            framework,
            estimated: snapshot.is_estimated(),
            snapshot,
            composite,
            coverage,
            generation,
            fetched_at: Utc::now(),
        });

        let mut slot = self.record.write().await;
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != generation {
            tracing::info!(
                "Discarding ESG result for {} (generation {} superseded by {})",
                symbol,
                generation,
                latest
            );
            return Ok(RefreshOutcome::Superseded { generation, latest });
        }
        *slot = Some(Arc::clone(&record));
        drop(slot);

        tracing::info!(
            "Published ESG record for {}: total {} ({}), coverage {:?}",
            symbol,
            record.composite.total,
            record.composite.rating,
            record.coverage
        );
        Ok(RefreshOutcome::Published(record))
    }

    /// The published record as-is
    pub async fn record(&self) -> Option<Arc<EsgRecord>> {
        self.record.read().await.clone()
    }

    /// The published record, re-scored under `framework` when one is named
    pub async fn current(&self, framework: Option<&str>) -> Result<EsgRecord, OrchestratorError> {
        let record = self.record().await.ok_or(OrchestratorError::NoRecord)?;
        let Some(name) = framework.filter(|n| !n.trim().is_empty()) else {
            return Ok(record.as_ref().clone());
        };

        let framework = self.resolve_framework(Some(name))?;
        let composite = self.aggregator.score(&record.snapshot, &framework)?;
        Ok(EsgRecord {
            framework,
            composite,
            ..record.as_ref().clone()
        })
    }

    /// Pure aggregation of a caller-supplied snapshot
    pub fn score_snapshot(&self, snapshot: &EsgSnapshot, framework: &Framework) -> Result<CompositeScore, EsgError> {
        self.aggregator.score(snapshot, framework)
    }

    /// Forecast for the published record's ticker. Precomputed overrides win.
    pub async fn forecast(&self, horizon: Option<usize>) -> Result<ForecastReport, OrchestratorError> {
        let record = self.record().await.ok_or(OrchestratorError::NoRecord)?;
        let requested = horizon.unwrap_or(DEFAULT_HORIZON);
        let horizon = requested.min(MAX_FORECAST_HORIZON);
        if horizon < requested {
            tracing::debug!("Forecast horizon {} truncated to {}", requested, horizon);
        }

        if let Some(points) = self.overrides.get(&record.symbol, horizon) {
            tracing::debug!("Serving precomputed forecast for {}", record.symbol);
            return Ok(ForecastReport {
                symbol: record.symbol.clone(),
                source: ForecastSource::Precomputed,
                points,
            });
        }

        let mut rng = SeededRandom::from_os();
        let points = self
            .generator
            .forecast(&record.snapshot, &record.symbol, horizon, record.fetched_at.date_naive(), &mut rng)
            .collect();
        Ok(ForecastReport {
            symbol: record.symbol.clone(),
            source: ForecastSource::Generated,
            points,
        })
    }

    async fn resolve_company(&self, symbol: &str) -> Option<CompanyIdentity> {
        let provider = self.disclosures.as_ref()?;
        self.guarded("SEC EDGAR", provider.resolve_company(symbol)).await
    }

    async fn fetch_financial(&self, symbol: &str) -> Option<esg_core::FinancialEsgScores> {
        let provider = self.financial.as_ref()?;
        self.guarded("Finnhub", provider.fetch_financial_esg(symbol)).await
    }

    async fn fetch_disclosures(&self, cik: Option<&str>) -> Option<serde_json::Value> {
        let provider = self.disclosures.as_ref()?;
        let Some(cik) = cik else {
            tracing::debug!("No CIK available, skipping disclosures");
            return None;
        };
        self.guarded("SEC EDGAR", provider.fetch_disclosures(cik)).await
    }

    async fn fetch_emissions(&self, company: &str) -> Option<Vec<esg_core::FacilityEmission>> {
        let provider = self.emissions.as_ref()?;
        self.guarded("EPA Envirofacts", provider.fetch_facility_emissions(company)).await
    }

    /// Await a provider call under the fetch timeout. Any failure becomes `None`.
    async fn guarded<T>(&self, provider: &str, call: impl Future<Output = Result<T, EsgError>>) -> Option<T> {
        let error = match tokio::time::timeout(self.fetch_timeout, call).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(e)) => e,
            Err(_) => EsgError::fetch(provider, format!("timed out after {:?}", self.fetch_timeout)),
        };
        tracing::warn!("{}", error);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use esg_core::{FacilityEmission, FinancialEsgScores, RatingGrade};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct StubFinancial {
        scores: FinancialEsgScores,
        delay: Option<(String, Duration)>,
    }

    #[async_trait]
    impl FinancialEsgProvider for StubFinancial {
        async fn fetch_financial_esg(&self, symbol: &str) -> Result<FinancialEsgScores, EsgError> {
            if let Some((slow_symbol, delay)) = &self.delay {
                if slow_symbol == symbol {
                    tokio::time::sleep(*delay).await;
                }
            }
            Ok(self.scores.clone())
        }
    }

    struct FailingFinancial;

    #[async_trait]
    impl FinancialEsgProvider for FailingFinancial {
        async fn fetch_financial_esg(&self, _symbol: &str) -> Result<FinancialEsgScores, EsgError> {
            Err(EsgError::fetch("Finnhub", "HTTP 401 Unauthorized"))
        }
    }

    #[derive(Default)]
    struct StubDisclosures {
        resolve_calls: AtomicUsize,
    }

    #[async_trait]
    impl DisclosureProvider for StubDisclosures {
        async fn fetch_disclosures(&self, cik: &str) -> Result<serde_json::Value, EsgError> {
            assert_eq!(cik, "0000320193");
            Ok(json!({"facts": "climate risk; renewable power; labor; board"}))
        }

        async fn resolve_company(&self, ticker: &str) -> Result<CompanyIdentity, EsgError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyIdentity {
                ticker: ticker.to_string(),
                cik: "0000320193".to_string(),
                title: "Apple Inc.".to_string(),
            })
        }
    }

    struct StubEmissions {
        expected_company: &'static str,
        releases: Vec<&'static str>,
    }

    #[async_trait]
    impl EmissionsProvider for StubEmissions {
        async fn fetch_facility_emissions(&self, company: &str) -> Result<Vec<FacilityEmission>, EsgError> {
            assert_eq!(company, self.expected_company);
            Ok(self
                .releases
                .iter()
                .map(|r| FacilityEmission {
                    facility_name: None,
                    total_releases: Some(json!(r)),
                })
                .collect())
        }
    }

    fn gri() -> Framework {
        framework_by_name("GRI").unwrap()
    }

    fn scores(e: f64, s: f64, g: f64) -> FinancialEsgScores {
        FinancialEsgScores {
            environment_score: Some(e),
            social_score: Some(s),
            governance_score: Some(g),
            total_score: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_without_providers_publishes_default() {
        let orchestrator = EsgOrchestrator::new(gri());
        let outcome = orchestrator.refresh(EsgRequest::new("zzzz")).await.unwrap();

        let record = outcome.record().unwrap();
        assert_eq!(record.symbol, "ZZZZ");
        assert!(record.estimated);
        assert_eq!(record.snapshot.controversies, 0);
        assert_eq!(record.coverage, SignalCoverage::default());
        // 70.1*.33 + 75.1*.33 + 75.0*.34 = 73.4
        assert_eq!(record.composite.total, 73.0);
        assert_eq!(record.composite.rating, RatingGrade::A);
        assert_eq!(orchestrator.record().await.unwrap().generation, 1);
    }

    #[tokio::test]
    async fn test_refresh_with_all_providers() {
        let disclosures = Arc::new(StubDisclosures::default());
        let orchestrator = EsgOrchestrator::new(gri())
            .with_financial_provider(Arc::new(StubFinancial {
                scores: scores(70.0, 80.0, 75.0),
                delay: None,
            }))
            .with_disclosure_provider(disclosures.clone())
            .with_emissions_provider(Arc::new(StubEmissions {
                expected_company: "Apple Inc.",
                releases: vec!["10000", "10000", "10000"],
            }));

        let mut request = EsgRequest::new("AAPL");
        request.industry = Some("technology".to_string());
        let outcome = orchestrator.refresh(request).await.unwrap();
        let record = outcome.record().unwrap();

        assert_eq!(disclosures.resolve_calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.cik.as_deref(), Some("0000320193"));
        assert_eq!(record.company_name, "Apple Inc.");
        assert_eq!(record.industry, Industry::Technology);
        assert_eq!(
            record.coverage,
            SignalCoverage {
                financial: true,
                disclosures: true,
                emissions: true
            }
        );
        assert!(!record.estimated);
        assert_eq!(record.snapshot.controversies, 1);
        assert_eq!(record.snapshot.environmental.metrics[0].score, 90.0);
        assert!((0.0..=100.0).contains(&record.composite.total));
    }

    #[tokio::test]
    async fn test_explicit_cik_skips_resolution() {
        let disclosures = Arc::new(StubDisclosures::default());
        let orchestrator = EsgOrchestrator::new(gri()).with_disclosure_provider(disclosures.clone());

        let mut request = EsgRequest::new("AAPL");
        request.cik = Some("0000320193".to_string());
        let record = orchestrator.refresh(request).await.unwrap();

        assert_eq!(disclosures.resolve_calls.load(Ordering::SeqCst), 0);
        assert!(record.record().unwrap().coverage.disclosures);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let orchestrator = EsgOrchestrator::new(gri()).with_financial_provider(Arc::new(FailingFinancial));
        let outcome = orchestrator.refresh(EsgRequest::new("AAPL")).await.unwrap();
        let record = outcome.record().unwrap();
        assert!(!record.coverage.financial);
        assert!(record.estimated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let orchestrator = EsgOrchestrator::new(gri())
            .with_fetch_timeout(Duration::from_secs(1))
            .with_financial_provider(Arc::new(StubFinancial {
                scores: scores(90.0, 90.0, 90.0),
                delay: Some(("AAPL".to_string(), Duration::from_secs(60))),
            }));

        let outcome = orchestrator.refresh(EsgRequest::new("AAPL")).await.unwrap();
        let record = outcome.record().unwrap();
        assert!(!record.coverage.financial);
        assert_eq!(record.snapshot, MetricInferenceEngine::default_snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_superseded() {
        let orchestrator = EsgOrchestrator::new(gri()).with_financial_provider(Arc::new(StubFinancial {
            scores: scores(80.0, 80.0, 80.0),
            delay: Some(("SLOW".to_string(), Duration::from_secs(5))),
        }));

        let (slow, fast) = tokio::join!(
            orchestrator.refresh(EsgRequest::new("SLOW")),
            orchestrator.refresh(EsgRequest::new("FAST")),
        );

        match slow.unwrap() {
            RefreshOutcome::Superseded { generation, latest } => {
                assert_eq!(generation, 1);
                assert_eq!(latest, 2);
            }
            RefreshOutcome::Published(_) => panic!("stale refresh must not publish"),
        }
        assert!(fast.unwrap().record().is_some());
        assert_eq!(orchestrator.record().await.unwrap().symbol, "FAST");
    }

    #[tokio::test]
    async fn test_unknown_framework_rejected_before_fetch() {
        let orchestrator = EsgOrchestrator::new(gri());
        let mut request = EsgRequest::new("AAPL");
        request.framework = Some("ISO-9001".to_string());
        let err = orchestrator.refresh(request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownFramework(_)));
        assert!(orchestrator.record().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_symbol_rejected() {
        let err = EsgOrchestrator::new(gri())
            .refresh(EsgRequest::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_current_rescores_under_framework() {
        let orchestrator = EsgOrchestrator::new(gri());
        assert!(matches!(orchestrator.current(None).await, Err(OrchestratorError::NoRecord)));

        orchestrator.refresh(EsgRequest::new("AAPL")).await.unwrap();
        let published = orchestrator.current(None).await.unwrap();
        assert_eq!(published.framework.name, "GRI");

        let rescored = orchestrator.current(Some("tcfd")).await.unwrap();
        assert_eq!(rescored.framework.name, "TCFD");
        // 70.1*.5 + 75.1*.2 + 75.0*.3 = 72.57
        assert_eq!(rescored.composite.total, 73.0);
        assert_eq!(rescored.snapshot, published.snapshot);

        assert!(matches!(
            orchestrator.current(Some("nope")).await,
            Err(OrchestratorError::UnknownFramework(_))
        ));
    }

    #[tokio::test]
    async fn test_forecast_generated_and_precomputed() {
        let overrides = ForecastOverrides::from_json_str(
            r#"{"AAPL": [
                {"period": "Q1 2027", "environmental": 71.0, "social": 76.0, "governance": 76.0, "total": 74.3, "confidence_percent": 90.0},
                {"period": "Q2 2027", "environmental": 71.5, "social": 76.5, "governance": 76.4, "total": 74.8, "confidence_percent": 88.0}
            ]}"#,
        )
        .unwrap();
        let orchestrator = EsgOrchestrator::new(gri()).with_overrides(overrides);
        assert!(matches!(orchestrator.forecast(None).await, Err(OrchestratorError::NoRecord)));

        orchestrator.refresh(EsgRequest::new("MSFT")).await.unwrap();
        let generated = orchestrator.forecast(None).await.unwrap();
        assert_eq!(generated.source, ForecastSource::Generated);
        assert_eq!(generated.points.len(), DEFAULT_HORIZON);
        assert_eq!(orchestrator.forecast(Some(500)).await.unwrap().points.len(), MAX_FORECAST_HORIZON);

        orchestrator.refresh(EsgRequest::new("aapl")).await.unwrap();
        let precomputed = orchestrator.forecast(Some(1)).await.unwrap();
        assert_eq!(precomputed.source, ForecastSource::Precomputed);
        assert_eq!(precomputed.points.len(), 1);
        assert_eq!(precomputed.points[0].period, "Q1 2027");
    }
}
