//! HTTP clients for the ESG signal providers.
//!
//! Every client maps transport failures and non-2xx statuses to
//! `EsgError::FetchError`; callers decide whether that degrades to defaults.

mod edgar;
mod epa;
mod finnhub;
mod overrides;
mod rate_limit;

pub use edgar::EdgarClient;
pub use epa::EpaClient;
pub use finnhub::FinnhubClient;
pub use overrides::ForecastOverrides;

use esg_core::EsgError;
use reqwest::{Client, Response};
use std::time::Duration;

pub(crate) fn build_http_client(timeout: Duration, user_agent: Option<&str>) -> Client {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent.to_string());
    }
    builder.build().unwrap_or_else(|_| Client::new())
}

/// Send a prepared request, turning transport errors and non-2xx statuses into `FetchError`.
pub(crate) async fn send_checked(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<Response, EsgError> {
    let response = request
        .send()
        .await
        .map_err(|e| EsgError::fetch(provider, e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("{} returned HTTP {}", provider, status);
        return Err(EsgError::fetch(
            provider,
            format!("HTTP {}: {}", status, truncate(&body, 200)),
        ));
    }

    Ok(response)
}

pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, EsgError> {
    response
        .json::<T>()
        .await
        .map_err(|e| EsgError::fetch(provider, format!("invalid JSON body: {}", e.without_url())))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
