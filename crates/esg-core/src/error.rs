use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EsgError {
    /// Network failure, timeout or non-2xx status from a signal provider.
    #[error("Fetch error ({provider}): {message}")]
    FetchError { provider: String, message: String },

    #[error("Invalid framework: {0}")]
    InvalidFramework(String),

    /// Unparseable field in a provider payload. Filtered at the boundary, only surfaced by parsers.
    #[error("Malformed signal: {0}")]
    MalformedSignal(String),
}

impl EsgError {
    pub fn fetch(provider: &str, message: impl Into<String>) -> Self {
        EsgError::FetchError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
