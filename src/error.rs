use thiserror::Error;

/// Main error type for period tracking and probability fusion
#[derive(Error, Debug)]
pub enum PoolcastError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream fetch failed (network, timeout, decode). Recovered inside the
    /// provider adapter and collapsed to an absent signal.
    #[error("Transient fetch failure: {0}")]
    TransientFetch(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Persisted state errors
    #[error("Malformed observation log: {0}")]
    MalformedLog(String),

    // Fusion input errors
    #[error("Missing input document: {0}")]
    MissingInput(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PoolcastError
pub type Result<T> = std::result::Result<T, PoolcastError>;

impl PoolcastError {
    /// Whether a fusion invocation must stop (non-zero exit) on this error
    pub fn is_fatal_for_fusion(&self) -> bool {
        !matches!(self, PoolcastError::TransientFetch(_) | PoolcastError::MalformedLog(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_fatal() {
        let err = PoolcastError::MissingInput("result/26027期_预测概率.json".into());
        assert!(err.is_fatal_for_fusion());
        assert!(err.to_string().contains("26027期_预测概率.json"));
    }

    #[test]
    fn test_recoverable_errors_are_not_fatal() {
        assert!(!PoolcastError::TransientFetch("timeout".into()).is_fatal_for_fusion());
        assert!(!PoolcastError::MalformedLog("not an array".into()).is_fatal_for_fusion());
    }
}
