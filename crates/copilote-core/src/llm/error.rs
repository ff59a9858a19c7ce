use thiserror::Error;

/// Transport-level failures of the external model call. The classifier
/// never surfaces these to its caller; the adapter downgrades every variant
/// to a review-sentinel result.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("server error: {0}")]
    ServerError(String),
    #[error("timeout")]
    Timeout,
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("provider error: {0}")]
    ProviderError(String),
}
