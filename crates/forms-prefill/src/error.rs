//! Prefill error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrefillError {
    #[error("field has no prefill config")]
    NotConfigured,

    #[error("{origin} prefill requires {what}")]
    Incomplete { origin: &'static str, what: &'static str },

    #[error("no value at context path \"{0}\"")]
    MissingContextValue(String),

    #[error("unknown lookup table \"{0}\"")]
    UnknownLookup(String),

    /// Endpoint has an `:id` placeholder but no context key was given
    #[error("endpoint {0} needs a context key to fill :id")]
    MissingContextKey(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrefillError {
    /// Server-side and transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            PrefillError::Status { status, .. } => *status >= 500 || *status == 429,
            PrefillError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrefillError>;
