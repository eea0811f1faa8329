use thiserror::Error;

/// The central error type for the Aegis client.
///
/// This hierarchy enables programmatic recovery and unified error handling
/// across the model core, tuning validation, and transport layers.
#[derive(Error, Debug)]
pub enum AegisError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by the local model object graph.
///
/// All of these are synchronous and non-retryable: construction and lookup
/// either fully succeed or fail before any shared state is mutated.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed model: {0}")]
    Malformed(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Ambiguous match for {kind} '{name}': {count} candidates, disambiguate by asset type")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },
}

impl ModelError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ModelError::Malformed(msg.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        ModelError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// A tuning, filter, or finding violates the platform's construction rules.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Payload '{payload}' is not allowed for tuning type '{tuning_type}'")]
    ForbiddenPayload {
        tuning_type: &'static str,
        payload: &'static str,
    },

    #[error("Filter key '{key}' is not allowed for tuning type '{tuning_type}'")]
    ForbiddenFilterKey {
        tuning_type: &'static str,
        key: &'static str,
    },

    #[error("{field} {value} out of range, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Filters support at most one tag pair, got {0}")]
    TooManyFilterTags(usize),

    #[error("Finding {index}: {message}")]
    Finding { index: usize, message: String },

    #[error("{0}")]
    Invalid(String),
}

/// Errors from the HTTP transport layer.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request timed out")]
    Timeout,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{method} {url} returned status {status}: {message}")]
    Status {
        status: u16,
        method: &'static str,
        url: String,
        message: String,
    },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

pub type Result<T, E = AegisError> = std::result::Result<T, E>;
