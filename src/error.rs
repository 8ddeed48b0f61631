// src/error.rs
use thiserror::Error;

/// Schema violation found while validating provider metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is out of range: {value} (must be {constraint})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error("field `{field}` has the wrong type: expected {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Coarse classification of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingField,
    OutOfRange,
    InvalidType,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::MissingField { .. } => ValidationErrorKind::MissingField,
            ValidationError::OutOfRange { .. } => ValidationErrorKind::OutOfRange,
            ValidationError::InvalidType { .. } => ValidationErrorKind::InvalidType,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidType { field, .. } => field,
        }
    }
}

/// Failure talking to an upstream data provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("provider returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("unexpected provider response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            ProviderError::NotFound(_) | ProviderError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Transport(format!("request timeout: {}", err))
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Anything that can go wrong fetching a symbol's data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid metadata: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("reference close price is zero; percentage change is undefined")]
    ZeroReference,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("could not finish csv output: {0}")]
    Flush(String),

    #[error("unexpected csv header: {0}")]
    Header(String),
}
