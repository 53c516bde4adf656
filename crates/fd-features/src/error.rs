//! Error types for the feature pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building features.
///
/// Data-integrity and configuration errors abort the run. Undefined numeric
/// results (division by zero, short history) are never errors; they surface as
/// null cells and are resolved by the fill policy.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Raw date that does not parse with the configured encoding
    #[error("Invalid date {raw:?} for {symbol}")]
    InvalidDate {
        /// Entity the row belongs to
        symbol: String,
        /// Raw date text
        raw: String,
    },

    /// Non-numeric value in a fundamental field
    #[error("Invalid value {value:?} in column {column} for {symbol}")]
    InvalidValue {
        /// Entity the row belongs to
        symbol: String,
        /// Column holding the value
        column: String,
        /// Raw cell text
        value: String,
    },

    /// Null entity or period in the panel key
    #[error("Null key at row {0}")]
    NullKey(usize),

    /// Two rows share the same (entity, period) key
    #[error("Duplicate key ({symbol}, {date})")]
    DuplicateKey {
        /// Entity id
        symbol: String,
        /// Canonical period
        date: String,
    },

    /// Two raw dates snap onto the same canonical quarter
    #[error("Raw dates {first} and {second} of {symbol} both map to period {period}")]
    AliasedPeriod {
        /// Entity id
        symbol: String,
        /// Canonical period both dates map to
        period: String,
        /// First raw date seen
        first: String,
        /// Second raw date seen
        second: String,
    },

    /// Panel rows are not ordered entity-major, period-minor
    #[error("Panel is not sorted by (symbol, date) at ({symbol}, {date})")]
    UnsortedPanel {
        /// Entity id of the offending row
        symbol: String,
        /// Period of the offending row
        date: String,
    },

    /// Two blocks do not share the same row keys
    #[error("Block {0} is not aligned with the panel keys")]
    KeyMismatch(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration for {parameter}: {reason}")]
    InvalidConfig {
        /// Offending parameter
        parameter: String,
        /// Why it was rejected
        reason: String,
    },

    /// Insufficient data for lookback period
    #[error("Insufficient data: need {required} periods, got {available}")]
    InsufficientData {
        /// Required number of periods
        required: usize,
        /// Available number of periods
        available: usize,
    },

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feature matrix shape error
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl PipelineError {
    pub(crate) fn config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports malformed or inconsistent input data.
    pub const fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn(_)
                | Self::InvalidDate { .. }
                | Self::InvalidValue { .. }
                | Self::NullKey(_)
                | Self::DuplicateKey { .. }
                | Self::AliasedPeriod { .. }
                | Self::UnsortedPanel { .. }
                | Self::KeyMismatch(_)
        )
    }

    /// Whether this error reports a rejected pipeline configuration.
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::InsufficientData { .. } | Self::Json(_)
        )
    }
}
