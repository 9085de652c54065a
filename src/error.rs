//! Error types shared across the analytics core.

use crate::resolver::Role;
use thiserror::Error;

/// Errors surfaced by the analytics core.
///
/// Every variant is local and recoverable: callers display the message and
/// keep the session usable. Nothing in this crate panics on bad data.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A required logical role could not be resolved to a column.
    #[error("required column for role '{0}' was not detected")]
    MissingColumn(Role),

    /// No usable rows remain after filtering/parsing.
    #[error("dataset has no usable rows for this computation")]
    EmptyDataset,

    /// Forecasting was requested with too little history.
    #[error("not enough history to forecast: need at least {needed} periods, have {have}")]
    InsufficientHistory { needed: usize, have: usize },

    /// Dataset ingestion failed (malformed file, unreadable path).
    #[error("ingest failed: {0}")]
    Ingest(String),

    /// An external forecasting model failed to fit or predict.
    #[error("forecast model failed: {0}")]
    Model(String),
}

impl From<csv::Error> for AnalyticsError {
    fn from(e: csv::Error) -> Self {
        AnalyticsError::Ingest(e.to_string())
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(e: std::io::Error) -> Self {
        AnalyticsError::Ingest(e.to_string())
    }
}
