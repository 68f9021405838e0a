//! Error taxonomy shared by every facetmap crate.

use crate::histogram::TierFailure;
use crate::predicate::PredicateError;
use thiserror::Error;

/// Failure reported by an external provider (feature service, view, loader).
///
/// Cloneable so histogram tier failures can be retained and reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The provider does not implement the operation.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// The response was truncated by the service.
    #[error("transfer limit exceeded")]
    TransferLimitExceeded,

    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Error object returned by the service.
    #[error("service error {code}: {message}")]
    Service {
        /// Service error code
        code: i64,
        /// Service error message
        message: String,
    },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the exploration engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Value statistics could not be computed for a field.
    #[error("statistics unavailable for field '{field}': {reason}")]
    StatsUnavailable {
        /// Field name
        field: String,
        /// Underlying provider failure
        #[source]
        reason: QueryError,
    },

    /// Every histogram strategy failed for a field.
    #[error("no histogram strategy succeeded for field '{field}' ({} attempts)", .failures.len())]
    HistogramUnavailable {
        /// Field name
        field: String,
        /// One entry per attempted strategy, in order
        failures: Vec<TierFailure>,
    },

    /// The map background could not be classified.
    #[error("theme detection failed: {0}")]
    ThemeDetectionFailed(String),

    /// The extent of the filtered features could not be fetched.
    #[error("extent query failed: {0}")]
    ExtentQueryFailed(#[source] QueryError),

    /// A dataset could not be fetched or resolved.
    #[error("failed to load dataset '{target}': {reason}")]
    DatasetLoadFailed {
        /// Dataset id or slug
        target: String,
        /// Human readable cause
        reason: String,
    },

    /// The dataset has no field with this name.
    #[error("field '{0}' not found")]
    FieldNotFound(String),

    /// The dataset was switched while a request was in flight.
    #[error("dataset changed while loading '{0}'")]
    StaleDataset(String),

    /// A newer search replaced this one.
    #[error("search '{0}' superseded by a newer query")]
    SearchSuperseded(String),

    /// An operation needs a dataset but none is loaded.
    #[error("no dataset loaded")]
    NoDataset,

    /// The interaction does not apply to the widget.
    #[error("invalid widget interaction: {0}")]
    InvalidInteraction(String),

    /// No filter exists for the field.
    #[error("no filter on field '{0}'")]
    FilterNotFound(String),

    /// Provider failure outside a more specific context.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Malformed predicate text.
    #[error(transparent)]
    Predicate(#[from] PredicateError),
}

/// Result type for facetmap operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{HistogramStrategy, TierFailure};

    #[test]
    fn test_stats_unavailable_display() {
        let err = Error::StatsUnavailable {
            field: "Age".to_string(),
            reason: QueryError::Transport("timeout".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "statistics unavailable for field 'Age': transport error: timeout"
        );
    }

    #[test]
    fn test_histogram_unavailable_counts_failures() {
        let err = Error::HistogramUnavailable {
            field: "Age".to_string(),
            failures: vec![TierFailure::new(
                HistogramStrategy::ServerAggregate,
                QueryError::Unsupported("histograms".to_string()),
            )],
        };
        assert!(err.to_string().contains("1 attempts"));
    }

    #[test]
    fn test_query_error_converts() {
        let err: Error = QueryError::TransferLimitExceeded.into();
        assert!(matches!(err, Error::Query(QueryError::TransferLimitExceeded)));
    }
}
