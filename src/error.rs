// Error taxonomy: protocol faults, fetch failures, parameter-tree client errors

use std::time::Duration;

use thiserror::Error;

/// Fault reported by the management-protocol layer while walking a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkFault {
    /// Transport-level failure (timeout, unreachable agent, tool failure).
    #[error("transport failure: {0}")]
    Indication(String),

    /// Device-level failure reported for a row (e.g. noSuchObject).
    /// `index` is the 1-based position of the offending column, 0 when unknown.
    #[error("{status} at column {index}")]
    Status { status: String, index: usize },
}

/// Failure of one counter fetch. Always transient from the poller's view.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("table walk failed before any row: {0}")]
    Walk(WalkFault),

    #[error("non-numeric value {value:?} in column {column}")]
    Parse { column: String, value: String },

    #[error("need an inbound and an outbound counter column, got {0} columns")]
    CounterColumns(usize),

    #[error("row has {got} columns, expected {expected}")]
    ColumnCount { expected: usize, got: usize },

    #[error("fetch exceeded {0:?}")]
    Timeout(Duration),

    #[error("fetch task: {0}")]
    Join(String),
}

/// Errors of the parameter-tree surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path is read-only: {0}")]
    ReadOnly(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TreeError {
    /// Bad path or value from the caller (HTTP 400); anything else is a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TreeError::InvalidPath(_) | TreeError::ReadOnly(_) | TreeError::InvalidValue(_)
        )
    }
}
