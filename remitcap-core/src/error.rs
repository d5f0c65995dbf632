//! Error types for RemitCap operations

use rust_decimal::Decimal;
use thiserror::Error;

/// Cache key construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Empty identifier for key segment '{segment}'")]
    EmptySegment { segment: &'static str },

    #[error("Identifier for key segment '{segment}' contains the separator ':'")]
    SeparatorInSegment { segment: &'static str },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration from {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Failures reported by, or while talking to, the external authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("Authority unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Authority rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Malformed authority response: {0}")]
    Boundary(#[from] BoundaryError),
}

/// A response from the authority did not match the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("{call}: missing field '{field}'")]
    MissingField { call: String, field: String },

    #[error("{call}: field '{field}' has wrong type, expected {expected}")]
    WrongType {
        call: String,
        field: String,
        expected: &'static str,
    },

    #[error("{call}: field '{field}' out of range: {value}")]
    OutOfRange {
        call: String,
        field: String,
        value: String,
    },

    #[error("{call}: expected a JSON object or single-row array")]
    NotAnObject { call: String },

    #[error("{call}: expected a JSON array of rows")]
    NotAnArray { call: String },

    #[error("{call}: row {index} does not match the record shape: {reason}")]
    InvalidRow {
        call: String,
        index: usize,
        reason: String,
    },
}

/// Violations of entity invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Amount {amount} outside [0, {ceiling}]")]
    AmountOutOfRange { amount: Decimal, ceiling: Decimal },

    #[error("Commission {commission} must be non-negative")]
    NegativeCommission { commission: Decimal },

    #[error("Included commission {commission} exceeds amount {amount}")]
    CommissionExceedsAmount { commission: Decimal, amount: Decimal },

    #[error("Stored net amount {stored} does not match computed {computed}")]
    NetAmountMismatch { stored: Decimal, computed: Decimal },
}

/// Master error type for RemitCap errors below the facade.
#[derive(Debug, Clone, Error)]
pub enum RemitError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Result type alias for RemitCap operations.
pub type RemitResult<T> = Result<T, RemitError>;
