//! Error Types for the RemitCap facade
//!
//! Every failure reaching the UI is classified by an [`ErrorCode`] and carried
//! as a [`ServiceError`] with a short base-locale message. Field-level
//! problems travel in `details` as a `{ field: message }` object, and only
//! for the codes that describe form input.

use remitcap_core::{AuthorityError, EligibilityResult, KeyError, Money, RecordError, RemitError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for facade responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Input errors
    // ========================================================================
    /// One or more fields failed validation
    ValidationFailed,

    /// Input carried a script or SQL injection payload
    SecurityViolation,

    /// Amount exceeds the absolute legal ceiling
    CeilingExceeded,

    /// Amount exceeds the customer's remaining capacity in the rolling window
    WindowCapacityExceeded,

    // ========================================================================
    // Lookup and state errors
    // ========================================================================
    /// Requested entity does not exist (or belongs to another business)
    NotFound,

    /// Operation is not allowed in the current state
    InvalidState,

    // ========================================================================
    // Authority errors
    // ========================================================================
    /// The external authority could not be reached or failed
    AuthorityUnavailable,

    /// The external authority answered with an unexpected shape
    MalformedResponse,

    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SecurityViolation => "SECURITY_VIOLATION",
            ErrorCode::CeilingExceeded => "CEILING_EXCEEDED",
            ErrorCode::WindowCapacityExceeded => "WINDOW_CAPACITY_EXCEEDED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::AuthorityUnavailable => "AUTHORITY_UNAVAILABLE",
            ErrorCode::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Please correct the highlighted fields",
            ErrorCode::SecurityViolation => "Input rejected for security reasons",
            ErrorCode::CeilingExceeded => "Amount exceeds the legal limit",
            ErrorCode::WindowCapacityExceeded => {
                "Amount exceeds the customer's available limit in the current period"
            }
            ErrorCode::NotFound => "Record not found",
            ErrorCode::InvalidState => "Operation not allowed right now",
            ErrorCode::AuthorityUnavailable => "Service temporarily unavailable, please retry",
            ErrorCode::MalformedResponse => "Unexpected response from the service",
            ErrorCode::InternalError => "An internal error occurred",
        }
    }

    /// Whether `details` holds a `{ field: message }` map for the form.
    pub fn carries_field_errors(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed | ErrorCode::SecurityViolation | ErrorCode::CeilingExceeded
        )
    }

    /// Whether the user can act on this error by changing their input.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::SecurityViolation
                | ErrorCode::CeilingExceeded
                | ErrorCode::WindowCapacityExceeded
                | ErrorCode::NotFound
                | ErrorCode::InvalidState
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SERVICE ERROR STRUCT
// ============================================================================

/// Structured facade error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create an error carrying the code's default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Field messages carried in `details`. Empty for codes whose details
    /// describe something other than form fields.
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        if !self.code.carries_field_errors() {
            return BTreeMap::new();
        }
        match &self.details {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(field, message)| {
                    message.as_str().map(|m| (field.clone(), m.to_string()))
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Convenience constructors
    // ------------------------------------------------------------------------

    pub fn validation_failed(field_errors: BTreeMap<String, String>) -> Self {
        Self::from_code(ErrorCode::ValidationFailed).with_details(json!(field_errors))
    }

    pub fn security_violation(field_errors: BTreeMap<String, String>) -> Self {
        Self::from_code(ErrorCode::SecurityViolation).with_details(json!(field_errors))
    }

    pub fn ceiling_exceeded(ceiling: Money) -> Self {
        Self::new(
            ErrorCode::CeilingExceeded,
            format!("Amount exceeds the legal limit of {ceiling}"),
        )
    }

    /// Ceiling breach found while validating a form.
    pub fn ceiling_exceeded_fields(ceiling: Money, field_errors: BTreeMap<String, String>) -> Self {
        Self::ceiling_exceeded(ceiling).with_details(json!(field_errors))
    }

    pub fn window_capacity_exceeded(verdict: &EligibilityResult) -> Self {
        Self::new(ErrorCode::WindowCapacityExceeded, verdict.message.clone()).with_details(json!({
            "amount_used": verdict.amount_used,
            "amount_available": verdict.amount_available,
            "days_remaining": verdict.days_remaining,
        }))
    }

    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{entity} not found"))
            .with_details(json!({ "entity": entity, "id": id.to_string() }))
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn authority_unavailable(reason: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::AuthorityUnavailable)
            .with_details(json!({ "reason": reason.into() }))
    }

    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::MalformedResponse)
            .with_details(json!({ "reason": reason.into() }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<AuthorityError> for ServiceError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::Unavailable { reason } => Self::authority_unavailable(reason),
            AuthorityError::Rejected { message, .. } => {
                Self::new(ErrorCode::ValidationFailed, message)
            }
            AuthorityError::NotFound { entity, id } => Self::not_found(entity, id),
            AuthorityError::Boundary(e) => Self::malformed_response(e.to_string()),
        }
    }
}

impl From<KeyError> for ServiceError {
    fn from(err: KeyError) -> Self {
        Self::internal_error(format!("Cache key error: {err}"))
    }
}

impl From<RecordError> for ServiceError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::AmountOutOfRange { ceiling, .. } => Self::ceiling_exceeded(ceiling),
            other => Self::new(ErrorCode::ValidationFailed, other.to_string()),
        }
    }
}

impl From<RemitError> for ServiceError {
    fn from(err: RemitError) -> Self {
        match err {
            RemitError::Key(e) => e.into(),
            RemitError::Authority(e) => e.into(),
            RemitError::Record(e) => e.into(),
            RemitError::Config(e) => Self::internal_error(e.to_string()),
        }
    }
}

/// Result type alias for facade internals.
pub type ServiceResult<T> = Result<T, ServiceError>;
