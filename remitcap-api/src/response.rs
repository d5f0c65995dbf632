//! Uniform `{ data, error }` result shape returned to the UI.

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a facade call. Exactly one of `data` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            code: None,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn err(error: ServiceError) -> Self {
        Self {
            data: None,
            field_errors: error.field_errors(),
            code: Some(error.code),
            error: Some(error.message),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Back to a `Result`, e.g. for chaining in tests.
    pub fn into_result(self) -> ServiceResult<T> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(message)) => {
                let code = self.code.unwrap_or(ErrorCode::InternalError);
                let error = ServiceError::new(code, message);
                Err(if self.field_errors.is_empty() {
                    error
                } else {
                    error.with_details(serde_json::json!(self.field_errors))
                })
            }
            (None, None) => Err(ServiceError::internal_error("Empty response")),
        }
    }
}

impl<T> From<ServiceResult<T>> for ServiceResponse<T> {
    fn from(result: ServiceResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::err(error),
        }
    }
}
