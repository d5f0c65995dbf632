//! Raw form payloads as submitted by the UI.
//!
//! Nothing in here is trusted. Forms are sanitized and validated by
//! `remitcap-guard` before any value reaches the authority.

use crate::identity::CustomerId;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary input that may arrive as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// Best-effort decimal view of a numeric input; text is not parsed here.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            RawAmount::Number(n) if n.is_finite() => Decimal::from_f64(*n),
            _ => None,
        }
    }

    /// The textual form used by field-level validation.
    pub fn as_text(&self) -> String {
        match self {
            RawAmount::Number(n) => n.to_string(),
            RawAmount::Text(s) => s.clone(),
        }
    }
}

impl Default for RawAmount {
    fn default() -> Self {
        RawAmount::Text(String::new())
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

impl From<String> for RawAmount {
    fn from(value: String) -> Self {
        RawAmount::Text(value)
    }
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

/// Customer create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientForm {
    pub full_name: String,
    pub document_number: String,
    /// ISO date (`YYYY-MM-DD`).
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub fiscal_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Transfer submission form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferForm {
    pub customer_id: Option<CustomerId>,
    pub document_number: String,
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_country: Option<String>,
    pub amount: RawAmount,
    #[serde(default)]
    pub commission_amount: Option<RawAmount>,
    #[serde(default)]
    pub commission_included: bool,
    #[serde(default)]
    pub notes: Option<String>,
}
