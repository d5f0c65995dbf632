//! RemitCap Guard - Input Sanitization and Validation
//!
//! Every mutation path passes through this crate before it reaches the
//! authority that enforces the legal limit:
//!
//! - [`sanitize`]: field-aware cleaning. Pure, total and idempotent.
//! - [`patterns`]: advisory detection of script and SQL injection payloads.
//! - [`validation`]: semantic rules producing field-keyed error maps.
//!
//! Clamping inside [`sanitize::sanitize_amount`] is a display safeguard only.
//! The authoritative ceiling gate is [`validation::Validator`], which sees the
//! amount before any clamping happens.

pub mod messages;
pub mod patterns;
pub mod sanitize;
pub mod validation;

pub use messages::Message;
pub use patterns::{contains_dangerous_patterns, detect_threats, ThreatKind};
pub use sanitize::{
    sanitize_amount, sanitize_document_number, sanitize_email, sanitize_fiscal_code,
    sanitize_name, sanitize_object, sanitize_phone, sanitize_text, FieldKind, Sanitizer,
};
pub use validation::{Field, ValidationResult, Validator};
