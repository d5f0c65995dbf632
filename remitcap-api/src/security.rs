//! Security signals.
//!
//! Input carrying script or SQL injection payloads is blocked like any other
//! format error, and additionally reported through a [`SecuritySink`] so the
//! host can log or forward it.

use remitcap_guard::{detect_threats, ThreatKind};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// A blocked input.
///
/// Carries field names and threat kinds only; the offending values are never
/// echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAlert {
    pub operation: &'static str,
    pub fields: BTreeMap<String, Vec<ThreatKind>>,
}

impl SecurityAlert {
    /// Scan named raw inputs; `None` when every field is clean.
    pub fn scan<'a, I>(operation: &'static str, inputs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let fields: BTreeMap<String, Vec<ThreatKind>> = inputs
            .into_iter()
            .filter_map(|(field, value)| {
                let threats = detect_threats(value?);
                (!threats.is_empty()).then(|| (field.to_string(), threats))
            })
            .collect();
        (!fields.is_empty()).then_some(Self { operation, fields })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Receives security alerts.
pub trait SecuritySink: Send + Sync {
    fn report(&self, alert: &SecurityAlert);
}

/// Default sink: a structured `warn!` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSecuritySink;

impl SecuritySink for TracingSecuritySink {
    fn report(&self, alert: &SecurityAlert) {
        warn!(
            operation = alert.operation,
            fields = ?alert.fields,
            "dangerous input rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_clean_inputs() {
        let alert = SecurityAlert::scan(
            "create_customer",
            [("full_name", Some("María José")), ("email", Some("user@example.com")), ("phone", None)],
        );
        assert!(alert.is_none());
    }

    #[test]
    fn test_scan_reports_only_offending_fields() {
        let alert = SecurityAlert::scan(
            "create_transfer",
            [
                ("recipient_name", Some("<script>alert(1)</script>")),
                ("notes", Some("'; drop table users--")),
                ("document_number", Some("AB123456")),
            ],
        )
        .unwrap();

        assert_eq!(alert.operation, "create_transfer");
        let names: Vec<&str> = alert.field_names().collect();
        assert_eq!(names, vec!["notes", "recipient_name"]);
        assert!(!alert.fields["notes"].is_empty());
    }

    #[test]
    fn test_alert_serialization_omits_values() {
        let alert = SecurityAlert::scan("x", [("notes", Some("<script>x</script>"))]).unwrap();
        let json = serde_json::to_string(&alert).unwrap();
        assert!(!json.contains("<script>"));
    }
}
