//! Field-aware sanitization.
//!
//! Every function here is pure, total and idempotent:
//! `sanitize(sanitize(x)) == sanitize(x)` for every field kind.

use once_cell::sync::Lazy;
use regex::Regex;
use remitcap_core::money::clamp_money;
use remitcap_core::{ComplianceConfig, Money, RawAmount};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub const MAX_DOCUMENT_LEN: usize = 30;
pub const MAX_FISCAL_CODE_LEN: usize = 16;
pub const MAX_PHONE_LEN: usize = 25;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 150;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("Invalid script regex"));
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#)
        .expect("Invalid event handler regex")
});
static JAVASCRIPT_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("Invalid javascript regex"));
static BASE64_DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)data:[^\s,]*?;base64,?[a-z0-9+/=]*").expect("Invalid data URI regex")
});
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("Invalid control char regex")
});
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static NUMERIC_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d*)?$").expect("Invalid numeric regex"));

/// Integer digits beyond which a numeric string cannot fit a `Decimal`.
const MAX_DECIMAL_DIGITS: usize = 28;

/// Kind of field being sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Generic free text.
    Text,
    DocumentNumber,
    FiscalCode,
    Phone,
    Email,
    /// Person or business name.
    Name,
    /// Monetary amount; output is the canonical decimal string.
    Amount,
}

// ============================================================================
// GENERIC TEXT
// ============================================================================

/// Strip markup, script payloads, dangerous URIs and control characters,
/// then collapse whitespace and trim.
pub fn sanitize_text(raw: &str) -> String {
    // Stripping can splice a new payload together ("javajavascript::"), so
    // passes repeat until nothing changes. Each changing pass after the first
    // strictly shortens the text.
    let mut current = text_pass(raw);
    loop {
        let next = text_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn text_pass(input: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(input, "");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    let text = JAVASCRIPT_URI.replace_all(&text, "");
    let text = BASE64_DATA_URI.replace_all(&text, "");
    let text = CONTROL_CHARS.replace_all(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

// ============================================================================
// STRUCTURED FIELDS
// ============================================================================

/// Uppercase, keep `[A-Z0-9-]`, at most 30 characters.
pub fn sanitize_document_number(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .take(MAX_DOCUMENT_LEN)
        .collect()
}

/// Uppercase, keep `[A-Z0-9]`, at most 16 characters.
pub fn sanitize_fiscal_code(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(MAX_FISCAL_CODE_LEN)
        .collect()
}

/// Keep digits, `+`, `-`, spaces and parentheses, at most 25 characters.
pub fn sanitize_phone(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .take(MAX_PHONE_LEN)
        .collect();
    kept.trim().to_string()
}

/// Lowercase, keep `[a-z0-9@._+-]`, at most 100 characters.
pub fn sanitize_email(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '@' | '.' | '_' | '+' | '-')
        })
        .take(MAX_EMAIL_LEN)
        .collect()
}

/// Keep letters (accented included), spaces, hyphens, apostrophes and
/// periods; collapse whitespace; at most 150 characters.
pub fn sanitize_name(raw: &str) -> String {
    let text = sanitize_text(raw);
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else if c.is_alphabetic() || matches!(c, '-' | '\'' | '.') {
            out.push(c);
            last_was_space = false;
        }
    }
    let truncated: String = out.trim().chars().take(MAX_NAME_LEN).collect();
    truncated.trim_end().to_string()
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Parse, clamp to `[0, ceiling]` and round to cents.
///
/// Unparseable input yields zero rather than an error, so callers must
/// validate separately that zero is acceptable. This clamp is a display
/// safeguard; it never replaces rejecting an over-ceiling transfer.
pub fn sanitize_amount(raw: &RawAmount, ceiling: Money) -> Money {
    let value = match raw {
        RawAmount::Number(n) => number_to_decimal(*n, ceiling),
        RawAmount::Text(s) => text_to_decimal(s, ceiling),
    };
    clamp_money(value, ceiling)
}

fn number_to_decimal(n: f64, ceiling: Money) -> Decimal {
    if n.is_nan() {
        return Decimal::ZERO;
    }
    match Decimal::from_f64(n) {
        Some(d) => d,
        // Out of Decimal range: saturate toward the matching bound.
        None if n > 0.0 => ceiling,
        None => Decimal::ZERO,
    }
}

fn text_to_decimal(s: &str, ceiling: Money) -> Decimal {
    let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    match Decimal::from_str(&cleaned) {
        Ok(d) => d,
        Err(_) if is_overflowing_number(&cleaned) => ceiling,
        Err(_) => Decimal::ZERO,
    }
}

/// Syntactically a number, but with more integer digits than `Decimal` holds.
fn is_overflowing_number(cleaned: &str) -> bool {
    if !NUMERIC_SYNTAX.is_match(cleaned) {
        return false;
    }
    let integer = cleaned.split('.').next().unwrap_or_default();
    integer.trim_start_matches('0').len() > MAX_DECIMAL_DIGITS
}

// ============================================================================
// OBJECT GRAPHS
// ============================================================================

/// Apply [`sanitize_text`] to every string leaf of a JSON value.
///
/// Arrays and nested objects are walked recursively; numbers, booleans and
/// `null` pass through unchanged. Object keys are left as they are.
pub fn sanitize_object(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_object).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_object(v)))
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// SANITIZER
// ============================================================================

/// Dispatches to the field-specific functions with a configured ceiling.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    ceiling: Money,
}

impl Sanitizer {
    pub fn new(ceiling: Money) -> Self {
        Self { ceiling }
    }

    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self::new(config.ceiling)
    }

    pub fn ceiling(&self) -> Money {
        self.ceiling
    }

    /// Sanitize a raw value according to its field kind.
    pub fn sanitize(&self, kind: FieldKind, raw: &str) -> String {
        match kind {
            FieldKind::Text => sanitize_text(raw),
            FieldKind::DocumentNumber => sanitize_document_number(raw),
            FieldKind::FiscalCode => sanitize_fiscal_code(raw),
            FieldKind::Phone => sanitize_phone(raw),
            FieldKind::Email => sanitize_email(raw),
            FieldKind::Name => sanitize_name(raw),
            FieldKind::Amount => self.amount(&RawAmount::Text(raw.to_string())).to_string(),
        }
    }

    /// Sanitize an optional value, mapping empty results to `None`.
    pub fn sanitize_opt(&self, kind: FieldKind, raw: Option<&str>) -> Option<String> {
        raw.map(|r| self.sanitize(kind, r)).filter(|s| !s.is_empty())
    }

    pub fn amount(&self, raw: &RawAmount) -> Money {
        sanitize_amount(raw, self.ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_text_strips_script_blocks_and_tags() {
        assert_eq!(sanitize_text("<script>alert(1)</script>Hola"), "Hola");
        assert_eq!(sanitize_text("<b>Ana</b>  <i>Ruiz</i>"), "Ana Ruiz");
        assert_eq!(sanitize_text("  a\t\n b  "), "a b");
    }

    #[test]
    fn test_text_strips_handlers_and_uris() {
        assert_eq!(sanitize_text("x onclick=\"steal()\" y"), "x y");
        assert_eq!(sanitize_text("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_text("see data:image/png;base64,iVBORw0KGgo= now"), "see now");
        assert_eq!(sanitize_text("a\u{0007}b\u{007f}c"), "abc");
    }

    #[test]
    fn test_text_reaches_fixpoint_on_spliced_payloads() {
        let once = sanitize_text("javajavascript:script:alert(1)");
        assert_eq!(once, "alert(1)");
        assert_eq!(sanitize_text(&once), once);
    }

    #[test]
    fn test_document_number() {
        assert_eq!(sanitize_document_number(" ab-123.456 "), "AB-123456");
        assert_eq!(sanitize_document_number(&"X".repeat(40)).len(), MAX_DOCUMENT_LEN);
    }

    #[test]
    fn test_fiscal_code() {
        assert_eq!(sanitize_fiscal_code("rssmra85t10a562s!!"), "RSSMRA85T10A562S");
        assert_eq!(sanitize_fiscal_code("12345678-z"), "12345678Z");
    }

    #[test]
    fn test_phone() {
        assert_eq!(sanitize_phone("+34 (600) 123-456 ext<b>"), "+34 (600) 123-456");
        assert_eq!(sanitize_phone(&"9".repeat(40)).len(), MAX_PHONE_LEN);
    }

    #[test]
    fn test_email() {
        assert_eq!(sanitize_email(" User.Name+tag@Example.COM "), "user.name+tag@example.com");
        assert_eq!(sanitize_email("a<script>@b.c"), "ascript@b.c");
    }

    #[test]
    fn test_name_keeps_accents_and_punctuation() {
        assert_eq!(sanitize_name("  María   José O'Brien-Pérez Jr. "), "María José O'Brien-Pérez Jr.");
        assert_eq!(sanitize_name("<b>Ana</b> 123"), "Ana");
        assert_eq!(sanitize_name(&"a".repeat(200)).chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_amount_clamps_and_rounds() {
        let ceiling = dec!(999);
        assert_eq!(sanitize_amount(&RawAmount::Number(12.345), ceiling), dec!(12.35));
        assert_eq!(sanitize_amount(&RawAmount::Number(-5.0), ceiling), dec!(0));
        assert_eq!(sanitize_amount(&RawAmount::Number(5000.0), ceiling), dec!(999));
        assert_eq!(sanitize_amount(&"€ 1,200.50".into(), ceiling), dec!(999));
        assert_eq!(sanitize_amount(&"450.00 EUR".into(), ceiling), dec!(450));
    }

    #[test]
    fn test_amount_invalid_yields_zero() {
        let ceiling = dec!(999);
        assert_eq!(sanitize_amount(&"abc".into(), ceiling), Decimal::ZERO);
        assert_eq!(sanitize_amount(&"1.2.3".into(), ceiling), Decimal::ZERO);
        assert_eq!(sanitize_amount(&"".into(), ceiling), Decimal::ZERO);
        assert_eq!(sanitize_amount(&RawAmount::Number(f64::NAN), ceiling), Decimal::ZERO);
        assert_eq!(sanitize_amount(&RawAmount::Number(f64::INFINITY), ceiling), dec!(999));
    }

    #[test]
    fn test_amount_overflowing_digits_saturate() {
        let huge = "9".repeat(60);
        assert_eq!(sanitize_amount(&huge.as_str().into(), dec!(999)), dec!(999));
    }

    #[test]
    fn test_sanitize_object_walks_graph() {
        let input = json!({
            "name": "<b>Ana</b>",
            "tags": ["<i>vip</i>", 3],
            "nested": { "note": "x onclick=go() y", "ok": true },
            "missing": null
        });
        let output = sanitize_object(input);
        assert_eq!(
            output,
            json!({
                "name": "Ana",
                "tags": ["vip", 3],
                "nested": { "note": "x y", "ok": true },
                "missing": null
            })
        );
        assert_eq!(sanitize_object(Value::Null), Value::Null);
    }

    #[test]
    fn test_sanitizer_dispatch() {
        let sanitizer = Sanitizer::new(dec!(999));
        assert_eq!(sanitizer.sanitize(FieldKind::DocumentNumber, "ab123456"), "AB123456");
        assert_eq!(sanitizer.sanitize(FieldKind::Amount, "12.345"), "12.35");
        assert_eq!(sanitizer.sanitize_opt(FieldKind::Email, Some("<>")), None);
        assert_eq!(sanitizer.sanitize_opt(FieldKind::Phone, None), None);
    }
}
