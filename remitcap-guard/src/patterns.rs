//! Dangerous-pattern detection.
//!
//! Detection never mutates its input. It is used to raise a security signal
//! even for fields where sanitization would strip the payload anyway.

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::{Deserialize, Serialize};

/// Category of a detected payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    ScriptTag,
    JavascriptUri,
    EventHandler,
    HtmlDataUri,
    EmbeddedFrame,
    SqlTautology,
    SqlDropTable,
    SqlDeleteFrom,
    SqlUnionSelect,
    SqlLineComment,
    SqlBlockComment,
}

/// Patterns in the same order as [`ThreatKind`] variants in `KINDS`.
const PATTERNS: [&str; 11] = [
    r"(?i)<\s*script\b",
    r"(?i)javascript\s*:",
    r"(?i)\bon[a-z]+\s*=",
    r"(?i)data\s*:\s*text/html",
    r"(?i)<\s*(?:iframe|embed|object)\b",
    r"(?i)'\s*or\b\s*'?\w+'?\s*=\s*'?\w+",
    r"(?i);\s*drop\s+table\b",
    r"(?i);\s*delete\s+from\b",
    r"(?i)\bunion\s+(?:all\s+)?select\b",
    r"--\s*$",
    r"(?s)/\*.*?\*/",
];

const KINDS: [ThreatKind; 11] = [
    ThreatKind::ScriptTag,
    ThreatKind::JavascriptUri,
    ThreatKind::EventHandler,
    ThreatKind::HtmlDataUri,
    ThreatKind::EmbeddedFrame,
    ThreatKind::SqlTautology,
    ThreatKind::SqlDropTable,
    ThreatKind::SqlDeleteFrom,
    ThreatKind::SqlUnionSelect,
    ThreatKind::SqlLineComment,
    ThreatKind::SqlBlockComment,
];

static THREATS: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(PATTERNS).expect("Invalid threat pattern"));

/// Whether the value contains any known injection payload.
pub fn contains_dangerous_patterns(value: &str) -> bool {
    !value.is_empty() && THREATS.is_match(value)
}

/// Every kind of payload found in the value, in declaration order.
pub fn detect_threats(value: &str) -> Vec<ThreatKind> {
    if value.is_empty() {
        return Vec::new();
    }
    THREATS
        .matches(value)
        .into_iter()
        .map(|index| KINDS[index])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_script_injection() {
        assert!(contains_dangerous_patterns("<script>alert(1)</script>"));
        assert!(contains_dangerous_patterns("< SCRIPT src=x>"));
        assert!(contains_dangerous_patterns("<a href=\"javascript:alert(1)\">"));
        assert!(contains_dangerous_patterns("<img src=x onerror=alert(1)>"));
        assert!(contains_dangerous_patterns("data:text/html;base64,PHNjcmlwdD4="));
        assert!(contains_dangerous_patterns("<iframe src=//evil>"));
    }

    #[test]
    fn test_detects_sql_injection() {
        assert!(contains_dangerous_patterns("' or '1'='1"));
        assert!(contains_dangerous_patterns("admin' OR 1=1"));
        assert!(contains_dangerous_patterns("; drop table users--"));
        assert!(contains_dangerous_patterns("x; DELETE FROM customers"));
        assert!(contains_dangerous_patterns("1 UNION ALL SELECT password"));
        assert!(contains_dangerous_patterns("name /* hidden */"));
        assert!(contains_dangerous_patterns("admin'--"));
    }

    #[test]
    fn test_benign_values_pass() {
        assert!(!contains_dangerous_patterns("María José"));
        assert!(!contains_dangerous_patterns("user@example.com"));
        assert!(!contains_dangerous_patterns("O'Brien"));
        assert!(!contains_dangerous_patterns("D'Orsay = 5"));
        assert!(!contains_dangerous_patterns("Calle Mayor 12, 3º-B"));
        assert!(!contains_dangerous_patterns("+34 (600) 123-456"));
        assert!(!contains_dangerous_patterns(""));
    }

    #[test]
    fn test_detect_threats_lists_every_kind() {
        let kinds = detect_threats("<script>x</script>; drop table users--");
        assert!(kinds.contains(&ThreatKind::ScriptTag));
        assert!(kinds.contains(&ThreatKind::SqlDropTable));
        assert!(kinds.contains(&ThreatKind::SqlLineComment));
        assert!(detect_threats("Ana").is_empty());
    }
}
