//! Shared enumerations

use serde::{Deserialize, Serialize};

/// Language used for user-facing validation messages.
///
/// The core only ships message content; rendering and any further
/// localisation belong to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Spanish, the base locale of the reference jurisdiction.
    #[default]
    Es,
    /// English.
    En,
}

impl Locale {
    /// Parse a BCP-47-ish tag, falling back to the base locale.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Locale::En,
            _ => Locale::Es,
        }
    }
}
