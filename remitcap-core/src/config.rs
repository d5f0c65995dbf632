//! Compliance and cache configuration
//!
//! The legal ceiling and window length differ between jurisdictions, so they
//! are configuration, never literals at call sites. Every field has a serde
//! default so partial JSON files and sparse environments are accepted.

use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for every environment variable read by [`ComplianceConfig::from_env`].
pub const ENV_PREFIX: &str = "REMITCAP_";

// ============================================================================
// TTL TIERS
// ============================================================================

/// Named staleness tolerances for cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlTier {
    /// Ordinary reads (~1 minute).
    Default,
    /// Customer and transfer lists (~5 minutes).
    Lists,
    /// Rarely-changing data (~15 minutes).
    Stable,
    /// Eligibility verdicts (~30 seconds); legally sensitive.
    Eligibility,
}

// ============================================================================
// CACHE SETTINGS
// ============================================================================

/// Settings for the in-process cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of live entries before the oldest is evicted.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL for [`TtlTier::Default`], in milliseconds.
    #[serde(default = "default_default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// TTL for [`TtlTier::Lists`], in milliseconds.
    #[serde(default = "default_list_ttl_ms")]
    pub list_ttl_ms: u64,

    /// TTL for [`TtlTier::Stable`], in milliseconds.
    #[serde(default = "default_stable_ttl_ms")]
    pub stable_ttl_ms: u64,

    /// TTL for [`TtlTier::Eligibility`], in milliseconds.
    #[serde(default = "default_eligibility_ttl_ms")]
    pub eligibility_ttl_ms: u64,

    /// How often the background sweeper purges expired entries.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_max_entries() -> usize {
    1_000
}

fn default_default_ttl_ms() -> u64 {
    60_000
}

fn default_list_ttl_ms() -> u64 {
    300_000
}

fn default_stable_ttl_ms() -> u64 {
    900_000
}

fn default_eligibility_ttl_ms() -> u64 {
    30_000
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_ttl_ms: default_default_ttl_ms(),
            list_ttl_ms: default_list_ttl_ms(),
            stable_ttl_ms: default_stable_ttl_ms(),
            eligibility_ttl_ms: default_eligibility_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl CacheSettings {
    /// Resolve a tier to its duration.
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        let ms = match tier {
            TtlTier::Default => self.default_ttl_ms,
            TtlTier::Lists => self.list_ttl_ms,
            TtlTier::Stable => self.stable_ttl_ms,
            TtlTier::Eligibility => self.eligibility_ttl_ms,
        };
        Duration::from_millis(ms)
    }

    /// The default TTL as a duration.
    pub fn default_ttl(&self) -> Duration {
        self.ttl(TtlTier::Default)
    }

    /// The sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

// ============================================================================
// COMPLIANCE CONFIG
// ============================================================================

/// Configuration for the compliance layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Absolute legal maximum per customer within one rolling window.
    #[serde(default = "default_ceiling")]
    pub ceiling: Decimal,

    /// Length of the rolling window, in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Minimum customer age in whole years; `None` disables the check.
    #[serde(default = "default_minimum_age_years")]
    pub minimum_age_years: Option<u32>,

    /// Shortest accepted identity document number.
    #[serde(default = "default_min_document_length")]
    pub min_document_length: usize,

    /// Shortest accepted operator password.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_ceiling() -> Decimal {
    Decimal::new(999, 0)
}

fn default_window_days() -> u32 {
    8
}

fn default_minimum_age_years() -> Option<u32> {
    Some(18)
}

fn default_min_document_length() -> usize {
    5
}

fn default_min_password_length() -> usize {
    8
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            window_days: default_window_days(),
            minimum_age_years: default_minimum_age_years(),
            min_document_length: default_min_document_length(),
            min_password_length: default_min_password_length(),
            cache: CacheSettings::default(),
        }
    }
}

impl ComplianceConfig {
    /// Parse configuration from a JSON string, then validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file, then validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `REMITCAP_CEILING`: legal ceiling (default: 999)
    /// - `REMITCAP_WINDOW_DAYS`: rolling window length (default: 8)
    /// - `REMITCAP_MINIMUM_AGE_YEARS`: minimum age, `0` disables (default: 18)
    /// - `REMITCAP_MIN_DOCUMENT_LENGTH`: (default: 5)
    /// - `REMITCAP_MIN_PASSWORD_LENGTH`: (default: 8)
    /// - `REMITCAP_CACHE_MAX_ENTRIES`: (default: 1000)
    /// - `REMITCAP_CACHE_DEFAULT_TTL_MS`: (default: 60000)
    /// - `REMITCAP_CACHE_LIST_TTL_MS`: (default: 300000)
    /// - `REMITCAP_CACHE_STABLE_TTL_MS`: (default: 900000)
    /// - `REMITCAP_CACHE_ELIGIBILITY_TTL_MS`: (default: 30000)
    /// - `REMITCAP_CACHE_SWEEP_INTERVAL_MS`: (default: 60000)
    ///
    /// Absent or unparseable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn read<T: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            name: &str,
            fallback: T,
        ) -> T {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(fallback)
        }

        let defaults = Self::default();
        let cache_defaults = CacheSettings::default();
        let minimum_age: u32 = read(
            &lookup,
            "MINIMUM_AGE_YEARS",
            defaults.minimum_age_years.unwrap_or(0),
        );

        Self {
            ceiling: read(&lookup, "CEILING", defaults.ceiling),
            window_days: read(&lookup, "WINDOW_DAYS", defaults.window_days),
            minimum_age_years: (minimum_age > 0).then_some(minimum_age),
            min_document_length: read(
                &lookup,
                "MIN_DOCUMENT_LENGTH",
                defaults.min_document_length,
            ),
            min_password_length: read(
                &lookup,
                "MIN_PASSWORD_LENGTH",
                defaults.min_password_length,
            ),
            cache: CacheSettings {
                max_entries: read(&lookup, "CACHE_MAX_ENTRIES", cache_defaults.max_entries),
                default_ttl_ms: read(
                    &lookup,
                    "CACHE_DEFAULT_TTL_MS",
                    cache_defaults.default_ttl_ms,
                ),
                list_ttl_ms: read(&lookup, "CACHE_LIST_TTL_MS", cache_defaults.list_ttl_ms),
                stable_ttl_ms: read(
                    &lookup,
                    "CACHE_STABLE_TTL_MS",
                    cache_defaults.stable_ttl_ms,
                ),
                eligibility_ttl_ms: read(
                    &lookup,
                    "CACHE_ELIGIBILITY_TTL_MS",
                    cache_defaults.eligibility_ttl_ms,
                ),
                sweep_interval_ms: read(
                    &lookup,
                    "CACHE_SWEEP_INTERVAL_MS",
                    cache_defaults.sweep_interval_ms,
                ),
            },
        }
    }

    /// Reject configurations that would make the layer unsafe or useless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ceiling <= Decimal::ZERO {
            return Err(invalid("ceiling", self.ceiling, "must be positive"));
        }
        if self.window_days == 0 {
            return Err(invalid("window_days", self.window_days, "must be positive"));
        }
        if self.min_document_length == 0 {
            return Err(invalid(
                "min_document_length",
                self.min_document_length,
                "must be positive",
            ));
        }
        let cache = &self.cache;
        if cache.max_entries == 0 {
            return Err(invalid("cache.max_entries", cache.max_entries, "must be positive"));
        }
        if cache.eligibility_ttl_ms == 0 {
            return Err(invalid(
                "cache.eligibility_ttl_ms",
                cache.eligibility_ttl_ms,
                "must be positive",
            ));
        }
        if cache.sweep_interval_ms == 0 {
            return Err(invalid(
                "cache.sweep_interval_ms",
                cache.sweep_interval_ms,
                "must be positive",
            ));
        }
        let ordered = cache.eligibility_ttl_ms <= cache.default_ttl_ms
            && cache.default_ttl_ms <= cache.list_ttl_ms
            && cache.list_ttl_ms <= cache.stable_ttl_ms;
        if !ordered {
            return Err(invalid(
                "cache",
                format!(
                    "{}/{}/{}/{}",
                    cache.eligibility_ttl_ms,
                    cache.default_ttl_ms,
                    cache.list_ttl_ms,
                    cache.stable_ttl_ms
                ),
                "TTL tiers must satisfy eligibility <= default <= lists <= stable",
            ));
        }
        Ok(())
    }

    /// The rolling window as a chrono duration.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.window_days))
    }

    /// Resolve a TTL tier.
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        self.cache.ttl(tier)
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
