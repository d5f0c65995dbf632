//! Tracing Subscriber Initialization
//!
//! Installs a global `tracing` subscriber with an `EnvFilter` and either JSON
//! or human-readable output. Call once at application startup.

use crate::error::{ServiceError, ServiceResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "remitcap=info,remitcap_api=info,remitcap_storage=info";

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "text" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `REMITCAP_LOG_FORMAT`: `json` or `pretty`
    pub format: LogFormat,
    /// Fallback directive when `RUST_LOG` is absent
    pub default_filter: String,
    /// `REMITCAP_SERVICE_NAME`
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_filter: DEFAULT_FILTER.to_string(),
            service_name: "remitcap".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            format: lookup("REMITCAP_LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            default_filter: defaults.default_filter,
            service_name: lookup("REMITCAP_SERVICE_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.service_name),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> ServiceResult<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ServiceError::internal_error(format!("Failed to init subscriber: {e}")))?;

    tracing::info!(
        service_name = config.service_name,
        format = ?config.format,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::from_lookup(|_| None);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.service_name, "remitcap");
        assert_eq!(config.default_filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_telemetry_config_from_lookup() {
        let config = TelemetryConfig::from_lookup(|name| match name {
            "REMITCAP_LOG_FORMAT" => Some("JSON".to_string()),
            "REMITCAP_SERVICE_NAME" => Some("dashboard".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.service_name, "dashboard");

        let config = TelemetryConfig::from_lookup(|_| Some("xml".to_string()));
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_telemetry_config_from_env() {
        let _format = EnvVarGuard::set("REMITCAP_LOG_FORMAT", Some("json"));
        let _name = EnvVarGuard::set("REMITCAP_SERVICE_NAME", None);
        let config = TelemetryConfig::from_env();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.service_name, "remitcap");
    }

    #[test]
    fn test_init_twice_fails() {
        let config = TelemetryConfig::default();
        // Another test may have installed a subscriber first; the second call
        // must fail either way.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
