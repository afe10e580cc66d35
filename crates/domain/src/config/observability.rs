use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability (structured logging) configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Logging configuration. No external telemetry sink is configured here,
/// but the broker's own process logs are still structured and
/// level-filterable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `json` for machine-readable production logs, `pretty` for local dev.
    #[serde(default)]
    pub log_format: LogFormat,

    /// `tracing_subscriber::EnvFilter` directive string. Overridden by the
    /// `RUST_LOG` environment variable if set.
    #[serde(default = "d_log_filter")]
    pub log_filter: String,

    /// The `service.name` field attached to every log line.
    #[serde(default = "d_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: d_log_filter(),
            service_name: d_service_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

fn d_log_filter() -> String {
    "info".into()
}

fn d_service_name() -> String {
    "webmcp-broker".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_json() {
        assert_eq!(ObservabilityConfig::default().log_format, LogFormat::Json);
    }

    #[test]
    fn default_filter_is_info() {
        assert_eq!(ObservabilityConfig::default().log_filter, "info");
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.service_name, "webmcp-broker");
    }

    #[test]
    fn deserialize_pretty_format() {
        let cfg: ObservabilityConfig = toml::from_str(r#"log_format = "pretty""#).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }
}
