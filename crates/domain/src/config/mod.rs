mod audit;
mod auth;
mod browser;
mod observability;
mod redaction;
mod server;
mod session;

pub use audit::*;
pub use auth::*;
pub use browser::*;
pub use observability::*;
pub use redaction::*;
pub use server::*;
pub use session::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means the configuration may be used as-is.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.requests_per_second".into(),
                    message: "requests_per_second must be greater than 0".into(),
                });
            }
            if rl.burst_size == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.burst_size".into(),
                    message: "burst_size must be greater than 0".into(),
                });
            }
        }

        if self.browser.max_browsers == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "browser.max_browsers".into(),
                message: "max_browsers must be greater than 0".into(),
            });
        }

        // A host cannot be both allowed and blocked — the block list always
        // wins at evaluation time, so this is surfaced as a warning, not an
        // error, to avoid blocking an otherwise-valid startup.
        for host in &self.browser.policy.allowed_domains {
            if self
                .browser
                .policy
                .blocked_domains
                .iter()
                .any(|b| b.eq_ignore_ascii_case(host))
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "browser.policy.allowed_domains".into(),
                    message: format!(
                        "host \"{host}\" appears in both allowed_domains and blocked_domains; blocked_domains wins"
                    ),
                });
            }
        }

        if matches!(self.auth.mode, AuthMode::Apikey | AuthMode::Both) && self.auth.api_keys.is_empty()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "auth.api_keys".into(),
                message: "authMode admits api keys but none are configured".into(),
            });
        }
        if matches!(self.auth.mode, AuthMode::Token | AuthMode::Both) && self.auth.tenant_id.is_none()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "auth.tenant_id".into(),
                message: "authMode admits bearer tokens but no tenant_id is configured".into(),
            });
        }

        for (i, pattern) in self.redaction.patterns.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("redaction.patterns[{i}]"),
                    message: format!("invalid regex \"{pattern}\": {e}"),
                });
            }
        }

        if self.session.ttl_minutes <= 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.ttl_minutes".into(),
                message: "ttl_minutes must be greater than 0".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = Config::default().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn zero_port_is_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        assert!(find_issue(&cfg.validate(), "server.port").is_some());
    }

    #[test]
    fn zero_max_browsers_is_error() {
        let mut cfg = Config::default();
        cfg.browser.max_browsers = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "browser.max_browsers").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn wildcard_cors_is_warning_not_error() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.cors").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn apikey_mode_without_keys_warns() {
        let mut cfg = Config::default();
        cfg.auth.mode = AuthMode::Apikey;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "auth.api_keys").is_some());
    }

    #[test]
    fn invalid_redaction_regex_is_error() {
        let mut cfg = Config::default();
        cfg.redaction.patterns.push("(unterminated".into());
        let issues = cfg.validate();
        let issue = find_issue(&issues, "redaction.patterns").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn host_in_both_lists_warns() {
        let mut cfg = Config::default();
        cfg.browser.policy.allowed_domains = vec!["example.com".into()];
        cfg.browser.policy.blocked_domains = vec!["EXAMPLE.COM".into()];
        let issues = cfg.validate();
        assert!(find_issue(&issues, "browser.policy.allowed_domains").is_some());
    }

    #[test]
    fn zero_ttl_is_error() {
        let mut cfg = Config::default();
        cfg.session.ttl_minutes = 0.0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "session.ttl_minutes").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }
}
