use serde::{Deserialize, Serialize};

use crate::trace::AuditLevel;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Audit sink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub level: AuditLevel,

    /// Optional external sink URL. The broker always logs locally via
    /// `tracing`; this is an additional forwarding target and its absence
    /// never disables local audit emission.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            level: AuditLevel::default(),
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_basic() {
        assert_eq!(AuditConfig::default().level, AuditLevel::Basic);
    }

    #[test]
    fn deserialize_full_level() {
        let cfg: AuditConfig = toml::from_str(r#"level = "full""#).unwrap();
        assert_eq!(cfg.level, AuditLevel::Full);
    }
}
