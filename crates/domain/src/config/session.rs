use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default TTL for newly created sessions. Accepts fractional minutes
    /// so short-lived test sessions (e.g. 0.01 min) can be expressed.
    #[serde(default = "d_ttl_minutes")]
    pub ttl_minutes: f64,

    /// Default value of `recordingEnabled` for newly created sessions.
    #[serde(default)]
    pub recording_default: bool,

    /// Sweep cadence for the background TTL eviction loop.
    #[serde(default = "d_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: d_ttl_minutes(),
            recording_default: false,
            sweep_interval_secs: d_sweep_interval_secs(),
        }
    }
}

fn d_ttl_minutes() -> f64 {
    15.0
}
fn d_sweep_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_fifteen_minutes() {
        assert_eq!(SessionConfig::default().ttl_minutes, 15.0);
    }

    #[test]
    fn default_sweep_interval_is_sixty_seconds() {
        assert_eq!(SessionConfig::default().sweep_interval_secs, 60);
    }

    #[test]
    fn deserialize_fractional_ttl() {
        let cfg: SessionConfig = toml::from_str("ttl_minutes = 0.01").unwrap();
        assert!((cfg.ttl_minutes - 0.01).abs() < f64::EPSILON);
    }
}
