use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Browser pool & egress policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Hard cap on concurrently live browser processes.
    #[serde(default = "d_max_browsers")]
    pub max_browsers: usize,

    /// Enforce URL policy on every subresource request made inside the
    /// brokered browser, not just on the caller-supplied navigation target.
    #[serde(default = "d_true")]
    pub network_egress_control: bool,

    #[serde(default)]
    pub policy: UrlPolicyConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            max_browsers: d_max_browsers(),
            network_egress_control: d_true(),
            policy: UrlPolicyConfig::default(),
        }
    }
}

/// Host allow/block lists consulted by `wmcp_security::url_policy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlPolicyConfig {
    /// Empty means "any host is allowed" (subject to the block list).
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

fn d_max_browsers() -> usize {
    5
}
fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_browsers_is_five() {
        assert_eq!(BrowserConfig::default().max_browsers, 5);
    }

    #[test]
    fn default_egress_control_enabled() {
        assert!(BrowserConfig::default().network_egress_control);
    }

    #[test]
    fn empty_allow_list_means_any() {
        assert!(UrlPolicyConfig::default().allowed_domains.is_empty());
    }
}
