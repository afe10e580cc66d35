use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth & RBAC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// API key → role. Keys are never logged; see `wmcp_security::redaction`.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Bearer-token validation parameters.
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,

    /// Name of the environment variable holding the HMAC key used to
    /// validate bearer tokens. Never itself holds the secret.
    #[serde(default = "d_token_signing_key_env")]
    pub token_signing_key_env: String,

    /// When `false`, every authenticated principal is granted the `admin`
    /// role regardless of how it was derived.
    #[serde(default = "d_true")]
    pub rbac_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            api_keys: HashMap::new(),
            tenant_id: None,
            client_id: None,
            token_signing_key_env: d_token_signing_key_env(),
            rbac_enabled: d_true(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Apikey,
    Token,
    Both,
}

fn d_true() -> bool {
    true
}
fn d_token_signing_key_env() -> String {
    "WMCP_TOKEN_SIGNING_KEY".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_apikey() {
        assert_eq!(AuthConfig::default().mode, AuthMode::Apikey);
    }

    #[test]
    fn default_rbac_enabled() {
        assert!(AuthConfig::default().rbac_enabled);
    }

    #[test]
    fn deserialize_both_mode() {
        let cfg: AuthConfig = toml::from_str(r#"mode = "both""#).unwrap();
        assert_eq!(cfg.mode, AuthMode::Both);
    }
}
