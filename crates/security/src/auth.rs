//! Credential verification. Resolving *who is calling* (this module) is
//! kept separate from *what they may do* ([`crate::rbac`]) and from *how
//! the credential was carried on the wire* (an Axum extractor in the
//! gateway crate, following the same split the admin guard uses there).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use wmcp_domain::config::{AuthConfig, AuthMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalSource {
    Apikey,
    Token,
}

/// The authenticated identity attached to one request. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub source: PrincipalSource,
    pub role: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),
    #[error("auth mode {0:?} does not accept this credential type")]
    WrongCredentialType(AuthMode),
}

/// Compare a presented secret to an expected one in constant time,
/// independent of either string's length (both are first hashed to a
/// fixed-size digest). Mirrors the gateway's admin-token check.
fn secure_eq(expected: &str, provided: &str) -> bool {
    let expected_hash = Sha256::digest(expected.as_bytes());
    let provided_hash = Sha256::digest(provided.as_bytes());
    bool::from(expected_hash.ct_eq(&provided_hash))
}

/// Resolve a principal from a presented API key. `O(n)` in the number of
/// configured keys, each compared in constant time; the map lookup itself
/// (which key index matched) is not secret, only the key value is.
pub fn resolve_apikey(presented: &str, config: &AuthConfig) -> Result<Principal, AuthError> {
    if !matches!(config.mode, AuthMode::Apikey | AuthMode::Both) {
        return Err(AuthError::WrongCredentialType(config.mode));
    }
    if presented.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    find_role_for_key(presented, &config.api_keys)
        .map(|role| Principal {
            id: format!("apikey:{}", &fingerprint(presented)),
            source: PrincipalSource::Apikey,
            role,
            scopes: Vec::new(),
        })
        .ok_or(AuthError::InvalidApiKey)
}

fn find_role_for_key(presented: &str, api_keys: &HashMap<String, String>) -> Option<String> {
    api_keys
        .iter()
        .find(|(key, _)| secure_eq(key, presented))
        .map(|(_, role)| role.clone())
}

/// A short, non-reversible identifier for audit logs — never the key
/// itself.
fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..6])
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    scopes: Vec<String>,
}

/// Validate a bearer token against the configured tenant (issuer) and
/// client (audience), using the HMAC secret named by
/// `token_signing_key_env`. Role is claim-derived from the token's `role`
/// claim, defaulting to `viewer` when absent.
pub fn resolve_bearer_token(token: &str, config: &AuthConfig) -> Result<Principal, AuthError> {
    if !matches!(config.mode, AuthMode::Token | AuthMode::Both) {
        return Err(AuthError::WrongCredentialType(config.mode));
    }
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    let secret = std::env::var(&config.token_signing_key_env)
        .map_err(|_| AuthError::InvalidToken("signing key not configured".into()))?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    if let Some(tenant) = &config.tenant_id {
        validation.set_issuer(&[tenant]);
    } else {
        validation.insecure_disable_signature_validation_for_issuer_check_only_do_not_use_in_prod_unless_you_know_what_you_are_doing();
    }
    if let Some(client) = &config.client_id {
        validation.set_audience(&[client]);
    } else {
        validation.validate_aud = false;
    }

    let key = jsonwebtoken::DecodingKey::from_secret(secret.as_bytes());
    let data = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(Principal {
        id: data.claims.sub,
        source: PrincipalSource::Token,
        role: data.claims.role.unwrap_or_else(|| "viewer".into()),
        scopes: data.claims.scopes,
    })
}

/// When RBAC is disabled, every authenticated principal is promoted to
/// `admin`, per spec.
pub fn apply_rbac_override(mut principal: Principal, config: &AuthConfig) -> Principal {
    if !config.rbac_enabled {
        principal.role = "admin".into();
    }
    principal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(pairs: &[(&str, &str)]) -> AuthConfig {
        AuthConfig {
            mode: AuthMode::Apikey,
            api_keys: pairs
                .iter()
                .map(|(k, r)| (k.to_string(), r.to_string()))
                .collect(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn valid_apikey_resolves_role() {
        let cfg = config_with_keys(&[("abc123", "operator")]);
        let principal = resolve_apikey("abc123", &cfg).unwrap();
        assert_eq!(principal.role, "operator");
        assert_eq!(principal.source, PrincipalSource::Apikey);
    }

    #[test]
    fn unknown_apikey_is_rejected() {
        let cfg = config_with_keys(&[("abc123", "operator")]);
        assert!(matches!(
            resolve_apikey("wrong", &cfg),
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[test]
    fn empty_apikey_is_missing_credential() {
        let cfg = config_with_keys(&[("abc123", "operator")]);
        assert!(matches!(
            resolve_apikey("", &cfg),
            Err(AuthError::MissingCredential)
        ));
    }

    #[test]
    fn apikey_rejected_when_mode_is_token_only() {
        let mut cfg = config_with_keys(&[("abc123", "operator")]);
        cfg.mode = AuthMode::Token;
        assert!(matches!(
            resolve_apikey("abc123", &cfg),
            Err(AuthError::WrongCredentialType(_))
        ));
    }

    #[test]
    fn rbac_override_promotes_to_admin_when_disabled() {
        let cfg = AuthConfig {
            rbac_enabled: false,
            ..AuthConfig::default()
        };
        let principal = Principal {
            id: "x".into(),
            source: PrincipalSource::Apikey,
            role: "viewer".into(),
            scopes: Vec::new(),
        };
        let principal = apply_rbac_override(principal, &cfg);
        assert_eq!(principal.role, "admin");
    }

    #[test]
    fn rbac_override_leaves_role_untouched_when_enabled() {
        let cfg = AuthConfig::default();
        let principal = Principal {
            id: "x".into(),
            source: PrincipalSource::Apikey,
            role: "viewer".into(),
            scopes: Vec::new(),
        };
        let principal = apply_rbac_override(principal, &cfg);
        assert_eq!(principal.role, "viewer");
    }
}
