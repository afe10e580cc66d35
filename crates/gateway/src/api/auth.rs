//! Principal resolution for the HTTP transport.
//!
//! Credential *verification* lives in `wmcp_security::auth`; this module is
//! only the wire-level half — pulling the right header for the configured
//! auth mode and turning a failure into an HTTP 401.
//! A `FromRequestParts` extractor that handlers opt into by naming it in
//! their argument list.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use wmcp_domain::config::{AuthConfig, AuthMode};
use wmcp_domain::trace::TraceEvent;
use wmcp_security::auth::{apply_rbac_override, resolve_apikey, resolve_bearer_token, AuthError, Principal};

use crate::state::AppState;

/// Correlation id minted once per request, threaded through every audit
/// event so a downstream reader can reconstruct one request's timeline.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, axum::http::header::AUTHORIZATION.as_str())?.strip_prefix("Bearer ")
}

/// Resolve the caller's [`Principal`] from whichever credential the
/// configured [`AuthMode`] expects.
pub fn resolve_principal(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal, AuthError> {
    let api_key = header_str(headers, "api-key");
    let bearer = bearer_token(headers);

    let principal = match config.mode {
        AuthMode::Apikey => resolve_apikey(api_key.ok_or(AuthError::MissingCredential)?, config)?,
        AuthMode::Token => resolve_bearer_token(bearer.ok_or(AuthError::MissingCredential)?, config)?,
        AuthMode::Both => match api_key {
            Some(key) => resolve_apikey(key, config)?,
            None => resolve_bearer_token(bearer.ok_or(AuthError::MissingCredential)?, config)?,
        },
    };

    Ok(apply_rbac_override(principal, config))
}

/// The authenticated caller, extracted from the request and attached to
/// the handler's argument list. Mints and stashes the [`CorrelationId`]
/// into request extensions along the way, so it is available even on the
/// failure path below.
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedPrincipal {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId(Uuid::new_v4().to_string());
        let correlation_id_str = correlation_id.0.clone();
        parts.extensions.insert(correlation_id);

        match resolve_principal(&parts.headers, &state.config.auth) {
            Ok(principal) => Ok(AuthenticatedPrincipal(principal)),
            Err(e) => {
                state.audit.record(TraceEvent::AuthFailed {
                    correlation_id: correlation_id_str,
                    reason: e.to_string(),
                });
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": e.to_string() })),
                ))
            }
        }
    }
}
