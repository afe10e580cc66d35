//! The single `/mcp` transport endpoint: size-caps and parses the body,
//! authenticates, applies the coarse method-name RBAC checks that don't
//! need the request body, dispatches to the protocol handler, and audits
//! admission/denial around it. Per-tool-category RBAC (which needs the
//! tool name out of `tools/call`'s own params) is the handler's job, not
//! this layer's — see `wmcp_protocol::handler`.

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use wmcp_domain::trace::{AuditLevel, TraceEvent};
use wmcp_protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use wmcp_security::rbac::may;
use wmcp_security::redaction::RedactionPolicy;

use crate::api::auth::{AuthenticatedPrincipal, CorrelationId};
use crate::state::AppState;

/// The coarse, method-name-only RBAC action a method requires before its
/// params are even parsed. `tools/call` is deliberately absent — its
/// action depends on the tool name, which the handler resolves itself.
fn coarse_action_for(method: &str) -> Option<&'static str> {
    match method {
        "session/open" => Some("session.create"),
        "session/close" => Some("session.close"),
        "tools/list" => Some("tool.list"),
        _ => None,
    }
}

pub async fn mcp(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Extension(CorrelationId(correlation_id)): Extension<CorrelationId>,
    body: Bytes,
) -> Response {
    if body.len() > state.config.server.max_body_bytes {
        return json_rpc_error(JsonRpcError::invalid_request("request body exceeds size cap"));
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return json_rpc_error(JsonRpcError::parse_error(e.to_string())),
    };

    if let Some(action) = coarse_action_for(&request.method) {
        if !may(&principal, action) {
            state.audit.record(TraceEvent::AuthzDenied {
                correlation_id: correlation_id.clone(),
                principal_id: principal.id.clone(),
                action: action.to_string(),
            });
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": format!("principal is not permitted to perform {action}") })),
            )
                .into_response();
        }
    }

    state.audit.record(TraceEvent::RequestAdmitted {
        correlation_id: correlation_id.clone(),
        method: request.method.clone(),
        principal_id: principal.id.clone(),
        role: principal.role.clone(),
    });

    let full_audit = state.config.audit.level == AuditLevel::Full;
    let method = request.method.clone();
    if full_audit {
        let redaction = RedactionPolicy::new(&state.config.redaction);
        state.audit.record(TraceEvent::RequestBody {
            correlation_id: correlation_id.clone(),
            method: method.clone(),
            body: redaction.redact_payload(request.params.as_ref().unwrap_or(&serde_json::Value::Null)),
        });
    }

    let is_tool_call = method == "tools/call";
    let response = state.handler.handle(&principal, &correlation_id, request).await;
    if is_tool_call {
        if let Some(r) = &response {
            if r.error.is_none() {
                state.metrics.record_tool_call();
            }
        }
    }

    if full_audit {
        if let Some(response) = &response {
            let redaction = RedactionPolicy::new(&state.config.redaction);
            let body = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);
            state.audit.record(TraceEvent::ResponseBody {
                correlation_id: correlation_id.clone(),
                body: redaction.redact_payload(&body),
            });
        }
    }

    match response {
        Some(response) => {
            let response = if full_audit {
                response.with_correlation_id(&correlation_id)
            } else {
                response
            };
            Json(response).into_response()
        }
        // Notifications never get a JSON-RPC response; the caller still
        // needs an HTTP status, and 204 carries no implication about the
        // notification having been acted on (MCP gives none either way).
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn json_rpc_error(error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::error(serde_json::Value::Null, error)).into_response()
}
