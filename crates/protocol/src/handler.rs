//! The MCP protocol handler: routes a parsed JSON-RPC envelope to the
//! session store, browser pool, and tool executor, and folds every error
//! kind into the documented JSON-RPC code or tool-envelope shape.
//!
//! Authentication (who is calling) and the coarse RBAC checks that need
//! only the method name (`session.create`, `session.close`, `tool.list`)
//! are the HTTP transport's job, applied before a request ever reaches
//! here — see the gateway crate. The one RBAC check that cannot happen
//! before dispatch is `tool.call:<category>`, since the category is only
//! known once `tools/call`'s own params (the tool name) are parsed; that
//! check is made here, and a denial is reported as a JSON-RPC error in the
//! implementation-defined server-error range rather than an HTTP 403,
//! since every protocol response is HTTP 200 by contract.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use wmcp_browser::{ActionRecord, PoolError, SessionPhase, SessionStore};
use wmcp_domain::config::Config;
use wmcp_domain::trace::{AuditSink, TraceEvent};
use wmcp_security::auth::Principal;
use wmcp_security::rbac::may;
use wmcp_security::redaction::RedactionPolicy;
use wmcp_security::url_policy::is_url_allowed;
use wmcp_tools::{ExecutionContext, ToolCategory};

use crate::error::ProtocolError;
use crate::jsonrpc::{
    initialize_result, JsonRpcError, JsonRpcRequest, JsonRpcResponse, SessionCloseParams,
    SessionCloseResult, SessionOpenParams, SessionOpenResult, ToolCallParams, ToolCallResult,
    ToolsListParams, ToolsListResult,
};

impl JsonRpcError {
    /// Implementation-defined server-error range (`-32000`..`-32099` per
    /// JSON-RPC 2.0), used for the one authorization check that can only
    /// happen after params are parsed.
    pub const FORBIDDEN: i64 = -32001;

    pub fn forbidden(action: &str) -> Self {
        Self {
            code: Self::FORBIDDEN,
            message: format!("principal is not permitted to perform {action}"),
            data: Some(serde_json::json!({ "action": action })),
        }
    }
}

fn parse_optional<T: DeserializeOwned + Default>(params: Value) -> T {
    serde_json::from_value(params).unwrap_or_default()
}

fn parse_required<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

pub struct McpHandler {
    sessions: Arc<SessionStore>,
    pool: Arc<wmcp_browser::BrowserPool>,
    config: Arc<Config>,
    redaction: RedactionPolicy,
    audit: AuditSink,
}

impl McpHandler {
    pub fn new(
        sessions: Arc<SessionStore>,
        pool: Arc<wmcp_browser::BrowserPool>,
        config: Arc<Config>,
        audit: AuditSink,
    ) -> Self {
        let redaction = RedactionPolicy::new(&config.redaction);
        Self { sessions, pool, config, redaction, audit }
    }

    /// Handle one envelope. Returns `None` for notifications, which never
    /// receive a response.
    pub async fn handle(
        &self,
        principal: &Principal,
        correlation_id: &str,
        request: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(&request.method, correlation_id);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        let method = request.method.clone();
        let params = request.params_or_null();
        let response = match self.dispatch(principal, correlation_id, &method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        };
        Some(response)
    }

    fn handle_notification(&self, method: &str, correlation_id: &str) {
        if method == "notifications/cancelled" {
            self.audit.record(TraceEvent::RequestCancelled {
                correlation_id: correlation_id.to_string(),
                method: method.to_string(),
            });
        }
        // `notifications/initialized` and any other client notification we
        // don't act on are simply dropped; MCP does not require an ack.
    }

    async fn dispatch(
        &self,
        principal: &Principal,
        correlation_id: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(self.initialize(params)),
            "initialized" | "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.tools_list(params).await,
            "tools/call" => self.tools_call(principal, correlation_id, params).await,
            "session/open" => self.session_open(principal, correlation_id, params).await,
            "session/close" => self.session_close(principal, correlation_id, params).await,
            "resources/list" => Ok(serde_json::json!({ "resources": [] })),
            "resources/templates/list" => Ok(serde_json::json!({ "resourceTemplates": [] })),
            "prompts/list" => Ok(serde_json::json!({ "prompts": [] })),
            "completion/complete" => {
                Ok(serde_json::json!({ "completion": { "values": [], "total": 0, "hasMore": false } }))
            }
            "logging/setLevel" => Ok(serde_json::json!({})),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Value) -> Value {
        let caller_version = params.get("protocolVersion").and_then(Value::as_str);
        serde_json::to_value(initialize_result(caller_version)).expect("InitializeResult serializes")
    }

    async fn session_open(
        &self,
        principal: &Principal,
        correlation_id: &str,
        params: Value,
    ) -> Result<Value, JsonRpcError> {
        if !may(principal, "session.create") {
            self.audit.record(TraceEvent::AuthzDenied {
                correlation_id: correlation_id.to_string(),
                principal_id: principal.id.clone(),
                action: "session.create".to_string(),
            });
            return Err(JsonRpcError::forbidden("session.create"));
        }

        let params: SessionOpenParams = parse_required(params)?;
        if params.url.trim().is_empty() {
            return Err(JsonRpcError::invalid_params("url is required"));
        }

        let verdict = is_url_allowed(&params.url, &self.config.browser.policy);
        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_default();
            self.audit.record(TraceEvent::UrlBlocked {
                correlation_id: correlation_id.to_string(),
                url: params.url.clone(),
                reason: reason.clone(),
            });
            return Err(JsonRpcError::invalid_params(format!(
                "url blocked by policy: {reason}"
            )));
        }

        let handle = self.pool.acquire().await.map_err(|e| match e {
            PoolError::Exhausted { live, max } => {
                self.audit.record(TraceEvent::PoolExhausted {
                    correlation_id: correlation_id.to_string(),
                    max_browsers: max,
                });
                JsonRpcError::from(ProtocolError::Resource(format!(
                    "pool exhausted: {live}/{max} browsers already live"
                )))
            }
            PoolError::Launch(msg) => JsonRpcError::internal(msg),
        })?;

        let redaction_css = self.redaction.screenshot_style_snippet();
        let page = match handle
            .new_page(
                &params.url,
                self.config.browser.network_egress_control,
                &self.config.browser.policy,
                redaction_css,
            )
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.pool.release(handle).await;
                return Err(JsonRpcError::internal(e.to_string()));
            }
        };

        let ttl_minutes = params.ttl_minutes.unwrap_or(self.config.session.ttl_minutes);
        let ttl = chrono::Duration::milliseconds((ttl_minutes * 60_000.0) as i64);
        let recording_enabled =
            params.recording_enabled.unwrap_or(self.config.session.recording_default);

        let session_id = self.sessions.create(handle, page, params.url.clone(), ttl, recording_enabled);

        self.audit.record(TraceEvent::SessionOpened {
            correlation_id: correlation_id.to_string(),
            session_id: session_id.to_string(),
            url: params.url,
        });

        Ok(serde_json::to_value(SessionOpenResult { session_id: session_id.to_string() })
            .expect("SessionOpenResult serializes"))
    }

    async fn session_close(
        &self,
        principal: &Principal,
        correlation_id: &str,
        params: Value,
    ) -> Result<Value, JsonRpcError> {
        if !may(principal, "session.close") {
            self.audit.record(TraceEvent::AuthzDenied {
                correlation_id: correlation_id.to_string(),
                principal_id: principal.id.clone(),
                action: "session.close".to_string(),
            });
            return Err(JsonRpcError::forbidden("session.close"));
        }

        let params: SessionCloseParams = parse_required(params)?;
        let id = Uuid::parse_str(&params.session_id)
            .map_err(|_| JsonRpcError::invalid_params("invalid sessionId"))?;

        // close() is idempotent; closing an already-closed or unknown id is
        // not an error, matching the store's own contract.
        self.sessions.close(id).await;

        self.audit.record(TraceEvent::SessionClosed {
            correlation_id: correlation_id.to_string(),
            session_id: params.session_id,
            reason: "explicit".to_string(),
        });

        Ok(serde_json::to_value(SessionCloseResult { closed: true })
            .expect("SessionCloseResult serializes"))
    }

    async fn tools_list(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: ToolsListParams = parse_optional(params);

        let tools = match params.session_id {
            None => wmcp_tools::fallback_catalog(),
            Some(raw_id) => {
                let id = Uuid::parse_str(&raw_id)
                    .map_err(|_| JsonRpcError::invalid_params("invalid sessionId"))?;
                let discovered = self
                    .sessions
                    .with_session(id, |handle| async move { wmcp_tools::discover(&handle.page).await })
                    .await
                    .map_err(|_| {
                        JsonRpcError::from(ProtocolError::Session(format!(
                            "unknown or expired session: {raw_id}"
                        )))
                    })?;
                let discovered = discovered.map_err(|e| JsonRpcError::internal(e.to_string()))?;
                let _ = self.sessions.update_meta(id, |session| {
                    session.has_webmcp = discovered.has_web_mcp;
                    if discovered.has_web_mcp {
                        session.phase = SessionPhase::Discovered;
                    }
                });
                discovered.tools
            }
        };

        Ok(serde_json::to_value(ToolsListResult { tools }).expect("ToolsListResult serializes"))
    }

    async fn tools_call(
        &self,
        principal: &Principal,
        correlation_id: &str,
        params: Value,
    ) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = parse_required(params)?;
        if params.name.trim().is_empty() {
            return Err(JsonRpcError::invalid_params("name is required"));
        }

        let category = wmcp_tools::category_for(&params.name).unwrap_or(ToolCategory::Composite);
        let action = format!("tool.call:{}", category.as_str());
        if !may(principal, &action) {
            self.audit.record(TraceEvent::AuthzDenied {
                correlation_id: correlation_id.to_string(),
                principal_id: principal.id.clone(),
                action: action.clone(),
            });
            return Err(JsonRpcError::forbidden(&action));
        }

        let id = Uuid::parse_str(&params.session_id)
            .map_err(|_| JsonRpcError::invalid_params("invalid sessionId"))?;

        let policy = self.config.browser.policy.clone();
        let tool_name = params.name.clone();
        let arguments = params.arguments.clone();
        let sessions = self.sessions.clone();

        let started = Instant::now();
        let result = self
            .sessions
            .with_session(id, move |handle| async move {
                let mut aux_guard = handle.aux.lock().await;
                let mut ctx = ExecutionContext {
                    page: &handle.page,
                    browser: &handle.browser,
                    aux: &mut aux_guard,
                    policy: &policy,
                    sessions: &sessions,
                    session_id: id,
                };
                wmcp_tools::execute(&mut ctx, &tool_name, arguments).await
            })
            .await
            .map_err(|_| {
                JsonRpcError::from(ProtocolError::Session(format!(
                    "unknown or expired session: {}",
                    params.session_id
                )))
            })?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let recorded_input = self.redaction.redact_payload(&params.arguments);
        let tool_name = params.name.clone();
        let success = result.success;
        let error = result.error.clone();
        let new_url = result.new_url.clone();
        let _ = self.sessions.update_meta(id, move |session| {
            session.call_count += 1;
            let url = new_url.clone().unwrap_or_else(|| session.url.clone());
            session.record_action(ActionRecord {
                timestamp: Utc::now(),
                tool_name,
                input: recorded_input,
                success,
                duration_ms,
                url,
                error,
            });
            if let Some(new_url) = new_url {
                session.url = new_url;
            }
        });

        self.audit.record(TraceEvent::ToolCalled {
            correlation_id: correlation_id.to_string(),
            session_id: params.session_id,
            tool_name: params.name,
            success: result.success,
            duration_ms,
        });

        let value = if result.success {
            result.result.unwrap_or(Value::Null)
        } else {
            serde_json::json!({ "error": result.error.unwrap_or_default() })
        };

        Ok(serde_json::to_value(ToolCallResult::from_value(value, !result.success))
            .expect("ToolCallResult serializes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmcp_domain::config::UrlPolicyConfig;
    use wmcp_domain::trace::AuditLevel;
    use wmcp_security::auth::PrincipalSource;

    fn handler() -> McpHandler {
        let config = Arc::new(Config::default());
        let pool = wmcp_browser::BrowserPool::new(
            config.browser.max_browsers,
            config.browser.network_egress_control,
            UrlPolicyConfig::default(),
        );
        let sessions = SessionStore::new(pool.clone());
        let audit = AuditSink::new(AuditLevel::None);
        McpHandler::new(sessions, pool, config, audit)
    }

    fn principal(role: &str) -> Principal {
        Principal {
            id: "test-principal".to_string(),
            source: PrincipalSource::Apikey,
            role: role.to_string(),
            scopes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn initialize_reports_broker_capabilities() {
        let h = handler();
        let value = h.initialize(Value::Null);
        assert_eq!(value["serverInfo"]["name"], "webmcp-discovery-broker");
        assert_eq!(value["capabilities"]["tools"], true);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let h = handler();
        let err = h
            .dispatch(&principal("admin"), "corr-1", "frobnicate", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn ping_round_trips_as_empty_object() {
        let h = handler();
        let value = h
            .dispatch(&principal("admin"), "corr-1", "ping", Value::Null)
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn viewer_cannot_open_sessions() {
        let h = handler();
        let err = h.session_open(&principal("viewer"), "corr-1", Value::Null).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::FORBIDDEN);
    }

    #[tokio::test]
    async fn session_open_rejects_empty_url() {
        let h = handler();
        let params = serde_json::json!({ "url": "" });
        let err = h.session_open(&principal("admin"), "corr-1", params).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_on_unknown_session_is_session_error() {
        let h = handler();
        let params = serde_json::json!({
            "sessionId": Uuid::new_v4().to_string(),
            "name": "browser_click",
            "arguments": {},
        });
        let err = h.tools_call(&principal("admin"), "corr-1", params).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_denies_viewer_for_navigation_category() {
        let h = handler();
        let params = serde_json::json!({
            "sessionId": Uuid::new_v4().to_string(),
            "name": "browser_navigate",
            "arguments": {},
        });
        let err = h.tools_call(&principal("viewer"), "corr-1", params).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::FORBIDDEN);
    }
}
