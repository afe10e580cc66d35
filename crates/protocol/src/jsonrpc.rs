//! JSON-RPC 2.0 envelope types for the broker's *server* role: parsing
//! requests a caller sends us, and building the responses we send back.
//! This intentionally has no concept of "our own outgoing request" — the
//! broker never calls out to another MCP server, it only answers one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One incoming envelope. `id` absent means the call is a notification — no
/// response is sent, per JSON-RPC 2.0.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// `params` as an object/array value, defaulting to `Null` so handlers
    /// can deserialize optimistically and fall through to "missing field"
    /// errors rather than matching on `Option` everywhere.
    pub fn params_or_null(&self) -> Value {
        self.params.clone().unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Present only when the configured audit level is `full`: echoes the
    /// correlation id minted at the HTTP boundary so a caller can match a
    /// response back to the audit trail without parsing response headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
            meta: None,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
            meta: None,
        }
    }

    /// Attach `meta.correlationId`, used when the configured audit level
    /// is `full`.
    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.meta = Some(serde_json::json!({ "correlationId": correlation_id }));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self { code: Self::PARSE_ERROR, message: message.into(), data: None }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self { code: Self::INVALID_REQUEST, message: message.into(), data: None }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: Some(serde_json::json!({ "method": method })),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PARAMS, message: message.into(), data: None }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { code: Self::INTERNAL_ERROR, message: message.into(), data: None }
    }

    /// Internal-error variant carrying a stable machine-readable code
    /// string in `data`, e.g. pool exhaustion, so clients can branch on it
    /// without string-matching `message`.
    pub fn internal_with_code(message: impl Into<String>, code_str: &str) -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: message.into(),
            data: Some(serde_json::json!({ "code": code_str })),
        }
    }
}

// ── MCP payload shapes ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    pub protocol_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
    pub logging: bool,
    pub completions: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

pub fn initialize_result(caller_version: Option<&str>) -> InitializeResult {
    InitializeResult {
        protocol_version: caller_version
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
        capabilities: ServerCapabilities {
            tools: true,
            resources: true,
            prompts: true,
            logging: true,
            completions: true,
        },
        server_info: ServerInfo {
            name: "webmcp-discovery-broker".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionOpenParams {
    pub url: String,
    #[serde(default, rename = "ttlMinutes")]
    pub ttl_minutes: Option<f64>,
    #[serde(default, rename = "recordingEnabled")]
    pub recording_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionOpenResult {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCloseParams {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCloseResult {
    pub closed: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsListParams {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<wmcp_tools::ToolDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolCallContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn from_value(value: Value, is_error: bool) -> Self {
        let text = serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string());
        Self {
            content: vec![ToolCallContent { content_type: "text".to_string(), text }],
            is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn request_with_id_is_not_a_notification() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(!req.is_notification());
    }

    #[test]
    fn initialize_result_echoes_caller_protocol_version() {
        let result = initialize_result(Some("2025-06-18"));
        assert_eq!(result.protocol_version, "2025-06-18");
        assert!(result.capabilities.tools);
    }

    #[test]
    fn initialize_result_defaults_protocol_version_when_absent() {
        let result = initialize_result(None);
        assert_eq!(result.protocol_version, DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn method_not_found_carries_method_in_data() {
        let err = JsonRpcError::method_not_found("frobnicate");
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(err.data.unwrap()["method"], "frobnicate");
    }

    #[test]
    fn success_response_omits_error_field() {
        let resp = JsonRpcResponse::success(Value::from(1), serde_json::json!({"ok": true}));
        let serialized = serde_json::to_value(&resp).unwrap();
        assert!(serialized.get("error").is_none());
    }

    #[test]
    fn response_omits_meta_unless_correlation_id_attached() {
        let resp = JsonRpcResponse::success(Value::from(1), serde_json::json!({"ok": true}));
        let serialized = serde_json::to_value(&resp).unwrap();
        assert!(serialized.get("meta").is_none());

        let resp = resp.with_correlation_id("corr-1");
        let serialized = serde_json::to_value(&resp).unwrap();
        assert_eq!(serialized["meta"]["correlationId"], "corr-1");
    }

    #[test]
    fn tool_call_result_from_success_value_is_not_error() {
        let result = ToolCallResult::from_value(serde_json::json!({"result": 5}), false);
        assert!(!result.is_error);
        assert_eq!(result.content[0].text, r#"{"result":5}"#);
    }
}
