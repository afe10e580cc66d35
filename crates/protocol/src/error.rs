//! Protocol-level error kinds, reasoned about independently of the wire
//! format they eventually cross as. Lower crates (browser, tools,
//! security) raise their own error types; the handler translates the
//! ones that reach the JSON-RPC boundary into one of these four kinds
//! before mapping each onto a `JsonRpcError` code.

use crate::jsonrpc::JsonRpcError;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("session: {0}")]
    Session(String),
    #[error("resource exhausted: {0}")]
    Resource(String),
}

impl From<ProtocolError> for JsonRpcError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Transport(msg) => JsonRpcError::invalid_request(msg),
            ProtocolError::Protocol(msg) => JsonRpcError::invalid_params(msg),
            ProtocolError::Session(msg) => JsonRpcError::invalid_params(msg),
            ProtocolError::Resource(msg) => {
                JsonRpcError::internal_with_code(msg, "pool_exhausted")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_maps_to_invalid_params() {
        let err: JsonRpcError = ProtocolError::Session("unknown session".into()).into();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[test]
    fn resource_error_carries_pool_exhausted_code() {
        let err: JsonRpcError = ProtocolError::Resource("5/5 live".into()).into();
        assert_eq!(err.code, JsonRpcError::INTERNAL_ERROR);
        assert_eq!(err.data.unwrap()["code"], "pool_exhausted");
    }
}
