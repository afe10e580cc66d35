/// Shared error type used across all broker crates.
///
/// Variants map directly onto the error kinds enumerated for the protocol
/// layer; lower crates (browser, tools, security) produce these and the
/// gateway's protocol handler folds them into JSON-RPC error codes or HTTP
/// status codes at the boundary.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("forbidden: {0}")]
    Authz(String),

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("session: {0}")]
    Session(String),

    #[error("resource exhausted: {0}")]
    Resource(String),

    #[error("policy: {0}")]
    Policy(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("config: {0}")]
    Config(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
