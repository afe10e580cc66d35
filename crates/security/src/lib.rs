pub mod auth;
pub mod rbac;
pub mod redaction;
pub mod url_policy;

pub use auth::{AuthError, Principal, PrincipalSource};
pub use rbac::may;
pub use redaction::RedactionPolicy;
pub use url_policy::{is_url_allowed, UrlVerdict};
