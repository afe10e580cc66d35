use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wmcp_browser::{BrowserPool, SessionStore};
use wmcp_domain::config::Config;
use wmcp_domain::trace::AuditSink;
use wmcp_protocol::McpHandler;

/// Process-lifetime counters surfaced on `/v1/metrics` that nothing else
/// already tracks. Audit-event and pool/session counts come straight from
/// `AuditSink`, `BrowserPool`, and `SessionStore` instead of being
/// duplicated here.
#[derive(Default)]
pub struct Metrics {
    pub tool_calls_served: AtomicU64,
}

impl Metrics {
    pub fn record_tool_call(&self) {
        self.tool_calls_served.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared application state passed to every API handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Arc<BrowserPool>,
    pub sessions: Arc<SessionStore>,
    pub handler: Arc<McpHandler>,
    pub audit: AuditSink,
    pub metrics: Arc<Metrics>,
}
