//! `AppState` construction and background-task spawning, extracted from
//! `main.rs` so the `serve` command isn't the only path that can boot the
//! runtime (a future `doctor`-style deep check could reuse it too).

use std::sync::Arc;

use wmcp_browser::{BrowserPool, SessionStore};
use wmcp_domain::config::{Config, ConfigSeverity};
use wmcp_domain::trace::{AuditSink, TraceEvent};
use wmcp_protocol::McpHandler;

use crate::state::{AppState, Metrics};

/// Validate config, build every shared service, and return the state
/// handlers are wired against. Does not bind a socket or spawn the HTTP
/// server — only `run_server` in `main.rs` does that.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let pool = BrowserPool::new(
        config.browser.max_browsers,
        config.browser.network_egress_control,
        config.browser.policy.clone(),
    );
    tracing::info!(max_browsers = config.browser.max_browsers, "browser pool ready");

    let sessions = SessionStore::new(pool.clone());
    let audit = AuditSink::new(config.audit.level);
    let handler = Arc::new(McpHandler::new(sessions.clone(), pool.clone(), config.clone(), audit.clone()));

    Ok(AppState {
        config,
        pool,
        sessions,
        handler,
        audit,
        metrics: Arc::new(Metrics::default()),
    })
}

/// Spawn the background TTL sweeper that evicts expired sessions on the
/// configured cadence, closing each one's browser and auditing the
/// eviction.
pub fn spawn_session_sweeper(state: AppState) {
    let interval_secs = state.config.session.sweep_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let expired = state.sessions.sweep_expired().await;
            for id in expired {
                state.audit.record(TraceEvent::SessionExpired { session_id: id.to_string() });
            }
        }
    });
}
