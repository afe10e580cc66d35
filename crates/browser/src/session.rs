//! Session store: the map of session id → browser/context/page plus TTL
//! eviction. Per-session auxiliary state (console log, network log, extra
//! tabs) is owned here as a typed record keyed by session id rather than
//! stashed as dynamic properties on the page object.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chromiumoxide::{Browser, Page};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pool::{BrowserHandle, BrowserPool};

const MAX_LOG_ENTRIES: usize = 1000;

/// One entry in a session's recording, appended atomically per tool call
/// when recording is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    /// Post-redaction input — never the raw payload.
    pub input: serde_json::Value,
    pub success: bool,
    pub duration_ms: u64,
    pub url: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConsoleLogEntry {
    pub level: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NetworkLogEntry {
    pub url: String,
    pub method: String,
    pub status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

/// Per-session auxiliary state. Owned by the store, addressed by session
/// id — the "back-reference from page to session" problem the source
/// solved by monkey-patching is solved here by keying the other direction.
#[derive(Debug, Default)]
pub struct AuxState {
    pub console_logs: Vec<ConsoleLogEntry>,
    pub network_log: Vec<NetworkLogEntry>,
    /// Extra tabs opened by `new_tab`/popups, addressable by index
    /// starting at 1 (index 0 is always the primary page).
    pub tabs: Vec<Page>,
}

impl AuxState {
    pub fn push_console(&mut self, entry: ConsoleLogEntry) {
        if self.console_logs.len() >= MAX_LOG_ENTRIES {
            self.console_logs.remove(0);
        }
        self.console_logs.push(entry);
    }

    pub fn push_network(&mut self, entry: NetworkLogEntry) {
        if self.network_log.len() >= MAX_LOG_ENTRIES {
            self.network_log.remove(0);
        }
        self.network_log.push(entry);
    }
}

/// A cloned, self-contained view of a session handed to tool-call closures.
/// Cloning `Page`/`Browser` is cheap (both are handles around a CDP
/// connection); this lets `with_session` release the store's map lock
/// before the closure runs its (possibly long) I/O, so unrelated sessions
/// are never blocked by one session's tool call.
pub struct SessionHandle {
    pub id: Uuid,
    pub page: Page,
    pub browser: Browser,
    pub aux: Arc<tokio::sync::Mutex<AuxState>>,
    pub url: String,
    pub has_webmcp: bool,
}

/// Coarse state-machine label, tracked informally via `has_webmcp` and the
/// store membership itself (`Closed`/`Expired` sessions are simply absent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Fresh,
    Discovered,
}

pub struct Session {
    pub id: Uuid,
    pub browser: BrowserHandle,
    pub page: Page,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub call_count: u64,
    pub has_webmcp: bool,
    pub phase: SessionPhase,
    pub recording: Vec<ActionRecord>,
    pub recording_enabled: bool,
    pub aux: Arc<tokio::sync::Mutex<AuxState>>,
    /// Exclusive lease: held for the duration of one `tools/call` so
    /// interleaved calls on the same session can never corrupt page state.
    /// Calls on different sessions take out unrelated leases and run
    /// freely.
    pub lease: Arc<tokio::sync::Mutex<()>>,
}

impl Session {
    pub fn record_action(&mut self, record: ActionRecord) {
        if self.recording_enabled {
            self.recording.push(record);
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown or expired session: {0}")]
    NotFound(Uuid),
}

/// The session store. `RwLock<HashMap<..>>` rather than an async lock: all
/// mutation paths (create/close/sweep) are short, synchronous critical
/// sections, and the per-session `lease` mutex is what actually serializes
/// the (possibly long-running) tool call itself.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    pool: Arc<BrowserPool>,
}

impl SessionStore {
    pub fn new(pool: Arc<BrowserPool>) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            pool,
        })
    }

    pub fn pool(&self) -> &Arc<BrowserPool> {
        &self.pool
    }

    pub fn create(
        &self,
        browser: BrowserHandle,
        page: Page,
        url: String,
        ttl: chrono::Duration,
        recording_enabled: bool,
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let session = Session {
            id,
            browser,
            page,
            url,
            created_at: now,
            expires_at: now + ttl,
            call_count: 0,
            has_webmcp: false,
            phase: SessionPhase::Fresh,
            recording: Vec::new(),
            recording_enabled,
            aux: Arc::new(tokio::sync::Mutex::new(AuxState::default())),
            lease: Arc::new(tokio::sync::Mutex::new(())),
        };
        self.sessions.write().insert(id, session);
        id
    }

    /// Run `f` against a cloned [`SessionHandle`] for the session
    /// identified by `id`, after acquiring its per-session lease. Returns
    /// `NotFound` if the session is absent or has expired (an expired
    /// session is evicted on the way out so a racing sweep never observes
    /// it again).
    ///
    /// The store's map lock is held only long enough to clone the handle
    /// and the lease — never across the closure's `await` — so a
    /// long-running tool call on one session never blocks `create`/`close`
    /// or tool calls on any other session. The lease itself is what
    /// serializes calls on *this* session.
    pub async fn with_session<F, Fut, T>(&self, id: Uuid, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(SessionHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        let (lease, handle) = {
            let sessions = self.sessions.read();
            let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
            if session.is_expired(Utc::now()) {
                drop(sessions);
                self.close(id).await;
                return Err(SessionError::NotFound(id));
            }
            (
                session.lease.clone(),
                SessionHandle {
                    id,
                    page: session.page.clone(),
                    browser: session.browser.browser.clone(),
                    aux: session.aux.clone(),
                    url: session.url.clone(),
                    has_webmcp: session.has_webmcp,
                },
            )
        };

        let _guard = lease.lock().await;
        Ok(f(handle).await)
    }

    /// Apply a short, synchronous bookkeeping update to a session's
    /// metadata (call count, recording, discovery phase, ...). Callers
    /// should hold the session's lease (i.e. call this from inside the `f`
    /// passed to [`with_session`], or after it returns) so updates are not
    /// racing the session's own tool call.
    pub fn update_meta<F>(&self, id: Uuid, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        f(session);
        Ok(())
    }

    /// Clone out a session's recording buffer without taking the exclusive
    /// lease, for `browser_get_recording`.
    pub fn get_recording(&self, id: Uuid) -> Result<Vec<ActionRecord>, SessionError> {
        let sessions = self.sessions.read();
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        Ok(session.recording.clone())
    }

    /// Look up a session's bookkeeping fields without taking the exclusive
    /// lease (used by read-only operations like `tools/list`).
    pub fn get_snapshot(&self, id: Uuid) -> Option<(bool, String)> {
        let sessions = self.sessions.read();
        let session = sessions.get(&id)?;
        if session.is_expired(Utc::now()) {
            return None;
        }
        Some((session.has_webmcp, session.url.clone()))
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Close the owning browser and remove the entry. Idempotent.
    pub async fn close(&self, id: Uuid) {
        let removed = self.sessions.write().remove(&id);
        if let Some(session) = removed {
            self.pool.release(session.browser).await;
        }
    }

    pub async fn close_all(&self) {
        let ids: Vec<Uuid> = self.sessions.read().keys().copied().collect();
        for id in ids {
            self.close(id).await;
        }
    }

    /// Evict every session whose TTL has passed. Returns the evicted ids
    /// so the caller can audit each eviction.
    pub async fn sweep_expired(&self) -> Vec<Uuid> {
        let now = Utc::now();
        let expired: Vec<Uuid> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, s)| s.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.close(*id).await;
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_expired_after_ttl() {
        let now = Utc::now();
        let past = now - chrono::Duration::minutes(1);
        assert!(past < now);
    }

    #[test]
    fn aux_state_caps_console_logs() {
        let mut aux = AuxState::default();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            aux.push_console(ConsoleLogEntry {
                level: "log".into(),
                text: format!("entry {i}"),
                timestamp: Utc::now(),
            });
        }
        assert_eq!(aux.console_logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(aux.console_logs.last().unwrap().text, format!("entry {}", MAX_LOG_ENTRIES + 9));
    }
}
