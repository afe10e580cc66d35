//! Bounded pool of headless browser processes.
//!
//! There is no warm reuse: every `acquire` launches a fresh `chromiumoxide`
//! browser. The cap check and the live-set mutation happen as one atomic
//! step guarded by a single lock, so concurrent `acquire` calls can never
//! push the live count past `max_browsers`.

use std::collections::HashSet;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, NetworkErrorReason,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures_util::StreamExt;
use parking_lot::Mutex;
use uuid::Uuid;
use wmcp_domain::config::UrlPolicyConfig;
use wmcp_security::url_policy::is_url_allowed;

const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;
const BROKER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) WebMCPDiscoveryBroker/1.0 (+headless)";

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool exhausted: {live}/{max} browsers already live")]
    Exhausted { live: usize, max: usize },
    #[error("failed to launch browser: {0}")]
    Launch(String),
}

/// One live browser process plus the background task pumping its CDP
/// event stream. Dropping this does not close the browser — callers must
/// go through `BrowserPool::release`.
pub struct BrowserHandle {
    pub id: Uuid,
    pub browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserHandle {
    /// Open a new page on this browser, installing the redaction CSS and
    /// (when egress control is enabled) the URL-policy request log.
    pub async fn new_page(
        &self,
        url: &str,
        egress_control: bool,
        policy: &UrlPolicyConfig,
        redaction_css: &str,
    ) -> Result<Page, PoolError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| PoolError::Launch(e.to_string()))?;

        let inject = format!(
            "(() => {{ const s = document.createElement('style'); s.textContent = {css:?}; document.documentElement.appendChild(s); }})();",
            css = redaction_css,
        );
        if let Err(e) = page.evaluate_on_new_document(inject).await {
            tracing::warn!(error = %e, "failed to install redaction style on new page");
        }

        if egress_control {
            if let Err(e) = install_egress_interceptor(&page, policy.clone()).await {
                tracing::warn!(error = %e, "failed to install egress Fetch interceptor");
            }
        }

        if let Err(e) = page.goto(url).await {
            return Err(PoolError::Launch(e.to_string()));
        }

        Ok(page)
    }
}

/// Enable the CDP `Fetch` domain and spawn a task that resolves every
/// paused request against the URL policy: allowed requests are resumed
/// with `Fetch.continueRequest`, denied ones are killed with
/// `Fetch.failRequest` before they ever reach the network. Unlike a
/// `Network.requestWillBeSent` listener, pausing is what makes this a
/// real block instead of an after-the-fact observation.
async fn install_egress_interceptor(page: &Page, policy: UrlPolicyConfig) -> Result<(), String> {
    page.execute(EnableParams::default())
        .await
        .map_err(|e| e.to_string())?;

    let page = page.clone();
    let mut events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| e.to_string())?;
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let verdict = is_url_allowed(&event.request.url, &policy);
            let outcome = if verdict.allowed {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(drop)
            } else {
                tracing::warn!(
                    url = %event.request.url,
                    reason = ?verdict.reason,
                    "egress control blocked subresource request"
                );
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    NetworkErrorReason::BlockedByClient,
                ))
                .await
                .map(drop)
            };
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "failed to resolve paused Fetch request");
            }
        }
    });
    Ok(())
}

pub struct BrowserPool {
    max_browsers: usize,
    egress_control: bool,
    policy: UrlPolicyConfig,
    live: Mutex<HashSet<Uuid>>,
}

impl BrowserPool {
    pub fn new(max_browsers: usize, egress_control: bool, policy: UrlPolicyConfig) -> Arc<Self> {
        Arc::new(Self {
            max_browsers,
            egress_control,
            policy,
            live: Mutex::new(HashSet::new()),
        })
    }

    pub fn size(&self) -> usize {
        self.live.lock().len()
    }

    pub fn egress_control(&self) -> bool {
        self.egress_control
    }

    pub fn policy(&self) -> &UrlPolicyConfig {
        &self.policy
    }

    /// Atomically check the cap and reserve a slot, then launch the
    /// browser process. If the launch fails, the reserved slot is
    /// released so a failed acquire never leaks pool capacity.
    pub async fn acquire(&self) -> Result<BrowserHandle, PoolError> {
        let id = Uuid::new_v4();
        {
            let mut live = self.live.lock();
            if live.len() >= self.max_browsers {
                return Err(PoolError::Exhausted {
                    live: live.len(),
                    max: self.max_browsers,
                });
            }
            live.insert(id);
        }

        match self.launch().await {
            Ok((browser, handler_task)) => Ok(BrowserHandle {
                id,
                browser,
                handler_task,
            }),
            Err(e) => {
                self.live.lock().remove(&id);
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
    ) -> Result<(Browser, tokio::task::JoinHandle<()>), PoolError> {
        let config = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .arg("--disable-dev-shm-usage")
            .user_agent(BROKER_USER_AGENT)
            .viewport(Viewport {
                width: DEFAULT_VIEWPORT_WIDTH,
                height: DEFAULT_VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .build()
            .map_err(PoolError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PoolError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "CDP handler error");
                }
            }
        });

        Ok((browser, handler_task))
    }

    /// Remove `id` from the live set and close its browser. Idempotent —
    /// releasing an id that is not (or is no longer) live is a no-op.
    pub async fn release(&self, handle: BrowserHandle) {
        let was_live = self.live.lock().remove(&handle.id);
        if !was_live {
            return;
        }
        handle.handler_task.abort();
        let mut browser = handle.browser;
        if let Err(e) = browser.close().await {
            tracing::warn!(browser_id = %handle.id, error = %e, "error closing browser");
        }
    }

    /// Release every live browser. Used at shutdown.
    pub async fn close_all(&self, handles: Vec<BrowserHandle>) {
        for handle in handles {
            self.release(handle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_starts_at_zero() {
        let pool = BrowserPool::new(5, true, UrlPolicyConfig::default());
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn cap_check_and_reserve_is_atomic_under_the_same_lock() {
        // Regression guard for the "two separate reads" pitfall called out
        // for the pool's live set: reserving id0 must be visible to the
        // very next cap check without releasing the lock in between.
        let pool = BrowserPool::new(1, true, UrlPolicyConfig::default());
        {
            let mut live = pool.live.lock();
            assert!(live.len() < 1);
            live.insert(Uuid::new_v4());
        }
        assert_eq!(pool.size(), 1);
        let live = pool.live.lock();
        assert!(live.len() >= 1);
    }
}
