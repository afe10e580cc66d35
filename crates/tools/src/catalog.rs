//! The static fallback tool catalog: the ~120 generic browser-automation
//! primitives advertised when a page exposes no tools of its own through
//! `navigator.modelContext`.
//!
//! The catalog is built once, from a flat data table, rather than as ~120
//! individual struct literals — the table is what an author actually edits
//! when a primitive is added or renamed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Navigation,
    Interaction,
    Forms,
    Capture,
    Extraction,
    Waiting,
    Scrolling,
    Evaluation,
    Dialogs,
    Downloads,
    Cookies,
    Accessibility,
    Network,
    Device,
    Storage,
    MultiTab,
    Console,
    Media,
    DragAndDrop,
    RichText,
    ShadowDom,
    Performance,
    Visual,
    Permissions,
    Clipboard,
    Frames,
    Composite,
    ErrorRecovery,
    Recording,
    Egress,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Interaction => "interaction",
            Self::Forms => "forms",
            Self::Capture => "capture",
            Self::Extraction => "extraction",
            Self::Waiting => "waiting",
            Self::Scrolling => "scrolling",
            Self::Evaluation => "evaluation",
            Self::Dialogs => "dialogs",
            Self::Downloads => "downloads",
            Self::Cookies => "cookies",
            Self::Accessibility => "accessibility",
            Self::Network => "network",
            Self::Device => "device",
            Self::Storage => "storage",
            Self::MultiTab => "multi_tab",
            Self::Console => "console",
            Self::Media => "media",
            Self::DragAndDrop => "drag_and_drop",
            Self::RichText => "rich_text",
            Self::ShadowDom => "shadow_dom",
            Self::Performance => "performance",
            Self::Visual => "visual",
            Self::Permissions => "permissions",
            Self::Clipboard => "clipboard",
            Self::Frames => "frames",
            Self::Composite => "composite",
            Self::ErrorRecovery => "error_recovery",
            Self::Recording => "recording",
            Self::Egress => "egress",
        }
    }
}

/// `{name, description, inputSchema, outputSchema?, category, requiresAuth?}`
/// from the data model. The catalog is immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    pub category: ToolCategory,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_auth: bool,
}

/// One row of the catalog table: name, category, description, and the
/// names of required input properties (an empty slice means "no required
/// fields" — most read-only primitives take either no arguments or only
/// optional ones).
struct Row {
    name: &'static str,
    category: ToolCategory,
    description: &'static str,
    required: &'static [&'static str],
}

macro_rules! row {
    ($name:literal, $cat:ident, $desc:literal) => {
        Row { name: $name, category: ToolCategory::$cat, description: $desc, required: &[] }
    };
    ($name:literal, $cat:ident, $desc:literal, [$($req:literal),+]) => {
        Row { name: $name, category: ToolCategory::$cat, description: $desc, required: &[$($req),+] }
    };
}

#[rustfmt::skip]
const ROWS: &[Row] = &[
    // navigation
    row!("browser_navigate", Navigation, "Navigate the page to a URL.", ["url"]),
    row!("browser_back", Navigation, "Go back one entry in the session history."),
    row!("browser_forward", Navigation, "Go forward one entry in the session history."),
    row!("browser_reload", Navigation, "Reload the current page."),
    row!("browser_get_url", Navigation, "Return the page's current URL."),
    row!("browser_get_title", Navigation, "Return the page's document title."),

    // interaction
    row!("browser_click", Interaction, "Click an element.", ["locator"]),
    row!("browser_double_click", Interaction, "Double-click an element.", ["locator"]),
    row!("browser_right_click", Interaction, "Right-click (context-menu) an element.", ["locator"]),
    row!("browser_type", Interaction, "Type text into the focused element or a given locator.", ["text"]),
    row!("browser_hover", Interaction, "Hover the pointer over an element.", ["locator"]),
    row!("browser_focus", Interaction, "Move keyboard focus to an element.", ["locator"]),
    row!("browser_select_option", Interaction, "Select an option in a <select> element.", ["locator", "value"]),
    row!("browser_check", Interaction, "Check a checkbox or radio input.", ["locator"]),
    row!("browser_uncheck", Interaction, "Uncheck a checkbox.", ["locator"]),
    row!("browser_press_key", Interaction, "Press a single keyboard key.", ["key"]),
    row!("browser_clear_input", Interaction, "Clear the value of a text input.", ["locator"]),
    row!("browser_upload_file", Interaction, "Attach a file to a file input.", ["locator", "path"]),

    // forms
    row!("browser_fill_form", Forms, "Fill multiple form fields in one call.", ["fields"]),
    row!("browser_get_form_values", Forms, "Read the current values of every field in a form.", ["locator"]),
    row!("browser_submit_form", Forms, "Submit a form.", ["locator"]),
    row!("browser_reset_form", Forms, "Reset a form to its default values.", ["locator"]),
    row!("browser_select_multiple", Forms, "Select multiple options in a multi-select element.", ["locator", "values"]),
    row!("browser_get_validation_errors", Forms, "Collect native HTML5 validation messages for a form."),

    // capture
    row!("browser_screenshot", Capture, "Capture a PNG screenshot of the viewport."),
    row!("browser_screenshot_full_page", Capture, "Capture a PNG screenshot of the full scrollable page."),
    row!("browser_screenshot_element", Capture, "Capture a PNG screenshot of a single element.", ["locator"]),
    row!("browser_pdf", Capture, "Render the page to a PDF document."),

    // extraction
    row!("browser_get_text", Extraction, "Return the visible text content of an element or the page."),
    row!("browser_get_html", Extraction, "Return the HTML markup of an element or the page."),
    row!("browser_get_attribute", Extraction, "Return the value of an element attribute.", ["locator", "attribute"]),
    row!("browser_get_table", Extraction, "Extract a <table> element into rows of cell text.", ["locator"]),
    row!("browser_get_links", Extraction, "Return every anchor href and text on the page."),
    row!("browser_get_value", Extraction, "Return the current value of a form field.", ["locator"]),
    row!("browser_count_elements", Extraction, "Count elements matching a locator.", ["locator"]),

    // waiting
    row!("browser_wait_for_selector", Waiting, "Wait until an element matching a locator is present.", ["locator"]),
    row!("browser_wait_for_navigation", Waiting, "Wait for the next navigation to settle."),
    row!("browser_wait_for_timeout", Waiting, "Wait for a fixed duration.", ["ms"]),
    row!("browser_wait_for_network_idle", Waiting, "Wait until no more than a small number of requests are in flight."),
    row!("browser_wait_for_function", Waiting, "Poll a JavaScript expression until it returns truthy.", ["expression"]),
    row!("browser_wait_for_url", Waiting, "Wait until the page URL matches a pattern.", ["pattern"]),

    // scrolling
    row!("browser_scroll_to", Scrolling, "Scroll an element into the center of the viewport.", ["locator"]),
    row!("browser_scroll_by", Scrolling, "Scroll the page by a pixel offset.", ["dx", "dy"]),
    row!("browser_scroll_into_view", Scrolling, "Scroll an element into view at its nearest edge.", ["locator"]),
    row!("browser_scroll_to_top", Scrolling, "Scroll to the top of the page."),
    row!("browser_scroll_to_bottom", Scrolling, "Scroll to the bottom of the page."),

    // evaluation
    row!("browser_evaluate", Evaluation, "Run a JavaScript expression in the page context.", ["script"]),
    row!("browser_evaluate_on_element", Evaluation, "Run a JavaScript expression with an element bound to a name.", ["locator", "script"]),
    row!("browser_evaluate_handle", Evaluation, "Run a JavaScript expression and keep a handle to its result."),

    // dialogs
    row!("browser_handle_dialog", Dialogs, "Accept or dismiss the next native dialog.", ["accept"]),
    row!("browser_get_dialog_message", Dialogs, "Return the message of the last observed dialog."),
    row!("browser_set_dialog_auto_accept", Dialogs, "Configure whether future dialogs are auto-accepted.", ["enabled"]),

    // downloads
    row!("browser_wait_for_download", Downloads, "Wait for a triggered download to complete."),
    row!("browser_get_downloads", Downloads, "List downloads observed so far in this session."),
    row!("browser_cancel_download", Downloads, "Cancel an in-progress download.", ["id"]),

    // cookies
    row!("browser_get_cookies", Cookies, "Return cookies visible to the current page."),
    row!("browser_set_cookie", Cookies, "Set a cookie.", ["name", "value"]),
    row!("browser_clear_cookies", Cookies, "Clear all cookies for the current context."),
    row!("browser_delete_cookie", Cookies, "Delete a single cookie by name.", ["name"]),

    // accessibility
    row!("browser_get_accessibility_tree", Accessibility, "Return the accessibility tree rooted at the page or an element."),
    row!("browser_get_aria_label", Accessibility, "Return the computed accessible name of an element.", ["locator"]),
    row!("browser_get_accessibility_violations", Accessibility, "Run a lightweight set of accessibility checks against the page."),

    // network
    row!("browser_intercept_requests", Network, "Begin logging requests matching a URL pattern.", ["pattern"]),
    row!("browser_mock_response", Network, "Return a canned response for requests matching a URL pattern.", ["pattern", "body"]),
    row!("browser_get_network_log", Network, "Return the buffered network request log for this session."),
    row!("browser_clear_network_log", Network, "Clear the buffered network request log."),
    row!("browser_set_offline", Network, "Toggle simulated offline network conditions.", ["offline"]),

    // device
    row!("browser_set_viewport", Device, "Resize the emulated viewport.", ["width", "height"]),
    row!("browser_emulate_device", Device, "Apply a named device emulation preset.", ["device"]),
    row!("browser_set_geolocation", Device, "Override the emulated geolocation.", ["latitude", "longitude"]),
    row!("browser_set_user_agent", Device, "Override the browser's user-agent string.", ["user_agent"]),
    row!("browser_set_timezone", Device, "Override the emulated timezone.", ["timezone"]),

    // storage
    row!("browser_get_local_storage", Storage, "Return all localStorage entries for the current origin."),
    row!("browser_set_local_storage", Storage, "Set a localStorage entry.", ["key", "value"]),
    row!("browser_get_session_storage", Storage, "Return all sessionStorage entries for the current origin."),
    row!("browser_clear_storage", Storage, "Clear localStorage and sessionStorage for the current origin."),
    row!("browser_get_indexeddb", Storage, "List IndexedDB database names for the current origin."),

    // multi-tab
    row!("browser_list_tabs", MultiTab, "List tabs open in this session."),
    row!("browser_switch_tab", MultiTab, "Make a tab the active target for subsequent calls.", ["index"]),
    row!("browser_new_tab", MultiTab, "Open a new tab.", ["url"]),
    row!("browser_close_tab", MultiTab, "Close a tab by index.", ["index"]),
    row!("browser_get_active_tab", MultiTab, "Return the index of the currently active tab."),

    // console
    row!("browser_get_console_logs", Console, "Return buffered console messages for this session."),
    row!("browser_clear_console_logs", Console, "Clear the buffered console log."),
    row!("browser_get_page_errors", Console, "Return uncaught JavaScript errors observed in this session."),
    row!("browser_wait_for_console_message", Console, "Wait for a console message matching a substring.", ["pattern"]),

    // media
    row!("browser_play_media", Media, "Play an audio or video element.", ["locator"]),
    row!("browser_pause_media", Media, "Pause an audio or video element.", ["locator"]),
    row!("browser_mute_media", Media, "Mute or unmute an audio or video element.", ["locator", "muted"]),
    row!("browser_seek_media", Media, "Seek an audio or video element to a timestamp.", ["locator", "seconds"]),

    // drag and drop
    row!("browser_drag_and_drop", DragAndDrop, "Drag one element and drop it onto another.", ["source", "target"]),
    row!("browser_drop_file", DragAndDrop, "Simulate dropping a file onto a drop zone.", ["locator", "path"]),

    // rich text
    row!("browser_set_rich_text", RichText, "Set the HTML content of a contenteditable element.", ["locator", "html"]),
    row!("browser_get_rich_text", RichText, "Return the HTML content of a contenteditable element.", ["locator"]),

    // shadow dom
    row!("browser_query_shadow", ShadowDom, "Resolve a shadow-piercing locator (`host >> inner`).", ["locator"]),
    row!("browser_click_in_shadow", ShadowDom, "Click an element addressed by a shadow-piercing locator.", ["locator"]),

    // performance
    row!("browser_get_performance_metrics", Performance, "Return navigation and paint timing metrics."),
    row!("browser_get_memory_usage", Performance, "Return the page's JS heap usage."),

    // visual
    row!("browser_get_bounding_box", Visual, "Return an element's bounding box in viewport coordinates.", ["locator"]),
    row!("browser_is_visible", Visual, "Return whether an element is visible.", ["locator"]),
    row!("browser_compare_screenshot", Visual, "Compare the current screenshot against a provided baseline.", ["baseline"]),

    // permissions
    row!("browser_grant_permission", Permissions, "Grant a browser permission (e.g. geolocation, camera).", ["permission"]),
    row!("browser_revoke_permission", Permissions, "Revoke a previously granted browser permission.", ["permission"]),

    // clipboard
    row!("browser_read_clipboard", Clipboard, "Read the current clipboard text."),
    row!("browser_write_clipboard", Clipboard, "Write text to the clipboard.", ["text"]),

    // frames
    row!("browser_list_frames", Frames, "List frames embedded in the current page."),
    row!("browser_switch_frame", Frames, "Make an embedded frame the target for subsequent locators.", ["selector"]),
    row!("browser_get_frame_content", Frames, "Return the text content of an embedded frame.", ["selector"]),

    // composites
    row!("login", Composite, "Fill and submit a login form, trying caller selectors then common defaults.", ["username", "password"]),
    row!("fill_form", Composite, "Fill a set of named fields, resolving each by semantic locator.", ["fields"]),
    row!("search", Composite, "Enter a query into a search field and submit it.", ["query"]),
    row!("checkout", Composite, "Drive a checkout flow using caller-supplied or default field selectors.", ["fields"]),

    // error recovery
    row!("safe_click", ErrorRecovery, "Click an element, retrying with back-off while the attempt errors.", ["locator"]),
    row!("safe_fill", ErrorRecovery, "Fill an element, retrying with back-off while the attempt errors.", ["locator", "value"]),
    row!("wait_and_click", ErrorRecovery, "Wait for an element to become visible, then click it.", ["locator"]),

    // recording
    row!("browser_start_recording", Recording, "Enable action recording for this session."),
    row!("browser_stop_recording", Recording, "Disable action recording for this session."),
    row!("browser_get_recording", Recording, "Return the recorded action list for this session."),

    // egress
    row!("browser_set_egress_policy", Egress, "Update the allow/block domain lists enforced for this session."),
    row!("browser_get_egress_log", Egress, "Return requests that were denied by the egress policy."),
];

fn input_schema_for(row: &Row) -> Value {
    json!({
        "type": "object",
        "required": row.required,
        "additionalProperties": true,
    })
}

/// Category of a fallback-catalog tool by name, for RBAC's `tool.call:<category>`
/// action strings. Names not in the static table (page-declared WebMCP
/// tools) have no fixed category here — callers fall back to `Composite`,
/// matching the category `discover` assigns to declared tools.
pub fn category_for(name: &str) -> Option<ToolCategory> {
    ROWS.iter().find(|row| row.name == name).map(|row| row.category)
}

/// Build the fallback catalog. Pure and deterministic — called once at
/// startup and whenever discovery falls through to the static set.
pub fn fallback_catalog() -> Vec<ToolDescriptor> {
    ROWS.iter()
        .map(|row| ToolDescriptor {
            name: row.name.to_string(),
            description: row.description.to_string(),
            input_schema: input_schema_for(row),
            output_schema: None,
            category: row.category,
            requires_auth: matches!(row.category, ToolCategory::Evaluation),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_no_duplicate_names() {
        let catalog = fallback_catalog();
        let names: HashSet<_> = catalog.iter().map(|t| &t.name).collect();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn catalog_covers_every_spec_category() {
        let catalog = fallback_catalog();
        let categories: HashSet<_> = catalog.iter().map(|t| t.category.as_str()).collect();
        for expected in [
            "navigation", "interaction", "forms", "capture", "extraction", "waiting",
            "scrolling", "evaluation", "dialogs", "downloads", "cookies", "accessibility",
            "network", "device", "storage", "multi_tab", "console", "media",
            "drag_and_drop", "rich_text", "shadow_dom", "performance", "visual",
            "permissions", "clipboard", "frames", "composite", "error_recovery",
            "recording", "egress",
        ] {
            assert!(categories.contains(expected), "missing category {expected}");
        }
    }

    #[test]
    fn catalog_is_large_enough_to_cover_the_fallback_surface() {
        assert!(fallback_catalog().len() >= 100);
    }

    #[test]
    fn evaluation_tools_require_auth() {
        let catalog = fallback_catalog();
        let evaluate = catalog.iter().find(|t| t.name == "browser_evaluate").unwrap();
        assert!(evaluate.requires_auth);
    }

    #[test]
    fn navigate_declares_url_as_required() {
        let catalog = fallback_catalog();
        let navigate = catalog.iter().find(|t| t.name == "browser_navigate").unwrap();
        let required = navigate.input_schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "url"));
    }
}
