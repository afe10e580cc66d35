//! Semantic element locators.
//!
//! The executor accepts either a raw CSS selector or one of five semantic
//! forms. `role`, `placeholder` and `test-id` resolve to plain CSS
//! attribute selectors, evaluated the same way a raw selector is. `text`
//! and `label`, however, need to match on rendered text content, which CSS
//! cannot express — those resolve to an XPath 1.0 expression instead,
//! marked with the [`XPATH_PREFIX`] so the executor's `find()` knows to
//! evaluate it with `document.evaluate` rather than `document.querySelector`.

use serde::Deserialize;

/// Separates a shadow-host selector from the selector to pierce into, e.g.
/// `"my-widget >> #submit"` addresses `#submit` inside the shadow root of
/// the first element matched by `my-widget`. Chosen because it mirrors the
/// separator Playwright settled on, and because `>>` cannot appear in a
/// bare CSS selector, so the split is unambiguous.
const SHADOW_PIERCE_SEPARATOR: &str = ">>";

/// Prefix marking a resolved selector as an XPath 1.0 expression rather
/// than CSS. `xpath:` cannot occur at the start of a real CSS selector
/// (a leading bare identifier followed by `:` is only ever a pseudo-class),
/// so the split is unambiguous the same way `>>` is for shadow piercing.
pub const XPATH_PREFIX: &str = "xpath:";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Css(String),
    Semantic {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        test_id: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("locator did not specify a selector, text, role+name, label, placeholder, or test-id")]
    Empty,
}

/// Resolve a locator value to a CSS selector string. When the locator
/// pierces a shadow root (contains `>>`), the returned selector still
/// carries the separator; callers that need to actually reach into the
/// shadow tree use [`resolve_shadow_pierce`] to split it before querying.
pub fn resolve(locator: &Locator) -> Result<String, LocatorError> {
    match locator {
        Locator::Css(s) => Ok(s.clone()),
        Locator::Semantic {
            selector,
            text,
            role,
            name,
            label,
            placeholder,
            test_id,
        } => {
            if let Some(s) = selector {
                return Ok(s.clone());
            }
            if let Some(t) = text {
                return Ok(format!("{XPATH_PREFIX}{}", text_xpath(t)));
            }
            if let (Some(r), Some(n)) = (role, name) {
                return Ok(format!("[role={}][aria-label*={}]", css_escape(r), css_escape(n)));
            }
            if let Some(r) = role {
                return Ok(format!("[role={}]", css_escape(r)));
            }
            if let Some(l) = label {
                return Ok(format!("{XPATH_PREFIX}{}", label_xpath(l)));
            }
            if let Some(p) = placeholder {
                return Ok(format!("[placeholder={}]", css_escape(p)));
            }
            if let Some(id) = test_id {
                return Ok(format!("[data-testid={}]", css_escape(id)));
            }
            Err(LocatorError::Empty)
        }
    }
}

pub fn is_shadow_pierce(selector: &str) -> bool {
    selector.contains(SHADOW_PIERCE_SEPARATOR)
}

/// Split a `"host >> inner"` selector into the host and inner parts.
pub fn resolve_shadow_pierce(selector: &str) -> Option<(String, String)> {
    let (host, inner) = selector.split_once(SHADOW_PIERCE_SEPARATOR)?;
    Some((host.trim().to_string(), inner.trim().to_string()))
}

/// Strip [`XPATH_PREFIX`] off a resolved selector, returning the bare
/// XPath expression if that's what it is.
pub fn xpath_expression(selector: &str) -> Option<&str> {
    selector.strip_prefix(XPATH_PREFIX)
}

fn css_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote `value` as an XPath 1.0 string literal. XPath 1.0 has no escape
/// sequence, so a value containing both quote characters has to be spliced
/// together with `concat()` instead.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let parts: Vec<String> = value.split('"').map(|part| format!("\"{part}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Match any element whose own text node contains `value` — the XPath
/// analogue of Playwright's `:has-text`, restricted to leaf-ish text
/// (`text()`, not `string(.)`) so it prefers the innermost matching
/// element over every ancestor that also happens to contain the text.
fn text_xpath(value: &str) -> String {
    format!("//*[text()[contains(normalize-space(.), {})]]", xpath_literal(value))
}

/// Match either an element carrying a matching `aria-label`, or a form
/// control associated with a `<label>` whose text matches — by nesting
/// (`<label><input></label>`), by `for`/`id`, or by being the next sibling.
fn label_xpath(value: &str) -> String {
    let lit = xpath_literal(value);
    format!(
        "//*[@aria-label and contains(normalize-space(@aria-label), {lit})] | \
         //label[contains(normalize-space(string(.)), {lit})]//input | \
         //label[contains(normalize-space(string(.)), {lit})]//select | \
         //label[contains(normalize-space(string(.)), {lit})]//textarea | \
         //label[contains(normalize-space(string(.)), {lit})]/following-sibling::*[self::input or self::select or self::textarea][1] | \
         //*[@id = //label[contains(normalize-space(string(.)), {lit})]/@for]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_locator_passes_through() {
        let loc = Locator::Css("#submit".into());
        assert_eq!(resolve(&loc).unwrap(), "#submit");
    }

    #[test]
    fn test_id_locator_resolves_to_data_attribute() {
        let loc = Locator::Semantic {
            selector: None,
            text: None,
            role: None,
            name: None,
            label: None,
            placeholder: None,
            test_id: Some("save-button".into()),
        };
        assert_eq!(resolve(&loc).unwrap(), "[data-testid=\"save-button\"]");
    }

    #[test]
    fn empty_semantic_locator_is_error() {
        let loc = Locator::Semantic {
            selector: None,
            text: None,
            role: None,
            name: None,
            label: None,
            placeholder: None,
            test_id: None,
        };
        assert!(matches!(resolve(&loc), Err(LocatorError::Empty)));
    }

    #[test]
    fn text_locator_resolves_to_xpath() {
        let loc = Locator::Semantic {
            selector: None,
            text: Some("Add to cart".into()),
            role: None,
            name: None,
            label: None,
            placeholder: None,
            test_id: None,
        };
        let resolved = resolve(&loc).unwrap();
        assert!(resolved.starts_with(XPATH_PREFIX));
        let xpath = xpath_expression(&resolved).unwrap();
        assert!(xpath.contains("contains(normalize-space(.), \"Add to cart\")"));
    }

    #[test]
    fn label_locator_resolves_to_xpath_covering_aria_label_and_label_text() {
        let loc = Locator::Semantic {
            selector: None,
            text: None,
            role: None,
            name: None,
            label: Some("Email address".into()),
            placeholder: None,
            test_id: None,
        };
        let resolved = resolve(&loc).unwrap();
        let xpath = xpath_expression(&resolved).unwrap();
        assert!(xpath.contains("@aria-label"));
        assert!(xpath.contains("label[contains"));
    }

    #[test]
    fn xpath_expression_strips_prefix_only_from_xpath_selectors() {
        assert_eq!(xpath_expression("#submit"), None);
        assert_eq!(xpath_expression("xpath://button"), Some("//button"));
    }

    #[test]
    fn xpath_literal_falls_back_to_concat_when_both_quote_kinds_present() {
        let loc = Locator::Semantic {
            selector: None,
            text: Some("say \"hi\" y'all".into()),
            role: None,
            name: None,
            label: None,
            placeholder: None,
            test_id: None,
        };
        let resolved = resolve(&loc).unwrap();
        assert!(xpath_expression(&resolved).unwrap().contains("concat("));
    }

    #[test]
    fn shadow_pierce_selector_splits_on_separator() {
        let (host, inner) = resolve_shadow_pierce("my-widget >> #submit").unwrap();
        assert_eq!(host, "my-widget");
        assert_eq!(inner, "#submit");
    }

    #[test]
    fn non_piercing_selector_has_no_split() {
        assert!(resolve_shadow_pierce("#submit").is_none());
    }

    #[test]
    fn detects_shadow_pierce_selectors() {
        assert!(is_shadow_pierce("a >> b"));
        assert!(!is_shadow_pierce("a b"));
    }
}
