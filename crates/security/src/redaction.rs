//! Payload and screenshot redaction. `redact_payload` never mutates its
//! input — it walks a `serde_json::Value` and returns a new, masked copy —
//! so the same value can still be used for whatever still needs the
//! cleartext version (there is no such caller today, but the pure-function
//! shape is what makes "redaction happens before anything leaves the
//! process" checkable by inspection rather than by convention).

use regex::Regex;
use serde_json::Value;

use wmcp_domain::config::RedactionConfig;

const SENTINEL: &str = "***REDACTED***";

pub struct RedactionPolicy {
    fields: Vec<String>,
    patterns: Vec<Regex>,
}

impl RedactionPolicy {
    /// Compile the configured field names and regex patterns once. Invalid
    /// regexes are rejected by `Config::validate` before this is ever
    /// constructed, so compilation here is infallible in practice; a
    /// pattern that still fails to compile is skipped rather than panicking.
    pub fn new(config: &RedactionConfig) -> Self {
        let fields = config.fields.iter().map(|f| f.to_ascii_lowercase()).collect();
        let patterns = config
            .patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { fields, patterns }
    }

    fn field_is_sensitive(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f == &key.to_ascii_lowercase())
    }

    fn redact_string(&self, s: &str) -> String {
        let mut out = s.to_string();
        for pattern in &self.patterns {
            out = pattern.replace_all(&out, SENTINEL).into_owned();
        }
        out
    }

    /// Walk `value` and return a redacted copy. Object properties whose
    /// name matches the configured field set are replaced wholesale with
    /// the sentinel; every remaining string leaf has each configured regex
    /// applied in order.
    pub fn redact_payload(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    if self.field_is_sensitive(k) {
                        out.insert(k.clone(), Value::String(SENTINEL.to_string()));
                    } else {
                        out.insert(k.clone(), self.redact_payload(v));
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.redact_payload(v)).collect())
            }
            Value::String(s) => Value::String(self.redact_string(s)),
            other => other.clone(),
        }
    }

    /// CSS injected into every new page so screenshots never capture
    /// password fields or elements the page author marked sensitive.
    pub fn screenshot_style_snippet(&self) -> &'static str {
        r#"
input[type="password"] { -webkit-text-security: disc !important; filter: blur(6px) !important; }
.sensitive, [data-sensitive="true"] { filter: blur(6px) !important; }
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> RedactionPolicy {
        RedactionPolicy::new(&RedactionConfig {
            fields: vec!["password".into(), "Token".into()],
            patterns: vec![r"\b\d{3}-\d{2}-\d{4}\b".into()],
        })
    }

    #[test]
    fn masks_sensitive_field_case_insensitively() {
        let p = policy();
        let input = json!({"password": "hunter2", "TOKEN": "abc", "ok": "fine"});
        let out = p.redact_payload(&input);
        assert_eq!(out["password"], SENTINEL);
        assert_eq!(out["TOKEN"], SENTINEL);
        assert_eq!(out["ok"], "fine");
    }

    #[test]
    fn applies_regex_to_string_leaves() {
        let p = policy();
        let input = json!({"notes": "ssn is 123-45-6789 on file"});
        let out = p.redact_payload(&input);
        assert!(out["notes"].as_str().unwrap().contains(SENTINEL));
        assert!(!out["notes"].as_str().unwrap().contains("123-45-6789"));
    }

    #[test]
    fn recurses_into_nested_objects_and_arrays() {
        let p = policy();
        let input = json!({"fields": {"password": "secret", "list": [{"password": "x"}]}});
        let out = p.redact_payload(&input);
        assert_eq!(out["fields"]["password"], SENTINEL);
        assert_eq!(out["fields"]["list"][0]["password"], SENTINEL);
    }

    #[test]
    fn does_not_mutate_input() {
        let p = policy();
        let input = json!({"password": "hunter2"});
        let _ = p.redact_payload(&input);
        assert_eq!(input["password"], "hunter2");
    }

    #[test]
    fn screenshot_snippet_targets_password_and_sensitive_class() {
        let p = policy();
        let css = p.screenshot_style_snippet();
        assert!(css.contains("password"));
        assert!(css.contains("sensitive"));
    }
}
