use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Redaction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Field names (case-insensitive) whose values are always masked.
    #[serde(default = "d_fields")]
    pub fields: Vec<String>,

    /// Regex patterns applied, in order, to every string leaf.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            fields: d_fields(),
            patterns: Vec::new(),
        }
    }
}

fn d_fields() -> Vec<String> {
    vec![
        "password".into(),
        "passwd".into(),
        "secret".into(),
        "token".into(),
        "apikey".into(),
        "api_key".into(),
        "authorization".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fields_cover_password() {
        assert!(RedactionConfig::default()
            .fields
            .iter()
            .any(|f| f == "password"));
    }
}
