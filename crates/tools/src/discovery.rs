//! Tool discovery: inspect a page's `navigator.modelContext` capability
//! object and fall back to the static catalog when it is absent or empty.

use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{fallback_catalog, ToolDescriptor};

/// Probe script run inside the page. Reads the well-known capability
/// object without assuming any particular shape beyond "has a `tools`
/// array of `{name, description, inputSchema}` records" — the same shape
/// the fallback catalog itself uses, so callers never need to special-case
/// the two sources.
const PROBE_SCRIPT: &str = r#"
(() => {
  const mc = navigator.modelContext;
  if (!mc || typeof mc.provideContext !== 'function' && !Array.isArray(mc.tools)) {
    return null;
  }
  const tools = Array.isArray(mc.tools) ? mc.tools : [];
  if (tools.length === 0) return null;
  return tools.map(t => ({
    name: t.name,
    description: t.description || '',
    inputSchema: t.inputSchema || { type: 'object' },
  }));
})();
"#;

#[derive(Debug, Deserialize)]
struct DiscoveredTool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    pub tools: Vec<ToolDescriptor>,
    pub has_web_mcp: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to evaluate discovery probe: {0}")]
    Evaluate(String),
}

/// Run the discovery probe. Idempotent and side-effect free: calling it
/// twice with no intervening navigation returns an equal result.
pub async fn discover(page: &Page) -> Result<DiscoveryResult, DiscoveryError> {
    let evaluation = page
        .evaluate(PROBE_SCRIPT)
        .await
        .map_err(|e| DiscoveryError::Evaluate(e.to_string()))?;

    let declared: Option<Vec<DiscoveredTool>> = evaluation
        .into_value()
        .map_err(|e| DiscoveryError::Evaluate(e.to_string()))?;

    match declared {
        Some(tools) if !tools.is_empty() => Ok(DiscoveryResult {
            tools: tools
                .into_iter()
                .map(|t| ToolDescriptor {
                    name: t.name,
                    description: t.description,
                    input_schema: t.input_schema,
                    output_schema: None,
                    category: crate::catalog::ToolCategory::Composite,
                    requires_auth: false,
                })
                .collect(),
            has_web_mcp: true,
        }),
        _ => Ok(DiscoveryResult {
            tools: fallback_catalog(),
            has_web_mcp: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_result_reports_no_webmcp() {
        let fallback = DiscoveryResult {
            tools: fallback_catalog(),
            has_web_mcp: false,
        };
        assert!(!fallback.has_web_mcp);
        assert!(fallback.tools.len() >= 100);
    }
}
