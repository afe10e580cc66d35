use sha2::{Digest, Sha256};

use wmcp_domain::config::{Config, ConfigSeverity};
use wmcp_security::redaction::RedactionPolicy;

/// Parse and validate the config, printing any issues.
///
/// Returns `true` when valid (exit code 0), `false` when errors are found
/// (exit code 1).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML, with
/// every secret masked: configured API keys are replaced by a short
/// fingerprint, and the redaction policy's own fields/patterns are run
/// over the rest of the payload — the same treatment a recorded tool
/// call gets.
pub fn show(config: &Config) {
    let masked = mask_api_keys(config);
    let value = serde_json::to_value(&masked).expect("Config serializes");
    let redacted_value = RedactionPolicy::new(&masked.redaction).redact_payload(&value);

    let redacted: Config = match serde_json::from_value(redacted_value) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to re-parse redacted config: {e}");
            std::process::exit(1);
        }
    };

    match toml::to_string_pretty(&redacted) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

fn mask_api_keys(config: &Config) -> Config {
    let mut masked = config.clone();
    masked.auth.api_keys = masked
        .auth
        .api_keys
        .iter()
        .map(|(key, role)| {
            let digest = Sha256::digest(key.as_bytes());
            (format!("***{}***", hex::encode(&digest[..4])), role.clone())
        })
        .collect();
    masked
}
