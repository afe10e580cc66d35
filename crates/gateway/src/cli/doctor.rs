use wmcp_browser::BrowserPool;
use wmcp_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("webmcp-broker doctor");
    println!("=====================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_max_browsers(config, &mut all_passed);
    check_browser_launchable(config, &mut all_passed).await;

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

fn check_max_browsers(config: &Config, all_passed: &mut bool) {
    let max = config.browser.max_browsers;
    let ok = max >= 1;
    print_check("maxBrowsers >= 1", ok, format!("maxBrowsers = {max}"));
    if !ok {
        *all_passed = false;
    }
}

/// Launch exactly one browser through the real pool and release it —
/// the only check here that actually exercises Chrome, so a broken
/// headless-Chrome install or missing dependency shows up before the
/// first real session does.
async fn check_browser_launchable(config: &Config, all_passed: &mut bool) {
    let pool = BrowserPool::new(
        config.browser.max_browsers,
        config.browser.network_egress_control,
        config.browser.policy.clone(),
    );

    match pool.acquire().await {
        Ok(handle) => {
            print_check("Browser launchable", true, "launched and closed one headless browser".into());
            pool.release(handle).await;
        }
        Err(e) => {
            print_check("Browser launchable", false, e.to_string());
            *all_passed = false;
        }
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
