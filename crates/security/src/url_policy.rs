//! URL egress policy: a pure function over the configured allow/block
//! host lists. No I/O, no state — the same inputs always produce the
//! same verdict, which is what lets it run both on the caller-supplied
//! navigation target and, inside the browser pool, on every subresource
//! request (spec's "evaluated once per network request ... AND once on
//! the navigation target" invariant).

use url::Url;

use wmcp_domain::config::UrlPolicyConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl UrlVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Host-matching rule: exact match or suffix match on a dot boundary
/// (`"sub.example.com"` matches the entry `"example.com"`, but
/// `"evilexample.com"` does not).
fn host_matches(host: &str, entry: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let entry = entry.to_ascii_lowercase();
    host == entry || host.ends_with(&format!(".{entry}"))
}

fn matches_any(host: &str, entries: &[String]) -> bool {
    entries.iter().any(|e| host_matches(host, e))
}

/// Decide whether `raw_url` is permitted under the configured policy.
/// Malformed URLs are always denied.
pub fn is_url_allowed(raw_url: &str, policy: &UrlPolicyConfig) -> UrlVerdict {
    let Ok(parsed) = Url::parse(raw_url) else {
        return UrlVerdict::deny("malformed URL");
    };
    let Some(host) = parsed.host_str() else {
        return UrlVerdict::deny("URL has no host");
    };

    if matches_any(host, &policy.blocked_domains) {
        return UrlVerdict::deny(format!("host \"{host}\" is on the block list"));
    }
    if !policy.allowed_domains.is_empty() && !matches_any(host, &policy.allowed_domains) {
        return UrlVerdict::deny(format!("host \"{host}\" is not on the allow list"));
    }
    UrlVerdict::allow()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allowed: &[&str], blocked: &[&str]) -> UrlPolicyConfig {
        UrlPolicyConfig {
            allowed_domains: allowed.iter().map(|s| s.to_string()).collect(),
            blocked_domains: blocked.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_lists_allow_anything_valid() {
        let p = policy(&[], &[]);
        assert!(is_url_allowed("https://example.com/page", &p).allowed);
    }

    #[test]
    fn malformed_url_is_denied() {
        let p = policy(&[], &[]);
        assert!(!is_url_allowed("not a url", &p).allowed);
    }

    #[test]
    fn block_list_denies_exact_and_subdomain() {
        let p = policy(&[], &["blocked.test"]);
        assert!(!is_url_allowed("https://blocked.test/", &p).allowed);
        assert!(!is_url_allowed("https://sub.blocked.test/", &p).allowed);
        assert!(is_url_allowed("https://notblocked.test/", &p).allowed);
    }

    #[test]
    fn block_suffix_does_not_false_positive_on_prefix_collision() {
        let p = policy(&[], &["example.com"]);
        assert!(is_url_allowed("https://evilexample.com/", &p).allowed);
    }

    #[test]
    fn nonempty_allow_list_denies_unlisted_host() {
        let p = policy(&["example.com"], &[]);
        assert!(!is_url_allowed("https://blocked.test", &p).allowed);
        assert!(is_url_allowed("https://example.com", &p).allowed);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let p = policy(&["Example.COM"], &[]);
        assert!(is_url_allowed("https://example.com", &p).allowed);
    }

    #[test]
    fn block_list_wins_over_allow_list() {
        let p = policy(&["example.com"], &["example.com"]);
        assert!(!is_url_allowed("https://example.com", &p).allowed);
    }
}
