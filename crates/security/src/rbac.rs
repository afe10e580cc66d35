//! RBAC action table. Actions are coarse strings (`session.create`,
//! `tool.call:<category>`, …) rather than an exhaustive enum, because the
//! tool-call action space is parameterized by the catalog's category list,
//! which is itself data, not a fixed set known at compile time.

use crate::auth::Principal;

/// Built-in roles. A `custom` role (any string not in this list) is given
/// the same permissions as `viewer` unless RBAC is disabled, per the "role
/// ∈ {admin, operator, viewer, custom…}" data model.
const ADMIN: &str = "admin";
const OPERATOR: &str = "operator";
const VIEWER: &str = "viewer";

/// Answer `may(principal, action)`. `action` is matched exactly, except
/// for the `tool.call:<category>` family where a role's entry of
/// `tool.call:*` admits every category.
pub fn may(principal: &Principal, action: &str) -> bool {
    let allowed = allowed_actions(&principal.role);
    allowed.iter().any(|a| action_matches(a, action))
}

fn action_matches(granted: &str, requested: &str) -> bool {
    if granted == requested {
        return true;
    }
    if let Some(prefix) = granted.strip_suffix('*') {
        return requested.starts_with(prefix);
    }
    false
}

fn allowed_actions(role: &str) -> &'static [&'static str] {
    match role {
        ADMIN => &[
            "session.create",
            "session.read",
            "session.close",
            "tool.list",
            "tool.call:*",
        ],
        OPERATOR => &[
            "session.create",
            "session.read",
            "session.close",
            "tool.list",
            "tool.call:*",
        ],
        VIEWER => &["session.read", "tool.list", "tool.call:extraction", "tool.call:capture"],
        _ => &["session.read", "tool.list"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrincipalSource;

    fn principal(role: &str) -> Principal {
        Principal {
            id: "p1".into(),
            source: PrincipalSource::Apikey,
            role: role.into(),
            scopes: Vec::new(),
        }
    }

    #[test]
    fn admin_may_call_any_category() {
        let p = principal("admin");
        assert!(may(&p, "tool.call:navigation"));
        assert!(may(&p, "tool.call:evaluation"));
        assert!(may(&p, "session.close"));
    }

    #[test]
    fn viewer_may_read_but_not_close() {
        let p = principal("viewer");
        assert!(may(&p, "tool.list"));
        assert!(may(&p, "tool.call:extraction"));
        assert!(!may(&p, "session.close"));
        assert!(!may(&p, "tool.call:navigation"));
    }

    #[test]
    fn unknown_custom_role_defaults_to_read_only() {
        let p = principal("auditor");
        assert!(may(&p, "tool.list"));
        assert!(!may(&p, "session.create"));
    }
}
