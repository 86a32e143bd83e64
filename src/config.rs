//! Process-wide service configuration, fixed at startup.

use crate::models::PolicyRef;

/// Service configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct ServiceConfig {
    /// Resource identifier granting access to every domain
    /// (from POLICY_DOMAINS_ANY_RESOURCE_ID).
    ///
    /// Also decides what a request without an authorization context may see:
    /// everything when unset, nothing when set.
    pub any_resource_id: Option<String>,
    /// Trusted request header carrying the caller's authorized resource ids,
    /// comma-separated (from POLICY_DOMAINS_AUTHZ_HEADER). When unset no
    /// authorization context is ever attached to requests.
    pub authz_header: Option<String>,
    /// Policies a new domain may name as its root policy
    /// (from POLICY_DOMAINS_PRESET_POLICIES, comma-separated `id[:version]`).
    pub preset_policies: Vec<PolicyRef>,
    /// Allowed CORS origins (from POLICY_DOMAINS_CORS_ORIGINS, comma-separated).
    pub cors_origins: Option<Vec<String>>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let preset_policies = non_empty("POLICY_DOMAINS_PRESET_POLICIES")
            .map(|s| parse_preset_policies(&s))
            .unwrap_or_default();

        let cors_origins = non_empty("POLICY_DOMAINS_CORS_ORIGINS")
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            any_resource_id: non_empty("POLICY_DOMAINS_ANY_RESOURCE_ID"),
            authz_header: non_empty("POLICY_DOMAINS_AUTHZ_HEADER"),
            preset_policies,
            cors_origins,
        }
    }

    /// No wildcard, no authorization header: every caller sees every domain.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Authorization enforced through `header`, with `any_resource_id` as wildcard.
    pub fn with_authorization(
        header: impl Into<String>,
        any_resource_id: impl Into<String>,
    ) -> Self {
        Self {
            any_resource_id: Some(any_resource_id.into()),
            authz_header: Some(header.into()),
            ..Self::default()
        }
    }
}

/// Parses a comma-separated list of `id[:version]` entries, skipping
/// malformed ones.
pub fn parse_preset_policies(s: &str) -> Vec<PolicyRef> {
    s.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| match entry.parse::<PolicyRef>() {
            Ok(policy) => Some(policy),
            Err(e) => {
                tracing::warn!("Ignoring preset policy: {}", e);
                None
            }
        })
        .collect()
}
