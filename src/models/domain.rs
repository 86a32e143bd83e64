use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the root policy assigned to a domain when the caller does not
/// name one.
pub const DEFAULT_ROOT_POLICY_ID: &str = "root";
pub const DEFAULT_ROOT_POLICY_VERSION: &str = "0.1.0";

/// Reference to a policy, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PolicyRef {
    pub fn new(id: impl Into<String>, version: Option<String>) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// The root policy every domain gets when none is requested.
    pub fn default_root() -> Self {
        Self::new(
            DEFAULT_ROOT_POLICY_ID,
            Some(DEFAULT_ROOT_POLICY_VERSION.to_string()),
        )
    }

    /// Whether this reference resolves to `preset`.
    ///
    /// A reference without a version matches any version of the same policy.
    pub fn matches(&self, preset: &PolicyRef) -> bool {
        if self.id != preset.id {
            return false;
        }
        match (&self.version, &preset.version) {
            (None, _) => true,
            (Some(wanted), Some(available)) => wanted == available,
            (Some(_), None) => false,
        }
    }
}

impl std::str::FromStr for PolicyRef {
    type Err = String;

    /// Parses `id` or `id:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (id, version) = match s.split_once(':') {
            Some((id, version)) => (id.trim(), Some(version.trim().to_string())),
            None => (s, None),
        };
        if id.is_empty() {
            return Err(format!("invalid policy reference: '{}'", s));
        }
        Ok(Self::new(id, version.filter(|v| !v.is_empty())))
    }
}

/// Caller-supplied domain properties, used both to create a domain and to
/// replace the properties of an existing one.
///
/// The external id is a correlation key chosen by the caller; it is not unique
/// across domains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root policy the domain should start from. Must match one of the
    /// preset policies when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_policy_ref: Option<PolicyRef>,
}

/// A stored policy domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub root_policy_ref: PolicyRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainView {
    pub fn properties(&self) -> DomainProperties {
        DomainProperties {
            external_id: self.external_id.clone(),
            description: self.description.clone(),
            root_policy_ref: Some(self.root_policy_ref.clone()),
        }
    }
}
