use std::collections::HashSet;

use thiserror::Error;

use crate::models::DomainProperties;

/// Failure reported by a [`DomainRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The supplied properties are inconsistent, e.g. a root policy reference
    /// that matches no preset policy.
    #[error("{0}")]
    InvalidProperties(String),

    /// The backing store could not be read or written.
    #[error("domain storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

/// Authoritative store of policy domains.
///
/// Implementations own their own consistency and must tolerate concurrent
/// calls from any number of requests.
pub trait DomainRepository: Send + Sync {
    /// Session object for domain-scoped operations.
    type Handle;

    /// Creates a domain and returns the identifier the repository assigned.
    fn add_domain(&self, props: &DomainProperties) -> Result<String, RepositoryError>;

    /// All domain identifiers, restricted to those with the given external id
    /// when one is provided.
    fn get_domain_identifiers(
        &self,
        external_id: Option<&str>,
    ) -> Result<HashSet<String>, RepositoryError>;

    fn contains_domain(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Returns `None` when no domain has this identifier.
    fn get_domain_handle(&self, id: &str) -> Result<Option<Self::Handle>, RepositoryError>;
}
