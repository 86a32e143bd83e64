//! Domain access filtering and the domain collection operations built on it.
//!
//! [`DomainsService`] decides which domains a caller may see from the
//! authorization context supplied by the serving infrastructure:
//!
//! | context | wildcard configured | context has wildcard | visible |
//! |---------|---------------------|----------------------|---------|
//! | absent  | no                  | -                    | all domains |
//! | absent  | yes                 | -                    | none |
//! | present | -                   | yes                  | all domains |
//! | present | -                   | no                   | granted ids that exist |
//!
//! "All domains" is narrowed by the external id filter when one is given.

mod repository;

pub use repository::{DomainRepository, RepositoryError};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::error::{DomainsError, Result};
use crate::models::{DomainProperties, Link, Resources};

/// Stateless front end over a [`DomainRepository`].
pub struct DomainsService<R> {
    repo: Arc<R>,
    any_resource_id: Option<Arc<str>>,
}

impl<R> Clone for DomainsService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            any_resource_id: self.any_resource_id.clone(),
        }
    }
}

impl<R: DomainRepository> DomainsService<R> {
    pub fn new(repo: R, any_resource_id: Option<String>) -> Self {
        Self {
            repo: Arc::new(repo),
            any_resource_id: any_resource_id.map(Into::into),
        }
    }

    pub fn from_config(repo: R, config: &ServiceConfig) -> Self {
        Self::new(repo, config.any_resource_id.clone())
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn any_resource_id(&self) -> Option<&str> {
        self.any_resource_id.as_deref()
    }

    /// Identifiers of the domains visible to a caller, in lexicographic order.
    ///
    /// `authorized` is the list of resource ids granted to the caller, or
    /// `None` when the serving infrastructure supplied no authorization
    /// context. Granted ids are checked one by one, so grants for deleted
    /// domains are dropped rather than reported.
    pub fn visible_domains(
        &self,
        authorized: Option<&[String]>,
        external_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let visible: BTreeSet<String> = match authorized {
            None if self.any_resource_id.is_none() => {
                self.repo.get_domain_identifiers(external_id)?.into_iter().collect()
            }
            None => {
                tracing::debug!("No authorization context and a wildcard is configured; hiding all domains");
                BTreeSet::new()
            }
            Some(granted) if self.grants_any(granted) => {
                self.repo.get_domain_identifiers(external_id)?.into_iter().collect()
            }
            Some(granted) => {
                let mut visible = BTreeSet::new();
                for id in granted {
                    if self.repo.contains_domain(id)? {
                        visible.insert(id.clone());
                    } else {
                        tracing::debug!("Skipping grant for unknown domain {}", id);
                    }
                }
                visible
            }
        };

        Ok(visible.into_iter().collect())
    }

    /// Links to the domains visible to a caller.
    pub fn list_domains(
        &self,
        authorized: Option<&[String]>,
        external_id: Option<&str>,
    ) -> Result<Resources> {
        let ids = self.visible_domains(authorized, external_id)?;
        Ok(Resources {
            links: render_links(&ids),
        })
    }

    /// Creates a domain and links to it. The identifier is always chosen by
    /// the repository.
    pub fn create_domain(&self, props: Option<DomainProperties>) -> Result<Link> {
        let props = props.ok_or_else(|| DomainsError::invalid_argument("Missing domain properties"))?;

        let id = self.repo.add_domain(&props)?;
        tracing::info!("Created domain {} (external id: {:?})", id, props.external_id);

        Ok(Link::item(&id))
    }

    /// Session object for operations scoped to one domain.
    pub fn get_domain(&self, id: &str) -> Result<R::Handle> {
        if id.trim().is_empty() {
            return Err(DomainsError::invalid_argument("Missing domain id"));
        }

        self.repo
            .get_domain_handle(id)?
            .ok_or(DomainsError::NotFound)
    }

    fn grants_any(&self, granted: &[String]) -> bool {
        self.any_resource_id
            .as_deref()
            .is_some_and(|any| granted.iter().any(|id| id == any))
    }
}

/// Item links for `ids`, keeping their order.
pub fn render_links<S: AsRef<str>>(ids: &[S]) -> Vec<Link> {
    ids.iter().map(|id| Link::item(id.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Repository over a fixed id set that counts every call.
    #[derive(Default)]
    struct FakeRepo {
        ids: Mutex<Vec<(String, Option<String>)>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeRepo {
        fn with_ids(ids: &[&str]) -> Self {
            Self {
                ids: Mutex::new(ids.iter().map(|id| (id.to_string(), None)).collect()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn record(&self) -> std::result::Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RepositoryError::Storage(anyhow::anyhow!("disk unavailable")));
            }
            Ok(())
        }
    }

    impl DomainRepository for FakeRepo {
        type Handle = String;

        fn add_domain(&self, props: &DomainProperties) -> std::result::Result<String, RepositoryError> {
            self.record()?;
            if props.root_policy_ref.is_some() {
                return Err(RepositoryError::InvalidProperties("unknown root policy".to_string()));
            }
            let mut ids = self.ids.lock().unwrap();
            let id = format!("d{}", ids.len() + 1);
            ids.push((id.clone(), props.external_id.clone()));
            Ok(id)
        }

        fn get_domain_identifiers(
            &self,
            external_id: Option<&str>,
        ) -> std::result::Result<HashSet<String>, RepositoryError> {
            self.record()?;
            Ok(self
                .ids
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, ext)| external_id.is_none() || ext.as_deref() == external_id)
                .map(|(id, _)| id.clone())
                .collect())
        }

        fn contains_domain(&self, id: &str) -> std::result::Result<bool, RepositoryError> {
            self.record()?;
            Ok(self.ids.lock().unwrap().iter().any(|(known, _)| known == id))
        }

        fn get_domain_handle(&self, id: &str) -> std::result::Result<Option<String>, RepositoryError> {
            Ok(self.contains_domain(id)?.then(|| id.to_string()))
        }
    }

    fn grants(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn granted_ids_are_intersected_with_existing_domains() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d1", "d2", "d3"]), Some("ANY".into()));
        let visible = service.visible_domains(Some(grants(&["d2", "gone"]).as_slice()), None).unwrap();
        assert_eq!(visible, vec!["d2"]);
    }

    #[test]
    fn wildcard_grant_shows_everything() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d2", "d1"]), Some("ANY".into()));
        let visible = service.visible_domains(Some(grants(&["ANY", "d1"]).as_slice()), None).unwrap();
        assert_eq!(visible, vec!["d1", "d2"]);
    }

    #[test]
    fn absent_context_without_wildcard_shows_everything() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d1"]), None);
        assert_eq!(service.visible_domains(None, None).unwrap(), vec!["d1"]);
    }

    #[test]
    fn absent_context_with_wildcard_shows_nothing() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d1"]), Some("ANY".into()));
        assert!(service.visible_domains(None, None).unwrap().is_empty());
        assert_eq!(service.repository().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_grants_are_reported_once() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d1"]), Some("ANY".into()));
        let visible = service.visible_domains(Some(grants(&["d1", "d1"]).as_slice()), None).unwrap();
        assert_eq!(visible, vec!["d1"]);
    }

    #[test]
    fn repository_failure_is_internal() {
        let service = DomainsService::new(FakeRepo::failing(), None);
        assert!(matches!(
            service.visible_domains(None, None),
            Err(DomainsError::Internal(_))
        ));
    }

    #[test]
    fn create_without_properties_never_touches_the_repository() {
        let service = DomainsService::new(FakeRepo::default(), None);
        assert!(matches!(
            service.create_domain(None),
            Err(DomainsError::InvalidArgument(_))
        ));
        assert_eq!(service.repository().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn create_returns_item_link_for_assigned_id() {
        let service = DomainsService::new(FakeRepo::default(), None);
        let link = service.create_domain(Some(DomainProperties::default())).unwrap();
        assert_eq!(link, Link::item("d1"));
    }

    #[test]
    fn create_rejected_by_repository_is_invalid_argument() {
        let service = DomainsService::new(FakeRepo::default(), None);
        let props = DomainProperties {
            root_policy_ref: Some(crate::models::PolicyRef::new("nope", None)),
            ..DomainProperties::default()
        };
        assert!(matches!(
            service.create_domain(Some(props)),
            Err(DomainsError::InvalidArgument(msg)) if msg == "unknown root policy"
        ));
    }

    #[test]
    fn get_domain_validates_and_looks_up() {
        let service = DomainsService::new(FakeRepo::with_ids(&["d1"]), None);
        assert!(matches!(service.get_domain(""), Err(DomainsError::InvalidArgument(_))));
        assert!(matches!(service.get_domain("nonexistent"), Err(DomainsError::NotFound)));
        assert_eq!(service.get_domain("d1").unwrap(), "d1");
    }

    #[test]
    fn render_links_keeps_order() {
        let links = render_links(&["b", "a/1"]);
        assert_eq!(links[0].title, "b");
        assert_eq!(links[1].href, "a%2F1");
        assert_eq!(links[1].title, "a/1");
    }
}
