mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::domains::{DomainRepository, RepositoryError};
use crate::models::*;

/// SQLite-backed domain repository.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    preset_policies: Arc<Vec<PolicyRef>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::from_connection(conn))
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "policy-domains")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("domains.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            preset_policies: Arc::new(Vec::new()),
        }
    }

    /// Policies, besides the default root policy, that new domains may name
    /// as their root policy.
    pub fn with_preset_policies(mut self, policies: Vec<PolicyRef>) -> Self {
        self.preset_policies = Arc::new(policies);
        self
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Domain operations
    // ============================================================

    pub fn create_domain(&self, props: &DomainProperties) -> Result<DomainView, RepositoryError> {
        let root_policy_ref = self.resolve_root_policy(props.root_policy_ref.as_ref())?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO domains (id, external_id, description, root_policy_id, root_policy_version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &props.external_id,
                &props.description,
                &root_policy_ref.id,
                &root_policy_ref.version,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(DomainView {
            id,
            external_id: props.external_id.clone(),
            description: props.description.clone(),
            root_policy_ref,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_domain(&self, id: &str) -> Result<Option<DomainView>, RepositoryError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let domain = conn
            .query_row(
                "SELECT id, external_id, description, root_policy_id, root_policy_version, created_at, updated_at
                 FROM domains WHERE id = ?",
                [id],
                domain_from_row,
            )
            .optional()?;
        Ok(domain)
    }

    /// Replaces the properties of a domain. A missing root policy reference
    /// keeps the current one.
    pub fn update_domain(
        &self,
        id: &str,
        props: &DomainProperties,
    ) -> Result<Option<DomainView>, RepositoryError> {
        let Some(existing) = self.get_domain(id)? else {
            return Ok(None);
        };

        let root_policy_ref = match &props.root_policy_ref {
            Some(requested) => self.resolve_root_policy(Some(requested))?,
            None => existing.root_policy_ref,
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE domains SET external_id = ?, description = ?, root_policy_id = ?, root_policy_version = ?, updated_at = ?
             WHERE id = ?",
            (
                &props.external_id,
                &props.description,
                &root_policy_ref.id,
                &root_policy_ref.version,
                now.to_rfc3339(),
                id,
            ),
        )?;

        // Deleted between the lookup and the update
        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(DomainView {
            id: id.to_string(),
            external_id: props.external_id.clone(),
            description: props.description.clone(),
            root_policy_ref,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_domain(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM domains WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    /// Picks the root policy for a domain: the default one when none is
    /// requested, otherwise the first preset the reference matches.
    fn resolve_root_policy(&self, requested: Option<&PolicyRef>) -> Result<PolicyRef, RepositoryError> {
        let default_root = PolicyRef::default_root();
        let Some(requested) = requested else {
            return Ok(default_root);
        };

        std::iter::once(&default_root)
            .chain(self.preset_policies.iter())
            .find(|preset| requested.matches(preset))
            .cloned()
            .ok_or_else(|| {
                RepositoryError::InvalidProperties(format!(
                    "rootPolicyRef '{}'{} matches no preset policy",
                    requested.id,
                    requested
                        .version
                        .as_deref()
                        .map(|v| format!(" (version {})", v))
                        .unwrap_or_default()
                ))
            })
    }
}

impl DomainRepository for Database {
    type Handle = DomainHandle;

    fn add_domain(&self, props: &DomainProperties) -> Result<String, RepositoryError> {
        self.create_domain(props).map(|domain| domain.id)
    }

    fn get_domain_identifiers(
        &self,
        external_id: Option<&str>,
    ) -> Result<HashSet<String>, RepositoryError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare("SELECT id FROM domains WHERE (?1 IS NULL OR external_id = ?1)")?;

        let ids = stmt
            .query_map([external_id], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;

        Ok(ids)
    }

    fn contains_domain(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row("SELECT 1 FROM domains WHERE id = ?", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn get_domain_handle(&self, id: &str) -> Result<Option<DomainHandle>, RepositoryError> {
        Ok(self.contains_domain(id)?.then(|| DomainHandle {
            db: self.clone(),
            id: id.to_string(),
        }))
    }
}

/// Access to a single existing domain.
///
/// The domain may be deleted by another request while the handle is held, so
/// every read or write reports whether the domain was still there.
#[derive(Clone)]
pub struct DomainHandle {
    db: Database,
    id: String,
}

impl DomainHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn view(&self) -> Result<Option<DomainView>, RepositoryError> {
        self.db.get_domain(&self.id)
    }

    pub fn properties(&self) -> Result<Option<DomainProperties>, RepositoryError> {
        Ok(self.view()?.map(|domain| domain.properties()))
    }

    pub fn update_properties(
        &self,
        props: &DomainProperties,
    ) -> Result<Option<DomainView>, RepositoryError> {
        self.db.update_domain(&self.id, props)
    }

    pub fn delete(&self) -> Result<bool, RepositoryError> {
        self.db.delete_domain(&self.id)
    }
}

impl std::fmt::Debug for DomainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainHandle").field("id", &self.id).finish()
    }
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<DomainView> {
    Ok(DomainView {
        id: row.get(0)?,
        external_id: row.get(1)?,
        description: row.get(2)?,
        root_policy_ref: PolicyRef::new(row.get::<_, String>(3)?, row.get(4)?),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    match chrono::DateTime::parse_from_rfc3339(&s) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!("Unreadable timestamp {:?} in domains table, using now: {}", s, e);
            Utc::now()
        }
    }
}
