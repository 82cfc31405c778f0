//! The one domain-creation operation both protocol adapters reduce to.
//!
//! The stanza handler and the REST controller run on independent thread
//! pools and may race on the same name. The directory's check-then-create
//! is not atomic on its own, so the gateway serializes creation per
//! normalized name: of two racing requests, exactly one observes
//! `Created` and the other `Conflict`, and only one creation call reaches
//! the directory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use timplus_core::{DomainName, Jid};

use crate::directory::{DirectoryError, DirectoryService};
use crate::error::DomainCreationError;

/// Success record for a created domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCreated {
    pub name: DomainName,
}

pub struct DomainCreationGateway {
    directory: Arc<dyn DirectoryService>,
    /// Per-name creation locks, keyed by normalized domain name.
    creation_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DomainCreationGateway {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self {
            directory,
            creation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a domain on behalf of `requester`.
    ///
    /// `requester` is `Some` on the stanza path, where the sender must
    /// hold administrator privilege. The REST path passes `None`: its
    /// authorization lives in the surrounding HTTP security layer, a
    /// deliberate contract difference between the two trust boundaries.
    pub async fn create_domain(
        &self,
        requester: Option<&Jid>,
        name: &str,
    ) -> Result<DomainCreated, DomainCreationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainCreationError::InvalidRequest);
        }
        let normalized = name.to_ascii_lowercase();

        if let Some(requester) = requester {
            let login = requester.to_string();
            if !self.directory.is_user_admin(&login).await? {
                warn!(requester = %login, domain = %normalized, "domain creation refused");
                return Err(DomainCreationError::Forbidden(login));
            }
        }

        let lock = self.creation_lock(&normalized);
        let result = {
            let _guard = lock.lock().await;
            self.create_serialized(requester, &normalized).await
        };
        self.release_creation_lock(&normalized, lock);
        result
    }

    /// Check-then-create under the per-name lock held by the caller.
    async fn create_serialized(
        &self,
        requester: Option<&Jid>,
        normalized: &str,
    ) -> Result<DomainCreated, DomainCreationError> {
        if self.directory.is_registered_domain(normalized).await? {
            return Err(DomainCreationError::Conflict(normalized.to_owned()));
        }

        let domain = DomainName::parse(normalized)
            .map_err(|_| DomainCreationError::InvalidFormat(normalized.to_owned()))?;

        match self.directory.create_domain(domain.as_str(), true).await {
            Ok(()) => {
                match requester {
                    Some(requester) => {
                        info!(domain = %domain, requester = %requester, "domain created")
                    }
                    None => info!(domain = %domain, "domain created via REST API"),
                }
                Ok(DomainCreated { name: domain })
            }
            // Lost a race outside our serialization scope (e.g. another
            // node); the directory's conflict report keeps this idempotent.
            Err(DirectoryError::DomainExists(name)) => Err(DomainCreationError::Conflict(name)),
            Err(err) => Err(DomainCreationError::Internal(err)),
        }
    }

    /// Read-only existence check, no authorization, no mutation.
    ///
    /// Deliberately unauthenticated on the REST surface; callers must not
    /// treat domain existence as secret.
    pub async fn domain_exists(&self, name: &str) -> Result<bool, DirectoryError> {
        self.directory
            .is_registered_domain(&name.trim().to_ascii_lowercase())
            .await
    }

    fn creation_lock(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.creation_locks.lock().expect("lock table poisoned");
        locks.entry(name.to_owned()).or_default().clone()
    }

    /// Drops this request's lock handle and evicts the table entry once no
    /// other request holds one, so the table only tracks names with a
    /// creation currently in flight.
    fn release_creation_lock(&self, name: &str, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.creation_locks.lock().expect("lock table poisoned");
        drop(lock);
        if locks
            .get(name)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(name);
        }
    }

    #[cfg(test)]
    fn creation_lock_count(&self) -> usize {
        self.creation_locks
            .lock()
            .expect("lock table poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    fn gateway() -> DomainCreationGateway {
        DomainCreationGateway::new(Arc::new(MemoryDirectory::new()))
    }

    #[tokio::test]
    async fn rejects_empty_name() {
        let gw = gateway();
        let err = gw.create_domain(None, "   ").await.unwrap_err();
        assert!(matches!(err, DomainCreationError::InvalidRequest));
    }

    #[tokio::test]
    async fn rejects_bad_grammar() {
        let gw = gateway();
        let err = gw.create_domain(None, "-bad.com").await.unwrap_err();
        assert!(matches!(err, DomainCreationError::InvalidFormat(_)));
        assert!(!gw.domain_exists("-bad.com").await.unwrap());
    }

    #[tokio::test]
    async fn creates_then_conflicts() {
        let gw = gateway();
        let created = gw.create_domain(None, "Health.Example").await.unwrap();
        assert_eq!(created.name.as_str(), "health.example");

        let err = gw.create_domain(None, "health.example").await.unwrap_err();
        assert!(matches!(err, DomainCreationError::Conflict(_)));
        assert!(gw.domain_exists("HEALTH.EXAMPLE").await.unwrap());
    }

    #[tokio::test]
    async fn conflict_check_precedes_format_check() {
        // A name already present in the directory answers conflict even
        // when it would fail the grammar; the existence check runs first.
        let directory = Arc::new(MemoryDirectory::new());
        directory.create_domain("bad_name", true).await.unwrap();
        let gw = DomainCreationGateway::new(directory);
        let err = gw.create_domain(None, "bad_name").await.unwrap_err();
        assert!(matches!(err, DomainCreationError::Conflict(_)));
    }

    #[tokio::test]
    async fn lock_table_drains_after_each_request() {
        let gw = gateway();
        gw.create_domain(None, "a.example").await.unwrap();
        gw.create_domain(None, "a.example").await.unwrap_err();
        gw.create_domain(None, "not_a_name").await.unwrap_err();
        assert_eq!(gw.creation_lock_count(), 0);
    }

    #[tokio::test]
    async fn lock_table_drains_after_contended_creation() {
        let gw = gateway();
        let (first, second) = tokio::join!(
            gw.create_domain(None, "race.example"),
            gw.create_domain(None, "race.example"),
        );
        // One winner, one conflict, and no entry left behind.
        assert!(first.is_ok() != second.is_ok());
        assert_eq!(gw.creation_lock_count(), 0);
    }

    #[tokio::test]
    async fn forbidden_without_admin_privilege() {
        let gw = gateway();
        let requester = Jid::parse("mallory@example.com").unwrap();
        let err = gw
            .create_domain(Some(&requester), "tenant.example")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainCreationError::Forbidden(_)));
        assert!(!gw.domain_exists("tenant.example").await.unwrap());
    }
}
