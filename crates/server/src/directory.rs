//! The Directory Service: the external registry of domains, users, and
//! administrator grants that provisioning calls into.
//!
//! The trait captures exactly the call surface the subsystem needs. It is
//! assumed to give read-after-write consistency on a single node; no
//! cross-node atomicity. The in-memory implementation backs standalone
//! deployments and tests; a persistent engine is a deployment concern
//! outside this subsystem.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("domain `{0}` is already registered")]
    DomainExists(String),

    #[error("user `{0}` already exists")]
    UserExists(String),

    #[error("user `{0}` not found")]
    UserNotFound(String),

    #[error("directory backend failure: {0}")]
    Backend(String),
}

/// A user record as the directory stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Fields for a new user record.
#[derive(Debug, Clone)]
pub struct NewDirectoryUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub domain: String,
}

/// Domain registry and user/administrator registry, as one collaborator.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn is_registered_domain(&self, name: &str) -> Result<bool, DirectoryError>;

    /// Registers a domain. Must report `DomainExists` rather than corrupt
    /// state when the name is already taken; this is the idempotency leg
    /// of the concurrent-creation guarantee.
    async fn create_domain(&self, name: &str, publicly_visible: bool)
    -> Result<(), DirectoryError>;

    async fn is_registered_user(&self, username: &str) -> Result<bool, DirectoryError>;

    async fn create_user(&self, user: NewDirectoryUser) -> Result<DirectoryUser, DirectoryError>;

    async fn get_user(&self, username: &str) -> Result<DirectoryUser, DirectoryError>;

    async fn delete_user(&self, username: &str) -> Result<(), DirectoryError>;

    /// Grants administrator privilege over `domain` to `username`.
    async fn add_admin_account(&self, username: &str, domain: &str) -> Result<(), DirectoryError>;

    /// Revokes administrator privilege. Revoking a user that holds none is
    /// a no-op, which keeps reconciliation idempotent across restarts.
    async fn remove_admin_account(&self, username: &str, domain: &str)
    -> Result<(), DirectoryError>;

    async fn is_user_admin(&self, username: &str) -> Result<bool, DirectoryError>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    /// Domain name to publicly-visible flag.
    domains: HashMap<String, bool>,
    users: HashMap<String, DirectoryUser>,
    /// Admin grants keyed by username; the value records the domain the
    /// grant was made under. Revocation matches by username so a grant
    /// made under an old domain is still revocable after a rename.
    admins: HashMap<String, String>,
}

/// Single-node, in-memory directory with read-after-write consistency.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryService for MemoryDirectory {
    async fn is_registered_domain(&self, name: &str) -> Result<bool, DirectoryError> {
        let state = self.state.lock().expect("directory state poisoned");
        Ok(state.domains.contains_key(name))
    }

    async fn create_domain(
        &self,
        name: &str,
        publicly_visible: bool,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().expect("directory state poisoned");
        if state.domains.contains_key(name) {
            return Err(DirectoryError::DomainExists(name.to_owned()));
        }
        state.domains.insert(name.to_owned(), publicly_visible);
        Ok(())
    }

    async fn is_registered_user(&self, username: &str) -> Result<bool, DirectoryError> {
        let state = self.state.lock().expect("directory state poisoned");
        Ok(state.users.contains_key(username))
    }

    async fn create_user(&self, user: NewDirectoryUser) -> Result<DirectoryUser, DirectoryError> {
        let mut state = self.state.lock().expect("directory state poisoned");
        if state.users.contains_key(&user.username) {
            return Err(DirectoryError::UserExists(user.username));
        }
        let now = Utc::now();
        let record = DirectoryUser {
            username: user.username.clone(),
            name: user.name,
            email: user.email,
            domain: user.domain,
            created_at: now,
            modified_at: now,
        };
        state.users.insert(user.username, record.clone());
        Ok(record)
    }

    async fn get_user(&self, username: &str) -> Result<DirectoryUser, DirectoryError> {
        let state = self.state.lock().expect("directory state poisoned");
        state
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(username.to_owned()))
    }

    async fn delete_user(&self, username: &str) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().expect("directory state poisoned");
        state
            .users
            .remove(username)
            .ok_or_else(|| DirectoryError::UserNotFound(username.to_owned()))?;
        // A deleted user cannot keep an administrator grant.
        state.admins.remove(username);
        Ok(())
    }

    async fn add_admin_account(&self, username: &str, domain: &str) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().expect("directory state poisoned");
        state.admins.insert(username.to_owned(), domain.to_owned());
        Ok(())
    }

    async fn remove_admin_account(
        &self,
        username: &str,
        _domain: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().expect("directory state poisoned");
        state.admins.remove(username);
        Ok(())
    }

    async fn is_user_admin(&self, username: &str) -> Result<bool, DirectoryError> {
        let state = self.state.lock().expect("directory state poisoned");
        Ok(state.admins.contains_key(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_domain_reports_conflict_not_corruption() {
        let dir = MemoryDirectory::new();
        dir.create_domain("example.com", true).await.unwrap();
        let err = dir.create_domain("example.com", true).await.unwrap_err();
        assert!(matches!(err, DirectoryError::DomainExists(_)));
        assert!(dir.is_registered_domain("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn user_lifecycle() {
        let dir = MemoryDirectory::new();
        let created = dir
            .create_user(NewDirectoryUser {
                username: "admin@example.com".into(),
                password: "secret".into(),
                name: "admin@example.com".into(),
                email: "admin@example.com".into(),
                domain: "example.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.created_at, created.modified_at);
        assert!(dir.is_registered_user("admin@example.com").await.unwrap());

        dir.add_admin_account("admin@example.com", "example.com")
            .await
            .unwrap();
        assert!(dir.is_user_admin("admin@example.com").await.unwrap());

        dir.delete_user("admin@example.com").await.unwrap();
        assert!(!dir.is_registered_user("admin@example.com").await.unwrap());
        let err = dir.get_user("admin@example.com").await.unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound(_)));
        // The grant went with the user; no explicit revocation needed.
        assert!(!dir.is_user_admin("admin@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn deleting_user_drops_its_admin_grant() {
        let dir = MemoryDirectory::new();
        dir.create_user(NewDirectoryUser {
            username: "root@example.com".into(),
            password: "secret".into(),
            name: "root@example.com".into(),
            email: "root@example.com".into(),
            domain: "example.com".into(),
        })
        .await
        .unwrap();
        dir.add_admin_account("root@example.com", "example.com")
            .await
            .unwrap();

        dir.delete_user("root@example.com").await.unwrap();
        assert!(!dir.is_user_admin("root@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn revoking_absent_grant_is_noop() {
        let dir = MemoryDirectory::new();
        dir.remove_admin_account("nobody@example.com", "example.com")
            .await
            .unwrap();
        assert!(!dir.is_user_admin("nobody@example.com").await.unwrap());
    }
}
