//! Error types for the provisioning subsystem.
//!
//! Request-scoped errors (`DomainCreationError`) are recovered inside the
//! adapters and rendered as structured responses. Startup-scoped errors
//! (`ReconcileError`, `ClusterBootstrapError`) propagate out of the
//! bootstrap sequence and abort the process; the server must never accept
//! traffic with an indeterminate administrator or routing state.

use timplus_core::ErrorCondition;

use crate::directory::DirectoryError;

/// Outcome classification for a single domain-creation request.
#[derive(Debug, thiserror::Error)]
pub enum DomainCreationError {
    /// The request carried no domain name.
    #[error("domain name is missing or empty")]
    InvalidRequest,

    /// The name fails the hostname grammar.
    #[error("`{0}` is not a valid domain name")]
    InvalidFormat(String),

    /// The requester does not hold administrator privilege.
    #[error("`{0}` lacks administrator privilege")]
    Forbidden(String),

    /// The domain is already registered. Idempotent from the caller's
    /// point of view; no state was touched.
    #[error("domain `{0}` already exists")]
    Conflict(String),

    /// The directory failed in an unexpected way; nothing was created.
    #[error("directory failure: {0}")]
    Internal(#[source] DirectoryError),
}

impl DomainCreationError {
    /// Protocol error condition the stanza adapter answers with.
    pub fn protocol_condition(&self) -> ErrorCondition {
        match self {
            Self::InvalidRequest => ErrorCondition::BadRequest,
            Self::InvalidFormat(_) => ErrorCondition::NotAcceptable,
            Self::Forbidden(_) => ErrorCondition::Forbidden,
            Self::Conflict(_) => ErrorCondition::Conflict,
            Self::Internal(_) => ErrorCondition::InternalServerError,
        }
    }
}

impl From<DirectoryError> for DomainCreationError {
    fn from(err: DirectoryError) -> Self {
        Self::Internal(err)
    }
}

/// Fatal failure of the administrator reconciliation pass.
#[derive(Debug, thiserror::Error)]
#[error("administrator reconciliation failed: {0}")]
pub struct ReconcileError(#[from] pub DirectoryError);

/// Fatal failure while wiring up clustering support.
#[derive(Debug, thiserror::Error)]
pub enum ClusterBootstrapError {
    /// The configured factory name is not present in the registry.
    #[error("unknown remote packet router factory `{0}`")]
    UnknownFactory(String),

    /// The factory was resolved but could not produce a router.
    #[error("remote packet router factory `{name}` failed: {reason}")]
    FactoryFailed { name: String, reason: String },

    /// The cluster membership service failed to start.
    #[error("cluster membership startup failed: {0}")]
    MembershipFailed(String),
}

/// Anything that aborts process startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("clustering bootstrap failed: {0}")]
    Clustering(#[from] ClusterBootstrapError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
