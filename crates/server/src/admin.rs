//! Startup-time administrator reconciliation.
//!
//! Runs exactly once, single-threaded, before any listener binds. Brings
//! the persisted administrator account into agreement with the current
//! configuration: creates it when absent, migrates a legacy-named account
//! whose stored email no longer matches the configured identity, and
//! retires the bare `admin` account once a differently-named
//! administrator is configured. Idempotent: a second run with unchanged
//! configuration performs no mutation.

use tracing::info;

use crate::config::ServerConfig;
use crate::directory::{DirectoryError, DirectoryService, NewDirectoryUser};
use crate::error::ReconcileError;

/// Name of the administrator account that legacy deployments shipped with.
const LEGACY_ADMIN_NAME: &str = "admin";

/// Ensures exactly one administrator account consistent with `config`.
///
/// Any directory failure is fatal to startup; the server must not accept
/// traffic with an indeterminate administrator state.
pub async fn reconcile_admin_account(
    config: &ServerConfig,
    directory: &dyn DirectoryService,
) -> Result<(), ReconcileError> {
    let domain = config.domain.to_ascii_lowercase();

    // The default domain must exist before the admin account can be
    // attached to it. Not an error if a previous boot already created it.
    if !directory.is_registered_domain(&domain).await? {
        match directory.create_domain(&domain, true).await {
            Ok(()) | Err(DirectoryError::DomainExists(_)) => {}
            Err(err) => return Err(err.into()),
        }
        info!(domain = %domain, "registered default domain");
    }

    let cfg_user = if config.admin_username.contains('@') {
        config.admin_username.clone()
    } else {
        format!("{}@{}", config.admin_username, domain)
    };
    // The qualified login doubles as the account's mail address.
    let expected_email = cfg_user.clone();

    if !directory.is_registered_user(&cfg_user).await? {
        directory
            .create_user(NewDirectoryUser {
                username: cfg_user.clone(),
                password: config.admin_password.clone(),
                name: cfg_user.clone(),
                email: expected_email.clone(),
                domain: domain.clone(),
            })
            .await?;
        directory.add_admin_account(&cfg_user, &domain).await?;
        info!(admin = %cfg_user, "created administrator account");
    } else if admin_node(&cfg_user) == LEGACY_ADMIN_NAME {
        // Legacy-named account: when the stored email disagrees with the
        // configured identity, the account is recreated with fresh
        // timestamps. A migration, not a no-op.
        let existing = directory.get_user(&cfg_user).await?;
        if !existing.email.eq_ignore_ascii_case(&expected_email) {
            directory.remove_admin_account(&cfg_user, &domain).await?;
            directory.delete_user(&cfg_user).await?;
            directory
                .create_user(NewDirectoryUser {
                    username: cfg_user.clone(),
                    password: config.admin_password.clone(),
                    name: cfg_user.clone(),
                    email: expected_email.clone(),
                    domain: domain.clone(),
                })
                .await?;
            directory.add_admin_account(&cfg_user, &domain).await?;
            info!(
                admin = %cfg_user,
                old_email = %existing.email,
                new_email = %expected_email,
                "migrated legacy administrator account"
            );
        }
    }

    // Unconditional final step: a bare `admin` account must not survive a
    // configuration that names the administrator differently.
    if directory.is_registered_user(LEGACY_ADMIN_NAME).await? && cfg_user != LEGACY_ADMIN_NAME {
        directory
            .remove_admin_account(LEGACY_ADMIN_NAME, &domain)
            .await?;
        directory.delete_user(LEGACY_ADMIN_NAME).await?;
        info!("retired legacy `admin` account");
    }

    Ok(())
}

fn admin_node(login: &str) -> &str {
    login.split_once('@').map(|(node, _)| node).unwrap_or(login)
}
