//! Domain and administrator provisioning for the TIM+ messaging server.
//!
//! Two concurrently-reachable entry points (a stanza handler and a REST
//! controller) funnel into one domain-creation operation against the
//! Directory Service; a startup-time reconciler guarantees exactly one
//! administrator account consistent with configuration; and an optional
//! cluster bootstrap installs the remote packet router before the server
//! accepts traffic.

use std::sync::Arc;

use salvo::Router;
use tracing::info;

pub mod admin;
pub mod cluster;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod routing;

pub use config::{ClusteringConfig, ConfigError, ServerConfig};
pub use directory::{DirectoryError, DirectoryService, DirectoryUser, MemoryDirectory};
pub use error::{ClusterBootstrapError, DomainCreationError, ReconcileError, StartupError};
pub use gateway::{DomainCreated, DomainCreationGateway};
pub use handler::{DomainCreationIqHandler, IqHandler, IqRouter};

use cluster::{ClusterCoordinator, RouterFactoryRegistry, RoutingTable};
use routing::AppState;

/// The assembled provisioning subsystem.
///
/// [`ProvisioningServer::bootstrap`] runs the startup sequence in order:
/// cluster bootstrap, then administrator reconciliation, then adapter
/// wiring. Both startup steps complete (or abort the process) before any
/// listener binds, so client requests can never race the default-domain
/// registration.
pub struct ProvisioningServer {
    config: ServerConfig,
    directory: Arc<dyn DirectoryService>,
    routing_table: Arc<RoutingTable>,
    gateway: Arc<DomainCreationGateway>,
    iq_router: Arc<IqRouter>,
}

impl std::fmt::Debug for ProvisioningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProvisioningServer {
    pub async fn bootstrap(
        config: ServerConfig,
        directory: Arc<dyn DirectoryService>,
        registry: &RouterFactoryRegistry,
        coordinator: &dyn ClusterCoordinator,
    ) -> Result<Self, StartupError> {
        let routing_table = Arc::new(RoutingTable::new());
        cluster::bootstrap_clustering(&config.clustering, registry, &routing_table, coordinator)?;

        admin::reconcile_admin_account(&config, directory.as_ref()).await?;

        let gateway = Arc::new(DomainCreationGateway::new(directory.clone()));
        let mut iq_router = IqRouter::new();
        if config.allow_client_domain_creation {
            iq_router.register(Arc::new(DomainCreationIqHandler::new(gateway.clone())));
            info!("domain creation by clients is enabled");
        } else {
            info!("domain creation by clients is disabled");
        }

        Ok(Self {
            config,
            directory,
            routing_table,
            gateway,
            iq_router: Arc::new(iq_router),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryService> {
        &self.directory
    }

    /// Routing table the session layer consults for remote delivery.
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.routing_table
    }

    pub fn gateway(&self) -> &Arc<DomainCreationGateway> {
        &self.gateway
    }

    /// IQ dispatch surface handed to the stanza session layer.
    pub fn iq_router(&self) -> &Arc<IqRouter> {
        &self.iq_router
    }

    /// REST surface with shared state affixed.
    pub fn rest_router(&self) -> Router {
        routing::router(AppState {
            gateway: self.gateway.clone(),
        })
    }
}
