use std::env;
use std::sync::Arc;

use anyhow::Result;
use salvo::prelude::*;
use tracing::info;

use timplus_server::cluster::{LocalClusterCoordinator, RouterFactoryRegistry};
use timplus_server::{DirectoryService, MemoryDirectory, ProvisioningServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let config_path = env::var("TIMPLUS_CONFIG").unwrap_or_else(|_| "timplus.toml".to_owned());
    let config = ServerConfig::load(&config_path)?;
    info!(domain = %config.domain, "starting TIM+ provisioning server");

    let directory: Arc<dyn DirectoryService> = Arc::new(MemoryDirectory::new());
    let registry = RouterFactoryRegistry::builtin();
    let coordinator = LocalClusterCoordinator;

    // Startup-scoped failures abort here; the listener below never binds
    // with an indeterminate administrator or routing state.
    let server = ProvisioningServer::bootstrap(config, directory, &registry, &coordinator).await?;

    let listen_addr = server.config().listen_addr.clone();
    let acceptor = TcpListener::new(listen_addr.clone()).bind().await;
    info!(addr = %listen_addr, "REST surface listening");
    Server::new(acceptor).serve(server.rest_router()).await;

    Ok(())
}
