//! Startup configuration snapshot.
//!
//! Loaded once in `main` and passed by reference to the components that
//! need it. Nothing in the subsystem reads ambient global state; this is
//! what makes the reconciler and the cluster bootstrap deterministic
//! under test.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::path::Path;

use timplus_core::is_valid_domain_name;

pub const DEFAULT_ROUTER_FACTORY: &str = "delegated";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("`{0}` is not a valid default domain name")]
    InvalidDomain(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Default domain for the deployment, registered at boot.
    pub domain: String,

    /// Administrator login; qualified with `@domain` at reconciliation
    /// time when configured bare.
    pub admin_username: String,

    pub admin_password: String,

    /// Address the REST surface binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Whether the domain-creation stanza handler is registered at all.
    #[serde(default)]
    pub allow_client_domain_creation: bool,

    #[serde(default)]
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Symbolic name of the remote packet router factory, looked up in
    /// the registry at bootstrap.
    #[serde(default = "default_router_factory")]
    pub router_factory: String,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            router_factory: default_router_factory(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_owned()
}

fn default_router_factory() -> String {
    DEFAULT_ROUTER_FACTORY.to_owned()
}

impl ServerConfig {
    /// Loads the snapshot from a TOML file, with `TIMPLUS_*` environment
    /// variables taking precedence (nested keys split on `__`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TIMPLUS_").split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !is_valid_domain_name(&self.domain.to_ascii_lowercase()) {
            return Err(ConfigError::InvalidDomain(self.domain));
        }
        Ok(self)
    }
}
