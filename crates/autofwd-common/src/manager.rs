//! Collaborator traits consumed by the forward manager.
//!
//! The reconciliation engine never talks to docker or ssh directly. It
//! depends on a [`ContainerLister`] for the desired state and on a
//! [`TunnelManager`] to realise it, so tests can substitute both.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FwdResult;
use crate::forward::Forward;

/// Default values for the forwarding daemon.
pub mod defaults {
    /// Delay between reconciliation ticks in milliseconds.
    pub const POLL_INTERVAL_MS: u64 = 800;

    /// Local address tunnels bind to.
    pub const BIND_ADDRESS: &str = "127.0.0.1";

    /// ssh destination that runs the docker daemon.
    pub const REMOTE_HOST: &str = "remote-docker";

    /// Host assumed when a port descriptor has no host part.
    pub const DEFAULT_HOST: &str = "localhost";

    /// Upper bound for one container listing in milliseconds.
    pub const LIST_TIMEOUT_MS: u64 = 10_000;

    /// Upper bound for reaping a killed tunnel in milliseconds.
    pub const STOP_TIMEOUT_MS: u64 = 5_000;
}

/// One running container as reported by the container lister.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerRecord {
    /// Container id.
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    /// Container names.
    #[serde(rename = "Names", default)]
    pub names: Option<String>,
    /// Raw port-mapping descriptors, e.g. `0.0.0.0:80->80/tcp`.
    #[serde(rename = "Ports", default)]
    pub ports: Option<String>,
}

impl ContainerRecord {
    /// Creates a record exposing the given port descriptors.
    pub fn with_ports(ports: impl Into<String>) -> Self {
        Self {
            ports: Some(ports.into()),
            ..Self::default()
        }
    }

    /// Returns the trimmed port descriptors, or `None` when there are none.
    pub fn port_spec(&self) -> Option<&str> {
        self.ports
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Best human-readable label for logging.
    pub fn label(&self) -> &str {
        self.names
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// Source of the currently running containers.
#[async_trait]
pub trait ContainerLister: Send + Sync {
    /// Lists running containers and their published ports.
    ///
    /// Any failure is reported as an error; the caller decides how to
    /// degrade.
    async fn list(&self) -> FwdResult<Vec<ContainerRecord>>;
}

/// Starts and stops tunnel processes.
///
/// Each started tunnel is represented by an owned [`TunnelManager::Handle`].
/// Whoever holds the handle is the only party allowed to stop it.
#[async_trait]
pub trait TunnelManager: Send + Sync {
    /// Owned handle to a live tunnel.
    type Handle: Send;

    /// Launches a tunnel for `forward` without waiting for it to connect.
    async fn start(&self, forward: &Forward) -> FwdResult<Self::Handle>;

    /// Forcibly terminates the tunnel. Must not block indefinitely.
    async fn stop(&self, handle: &mut Self::Handle) -> FwdResult<()>;
}
