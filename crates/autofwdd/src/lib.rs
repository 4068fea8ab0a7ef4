//! Forwarding Daemon - keeps ssh port forwards in sync with docker
//!
//! autofwdd watches the containers running on a remote docker host and
//! maintains one `ssh -L` tunnel per published port:
//! - Container discovery via `docker ps`
//! - Port-mapping resolution into forward targets
//! - Tunnel lifecycle through ssh child processes
//! - Graceful drain of every tunnel on shutdown

pub mod commands;
pub mod config;
pub mod docker;
pub mod forward_mgr;
pub mod ssh;
pub mod types;

pub use config::ForwarderConfig;
pub use docker::DockerLister;
pub use forward_mgr::ForwardMgr;
pub use ssh::{SshTunnel, SshTunnelManager};
pub use types::{ActiveForward, EngineState, TickReport};
