//! Tunnel processes backed by `ssh -N -L`

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use autofwd_common::{shell, Forward, FwdError, FwdResult, TunnelManager};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::commands::build_ssh_tunnel_args;
use crate::config::ForwarderConfig;

/// A running ssh tunnel process
///
/// The child is killed when the handle is dropped, so a tunnel can never
/// outlive its owner even if an explicit stop was skipped.
#[derive(Debug)]
pub struct SshTunnel {
    forward: Forward,
    child: Child,
}

impl SshTunnel {
    pub(crate) fn new(forward: Forward, child: Child) -> Self {
        Self { forward, child }
    }

    pub fn forward(&self) -> Forward {
        self.forward
    }

    /// OS process id, if the process has not been reaped yet
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Launches one ssh process per forwarded port
#[derive(Debug, Clone)]
pub struct SshTunnelManager {
    program: String,
    bind_address: String,
    remote_host: String,
    stop_timeout: Duration,
}

impl SshTunnelManager {
    pub fn new(
        program: impl Into<String>,
        bind_address: impl Into<String>,
        remote_host: impl Into<String>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            bind_address: bind_address.into(),
            remote_host: remote_host.into(),
            stop_timeout,
        }
    }

    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(
            config.ssh_command.clone(),
            config.bind_address.clone(),
            config.remote_host.clone(),
            config.stop_timeout(),
        )
    }
}

#[async_trait]
impl TunnelManager for SshTunnelManager {
    type Handle = SshTunnel;

    async fn start(&self, forward: &Forward) -> FwdResult<SshTunnel> {
        let args = build_ssh_tunnel_args(forward, &self.bind_address, &self.remote_host);
        debug!(command = %shell::display_command(&self.program, &args), "Spawning tunnel");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FwdError::tunnel_start(forward.port(), e.to_string()))?;

        Ok(SshTunnel::new(*forward, child))
    }

    async fn stop(&self, handle: &mut SshTunnel) -> FwdResult<()> {
        let port = handle.forward.port();

        match handle.child.try_wait() {
            Ok(Some(status)) => {
                debug!(port, %status, "Tunnel already exited");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => return Err(FwdError::tunnel_stop(port, e.to_string())),
        }

        handle
            .child
            .start_kill()
            .map_err(|e| FwdError::tunnel_stop(port, e.to_string()))?;

        match tokio::time::timeout(self.stop_timeout, handle.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(port, %status, "Tunnel terminated");
                Ok(())
            }
            Ok(Err(e)) => Err(FwdError::tunnel_stop(port, e.to_string())),
            Err(_) => Err(FwdError::tunnel_stop(
                port,
                format!("process did not exit within {:?}", self.stop_timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(program: &str) -> SshTunnelManager {
        SshTunnelManager::new(program, "127.0.0.1", "remote-docker", Duration::from_secs(5))
    }

    fn fwd(port: u16) -> Forward {
        Forward::new(port).unwrap()
    }

    #[tokio::test]
    async fn test_start_missing_program() {
        let result = manager("/nonexistent/ssh").start(&fwd(8080)).await;
        match result {
            Err(FwdError::TunnelStart { port, .. }) => assert_eq!(port, 8080),
            other => panic!("Expected TunnelStart error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_already_exited() {
        // `true` ignores the ssh arguments and exits immediately
        let tunnels = manager("true");
        let mut handle = tunnels.start(&fwd(8080)).await.unwrap();
        assert_eq!(handle.forward(), fwd(8080));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(tunnels.stop(&mut handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_kills_running_process() {
        let child = Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let mut handle = SshTunnel::new(fwd(9000), child);
        assert!(handle.pid().is_some());

        let tunnels = manager("ssh");
        tunnels.stop(&mut handle).await.unwrap();

        // Reaped: no pid and a second stop is a no-op
        assert!(handle.pid().is_none());
        assert!(tunnels.stop(&mut handle).await.is_ok());
    }
}
