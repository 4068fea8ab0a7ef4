//! Argument builders for the docker and ssh collaborators

use autofwd_common::Forward;

/// Go template that makes `docker ps` emit one JSON object per container
pub const DOCKER_PS_FORMAT: &str = "{{json .}}";

/// Build the `docker ps` argument list
pub fn build_docker_ps_args() -> Vec<String> {
    vec![
        "ps".to_string(),
        "--format".to_string(),
        DOCKER_PS_FORMAT.to_string(),
    ]
}

/// Build the local forward specification `bind:port:localhost:port`
///
/// The remote side always targets the same port on the remote host's
/// loopback, where docker publishes it.
pub fn build_local_forward_spec(forward: &Forward, bind_address: &str) -> String {
    format!(
        "{}:{}:localhost:{}",
        bind_address,
        forward.port(),
        forward.port()
    )
}

/// Build the `ssh` argument list for one tunnel
///
/// `-N` keeps the session open without running a remote command.
pub fn build_ssh_tunnel_args(forward: &Forward, bind_address: &str, remote_host: &str) -> Vec<String> {
    vec![
        "-N".to_string(),
        format!("-L{}", build_local_forward_spec(forward, bind_address)),
        remote_host.to_string(),
    ]
}
