//! Configuration file support for autofwdd
//!
//! Loads and validates daemon configuration from TOML files. Every field
//! has a default, so a missing file or a partial file is fine.

use std::fs;
use std::path::Path;
use std::time::Duration;

use autofwd_common::{defaults, shell, FwdError, FwdResult};
use serde::{Deserialize, Serialize};

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/autofwd/autofwd.toml";

/// Complete autofwdd configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Delay between reconciliation ticks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Local address each tunnel binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// ssh destination hosting the docker daemon
    #[serde(default = "default_remote_host")]
    pub remote_host: String,

    /// Host assumed for port descriptors without a host part
    #[serde(default = "default_host")]
    pub default_host: String,

    /// docker executable
    #[serde(default = "default_docker_command")]
    pub docker_command: String,

    /// ssh executable
    #[serde(default = "default_ssh_command")]
    pub ssh_command: String,

    /// Timeout for one container listing in milliseconds
    #[serde(default = "default_list_timeout_ms")]
    pub list_timeout_ms: u64,

    /// Timeout for reaping a killed tunnel in milliseconds
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    defaults::POLL_INTERVAL_MS
}

fn default_bind_address() -> String {
    defaults::BIND_ADDRESS.to_string()
}

fn default_remote_host() -> String {
    defaults::REMOTE_HOST.to_string()
}

fn default_host() -> String {
    defaults::DEFAULT_HOST.to_string()
}

fn default_docker_command() -> String {
    shell::DOCKER_CMD.to_string()
}

fn default_ssh_command() -> String {
    shell::SSH_CMD.to_string()
}

fn default_list_timeout_ms() -> u64 {
    defaults::LIST_TIMEOUT_MS
}

fn default_stop_timeout_ms() -> u64 {
    defaults::STOP_TIMEOUT_MS
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            bind_address: default_bind_address(),
            remote_host: default_remote_host(),
            default_host: default_host(),
            docker_command: default_docker_command(),
            ssh_command: default_ssh_command(),
            list_timeout_ms: default_list_timeout_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl ForwarderConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> FwdResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                FwdError::invalid_config(
                    path.display().to_string(),
                    format!("failed to parse config file: {}", e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(FwdError::Io(e)),
        }
    }

    /// Delay between reconciliation ticks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Timeout for one container listing
    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    /// Timeout for reaping a killed tunnel
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> FwdResult<()> {
        for (field, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("list_timeout_ms", self.list_timeout_ms),
            ("stop_timeout_ms", self.stop_timeout_ms),
        ] {
            if value == 0 {
                return Err(FwdError::invalid_config(field, "must be > 0"));
            }
        }

        for (field, value) in [
            ("bind_address", &self.bind_address),
            ("remote_host", &self.remote_host),
            ("default_host", &self.default_host),
            ("docker_command", &self.docker_command),
            ("ssh_command", &self.ssh_command),
        ] {
            if value.trim().is_empty() {
                return Err(FwdError::invalid_config(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(FwdError::invalid_config(field, "must not contain whitespace"));
            }
        }

        // ssh would read a leading dash as an option
        if self.remote_host.starts_with('-') {
            return Err(FwdError::invalid_config(
                "remote_host",
                "must not start with '-'",
            ));
        }

        Ok(())
    }
}
