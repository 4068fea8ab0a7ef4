//! Error types for autofwd operations.
//!
//! This module defines the error type shared by the forwarding daemon and
//! its collaborators. All errors implement `std::error::Error` via
//! `thiserror`.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for autofwd operations.
pub type FwdResult<T> = Result<T, FwdError>;

/// Errors that can occur while listing containers or managing tunnels.
#[derive(Debug, Error)]
pub enum FwdError {
    /// Failed to spawn an external command.
    #[error("Failed to execute command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// External command returned a non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// External command did not finish in time.
    #[error("Command timed out after {timeout:?}: '{command}'")]
    Timeout {
        /// The command that timed out.
        command: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Container listing output could not be decoded.
    #[error("Malformed container listing at line {line}: {message}")]
    MalformedListing {
        /// 1-based line number in the listing output.
        line: usize,
        /// Decoder error message.
        message: String,
    },

    /// A tunnel process could not be started.
    #[error("Failed to start tunnel for port {port}: {message}")]
    TunnelStart {
        /// The forwarded port.
        port: u16,
        /// Error message.
        message: String,
    },

    /// A tunnel process could not be stopped.
    #[error("Failed to stop tunnel for port {port}: {message}")]
    TunnelStop {
        /// The forwarded port.
        port: u16,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// The engine has already drained and cannot run again.
    #[error("Forward manager already stopped")]
    EngineStopped,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FwdError {
    /// Creates a malformed listing error.
    pub fn malformed_listing(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedListing {
            line,
            message: message.into(),
        }
    }

    /// Creates a tunnel start error.
    pub fn tunnel_start(port: u16, message: impl Into<String>) -> Self {
        Self::TunnelStart {
            port,
            message: message.into(),
        }
    }

    /// Creates a tunnel stop error.
    pub fn tunnel_stop(port: u16, message: impl Into<String>) -> Self {
        Self::TunnelStop {
            port,
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that the next poll tick may recover from.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FwdError::ShellCommandFailed { .. }
                | FwdError::Timeout { .. }
                | FwdError::MalformedListing { .. }
                | FwdError::TunnelStart { .. }
        )
    }
}
