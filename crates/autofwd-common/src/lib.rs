//! Common infrastructure for the autofwd port-forwarding daemon.
//!
//! - [`forward`]: the [`Forward`] target type and the port-mapping resolver
//! - [`manager`]: collaborator traits ([`ContainerLister`], [`TunnelManager`])
//! - [`shell`]: external command execution with timeouts
//! - [`error`]: error types shared across the workspace
//!
//! # Example
//!
//! ```
//! use autofwd_common::forward::{parse_forwards, Forward};
//!
//! let forwards = parse_forwards("0.0.0.0:8080->80/tcp, :::8080->80/tcp", "localhost");
//! assert_eq!(forwards.len(), 1);
//! assert!(forwards.contains(&Forward::new(8080).unwrap()));
//! ```

pub mod error;
pub mod forward;
pub mod manager;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{FwdError, FwdResult};
pub use forward::{parse_forwards, parse_host, Forward};
pub use manager::{defaults, ContainerLister, ContainerRecord, TunnelManager};
