//! Test infrastructure for the autofwd forward manager
//!
//! Provides:
//! - A scripted container lister that replays listings tick by tick
//! - A recording tunnel manager with injectable start/stop failures
//! - Listing fixtures for common container layouts
//! - Tunnel start/stop verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
