//! Engine state and per-tick bookkeeping types

use std::fmt;
use std::time::{Duration, Instant};

use autofwd_common::Forward;

/// Lifecycle of the forward manager.
///
/// `Running` until a stop is requested, `Draining` while the remaining
/// tunnels are torn down, then `Stopped` for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Draining,
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forward together with the tunnel that serves it.
///
/// The entry owns the tunnel handle; removing the entry from the active
/// map is the only way the tunnel gets stopped.
#[derive(Debug)]
pub struct ActiveForward<H> {
    forward: Forward,
    handle: H,
    started_at: Instant,
}

impl<H> ActiveForward<H> {
    pub fn new(forward: Forward, handle: H) -> Self {
        Self {
            forward,
            handle,
            started_at: Instant::now(),
        }
    }

    pub fn forward(&self) -> Forward {
        self.forward
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Time since the tunnel was launched
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// What one reconciliation tick changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Forwards whose tunnel was started this tick
    pub added: Vec<Forward>,
    /// Forwards whose tunnel was stopped this tick
    pub removed: Vec<Forward>,
    /// Forwards that should exist but whose tunnel failed to start
    pub failed_starts: Vec<Forward>,
}

impl TickReport {
    /// True when the tick neither added nor removed anything
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failed_starts.is_empty()
    }
}
