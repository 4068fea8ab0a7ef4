//! Verification helpers for testing the forward manager
//!
//! Provides a recording [`TunnelManager`] and assertion helpers over the
//! tunnel start/stop history it captures

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use autofwd_common::{Forward, FwdError, FwdResult, TunnelManager};
use parking_lot::Mutex;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {expected} {action} for port {port}, found {actual}")]
    CountMismatch {
        action: &'static str,
        port: u16,
        expected: usize,
        actual: usize,
    },

    #[error("Expected live ports {expected:?}, found {actual:?}")]
    LivePortsMismatch {
        expected: BTreeSet<u16>,
        actual: BTreeSet<u16>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// One entry in the tunnel history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelEvent {
    /// A tunnel instance was launched
    Started { id: u64, port: u16 },
    /// A stop was requested for a tunnel instance (whether or not it failed)
    Stopped { id: u64, port: u16 },
}

/// Handle produced by [`RecordingTunnels`]
#[derive(Debug, PartialEq, Eq)]
pub struct RecordedTunnel {
    /// Unique instance id, increasing with each start
    pub id: u64,
    /// The forward this tunnel serves
    pub forward: Forward,
}

#[derive(Default)]
struct RecorderState {
    events: Mutex<Vec<TunnelEvent>>,
    next_id: AtomicU64,
    failing_starts: Mutex<HashSet<u16>>,
    failing_stops: Mutex<HashSet<u16>>,
}

/// Tunnel manager that records starts and stops instead of spawning processes
///
/// Clones share the same history, so a test can keep one clone for
/// verification after moving another into the engine.
#[derive(Clone, Default)]
pub struct RecordingTunnels {
    state: Arc<RecorderState>,
}

impl RecordingTunnels {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every start for `port` fail until [`Self::allow_start`]
    pub fn fail_start(&self, port: u16) {
        self.state.failing_starts.lock().insert(port);
    }

    /// Let starts for `port` succeed again
    pub fn allow_start(&self, port: u16) {
        self.state.failing_starts.lock().remove(&port);
    }

    /// Make every stop for `port` fail
    pub fn fail_stop(&self, port: u16) {
        self.state.failing_stops.lock().insert(port);
    }

    /// Snapshot of the recorded history
    pub fn events(&self) -> Vec<TunnelEvent> {
        self.state.events.lock().clone()
    }

    /// Verifier over the current history
    pub fn verifier(&self) -> TunnelVerifier {
        TunnelVerifier::new(self.events())
    }
}

#[async_trait]
impl TunnelManager for RecordingTunnels {
    type Handle = RecordedTunnel;

    async fn start(&self, forward: &Forward) -> FwdResult<RecordedTunnel> {
        let port = forward.port();
        if self.state.failing_starts.lock().contains(&port) {
            return Err(FwdError::tunnel_start(port, "injected start failure"));
        }

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .events
            .lock()
            .push(TunnelEvent::Started { id, port });
        Ok(RecordedTunnel {
            id,
            forward: *forward,
        })
    }

    async fn stop(&self, handle: &mut RecordedTunnel) -> FwdResult<()> {
        let port = handle.forward.port();
        self.state.events.lock().push(TunnelEvent::Stopped {
            id: handle.id,
            port,
        });

        if self.state.failing_stops.lock().contains(&port) {
            return Err(FwdError::tunnel_stop(port, "injected stop failure"));
        }
        Ok(())
    }
}

/// Tunnel history verifier
pub struct TunnelVerifier {
    events: Vec<TunnelEvent>,
}

impl TunnelVerifier {
    /// Create a verifier over `events`
    pub fn new(events: Vec<TunnelEvent>) -> Self {
        Self { events }
    }

    /// Number of starts recorded for `port`
    pub fn starts_for(&self, port: u16) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TunnelEvent::Started { port: p, .. } if *p == port))
            .count()
    }

    /// Number of stops recorded for `port`
    pub fn stops_for(&self, port: u16) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TunnelEvent::Stopped { port: p, .. } if *p == port))
            .count()
    }

    /// Number of stops recorded for tunnel instance `id`
    pub fn stops_for_instance(&self, id: u64) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TunnelEvent::Stopped { id: i, .. } if *i == id))
            .count()
    }

    /// Ports with a started instance that has not been stopped
    pub fn live_ports(&self) -> BTreeSet<u16> {
        let stopped: HashSet<u64> = self
            .events
            .iter()
            .filter_map(|e| match e {
                TunnelEvent::Stopped { id, .. } => Some(*id),
                TunnelEvent::Started { .. } => None,
            })
            .collect();

        self.events
            .iter()
            .filter_map(|e| match e {
                TunnelEvent::Started { id, port } if !stopped.contains(id) => Some(*port),
                _ => None,
            })
            .collect()
    }

    /// Verify that `port` was started exactly `expected` times
    pub fn assert_starts(&self, port: u16, expected: usize) -> VerifyResult<()> {
        let actual = self.starts_for(port);
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                action: "starts",
                port,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that `port` was stopped exactly `expected` times
    pub fn assert_stops(&self, port: u16, expected: usize) -> VerifyResult<()> {
        let actual = self.stops_for(port);
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                action: "stops",
                port,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify the exact set of ports with live tunnels
    pub fn assert_live(&self, expected: &[u16]) -> VerifyResult<()> {
        let expected: BTreeSet<u16> = expected.iter().copied().collect();
        let actual = self.live_ports();
        if actual != expected {
            return Err(VerificationError::LivePortsMismatch { expected, actual });
        }
        Ok(())
    }

    /// Get all recorded events
    pub fn events(&self) -> &[TunnelEvent] {
        &self.events
    }
}
