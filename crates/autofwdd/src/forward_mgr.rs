//! Forward Manager - reconciles tunnels against running containers

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use autofwd_common::{
    defaults, parse_forwards, ContainerLister, Forward, FwdError, FwdResult, TunnelManager,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::types::{ActiveForward, EngineState, TickReport};

/// Forward Manager
///
/// Owns the active tunnels and keeps them in line with the ports published
/// by running containers. All state lives here and is only touched by the
/// task driving [`ForwardMgr::run`].
pub struct ForwardMgr<L, T>
where
    T: TunnelManager,
{
    lister: L,
    tunnels: T,

    /// Host assumed for descriptors without one
    default_host: String,

    /// Delay between ticks
    poll_interval: Duration,

    /// At most one tunnel per forward
    active: HashMap<Forward, ActiveForward<T::Handle>>,

    state: EngineState,
}

impl<L, T> ForwardMgr<L, T>
where
    L: ContainerLister,
    T: TunnelManager,
{
    /// Create a new ForwardMgr instance
    pub fn new(lister: L, tunnels: T) -> Self {
        Self {
            lister,
            tunnels,
            default_host: defaults::DEFAULT_HOST.to_string(),
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            active: HashMap::new(),
            state: EngineState::Running,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_default_host(mut self, default_host: impl Into<String>) -> Self {
        self.default_host = default_host.into();
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Currently forwarded ports, sorted
    pub fn active_forwards(&self) -> Vec<Forward> {
        let mut forwards: Vec<Forward> = self.active.keys().copied().collect();
        forwards.sort_unstable();
        forwards
    }

    /// Tunnel handle serving `forward`, if any
    pub fn active_handle(&self, forward: &Forward) -> Option<&T::Handle> {
        self.active.get(forward).map(ActiveForward::handle)
    }

    /// Compute the forwards that should exist right now
    ///
    /// A failed listing is logged and treated as "no containers".
    pub async fn desired_forwards(&self) -> HashSet<Forward> {
        let records = match self.lister.list().await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Container listing failed, treating as empty"
                );
                Vec::new()
            }
        };

        let mut desired = HashSet::new();
        for record in &records {
            if let Some(spec) = record.port_spec() {
                let forwards = parse_forwards(spec, &self.default_host);
                debug!(container = %record.label(), ports = %spec, count = forwards.len(), "Resolved container ports");
                desired.extend(forwards);
            }
        }
        desired
    }

    /// Run one reconciliation tick
    pub async fn reconcile_once(&mut self) -> TickReport {
        let desired = self.desired_forwards().await;

        let mut additions: Vec<Forward> = desired
            .iter()
            .filter(|f| !self.active.contains_key(f))
            .copied()
            .collect();
        additions.sort_unstable();

        let mut removals: Vec<Forward> = self
            .active
            .keys()
            .filter(|f| !desired.contains(f))
            .copied()
            .collect();
        removals.sort_unstable();

        let mut report = TickReport::default();

        for forward in additions {
            match self.tunnels.start(&forward).await {
                Ok(handle) => {
                    info!(port = forward.port(), "Adding forward");
                    self.active
                        .insert(forward, ActiveForward::new(forward, handle));
                    report.added.push(forward);
                }
                Err(e) => {
                    warn!(port = forward.port(), error = %e, "Failed to start tunnel, will retry");
                    report.failed_starts.push(forward);
                }
            }
        }

        for forward in removals {
            if let Some(mut entry) = self.active.remove(&forward) {
                info!(
                    port = forward.port(),
                    uptime_ms = entry.uptime().as_millis() as u64,
                    "Stopping forward"
                );
                if let Err(e) = self.tunnels.stop(entry.handle_mut()).await {
                    warn!(port = forward.port(), error = %e, "Failed to stop tunnel");
                }
                report.removed.push(forward);
            }
        }

        report
    }

    /// Stop every active tunnel and empty the active map
    ///
    /// A failed stop is logged and does not prevent the remaining stops.
    /// Returns the number of tunnels that were stopped.
    pub async fn drain(&mut self) -> usize {
        let mut entries: Vec<(Forward, ActiveForward<T::Handle>)> = self.active.drain().collect();
        entries.sort_unstable_by_key(|(forward, _)| *forward);

        let count = entries.len();
        for (forward, mut entry) in entries {
            info!(port = forward.port(), "Stopping forward");
            if let Err(e) = self.tunnels.stop(entry.handle_mut()).await {
                warn!(port = forward.port(), error = %e, "Failed to stop tunnel during drain");
            }
        }
        count
    }

    /// Reconcile until `cancel` fires, then drain
    ///
    /// A stop request is honoured between ticks; the tick in flight always
    /// completes. Every tunnel still active is stopped before this returns,
    /// including when a tick panics, in which case the panic is resumed
    /// after draining. A stopped manager cannot be run again.
    pub async fn run(&mut self, cancel: CancellationToken) -> FwdResult<()> {
        if self.state != EngineState::Running {
            return Err(FwdError::EngineStopped);
        }

        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting forward reconciliation"
        );

        let outcome = AssertUnwindSafe(self.run_loop(&cancel))
            .catch_unwind()
            .await;

        self.state = EngineState::Draining;
        info!(active = self.active.len(), "Draining forwards");
        let stopped = self.drain().await;
        self.state = EngineState::Stopped;
        info!(stopped, "Forward manager stopped");

        if let Err(panic) = outcome {
            error!("Reconciliation loop panicked; tunnels drained");
            std::panic::resume_unwind(panic);
        }
        Ok(())
    }

    async fn run_loop(&mut self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            let report = self.reconcile_once().await;
            if !report.is_noop() {
                debug!(
                    added = report.added.len(),
                    removed = report.removed.len(),
                    failed = report.failed_starts.len(),
                    active = self.active.len(),
                    "Tick complete"
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!("Stop requested");
    }
}
