//! Test fixtures for container listings
//!
//! Provides a scripted [`ContainerLister`] and reusable listing scenarios

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use autofwd_common::{ContainerLister, ContainerRecord, FwdError, FwdResult};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// What the scripted lister does on one call
#[derive(Debug, Clone)]
pub enum ListingStep {
    /// Return these containers
    Containers(Vec<ContainerRecord>),
    /// Fail as if the listing command exited non-zero
    Fail(String),
    /// Panic inside the listing call
    Panic,
}

impl ListingStep {
    /// Containers each publishing one of `ports`
    pub fn ports(ports: &[u16]) -> Self {
        Self::Containers(ports.iter().map(|p| container_publishing(*p)).collect())
    }
}

struct ScriptState {
    steps: VecDeque<ListingStep>,
    last: ListingStep,
}

/// Container lister that replays a script of listings
///
/// Each call consumes one step. Once the script is exhausted the final step
/// is repeated. Clones share the same script and call counter.
#[derive(Clone)]
pub struct ScriptedLister {
    state: Arc<Mutex<ScriptState>>,
    calls: Arc<AtomicUsize>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl ScriptedLister {
    /// Create a lister replaying `steps`
    pub fn new<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = ListingStep>,
    {
        let steps: VecDeque<ListingStep> = steps.into_iter().collect();
        let last = steps
            .back()
            .cloned()
            .unwrap_or(ListingStep::Containers(Vec::new()));
        Self {
            state: Arc::new(Mutex::new(ScriptState { steps, last })),
            calls: Arc::new(AtomicUsize::new(0)),
            cancel_on_call: None,
        }
    }

    /// Cancel `token` while serving the `call`-th listing (1-based)
    ///
    /// The tick that issued that call still completes; the stop takes
    /// effect at the following iteration boundary.
    pub fn cancel_on_call(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Number of listing calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerLister for ScriptedLister {
    async fn list(&self) -> FwdResult<Vec<ContainerRecord>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }

        let step = {
            let mut state = self.state.lock();
            match state.steps.pop_front() {
                Some(step) => step,
                None => state.last.clone(),
            }
        };

        match step {
            ListingStep::Containers(records) => Ok(records),
            ListingStep::Fail(message) => Err(FwdError::ShellCommandFailed {
                command: "docker ps --format {{json .}}".to_string(),
                exit_code: 1,
                output: message,
            }),
            ListingStep::Panic => panic!("scripted listing panic on call {}", call),
        }
    }
}

/// A container publishing `port` on all interfaces, v4 and v6
pub fn container_publishing(port: u16) -> ContainerRecord {
    ContainerRecord {
        id: Some(format!("c{:04}", port)),
        names: Some(format!("svc-{}", port)),
        ports: Some(format!(
            "0.0.0.0:{port}->{port}/tcp, :::{port}->{port}/tcp",
            port = port
        )),
    }
}

/// A container with no published ports
pub fn container_without_ports(name: &str) -> ContainerRecord {
    ContainerRecord {
        id: Some(format!("id-{}", name)),
        names: Some(name.to_string()),
        ports: Some(String::new()),
    }
}

/// Common multi-container scenarios
pub mod listing_fixtures {
    use super::*;

    /// Web stack: nginx on 8080, postgres on 5432, a worker without ports
    pub fn web_stack() -> Vec<ContainerRecord> {
        vec![
            ContainerRecord {
                id: Some("a1".to_string()),
                names: Some("nginx".to_string()),
                ports: Some("0.0.0.0:8080->80/tcp, :::8080->80/tcp".to_string()),
            },
            ContainerRecord {
                id: Some("b2".to_string()),
                names: Some("postgres".to_string()),
                ports: Some("127.0.0.1:5432->5432/tcp".to_string()),
            },
            container_without_ports("worker"),
        ]
    }

    /// Two containers publishing the same host port on different addresses
    pub fn shared_port() -> Vec<ContainerRecord> {
        vec![
            ContainerRecord::with_ports("127.0.0.1:9000->9000/tcp"),
            ContainerRecord::with_ports("0.0.0.0:9000->9001/udp"),
        ]
    }
}
