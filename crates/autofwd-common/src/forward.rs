//! Forward targets and the container port-mapping resolver.
//!
//! Container listings describe published ports as a comma-separated list of
//! descriptors such as `0.0.0.0:8080->80/tcp, :::8080->80/tcp`. Only the
//! host side of each mapping matters: it is the port a tunnel must expose.

use std::collections::HashSet;
use std::fmt;

/// A single port that should have an active tunnel.
///
/// Two forwards are equal when their ports are equal, regardless of the
/// host binding they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Forward {
    port: u16,
}

impl Forward {
    /// Creates a forward for `port`. Returns `None` for port 0.
    pub fn new(port: u16) -> Option<Self> {
        (port != 0).then_some(Self { port })
    }

    /// The forwarded port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Forward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Forward({})", self.port)
    }
}

/// Parses a host binding of the form `[host:]port[/proto]`.
///
/// A single segment is the port and the host falls back to `default_host`.
/// Two segments are `host:port`. Anything else, including a port that is
/// not a positive 16-bit integer, yields `None`.
pub fn parse_host(s: &str, default_host: &str) -> Option<(String, u16)> {
    let s = match s.split_once('/') {
        Some((binding, _proto)) => binding,
        None => s,
    };

    let segments: Vec<&str> = s.split(':').collect();
    let (host, port) = match segments.as_slice() {
        [port] => (default_host, *port),
        [host, port] => (*host, *port),
        _ => return None,
    };

    match port.trim().parse::<u16>() {
        Ok(p) if p != 0 => Some((host.to_string(), p)),
        _ => None,
    }
}

/// Resolves a raw port-mapping string into the set of forwards it implies.
///
/// Descriptors that cannot be parsed are skipped; this function never fails.
pub fn parse_forwards(raw: &str, default_host: &str) -> HashSet<Forward> {
    raw.split(',')
        .map(str::trim)
        .filter(|descriptor| !descriptor.is_empty())
        .filter_map(|descriptor| {
            let binding = descriptor.split("->").next().unwrap_or_default();
            let parsed = parse_host(binding, default_host);
            if parsed.is_none() {
                tracing::debug!(descriptor = %descriptor, "Skipping unparseable port descriptor");
            }
            parsed
        })
        .filter_map(|(_host, port)| Forward::new(port))
        .collect()
}
