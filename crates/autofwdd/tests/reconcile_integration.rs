//! Reconciliation integration tests
//!
//! Drives the forward manager against scripted container listings and a
//! recording tunnel manager.

use std::time::Duration;

use autofwd_common::Forward;
use autofwd_test::{ListingStep, RecordingTunnels, ScriptedLister};
use autofwdd::{EngineState, ForwardMgr};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const POLL: Duration = Duration::from_millis(5);

fn fwd(port: u16) -> Forward {
    Forward::new(port).unwrap()
}

fn three_tick_script() -> Vec<ListingStep> {
    vec![
        ListingStep::ports(&[80]),
        ListingStep::ports(&[80, 443]),
        ListingStep::ports(&[443]),
    ]
}

/// Scenario:
/// 1. tick1 publishes {80}
/// 2. tick2 publishes {80, 443}: the 80 tunnel is reused
/// 3. tick3 publishes {443}: 80 is stopped, 443 keeps its tick2 instance
#[tokio::test]
async fn test_three_tick_convergence() {
    let tunnels = RecordingTunnels::new();
    let mut mgr = ForwardMgr::new(ScriptedLister::new(three_tick_script()), tunnels.clone())
        .with_poll_interval(POLL);

    // Tick 1
    let report = mgr.reconcile_once().await;
    assert_eq!(report.added, vec![fwd(80)]);
    assert_eq!(mgr.active_forwards(), vec![fwd(80)]);
    let tunnel_80 = mgr.active_handle(&fwd(80)).unwrap().id;

    // Tick 2
    let report = mgr.reconcile_once().await;
    assert_eq!(report.added, vec![fwd(443)]);
    assert!(report.removed.is_empty());
    assert_eq!(mgr.active_forwards(), vec![fwd(80), fwd(443)]);
    assert_eq!(mgr.active_handle(&fwd(80)).unwrap().id, tunnel_80);
    let tunnel_443 = mgr.active_handle(&fwd(443)).unwrap().id;

    // Tick 3
    let report = mgr.reconcile_once().await;
    assert!(report.added.is_empty());
    assert_eq!(report.removed, vec![fwd(80)]);
    assert_eq!(mgr.active_forwards(), vec![fwd(443)]);
    assert_eq!(mgr.active_handle(&fwd(443)).unwrap().id, tunnel_443);

    let verifier = tunnels.verifier();
    verifier.assert_starts(80, 1).unwrap();
    verifier.assert_starts(443, 1).unwrap();
    verifier.assert_stops(80, 1).unwrap();
    verifier.assert_stops(443, 0).unwrap();
    assert_eq!(verifier.stops_for_instance(tunnel_80), 1);
    verifier.assert_live(&[443]).unwrap();
}

/// Stop requested during tick2: tick2 completes, then everything drains
#[tokio::test]
async fn test_stop_after_second_tick_drains_all() {
    let cancel = CancellationToken::new();
    let tunnels = RecordingTunnels::new();
    let lister = ScriptedLister::new(three_tick_script()).cancel_on_call(2, cancel.clone());
    let mut mgr = ForwardMgr::new(lister.clone(), tunnels.clone()).with_poll_interval(POLL);

    mgr.run(cancel).await.unwrap();

    assert_eq!(lister.calls(), 2);
    assert_eq!(mgr.state(), EngineState::Stopped);
    assert_eq!(mgr.active_count(), 0);

    let verifier = tunnels.verifier();
    verifier.assert_starts(80, 1).unwrap();
    verifier.assert_starts(443, 1).unwrap();
    verifier.assert_stops(80, 1).unwrap();
    verifier.assert_stops(443, 1).unwrap();
    verifier.assert_live(&[]).unwrap();
}

#[tokio::test]
async fn test_identical_listings_converge_without_churn() {
    let tunnels = RecordingTunnels::new();
    let mut mgr = ForwardMgr::new(
        ScriptedLister::new([ListingStep::ports(&[3000, 5432, 8080])]),
        tunnels.clone(),
    );

    let first = mgr.reconcile_once().await;
    assert_eq!(first.added.len(), 3);

    for _ in 0..3 {
        let report = mgr.reconcile_once().await;
        assert!(report.is_noop());
    }
    assert_eq!(tunnels.events().len(), 3);
}

/// A panicking tick must still stop every active tunnel
#[tokio::test]
async fn test_panic_in_tick_still_drains() {
    let tunnels = RecordingTunnels::new();
    let lister = ScriptedLister::new([
        ListingStep::ports(&[80, 443]),
        ListingStep::Panic,
    ]);
    let mut mgr = ForwardMgr::new(lister, tunnels.clone()).with_poll_interval(POLL);

    let handle = tokio::spawn(async move { mgr.run(CancellationToken::new()).await });
    let err = handle.await.unwrap_err();
    assert!(err.is_panic());

    let verifier = tunnels.verifier();
    verifier.assert_stops(80, 1).unwrap();
    verifier.assert_stops(443, 1).unwrap();
    verifier.assert_live(&[]).unwrap();
}

#[tokio::test]
async fn test_drain_with_failing_stop_reaches_others() {
    let cancel = CancellationToken::new();
    let tunnels = RecordingTunnels::new();
    tunnels.fail_stop(443);
    let lister = ScriptedLister::new([ListingStep::ports(&[80, 443, 8080])])
        .cancel_on_call(1, cancel.clone());
    let mut mgr = ForwardMgr::new(lister, tunnels.clone()).with_poll_interval(POLL);

    mgr.run(cancel).await.unwrap();

    assert_eq!(mgr.active_count(), 0);
    let verifier = tunnels.verifier();
    for port in [80, 443, 8080] {
        verifier.assert_stops(port, 1).unwrap();
    }
}
