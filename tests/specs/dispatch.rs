//! Dispatcher lifecycle specs
//!
//! A host drives the dispatcher through a connectivity outage, a
//! background suspension, a process restart, and a reconnect.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wp_core::{FakeClock, Mutation, Record};
use wp_dispatch::{Delivery, DispatcherConfig, FakeTransport, Outcome, RecordDispatcher};

fn dispatcher(root: &Path, transport: &FakeTransport) -> RecordDispatcher<FakeClock> {
    let clock = FakeClock::new();
    clock.advance(Duration::from_secs(100));
    let config = DispatcherConfig {
        cache_root: root.to_path_buf(),
        log_name: "mutations".to_string(),
        flush_interval: Duration::from_millis(10),
    };
    RecordDispatcher::with_clock(config, Arc::new(transport.clone()), clock).unwrap()
}

#[test]
fn outage_suspension_restart_reconnect_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new();
    let update = Mutation::Update(Record::new("tracking", 40.01, -105.27, 1_700_000_000));

    // Session one: the network is down, then the app is suspended and
    // finally terminated.
    {
        transport.push_outcome(Outcome::Unavailable);
        let d = dispatcher(dir.path(), &transport);
        assert_eq!(d.send("alice", "pos", &update).unwrap(), Delivery::Queued);
        d.on_background();
        assert_eq!(d.send("alice", "pos", &update).unwrap(), Delivery::Queued);
        d.on_terminate();
    }
    assert_eq!(transport.calls().len(), 1);

    // Session two: recover, come to the foreground with connectivity.
    let d = dispatcher(dir.path(), &transport);
    d.recover().unwrap();
    assert_eq!(d.pending("alice", "pos"), (2, 0));

    d.on_foreground();
    d.on_background();

    assert_eq!(d.pending("alice", "pos"), (0, 0));
    // One failed attempt plus two successful redeliveries
    assert_eq!(transport.calls().len(), 3);
    assert!(!d.log().path().join("alice").exists());
}

#[test]
fn periodic_flush_checkpoints_while_foregrounded() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new();
    let d = dispatcher(dir.path(), &transport);

    d.on_foreground();
    transport.push_outcome(Outcome::Unavailable);
    d.send("alice", "pos", &Mutation::Delete {
        id: "rec-1".to_string(),
        layer: "tracking".to_string(),
    })
    .unwrap();

    std::thread::sleep(Duration::from_millis(100));
    // Persisted by the scheduler, not by a lifecycle checkpoint
    assert!(d.log().path().join("alice").join("pos").is_dir());
    d.on_background();
}

#[test]
fn mutations_decode_after_the_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new();
    transport.push_outcome(Outcome::Unavailable);
    let d = dispatcher(dir.path(), &transport);
    let mutation = Mutation::Create(Record::new("tracking", 51.5, -0.12, 1_700_000_001));

    d.send("alice", "pos", &mutation).unwrap();
    d.on_foreground();
    d.on_background();

    let calls = transport.calls();
    let redelivered = Mutation::from_payload(&calls[1].payload).unwrap();
    assert_eq!(redelivered, mutation);
}
