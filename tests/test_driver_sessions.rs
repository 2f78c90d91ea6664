//! Connection driver against the in-memory transport
//!
//! Covers open pacing, byte accounting that leaves payloads untouched,
//! and the connected-count bookkeeping across leave and error.

use room_loadtest::runtime::shutdown_channel;
use room_loadtest::transport::{MemoryTransport, SessionEvent};
use room_loadtest::types::{ClientCount, TargetName};
use room_loadtest::{ConnectionDriver, ConnectionState, EventSink, Scripting, WorkerEvent, WorkerStats};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn target() -> TargetName {
    TargetName::new("battle".to_string()).unwrap()
}

fn clients(n: usize) -> ClientCount {
    ClientCount::new(n).unwrap()
}

/// Opens start `delay` apart even when joins take far longer
#[tokio::test(start_paused = true)]
async fn test_open_attempts_are_paced_not_serialized() {
    let transport = MemoryTransport::builder()
        .open_latency(Duration::from_secs(10))
        .build();
    let (sink, _events) = EventSink::channel();
    let driver = ConnectionDriver::new(
        target(),
        clients(4),
        Arc::new(transport.clone()),
        Scripting::new(),
        WorkerStats::new(),
        sink,
    )
    .with_open_delay(Duration::from_millis(100));

    let (stop, shutdown) = shutdown_channel();
    let run = tokio::spawn(driver.run(shutdown));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.attempts(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.attempts(), 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(transport.attempts(), 4);
    assert!(transport.peers().is_empty());

    stop.send(true).unwrap();
    let records = run.await.unwrap().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.state() == ConnectionState::Connecting));
}

/// Payloads reach the transport byte-for-byte and are counted exactly once
#[tokio::test]
async fn test_instrumentation_is_transparent() {
    let payloads: Vec<Vec<u8>> = vec![b"hello".to_vec(), vec![0u8; 1024], vec![0xff, 0x00, 0x7f]];
    let expected_sent: u64 = payloads.iter().map(|p| p.len() as u64).sum();

    let received = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let scripting = {
        let payloads = payloads.clone();
        let received = received.clone();
        Scripting::new()
            .on_join(move |session| {
                for payload in &payloads {
                    session.send(payload.clone()).unwrap();
                }
            })
            .on_message(move |_session, payload| {
                received.lock().unwrap().push(payload.to_vec());
            })
    };

    let transport = MemoryTransport::builder().build();
    let stats = WorkerStats::new();
    let (sink, _events) = EventSink::channel();
    let driver = ConnectionDriver::new(
        target(),
        clients(1),
        Arc::new(transport.clone()),
        scripting,
        stats.clone(),
        sink,
    );

    let (stop, shutdown) = shutdown_channel();
    let run = tokio::spawn(driver.run(shutdown));

    while stats.snapshot().bytes_sent < expected_sent {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let peer = transport.peers().remove(0);
    assert_eq!(peer.sent(), payloads);
    assert_eq!(stats.snapshot().bytes_sent, expected_sent);

    let inbound = vec![7u8; 300];
    assert!(peer.push(SessionEvent::Message(inbound.clone())));
    while stats.snapshot().bytes_received < 300 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(stats.snapshot().bytes_received, 300);
    assert_eq!(*received.lock().unwrap(), vec![inbound]);

    stop.send(true).unwrap();
    run.await.unwrap().unwrap();
    assert!(peer.is_closed());
    assert_eq!(stats.snapshot().clients_connected, 0);
}

/// Error then leave on the same session decrements once and reports once
#[tokio::test]
async fn test_error_then_leave_counts_once() {
    let transport = MemoryTransport::builder().fail_attempt(1).build();
    let stats = WorkerStats::new();
    let (sink, mut events) = EventSink::channel();
    let driver = ConnectionDriver::new(
        target(),
        clients(3),
        Arc::new(transport.clone()),
        Scripting::new(),
        stats.clone(),
        sink,
    );

    let (_stop, shutdown) = shutdown_channel();
    let run = tokio::spawn(driver.run(shutdown));

    while stats.snapshot().clients_connected < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let peers = transport.peers();
    assert_eq!(peers.len(), 2);

    peers[0].push(SessionEvent::Error("socket reset".to_string()));
    peers[0].push(SessionEvent::Leave { code: Some(1006) });
    peers[1].push(SessionEvent::Leave { code: Some(1000) });

    let records = run.await.unwrap().unwrap();
    let errored = records
        .iter()
        .filter(|r| r.state() == ConnectionState::Errored)
        .count();
    let left = records
        .iter()
        .filter(|r| r.state() == ConnectionState::Left)
        .count();
    assert_eq!((errored, left), (2, 1));
    assert_eq!(stats.snapshot().clients_connected, 0);

    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WorkerEvent::Error {
            connection,
            session_failed,
            ..
        } = event
        {
            assert!(session_failed);
            errors.push(connection.expect("driver errors carry a connection index"));
        }
    }
    // one failed open plus one failure after joining, on different connections
    assert_eq!(errors.len(), 2);
    assert_ne!(errors[0], errors[1]);
}
