// AERIE Central - Integration Tests
//
// End-to-end tests driving a real registry over TCP on ephemeral ports.
// Organized into categories:
// 1. Report ingestion
// 2. Decode boundary
// 3. Liveness
// 4. Observer surface

use aerie::protocol::{
    AggregateReport, AnomalyEvent, BatteryState, FlightMode, Message, Metric, Reading,
};
use aerie::wire::encode_frame;
use aerie_central::{CentralConfig, CentralNode, RegistryHandle};
use chrono::Utc;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::sleep;

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> CentralConfig {
    CentralConfig::new()
        .with_listen_addr("127.0.0.1:0")
        .with_liveness_timeout(Duration::from_millis(400))
        .with_sweep_interval(Duration::from_millis(100))
}

async fn start_central(config: CentralConfig) -> (RegistryHandle, SocketAddr) {
    let node = CentralNode::bind(config).await.expect("bind central");
    let addr = node.local_addr().expect("local addr");
    let handle = node.handle();
    tokio::spawn(node.run());
    (handle, addr)
}

fn make_report(edge_id: &str, level: u8, anomalies: Vec<AnomalyEvent>) -> AggregateReport {
    let mut sensors = HashMap::new();
    sensors.insert(
        "sensor1".to_string(),
        Reading::new("sensor1", 22.0, 50.0, Utc::now()),
    );
    AggregateReport {
        edge_id: edge_id.to_string(),
        battery: BatteryState::new(level, FlightMode::Active),
        sensors,
        anomalies,
        avg_temperature: Some(22.0),
        avg_humidity: Some(50.0),
        sent_at: Utc::now(),
    }
}

fn make_anomaly(edge_id: &str, value: f64) -> AnomalyEvent {
    AnomalyEvent {
        sensor_id: "sensor1".to_string(),
        metric: Metric::Temperature,
        value,
        timestamp: Utc::now(),
        edge_id: edge_id.to_string(),
    }
}

async fn send_report(stream: &mut TcpStream, report: AggregateReport) {
    let frame = encode_frame(&Message::Report(report)).expect("encode report");
    stream.write_all(&frame).await.expect("write report");
}

/// Poll a condition for up to five seconds
async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for: {}", what);
}

// ============================================================================
// Report ingestion
// ============================================================================

#[tokio::test]
async fn test_report_creates_drone_record() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(&mut stream, make_report("drone1", 87, vec![])).await;

    wait_until("record created", || handle.drone("drone1").is_some()).await;

    let record = handle.drone("drone1").unwrap();
    assert_eq!(record.battery.level, 87);
    assert!(record.live);
    assert_eq!(record.sensors.len(), 1);
    assert_eq!(record.reports_received, 1);
}

#[tokio::test]
async fn test_last_write_wins_per_edge() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(&mut stream, make_report("drone1", 90, vec![])).await;
    send_report(&mut stream, make_report("drone1", 41, vec![])).await;

    wait_until("both reports applied", || {
        handle
            .drone("drone1")
            .map(|r| r.reports_received == 2)
            .unwrap_or(false)
    })
    .await;

    assert_eq!(handle.drone("drone1").unwrap().battery.level, 41);
    assert_eq!(handle.view().drones.len(), 1);
}

#[tokio::test]
async fn test_multiple_edges_tracked_independently() {
    let (handle, addr) = start_central(test_config()).await;

    let mut a = TcpStream::connect(addr).await.expect("connect a");
    let mut b = TcpStream::connect(addr).await.expect("connect b");
    send_report(&mut a, make_report("drone1", 90, vec![])).await;
    send_report(&mut b, make_report("drone2", 60, vec![])).await;

    wait_until("both drones known", || handle.view().drones.len() == 2).await;

    let view = handle.view();
    assert_eq!(view.drones[0].edge_id, "drone1");
    assert_eq!(view.drones[1].edge_id, "drone2");
}

#[tokio::test]
async fn test_anomalies_appended_to_ledger_in_order() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(
        &mut stream,
        make_report(
            "drone1",
            90,
            vec![make_anomaly("drone1", 40.0), make_anomaly("drone1", 41.0)],
        ),
    )
    .await;
    send_report(
        &mut stream,
        make_report("drone1", 89, vec![make_anomaly("drone1", 42.0)]),
    )
    .await;

    wait_until("ledger has three entries", || {
        handle.ledger_stats().total == 3
    })
    .await;

    let tail = handle.ledger_tail(10);
    assert_eq!(tail[0].value, 40.0);
    assert_eq!(tail[1].value, 41.0);
    assert_eq!(tail[2].value, 42.0);
    assert_eq!(handle.ledger_stats().temperature, 3);
}

// ============================================================================
// Decode boundary
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_keeps_connection_alive() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"garbage that is not a report\n")
        .await
        .expect("write garbage");
    send_report(&mut stream, make_report("drone1", 90, vec![])).await;

    wait_until("valid report still processed", || {
        handle.drone("drone1").is_some()
    })
    .await;
    assert_eq!(handle.stats().decode_failures, 1);
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test]
async fn test_silent_drone_flagged_stale_fields_retained() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(&mut stream, make_report("drone1", 77, vec![])).await;

    wait_until("record created", || handle.drone("drone1").is_some()).await;

    // No further reports: the sweeper flips the flag after the timeout.
    wait_until("record flagged stale", || {
        handle.drone("drone1").map(|r| !r.live).unwrap_or(false)
    })
    .await;

    // Fields unchanged, record still visible for audit.
    let record = handle.drone("drone1").unwrap();
    assert_eq!(record.battery.level, 77);
    assert_eq!(record.sensors.len(), 1);
    assert_eq!(handle.view().drones.len(), 1);
}

#[tokio::test]
async fn test_new_report_revives_stale_record() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(&mut stream, make_report("drone1", 77, vec![])).await;
    wait_until("record flagged stale", || {
        handle.drone("drone1").map(|r| !r.live).unwrap_or(false)
    })
    .await;

    send_report(&mut stream, make_report("drone1", 76, vec![])).await;
    wait_until("record live again", || {
        handle.drone("drone1").map(|r| r.live).unwrap_or(false)
    })
    .await;
    assert_eq!(handle.drone("drone1").unwrap().battery.level, 76);
}

// ============================================================================
// Observer surface
// ============================================================================

#[tokio::test]
async fn test_watch_subscription_sees_applied_report() {
    let (handle, addr) = start_central(test_config()).await;
    let mut updates = handle.subscribe();

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    send_report(&mut stream, make_report("drone1", 90, vec![])).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            updates.changed().await.expect("watch channel open");
            if !updates.borrow().drones.is_empty() {
                break;
            }
        }
    })
    .await
    .expect("view update within timeout");

    let view = updates.borrow().clone();
    assert_eq!(view.drones[0].edge_id, "drone1");
    assert_eq!(view.stats.reports_received, 1);
}

#[tokio::test]
async fn test_history_recorded_per_report() {
    let (handle, addr) = start_central(test_config()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    for level in [90, 89, 88] {
        send_report(&mut stream, make_report("drone1", level, vec![])).await;
    }

    wait_until("three reports applied", || {
        handle
            .drone("drone1")
            .map(|r| r.reports_received == 3)
            .unwrap_or(false)
    })
    .await;

    let record = handle.drone("drone1").unwrap();
    assert_eq!(record.history.len(), 3);
    assert_eq!(record.history[0].avg_temperature, Some(22.0));
}
