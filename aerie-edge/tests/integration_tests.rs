// AERIE Edge - Integration Tests
//
// End-to-end tests driving a real edge node over TCP on ephemeral
// ports. Organized into categories:
// 1. Reading ingestion
// 2. Decode boundary
// 3. Control commands
// 4. Reporting and the central uplink
// 5. Connection lifecycle

use aerie::protocol::{ControlCommand, FlightMode, Message, Reading};
use aerie::wire::{decode_line, encode_frame};
use aerie_edge::{EdgeConfig, EdgeHandle, EdgeNode};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> EdgeConfig {
    EdgeConfig::new("drone1")
        .with_listen_addr("127.0.0.1:0")
        // Nothing listens here; the uplink just retries in the background.
        .with_central_addr("127.0.0.1:9")
        .with_report_interval(Duration::from_millis(100))
        .with_battery_tick_interval(Duration::from_secs(3600))
}

async fn start_edge(config: EdgeConfig) -> (EdgeHandle, SocketAddr) {
    let node = EdgeNode::bind(config).await.expect("bind edge node");
    let addr = node.local_addr().expect("local addr");
    let handle = node.handle();
    tokio::spawn(node.run());
    (handle, addr)
}

async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("connect to edge")
}

async fn send_message(stream: &mut TcpStream, message: &Message) {
    let frame = encode_frame(message).expect("encode frame");
    stream.write_all(&frame).await.expect("write frame");
}

async fn send_reading(stream: &mut TcpStream, sensor_id: &str, temperature: f64, humidity: f64) {
    let reading = Reading::new(sensor_id, temperature, humidity, Utc::now());
    send_message(stream, &Message::Reading(reading)).await;
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
// Reading ingestion
// ============================================================================

#[tokio::test]
async fn test_reading_updates_snapshot() {
    let (handle, addr) = start_edge(test_config()).await;

    let mut stream = connect(addr).await;
    send_reading(&mut stream, "sensor1", 22.5, 48.0).await;

    wait_until("reading applied", || {
        handle.snapshot().sensors.contains_key("sensor1")
    })
    .await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.sensors["sensor1"].temperature, 22.5);
    assert_eq!(snapshot.connected_sensors, 1);
    assert_eq!(snapshot.stats.readings_received, 1);
    assert_eq!(snapshot.pending_anomalies, 0);
}

#[tokio::test]
async fn test_many_sensors_tracked_concurrently() {
    let (handle, addr) = start_edge(test_config()).await;

    let mut streams = Vec::new();
    for i in 0..5 {
        let mut stream = connect(addr).await;
        send_reading(&mut stream, &format!("sensor{}", i), 20.0 + i as f64, 50.0).await;
        streams.push(stream);
    }

    wait_until("all sensors registered", || {
        handle.snapshot().sensors.len() == 5
    })
    .await;
    assert_eq!(handle.snapshot().connected_sensors, 5);
}

#[tokio::test]
async fn test_snapshot_is_monotonic_per_sensor() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    let newer = Utc::now();
    let older = newer - chrono::Duration::seconds(30);

    send_message(
        &mut stream,
        &Message::Reading(Reading::new("sensor1", 25.0, 50.0, newer)),
    )
    .await;
    send_message(
        &mut stream,
        &Message::Reading(Reading::new("sensor1", 99.0, 50.0, older)),
    )
    .await;

    wait_until("both readings processed", || {
        handle.stats().readings_received == 2
    })
    .await;

    // The out-of-order arrival did not regress the snapshot.
    assert_eq!(handle.snapshot().sensors["sensor1"].temperature, 25.0);
}

// ============================================================================
// Decode boundary
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_keeps_connection_alive() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    stream
        .write_all(b"this is not a frame\n")
        .await
        .expect("write garbage");
    // The same connection keeps working afterwards.
    send_reading(&mut stream, "sensor1", 22.0, 50.0).await;

    wait_until("valid reading still processed", || {
        handle.stats().readings_received == 1
    })
    .await;
    assert_eq!(handle.stats().decode_failures, 1);
}

#[tokio::test]
async fn test_schema_violation_is_dropped() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    // Valid JSON, missing fields.
    stream
        .write_all(b"{\"type\":\"reading\",\"sensor_id\":\"s1\"}\n")
        .await
        .expect("write bad frame");
    send_reading(&mut stream, "sensor1", 22.0, 50.0).await;

    wait_until("valid reading still processed", || {
        handle.stats().readings_received == 1
    })
    .await;
    assert_eq!(handle.stats().decode_failures, 1);
}

// ============================================================================
// Control commands
// ============================================================================

#[tokio::test]
async fn test_set_battery_override() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    send_message(
        &mut stream,
        &Message::Control(ControlCommand::set_battery("drone1", 55)),
    )
    .await;

    wait_until("override applied", || handle.battery().level == 55).await;
    assert_eq!(handle.stats().commands_applied, 1);
}

#[tokio::test]
async fn test_out_of_range_override_rejected() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    send_message(
        &mut stream,
        &Message::Control(ControlCommand::set_battery("drone1", 180)),
    )
    .await;

    wait_until("rejection counted", || {
        handle.stats().commands_rejected == 1
    })
    .await;
    // State unchanged.
    assert_eq!(handle.battery().level, 100);
}

#[tokio::test]
async fn test_force_return_to_base() {
    let (handle, addr) = start_edge(test_config()).await;
    let mut stream = connect(addr).await;

    send_message(
        &mut stream,
        &Message::Control(ControlCommand::force_return_to_base("drone1")),
    )
    .await;

    wait_until("mode changed", || {
        handle.battery().mode == FlightMode::ReturningToBase
    })
    .await;
}

// ============================================================================
// Reporting and the central uplink
// ============================================================================

#[tokio::test]
async fn test_reports_delivered_to_central() {
    // Fake central registry.
    let central = TcpListener::bind("127.0.0.1:0").await.expect("bind central");
    let central_addr = central.local_addr().expect("central addr");

    let config = test_config().with_central_addr(central_addr.to_string());
    let (_handle, addr) = start_edge(config).await;

    // Anomalous temperature: exactly one anomaly event expected.
    let mut stream = connect(addr).await;
    send_reading(&mut stream, "sensor1", 40.0, 50.0).await;

    let (upstream, _) = central.accept().await.expect("edge connects");
    let mut reader = BufReader::new(upstream);
    let mut line = String::new();

    // Reports arrive continuously; find the one carrying the anomaly.
    let report = loop {
        line.clear();
        let n = reader.read_line(&mut line).await.expect("read report");
        assert!(n > 0, "central connection closed unexpectedly");

        match decode_line(&line).expect("decode report") {
            Message::Report(report) if report.anomaly_count() > 0 => break report,
            Message::Report(_) => continue,
            other => panic!("unexpected message on central link: {:?}", other),
        }
    };

    assert_eq!(report.edge_id, "drone1");
    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.anomalies[0].sensor_id, "sensor1");
    assert_eq!(report.anomalies[0].value, 40.0);
    assert!(report.sensors.contains_key("sensor1"));
    assert_eq!(report.avg_temperature, Some(40.0));

    // The buffer was cleared after sending: the next report is clean.
    line.clear();
    reader.read_line(&mut line).await.expect("read next report");
    let Message::Report(next) = decode_line(&line).expect("decode next") else {
        panic!("expected a report");
    };
    assert_eq!(next.anomaly_count(), 0);
    // The sensor snapshot persists across reports.
    assert!(next.sensors.contains_key("sensor1"));
}

#[tokio::test]
async fn test_reports_queue_while_central_down() {
    // No central at all: reports pile up in the bounded queue and the
    // node keeps accepting readings.
    let (handle, addr) = start_edge(test_config()).await;

    let mut stream = connect(addr).await;
    send_reading(&mut stream, "sensor1", 22.0, 50.0).await;

    wait_until("several reports built", || {
        handle.stats().reports_built >= 3
    })
    .await;
    assert_eq!(handle.stats().readings_received, 1);
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_disconnect_keeps_snapshot_for_grace_period() {
    let (handle, addr) = start_edge(test_config()).await;

    {
        let mut stream = connect(addr).await;
        send_reading(&mut stream, "sensor1", 22.0, 50.0).await;
        wait_until("reading applied", || {
            handle.snapshot().sensors.contains_key("sensor1")
        })
        .await;
    } // stream dropped: connection closes

    wait_until("channel marked disconnected", || {
        handle.snapshot().connected_sensors == 0
    })
    .await;

    // Within the grace period the snapshot survives.
    let snapshot = handle.snapshot();
    assert!(snapshot.sensors.contains_key("sensor1"));
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let (handle, addr) = start_edge(test_config()).await;

    {
        let mut stream = connect(addr).await;
        send_reading(&mut stream, "sensor1", 22.0, 50.0).await;
        wait_until("first reading applied", || {
            handle.stats().readings_received == 1
        })
        .await;
    }

    wait_until("disconnected", || handle.snapshot().connected_sensors == 0).await;

    let mut stream = connect(addr).await;
    send_reading(&mut stream, "sensor1", 23.0, 51.0).await;

    wait_until("second reading applied", || {
        handle.stats().readings_received == 2
    })
    .await;
    assert_eq!(handle.snapshot().connected_sensors, 1);
    assert_eq!(handle.snapshot().sensors["sensor1"].temperature, 23.0);
}
