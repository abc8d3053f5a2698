// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sensor-facing TCP server
//!
//! One task per accepted connection. Each task reads delimited frames,
//! applies readings and control commands to the shared state, and drops
//! malformed frames without tearing the connection down. On EOF or I/O
//! error the sensor's channel is marked disconnected; eviction happens
//! later, on the report tick, once the grace period runs out.

use crate::aggregator::{lock_state, EdgeState};
use aerie::protocol::Message;
use aerie::wire::decode_line;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Accept sensor and presentation connections forever
pub(crate) async fn run_sensor_listener(listener: TcpListener, state: Arc<Mutex<EdgeState>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "connection accepted");
                tokio::spawn(handle_connection(stream, peer, state.clone()));
            }
            Err(err) => {
                warn!(error = %err, "accept failed");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Serve one inbound connection until the peer goes away
async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<Mutex<EdgeState>>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    // Filled in by the first reading so the disconnect can be attributed.
    let mut sensor_id: Option<String> = None;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => match decode_line(&line) {
                Ok(Message::Reading(reading)) => {
                    sensor_id = Some(reading.sensor_id.clone());
                    lock_state(&state).apply_reading(reading, Utc::now());
                }
                Ok(Message::Control(command)) => {
                    // Outcome is logged and counted by the state itself.
                    let _ = lock_state(&state).apply_command(&command);
                }
                Ok(Message::Report(_)) => {
                    warn!(%peer, "unexpected aggregate report on the sensor port, dropped");
                }
                Err(err) => {
                    lock_state(&state).record_decode_failure();
                    warn!(%peer, error = %err, "dropping malformed frame");
                }
            },
            Err(err) => {
                warn!(%peer, error = %err, "read failed");
                break;
            }
        }
    }

    match sensor_id {
        Some(id) => {
            lock_state(&state).mark_disconnected(&id, Utc::now());
            info!(sensor_id = %id, %peer, "sensor disconnected");
        }
        None => debug!(%peer, "connection closed"),
    }
}
