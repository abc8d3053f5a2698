// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Edge-facing TCP server
//!
//! One task per connected edge node. Reports on a single connection are
//! applied in arrival order, which together with TCP ordering gives the
//! per-edge delivery guarantee. Malformed frames are dropped without
//! closing the connection. Every applied report republishes the watch
//! view so observers never see a partially-applied update.

use crate::registry::{Registry, RegistryView};
use aerie::protocol::Message;
use aerie::wire::decode_line;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Lock the registry, recovering from poisoning
pub(crate) fn lock_registry(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Accept edge connections forever
pub(crate) async fn run_listener(
    listener: TcpListener,
    registry: Arc<Mutex<Registry>>,
    watch_tx: Arc<watch::Sender<RegistryView>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "edge connection accepted");
                tokio::spawn(handle_connection(
                    stream,
                    peer,
                    registry.clone(),
                    watch_tx.clone(),
                ));
            }
            Err(err) => {
                warn!(error = %err, "accept failed");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Serve one edge connection until the peer goes away
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<Mutex<Registry>>,
    watch_tx: Arc<watch::Sender<RegistryView>>,
) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => match decode_line(&line) {
                Ok(Message::Report(report)) => {
                    let view = {
                        let mut registry = lock_registry(&registry);
                        registry.apply_report(report, Utc::now());
                        registry.view()
                    };
                    watch_tx.send_replace(view);
                }
                Ok(other) => {
                    warn!(%peer, kind = message_kind(&other), "unexpected message on the central port, dropped");
                }
                Err(err) => {
                    lock_registry(&registry).record_decode_failure();
                    warn!(%peer, error = %err, "dropping malformed frame");
                }
            },
            Err(err) => {
                warn!(%peer, error = %err, "read failed");
                break;
            }
        }
    }

    debug!(%peer, "edge connection closed");
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Reading(_) => "reading",
        Message::Report(_) => "report",
        Message::Control(_) => "control",
    }
}
