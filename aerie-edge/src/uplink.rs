// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Central-facing uplink
//!
//! Reports are produced by the timer task whether or not the central
//! link is up. They land in a bounded FIFO; when the queue overflows the
//! oldest report is dropped, so a long outage costs history but never
//! memory. The uplink task drains the queue over a self-healing
//! connection, reconnecting under the configured backoff.

use aerie::error::ConnectError;
use aerie::protocol::{AggregateReport, Message};
use aerie::retry::RetryPolicy;
use aerie::wire::encode_frame;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Bounded FIFO of reports awaiting transmission
#[derive(Debug)]
pub struct ReportQueue {
    queue: Mutex<VecDeque<AggregateReport>>,
    limit: usize,
    notify: Notify,
}

impl ReportQueue {
    /// Create a queue holding at most `limit` reports
    pub fn new(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
            notify: Notify::new(),
        }
    }

    /// Enqueue a report, dropping the oldest on overflow
    ///
    /// Returns the number of reports dropped (0 or 1).
    pub fn push(&self, report: AggregateReport) -> usize {
        let dropped = {
            let mut queue = self.lock();
            let dropped = if queue.len() >= self.limit {
                queue.pop_front();
                1
            } else {
                0
            };
            queue.push_back(report);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Take the oldest pending report
    pub fn pop(&self) -> Option<AggregateReport> {
        self.lock().pop_front()
    }

    /// Put a report back at the front after a failed send
    pub fn requeue_front(&self, report: AggregateReport) {
        self.lock().push_front(report);
    }

    /// Wait until a report is (or already was) enqueued
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Number of pending reports
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AggregateReport>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drive the central connection forever
pub(crate) async fn run_uplink(central_addr: String, retry: RetryPolicy, queue: Arc<ReportQueue>) {
    let mut attempt: u32 = 0;
    loop {
        match TcpStream::connect(&central_addr).await {
            Ok(mut stream) => {
                info!(central_addr = %central_addr, "connected to central registry");
                attempt = 0;
                if let Err(err) = drain_loop(&mut stream, &queue).await {
                    warn!(error = %err, "central link lost");
                }
            }
            Err(err) => {
                let err = ConnectError::from_io(central_addr.clone(), err);
                warn!(error = %err, "could not reach central registry");
            }
        }

        let delay = retry.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        debug!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
        sleep(delay).await;
    }
}

/// Flush queued reports over an established connection until it fails
async fn drain_loop(stream: &mut TcpStream, queue: &ReportQueue) -> io::Result<()> {
    loop {
        while let Some(report) = queue.pop() {
            let frame = encode_frame(&Message::Report(report.clone()))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

            if let Err(err) = stream.write_all(&frame).await {
                // The report was not delivered; keep it for the next link.
                queue.requeue_front(report);
                return Err(err);
            }
            debug!(
                anomalies = report.anomaly_count(),
                sensors = report.sensor_count(),
                battery = report.battery.level,
                "report forwarded to central"
            );
        }
        queue.wait().await;
    }
}
