//! Delivery dispatcher.
//!
//! Every interval, drains at most `batch_cap` requests from the delivery
//! queue over one session. A failed send is logged and dropped; there is
//! no retry and no dead-letter queue.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::DeliveryQueue;
use super::transport::{DeliverySession, DeliveryTransport};
use crate::error::DeliveryError;
use crate::storage::CredentialStore;
use crate::worker::{run_periodic, Schedule};

/// Default time between dispatch cycles
pub const DISPATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Default maximum requests sent per cycle
pub const BATCH_CAP: usize = 10;

/// Outcome of one dispatch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub failed: usize,
}

impl BatchReport {
    /// Requests taken off the queue this cycle.
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

pub struct Dispatcher<T> {
    queue: Arc<DeliveryQueue>,
    transport: T,
    credentials: Arc<CredentialStore>,
    batch_cap: usize,
}

impl<T: DeliveryTransport> Dispatcher<T> {
    pub fn new(queue: Arc<DeliveryQueue>, transport: T, credentials: Arc<CredentialStore>) -> Self {
        Self {
            queue,
            transport,
            credentials,
            batch_cap: BATCH_CAP,
        }
    }

    pub fn with_batch_cap(mut self, batch_cap: usize) -> Self {
        self.batch_cap = batch_cap.max(1);
        self
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    /// Send up to `batch_cap` queued requests over one session.
    ///
    /// Stops early as soon as the queue is empty; never waits for new work.
    pub async fn drain_batch(&self) -> Result<BatchReport, DeliveryError> {
        let mut report = BatchReport::default();

        if self.queue.is_empty() {
            return Ok(report);
        }

        let session = self.transport.open_session()?;

        while report.attempted() < self.batch_cap {
            let Some(request) = self.queue.try_pop() else {
                break;
            };

            let _ack = Acknowledge(&self.queue);
            let token = self.credentials.token();
            match session.send(&request, token.as_deref()).await {
                Ok(status) => {
                    report.sent += 1;
                    debug!(url = %request.target_url, status, "event delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        error = %e,
                        sniffer = %request.payload.sniffer_serial,
                        beacon = %request.payload.beacon_addr,
                        "delivery failed, request discarded"
                    );
                }
            }
        }

        drop(session);
        Ok(report)
    }

    /// Drain a batch every `schedule.interval` until `cancel` fires.
    pub async fn run(self, schedule: Schedule, cancel: CancellationToken) {
        let dispatcher = &self;
        run_periodic("delivery-dispatcher", schedule, cancel, move || async move {
            match dispatcher.drain_batch().await {
                Ok(report) if report.attempted() == 0 => {}
                Ok(report) => info!(
                    sent = report.sent,
                    failed = report.failed,
                    remaining = dispatcher.queue.len(),
                    "dispatch cycle finished"
                ),
                Err(e) => warn!(error = %e, "dispatch cycle abandoned"),
            }
        })
        .await;
    }
}

/// Acknowledges one popped request when dropped, even if the send unwinds.
struct Acknowledge<'a>(&'a DeliveryQueue);

impl Drop for Acknowledge<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}
