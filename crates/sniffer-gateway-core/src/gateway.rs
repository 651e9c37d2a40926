//! Composition root wiring both engines together.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::delivery::{DeliveryQueue, DeliveryTransport, Dispatcher};
use crate::discovery::{response_queue, Prober, ResponseHandler};
use crate::intake::EventIntake;
use crate::registry::DeviceRegistry;
use crate::storage::CredentialStore;

pub struct Gateway;

impl Gateway {
    /// Spawn the prober, the response handler and the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<R, T>(
        config: &GatewayConfig,
        registry: Arc<R>,
        transport: T,
        credentials: Arc<CredentialStore>,
    ) -> GatewayHandle<R>
    where
        R: DeviceRegistry + 'static,
        T: DeliveryTransport + 'static,
    {
        let cancel = CancellationToken::new();
        let (responses_tx, responses_rx) = response_queue();
        let delivery = Arc::new(DeliveryQueue::new());

        let prober = Prober::new(config.probe_options(), responses_tx);
        let handler = ResponseHandler::new(registry.clone(), config.urn_format);
        let dispatcher = Dispatcher::new(delivery.clone(), transport, credentials.clone())
            .with_batch_cap(config.batch_cap);

        let tasks = vec![
            (
                "discovery-prober",
                tokio::spawn(prober.run(config.discovery_schedule(), cancel.clone())),
            ),
            (
                "discovery-handler",
                tokio::spawn(handler.run(responses_rx, cancel.clone())),
            ),
            (
                "delivery-dispatcher",
                tokio::spawn(dispatcher.run(config.dispatch_schedule(), cancel.clone())),
            ),
        ];

        let intake = Arc::new(EventIntake::new(
            registry,
            delivery.clone(),
            config.events_url(),
            config.duplicate_policy(),
        ));

        info!(
            bind = %config.bind_addr,
            server = %config.server_url,
            "gateway started"
        );

        GatewayHandle {
            cancel,
            tasks,
            intake,
            delivery,
        }
    }
}

/// Handle to a running gateway.
pub struct GatewayHandle<R> {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    intake: Arc<EventIntake<R>>,
    delivery: Arc<DeliveryQueue>,
}

impl<R: DeviceRegistry> GatewayHandle<R> {
    pub fn intake(&self) -> &Arc<EventIntake<R>> {
        &self.intake
    }

    /// Token shared by every worker; cancelling it stops the gateway.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask every worker to stop without waiting for them.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the gateway and wait for the workers to exit.
    ///
    /// With a `drain_timeout`, waits up to that long for every queued
    /// delivery to be attempted first. Returns whether the queue drained.
    pub async fn shutdown(self, drain_timeout: Option<Duration>) -> bool {
        let drained = match drain_timeout {
            Some(limit) if !self.cancel.is_cancelled() => {
                match timeout(limit, self.delivery.join()).await {
                    Ok(()) => true,
                    Err(_) => {
                        warn!(
                            pending = self.delivery.unfinished(),
                            "delivery queue not drained before shutdown"
                        );
                        false
                    }
                }
            }
            _ => self.delivery.unfinished() == 0,
        };

        self.cancel.cancel();

        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                error!(worker = name, error = %e, "worker task failed");
            }
        }

        info!(drained, "gateway stopped");
        drained
    }
}
