//! Discovery response handler.
//!
//! Drains the prober queue in arrival order, parses each reply and upserts
//! the device registry. Serial identity wins over address when deciding
//! whether a sniffer is already known, so a roaming sniffer is moved rather
//! than registered twice.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::protocol::{parse_headers, UrnFormat, LOCATION_HEADER, URN_HEADER};
use super::service::ResponseReceiver;
use crate::error::RegistryError;
use crate::registry::DeviceRegistry;
use crate::types::{Device, DiscoveryResponse};
use crate::worker::panic_message;

/// What an upsert did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Unseen serial at an unclaimed address
    Created(Device),
    /// Known serial answered from a new address
    AddressUpdated { device: Device, previous: Ipv4Addr },
    /// Already registered at this address
    Unchanged,
    /// Unknown serial at an address another serial already holds
    AddressClaimed { holder: String },
}

/// Create-or-move a sniffer in the registry.
///
/// Assumes a single writer; the lookups and the write are not atomic.
pub async fn upsert_device<R: DeviceRegistry>(
    registry: &R,
    serial: &str,
    address: Ipv4Addr,
    location: &str,
) -> Result<UpsertOutcome, RegistryError> {
    let by_address = registry.find_by_address(address).await?;
    let by_serial = registry.find_by_serial(serial).await?;

    match (by_address, by_serial) {
        (None, None) => {
            let device = registry.create(serial, address, location).await?;
            Ok(UpsertOutcome::Created(device))
        }
        (_, Some(mut device)) if device.address != address => {
            let previous = device.address;
            device.address = address;
            registry.update(&device).await?;
            Ok(UpsertOutcome::AddressUpdated { device, previous })
        }
        (_, Some(_)) => Ok(UpsertOutcome::Unchanged),
        (Some(holder), None) => Ok(UpsertOutcome::AddressClaimed {
            holder: holder.serial_num,
        }),
    }
}

/// Single consumer of the prober queue.
pub struct ResponseHandler<R> {
    registry: Arc<R>,
    urn_format: UrnFormat,
}

impl<R: DeviceRegistry> ResponseHandler<R> {
    pub fn new(registry: Arc<R>, urn_format: UrnFormat) -> Self {
        Self {
            registry,
            urn_format,
        }
    }

    /// Parse one reply and apply it to the registry.
    ///
    /// Returns `Ok(None)` when the reply is dropped: no usable `URN`, or a
    /// source address that isn't IPv4.
    pub async fn handle_response(
        &self,
        response: DiscoveryResponse,
    ) -> Result<Option<UpsertOutcome>, RegistryError> {
        let text = String::from_utf8_lossy(&response.raw_bytes);
        let headers = parse_headers(&text);

        let Some(serial) = headers
            .get(URN_HEADER)
            .and_then(|urn| self.urn_format.canonicalize(urn))
        else {
            info!(source = %response.source_address, "discovery response without URN dropped");
            return Ok(None);
        };

        let Some(address) = ipv4_source(response.source_address) else {
            warn!(
                source = %response.source_address,
                serial = %serial,
                "non-IPv4 discovery response dropped"
            );
            return Ok(None);
        };

        let location = headers
            .get(LOCATION_HEADER)
            .map(String::as_str)
            .unwrap_or_default();

        upsert_device(self.registry.as_ref(), &serial, address, location)
            .await
            .map(Some)
    }

    /// Drain `responses` until `cancel` fires or every sender is gone.
    ///
    /// Replies are handled strictly one at a time in arrival order.
    pub async fn run(self, mut responses: ResponseReceiver, cancel: CancellationToken) {
        info!(worker = "discovery-handler", "worker started");

        loop {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = responses.recv() => match next {
                    Some(response) => response,
                    None => break,
                },
            };

            match AssertUnwindSafe(self.handle_response(response))
                .catch_unwind()
                .await
            {
                Ok(Ok(Some(outcome))) => log_outcome(&outcome),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(error = %e, "registry upsert failed"),
                Err(payload) => error!(
                    "response handling panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }

        info!(worker = "discovery-handler", "worker stopped");
    }
}

fn ipv4_source(addr: SocketAddr) -> Option<Ipv4Addr> {
    match addr.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}

fn log_outcome(outcome: &UpsertOutcome) {
    match outcome {
        UpsertOutcome::Created(device) => info!(
            serial = %device.serial_num,
            address = %device.address,
            "registered new sniffer"
        ),
        UpsertOutcome::AddressUpdated { device, previous } => info!(
            serial = %device.serial_num,
            address = %device.address,
            previous = %previous,
            "sniffer address updated"
        ),
        UpsertOutcome::Unchanged => debug!("sniffer already registered"),
        UpsertOutcome::AddressClaimed { holder } => debug!(
            holder = %holder,
            "address already held by another sniffer, response ignored"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use std::time::Duration;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn response(body: &str, last: u8) -> DiscoveryResponse {
        DiscoveryResponse::new(body.as_bytes(), SocketAddr::from((addr(last), 1900)))
    }

    fn handler(registry: &Arc<MemoryRegistry>) -> ResponseHandler<MemoryRegistry> {
        ResponseHandler::new(registry.clone(), UrnFormat::Verbatim)
    }

    #[tokio::test]
    async fn test_creates_device_in_empty_registry() {
        let registry = Arc::new(MemoryRegistry::new());

        let outcome = handler(&registry)
            .handle_response(response("HTTP/1.1 200 OK\nURN: ABC123\n\n", 5))
            .await
            .unwrap();
        assert!(matches!(outcome, Some(UpsertOutcome::Created(_))));

        let devices = registry.list().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial_num, "ABC123");
        assert_eq!(devices[0].address, addr(5));
        assert!(!devices[0].active);
    }

    #[tokio::test]
    async fn test_known_serial_moves_address() {
        let registry = Arc::new(MemoryRegistry::with_devices(vec![Device::new(
            "ABC123",
            addr(5),
        )]));

        let outcome = handler(&registry)
            .handle_response(response("URN: ABC123\n", 9))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            outcome,
            UpsertOutcome::AddressUpdated { previous, .. } if previous == addr(5)
        ));

        let devices = registry.list().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, addr(9));
    }

    #[tokio::test]
    async fn test_known_serial_moves_onto_held_address() {
        let registry = Arc::new(MemoryRegistry::with_devices(vec![
            Device::new("S1", addr(5)),
            Device::new("S2", addr(9)),
        ]));

        let outcome = handler(&registry)
            .handle_response(response("URN: S1\n", 9))
            .await
            .unwrap()
            .unwrap();
        match outcome {
            UpsertOutcome::AddressUpdated { device, previous } => {
                assert_eq!(device.serial_num, "S1");
                assert_eq!(previous, addr(5));
            }
            other => panic!("expected an address update, got {other:?}"),
        }

        assert_eq!(registry.list().await.unwrap().len(), 2);
        let moved = registry.find_by_serial("S1").await.unwrap().unwrap();
        assert_eq!(moved.address, addr(9));
        let holder = registry.find_by_serial("S2").await.unwrap().unwrap();
        assert_eq!(holder.address, addr(9));
    }

    #[tokio::test]
    async fn test_same_serial_same_address_is_noop() {
        let mut device = Device::new("ABC123", addr(5));
        device.active = true;
        device.location = "Barn".to_string();
        let registry = Arc::new(MemoryRegistry::with_devices(vec![device.clone()]));

        let outcome = handler(&registry)
            .handle_response(response("URN: ABC123\nLocation: Elsewhere\n", 5))
            .await
            .unwrap();
        assert_eq!(outcome, Some(UpsertOutcome::Unchanged));
        assert_eq!(registry.list().await.unwrap(), vec![device]);
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let once = Arc::new(MemoryRegistry::new());
        let twice = Arc::new(MemoryRegistry::new());
        let body = "URN: ABC123\nLOCATION: Gate\n";

        handler(&once).handle_response(response(body, 5)).await.unwrap();
        handler(&twice).handle_response(response(body, 5)).await.unwrap();
        handler(&twice).handle_response(response(body, 5)).await.unwrap();

        assert_eq!(once.list().await.unwrap(), twice.list().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_serial_at_claimed_address_is_ignored() {
        let registry = Arc::new(MemoryRegistry::with_devices(vec![Device::new(
            "ABC123",
            addr(5),
        )]));

        let outcome = handler(&registry)
            .handle_response(response("URN: XYZ999\n", 5))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Some(UpsertOutcome::AddressClaimed {
                holder: "ABC123".to_string()
            })
        );
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_urn_is_dropped() {
        let registry = Arc::new(MemoryRegistry::new());

        let outcome = handler(&registry)
            .handle_response(response(
                "HTTP/1.1 200 OK\nST: urn:sniffer:slave\n\nURN: body\n",
                5,
            ))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_location_stored_on_create() {
        let registry = Arc::new(MemoryRegistry::new());

        handler(&registry)
            .handle_response(response("URN: ABC123\nLOCATION: Kennel 4\n", 5))
            .await
            .unwrap();

        let device = registry.find_by_serial("ABC123").await.unwrap().unwrap();
        assert_eq!(device.location, "Kennel 4");
    }

    #[tokio::test]
    async fn test_strip_prefix_mode() {
        let registry = Arc::new(MemoryRegistry::new());
        let handler = ResponseHandler::new(registry.clone(), UrnFormat::StripPrefix);

        handler
            .handle_response(response("URN: uuid:ABC123\n", 5))
            .await
            .unwrap();
        assert!(registry.find_by_serial("ABC123").await.unwrap().is_some());

        let dropped = handler
            .handle_response(response("URN: uuid\n", 6))
            .await
            .unwrap();
        assert!(dropped.is_none());
    }

    #[tokio::test]
    async fn test_ipv6_source_dropped() {
        let registry = Arc::new(MemoryRegistry::new());
        let response = DiscoveryResponse::new(
            b"URN: ABC123\n".to_vec(),
            "[fe80::1]:1900".parse().unwrap(),
        );

        let outcome = handler(&registry).handle_response(response).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_run_applies_in_order_and_stops() {
        let registry = Arc::new(MemoryRegistry::new());
        let (tx, rx) = crate::discovery::response_queue();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(handler(&registry).run(rx, cancel.clone()));

        tx.send(response("URN: ABC123\n", 5)).unwrap();
        tx.send(response("URN: ABC123\n", 7)).unwrap();
        tx.send(response("URN: ABC123\n", 9)).unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let device = registry.find_by_serial("ABC123").await.unwrap();
                if device.map(|d| d.address) == Some(addr(9)) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_exits_when_senders_drop() {
        let registry = Arc::new(MemoryRegistry::new());
        let (tx, rx) = crate::discovery::response_queue();
        tx.send(response("URN: ABC123\n", 5)).unwrap();
        drop(tx);

        handler(&registry).run(rx, CancellationToken::new()).await;
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }
}
