//! Discovery prober.
//!
//! Each cycle binds a fresh UDP socket, multicasts one search probe and
//! forwards every reply to the response handler until the socket stays
//! quiet for the receive timeout. The socket is dropped at the end of the
//! cycle whatever happened.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{build_search_probe, DEFAULT_SEARCH_TARGET};
use crate::error::DiscoveryError;
use crate::types::DiscoveryResponse;
use crate::worker::{run_periodic, Schedule};

/// Multicast group sniffers listen on
pub const MULTICAST_GROUP: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

/// Gateway address on the sniffer access-point subnet
pub const DEFAULT_BIND_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 4, 1), 1900);

/// How long the socket may stay quiet before the listen window closes
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(3);

const RECV_BUFFER_SIZE: usize = 2048;

/// Sending half of the prober → handler queue.
pub type ResponseSender = mpsc::UnboundedSender<DiscoveryResponse>;

/// Receiving half of the prober → handler queue.
pub type ResponseReceiver = mpsc::UnboundedReceiver<DiscoveryResponse>;

/// Unbounded, so a burst of replies is never dropped.
pub fn response_queue() -> (ResponseSender, ResponseReceiver) {
    mpsc::unbounded_channel()
}

/// Prober options
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Local address the probe socket binds to
    pub bind_addr: SocketAddrV4,
    /// Destination of the search probe
    pub group: SocketAddrV4,
    /// `ST` header value
    pub search_target: String,
    /// Per-read timeout closing the listen window
    pub receive_timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            group: MULTICAST_GROUP,
            search_target: DEFAULT_SEARCH_TARGET.to_string(),
            receive_timeout: RECEIVE_TIMEOUT,
        }
    }
}

/// Create the probe socket with address reuse so other SSDP listeners on
/// the same port keep working.
pub fn create_probe_socket(bind_addr: SocketAddrV4) -> Result<std::net::UdpSocket, std::io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;

    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    socket.bind(&SocketAddr::V4(bind_addr).into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// Periodic multicast search client.
pub struct Prober {
    options: ProbeOptions,
    responses: ResponseSender,
}

impl Prober {
    pub fn new(options: ProbeOptions, responses: ResponseSender) -> Self {
        Self { options, responses }
    }

    /// Run one probe cycle, returning how many replies were queued.
    pub async fn run_discovery_cycle(&self) -> Result<usize, DiscoveryError> {
        let bind_err = |source| DiscoveryError::Bind {
            addr: self.options.bind_addr.to_string(),
            source,
        };

        let std_socket = create_probe_socket(self.options.bind_addr).map_err(bind_err)?;
        let socket = UdpSocket::from_std(std_socket).map_err(bind_err)?;

        let probe = build_search_probe(self.options.group, &self.options.search_target);
        socket
            .send_to(probe.as_bytes(), SocketAddr::V4(self.options.group))
            .await
            .map_err(|source| DiscoveryError::Send {
                target: self.options.group.to_string(),
                source,
            })?;

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut queued = 0;

        loop {
            match timeout(self.options.receive_timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, addr))) => {
                    debug!(
                        source = %addr,
                        data = %String::from_utf8_lossy(&buf[..len]),
                        "discovery response received"
                    );

                    if self
                        .responses
                        .send(DiscoveryResponse::new(&buf[..len], addr))
                        .is_err()
                    {
                        warn!("response handler is gone, ending discovery cycle");
                        break;
                    }
                    queued += 1;
                }
                Ok(Err(e)) => return Err(DiscoveryError::Receive(e)),
                Err(_) => break,
            }
        }

        Ok(queued)
    }

    /// Probe once with a private queue and return what came back.
    pub async fn probe_once(
        options: ProbeOptions,
    ) -> Result<Vec<DiscoveryResponse>, DiscoveryError> {
        let (tx, mut rx) = response_queue();
        let prober = Prober::new(options, tx);

        prober.run_discovery_cycle().await?;
        drop(prober);

        let mut responses = Vec::new();
        while let Some(response) = rx.recv().await {
            responses.push(response);
        }

        Ok(responses)
    }

    /// Probe every `schedule.interval` until `cancel` fires.
    ///
    /// A failing cycle is logged and the next one runs as usual; a bind
    /// failure that repeats every cycle leaves the prober degraded but alive.
    pub async fn run(self, schedule: Schedule, cancel: CancellationToken) {
        let prober = &self;
        run_periodic("discovery-prober", schedule, cancel, move || async move {
            match prober.run_discovery_cycle().await {
                Ok(0) => debug!("discovery cycle finished without replies"),
                Ok(n) => info!(responses = n, "discovery cycle finished"),
                Err(e) => warn!(error = %e, "discovery cycle abandoned"),
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_options(group: SocketAddrV4) -> ProbeOptions {
        ProbeOptions {
            bind_addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0),
            group,
            search_target: DEFAULT_SEARCH_TARGET.to_string(),
            receive_timeout: Duration::from_millis(300),
        }
    }

    async fn fake_sniffer(
        replies: Vec<&'static str>,
    ) -> (SocketAddrV4, tokio::task::JoinHandle<String>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = match socket.local_addr().unwrap() {
            SocketAddr::V4(v4) => v4,
            SocketAddr::V6(_) => unreachable!(),
        };

        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let (len, from) = socket.recv_from(&mut buf).await.unwrap();
            for reply in replies {
                socket.send_to(reply.as_bytes(), from).await.unwrap();
            }
            String::from_utf8_lossy(&buf[..len]).to_string()
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_cycle_queues_every_reply() {
        let (group, sniffer) = fake_sniffer(vec![
            "HTTP/1.1 200 OK\nURN: ABC123\n\n",
            "HTTP/1.1 200 OK\nURN: DEF456\n\n",
        ])
        .await;
        let (tx, mut rx) = response_queue();
        let prober = Prober::new(loopback_options(group), tx);

        let queued = prober.run_discovery_cycle().await.unwrap();
        assert_eq!(queued, 2);

        let probe = sniffer.await.unwrap();
        assert!(probe.starts_with("M-SEARCH * HTTP/1.1\n"));
        assert!(probe.contains("ST: urn:sniffer:slave\n"));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.source_address, SocketAddr::V4(group));
        assert_eq!(first.raw_bytes, b"HTTP/1.1 200 OK\nURN: ABC123\n\n");
        assert!(rx.recv().await.unwrap().raw_bytes.ends_with(b"DEF456\n\n"));
    }

    #[tokio::test]
    async fn test_cycle_without_replies_times_out() {
        let (group, _sniffer) = fake_sniffer(vec![]).await;
        let (tx, _rx) = response_queue();
        let prober = Prober::new(loopback_options(group), tx);

        assert_eq!(prober.run_discovery_cycle().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_probe_once_collects_responses() {
        let (group, _sniffer) = fake_sniffer(vec!["URN: ABC123\n"]).await;

        let responses = Prober::probe_once(loopback_options(group)).await.unwrap();
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let mut options = loopback_options(MULTICAST_GROUP);
        // TEST-NET-3, never assigned to a local interface
        options.bind_addr = SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 1), 0);
        let (tx, _rx) = response_queue();

        let result = Prober::new(options, tx).run_discovery_cycle().await;
        assert!(matches!(result, Err(DiscoveryError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_run_keeps_going_after_bind_failures() {
        let mut options = loopback_options(MULTICAST_GROUP);
        options.bind_addr = SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 1), 0);
        let (tx, _rx) = response_queue();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Prober::new(options, tx).run(
            Schedule::new(Duration::from_millis(20), Duration::from_millis(5)),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
