//! Shared data model for the gateway.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered sniffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Serial identity, unique across the registry and never reassigned
    pub serial_num: String,
    /// Last address the sniffer answered discovery from
    pub address: Ipv4Addr,
    /// Free-text placement description
    #[serde(default)]
    pub location: String,
    /// Events from inactive sniffers are not forwarded
    #[serde(default)]
    pub active: bool,
}

impl Device {
    /// A freshly discovered, not yet activated device.
    pub fn new(serial_num: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            serial_num: serial_num.into(),
            address,
            location: String::new(),
            active: false,
        }
    }
}

/// Raw multicast reply as it came off the socket.
#[derive(Debug, Clone)]
pub struct DiscoveryResponse {
    pub raw_bytes: Vec<u8>,
    pub source_address: SocketAddr,
}

impl DiscoveryResponse {
    pub fn new(raw_bytes: impl Into<Vec<u8>>, source_address: SocketAddr) -> Self {
        Self {
            raw_bytes: raw_bytes.into(),
            source_address,
        }
    }
}

/// Uppercased header name to header value.
pub type ParsedHeaders = HashMap<String, String>;

/// A beacon sighting reported by a sniffer.
///
/// Serialized as-is into the body of the forwarded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub sniffer_serial: String,
    pub beacon_addr: String,
    pub event_time: DateTime<Utc>,
    pub rssi: i32,
}
