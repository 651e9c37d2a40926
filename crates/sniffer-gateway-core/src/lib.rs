//! Core library for the beacon-tracking sniffer gateway.
//!
//! Two independent engines share a device registry:
//!
//! - discovery: multicast probes find sniffers on the local segment and
//!   register them by serial
//! - delivery: accepted tracking events are forwarded to the aggregation
//!   server in rate-limited batches

pub mod config;
pub mod delivery;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod registry;
pub mod storage;
pub mod types;
pub mod worker;

pub use config::GatewayConfig;
pub use error::{
    ConfigError, CoreError, DeliveryError, DiscoveryError, EventError, RegistryError,
};
pub use gateway::{Gateway, GatewayHandle};
pub use intake::{Acceptance, DuplicatePolicy, EventIntake};
pub use registry::{DeviceRegistry, FileRegistry, MemoryRegistry};
pub use storage::{CredentialStore, Credentials};
pub use types::{Device, DiscoveryResponse, ParsedHeaders, TrackingEvent};
pub use worker::Schedule;
