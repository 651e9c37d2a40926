//! Error types for the sniffer gateway core.

use thiserror::Error;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures inside a single discovery cycle.
///
/// These never escape the prober loop; they end the current cycle only.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to bind discovery socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send search probe to {target}: {source}")]
    Send {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive discovery response: {0}")]
    Receive(#[source] std::io::Error),
}

/// Device registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device already registered: {0}")]
    Duplicate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to open HTTP session: {0}")]
    Session(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Server rejected request to {url} with HTTP {status}")]
    Rejected { url: String, status: u16 },
}

/// Tracking event validation errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Registry lookup failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data directory available on this platform")]
    NoDataDir,
}
