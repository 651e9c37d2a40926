//! Error types for the sniffer gateway CLI.
//!
//! CliError wraps CoreError from the shared library and adds CLI-specific variants.

use sniffer_gateway_core::error::CoreError;
use thiserror::Error;

pub use sniffer_gateway_core::error::{
    ConfigError, DeliveryError, DiscoveryError, EventError, RegistryError,
};

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
    pub const DEVICE_ERROR: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No sniffers answered the probe")]
    NoDevicesFound,

    #[error("Event not forwarded: {0}")]
    EventNotQueued(String),

    #[error("Delivery failed for {0} event(s)")]
    DeliveryFailed(usize),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => match e {
                CoreError::Discovery(_) => exit_codes::NETWORK_ERROR,
                CoreError::Delivery(_) => exit_codes::NETWORK_ERROR,
                CoreError::Registry(RegistryError::NotFound(_)) => exit_codes::DEVICE_ERROR,
                CoreError::Registry(_) => exit_codes::GENERAL_ERROR,
                CoreError::Event(EventError::MissingField(_)) => exit_codes::INVALID_ARGS,
                CoreError::Event(_) => exit_codes::GENERAL_ERROR,
                CoreError::Config(ConfigError::InvalidValue { .. }) => exit_codes::INVALID_ARGS,
                CoreError::Config(_) => exit_codes::GENERAL_ERROR,
            },
            CliError::Io(_) => exit_codes::GENERAL_ERROR,
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
            CliError::NoDevicesFound => exit_codes::GENERAL_ERROR,
            CliError::EventNotQueued(_) => exit_codes::DEVICE_ERROR,
            CliError::DeliveryFailed(_) => exit_codes::NETWORK_ERROR,
        }
    }
}

// Conversions from core error subtypes to CliError
impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        CliError::Core(CoreError::Discovery(e))
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Core(CoreError::Registry(e))
    }
}

impl From<DeliveryError> for CliError {
    fn from(e: DeliveryError) -> Self {
        CliError::Core(CoreError::Delivery(e))
    }
}

impl From<EventError> for CliError {
    fn from(e: EventError) -> Self {
        CliError::Core(CoreError::Event(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Core(CoreError::Config(e))
    }
}
