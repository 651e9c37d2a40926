//! On-disk state owned by the gateway.

pub mod credentials;

pub use credentials::{CredentialStore, Credentials};

/// Get the default data directory for the gateway.
///
/// Uses the `directories` crate to find the appropriate platform-specific
/// data directory.
pub fn default_data_dir() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "pawpharos", "sniffer-gateway")
        .map(|dirs| dirs.data_dir().to_path_buf())
}
