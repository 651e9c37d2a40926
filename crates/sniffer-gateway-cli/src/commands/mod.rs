//! Command implementations.

pub mod devices;
pub mod discover;
pub mod event;
pub mod run;
pub mod token;

pub use devices::run_devices;
pub use discover::run_discover;
pub use event::run_event;
pub use run::run_gateway;
pub use token::run_token;

use std::path::{Path, PathBuf};

use sniffer_gateway_core::config::CONFIG_FILE;
use sniffer_gateway_core::storage::default_data_dir;
use sniffer_gateway_core::{CredentialStore, FileRegistry, GatewayConfig};

use crate::error::{CliError, ConfigError};

/// Resolved configuration shared by every command.
#[derive(Debug)]
pub struct Context {
    pub config: GatewayConfig,
    pub data_dir: PathBuf,
}

impl Context {
    /// Resolve the config file and data directory.
    ///
    /// The `--data-dir` flag wins over `data_dir` in the config file, which
    /// wins over the platform default.
    pub fn load(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self, CliError> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => data_dir
                .map(Path::to_path_buf)
                .or_else(default_data_dir)
                .ok_or(ConfigError::NoDataDir)?
                .join(CONFIG_FILE),
        };

        let config = GatewayConfig::load(&config_path)?;
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.resolve_data_dir()?,
        };

        Ok(Self { config, data_dir })
    }

    pub async fn open_registry(&self) -> Result<FileRegistry, CliError> {
        Ok(FileRegistry::open(&self.data_dir).await?)
    }

    pub fn open_credentials(&self) -> Result<CredentialStore, CliError> {
        Ok(CredentialStore::open(&self.data_dir)?)
    }
}
