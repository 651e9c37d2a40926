//! File-backed device registry.
//!
//! `devices.json` is the source of truth. Every operation re-reads it under
//! the lock, so edits made by another process (the CLI while the daemon
//! runs) are seen before the next lookup or write. Writes go to a temporary
//! file first and are renamed into place.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{DeviceRegistry, DeviceTable};
use crate::error::RegistryError;
use crate::types::Device;

/// File name of the registry inside the data directory
pub const REGISTRY_FILE: &str = "devices.json";

pub struct FileRegistry {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileRegistry {
    /// Open (or start) the registry stored in `dir`.
    pub async fn open(dir: &Path) -> Result<Self, RegistryError> {
        fs::create_dir_all(dir).await?;

        let registry = Self {
            path: dir.join(REGISTRY_FILE),
            lock: Mutex::new(()),
        };

        let table = registry.load().await?;
        debug!(
            path = %registry.path.display(),
            count = table.all().len(),
            "loaded device registry"
        );

        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<DeviceTable, RegistryError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(DeviceTable::default());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(DeviceTable::default());
        }

        let devices: Vec<Device> = serde_json::from_str(&content)?;
        Ok(DeviceTable::from_devices(devices))
    }

    async fn persist(&self, table: &DeviceTable) -> Result<(), RegistryError> {
        let content = serde_json::to_string_pretty(&table.all())?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}

impl DeviceRegistry for FileRegistry {
    async fn find_by_address(&self, address: Ipv4Addr) -> Result<Option<Device>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.by_address(address))
    }

    async fn find_by_serial(&self, serial: &str) -> Result<Option<Device>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.by_serial(serial))
    }

    async fn create(
        &self,
        serial: &str,
        address: Ipv4Addr,
        location: &str,
    ) -> Result<Device, RegistryError> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        let device = table.insert_new(serial, address, location)?;

        self.persist(&table).await?;
        Ok(device)
    }

    async fn update(&self, device: &Device) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        table.replace(device)?;

        self.persist(&table).await
    }

    async fn list(&self) -> Result<Vec<Device>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.all())
    }
}
