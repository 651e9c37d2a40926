//! Volatile registry for tests and single-run tools.

use std::net::Ipv4Addr;

use tokio::sync::RwLock;

use super::{DeviceRegistry, DeviceTable};
use crate::error::RegistryError;
use crate::types::Device;

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    table: RwLock<DeviceTable>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `devices`.
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            table: RwLock::new(DeviceTable::from_devices(devices)),
        }
    }
}

impl DeviceRegistry for MemoryRegistry {
    async fn find_by_address(&self, address: Ipv4Addr) -> Result<Option<Device>, RegistryError> {
        Ok(self.table.read().await.by_address(address))
    }

    async fn find_by_serial(&self, serial: &str) -> Result<Option<Device>, RegistryError> {
        Ok(self.table.read().await.by_serial(serial))
    }

    async fn create(
        &self,
        serial: &str,
        address: Ipv4Addr,
        location: &str,
    ) -> Result<Device, RegistryError> {
        self.table.write().await.insert_new(serial, address, location)
    }

    async fn update(&self, device: &Device) -> Result<(), RegistryError> {
        self.table.write().await.replace(device)
    }

    async fn list(&self) -> Result<Vec<Device>, RegistryError> {
        Ok(self.table.read().await.all())
    }
}
