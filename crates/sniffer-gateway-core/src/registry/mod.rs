//! Device registry: the store of known sniffers keyed by serial.
//!
//! The discovery handler is the only writer during normal operation, so the
//! trait exposes plain lookups and writes rather than a combined upsert.

pub mod file;
pub mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use std::collections::BTreeMap;
use std::future::Future;
use std::net::Ipv4Addr;

use crate::error::RegistryError;
use crate::types::Device;

/// Storage contract consumed by the discovery handler and event intake.
pub trait DeviceRegistry: Send + Sync {
    /// First device registered at `address`, if any.
    fn find_by_address(
        &self,
        address: Ipv4Addr,
    ) -> impl Future<Output = Result<Option<Device>, RegistryError>> + Send;

    fn find_by_serial(
        &self,
        serial: &str,
    ) -> impl Future<Output = Result<Option<Device>, RegistryError>> + Send;

    /// Register a new, inactive device. Fails if the serial is taken.
    fn create(
        &self,
        serial: &str,
        address: Ipv4Addr,
        location: &str,
    ) -> impl Future<Output = Result<Device, RegistryError>> + Send;

    /// Overwrite the stored device with the same serial.
    fn update(&self, device: &Device) -> impl Future<Output = Result<(), RegistryError>> + Send;

    /// All devices, ordered by serial.
    fn list(&self) -> impl Future<Output = Result<Vec<Device>, RegistryError>> + Send;
}

/// Flip the `active` gate on a registered device.
pub async fn set_active<R: DeviceRegistry>(
    registry: &R,
    serial: &str,
    active: bool,
) -> Result<Device, RegistryError> {
    let mut device = registry
        .find_by_serial(serial)
        .await?
        .ok_or_else(|| RegistryError::NotFound(serial.to_string()))?;

    device.active = active;
    registry.update(&device).await?;
    Ok(device)
}

/// Replace the free-text location of a registered device.
pub async fn set_location<R: DeviceRegistry>(
    registry: &R,
    serial: &str,
    location: &str,
) -> Result<Device, RegistryError> {
    let mut device = registry
        .find_by_serial(serial)
        .await?
        .ok_or_else(|| RegistryError::NotFound(serial.to_string()))?;

    device.location = location.to_string();
    registry.update(&device).await?;
    Ok(device)
}

/// In-memory table shared by the registry implementations.
#[derive(Debug, Default, Clone)]
pub(crate) struct DeviceTable {
    devices: BTreeMap<String, Device>,
}

impl DeviceTable {
    pub(crate) fn from_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.serial_num.clone(), d))
                .collect(),
        }
    }

    pub(crate) fn by_address(&self, address: Ipv4Addr) -> Option<Device> {
        self.devices
            .values()
            .find(|d| d.address == address)
            .cloned()
    }

    pub(crate) fn by_serial(&self, serial: &str) -> Option<Device> {
        self.devices.get(serial).cloned()
    }

    pub(crate) fn insert_new(
        &mut self,
        serial: &str,
        address: Ipv4Addr,
        location: &str,
    ) -> Result<Device, RegistryError> {
        if self.devices.contains_key(serial) {
            return Err(RegistryError::Duplicate(serial.to_string()));
        }

        let mut device = Device::new(serial, address);
        device.location = location.to_string();
        self.devices.insert(serial.to_string(), device.clone());
        Ok(device)
    }

    pub(crate) fn replace(&mut self, device: &Device) -> Result<(), RegistryError> {
        match self.devices.get_mut(&device.serial_num) {
            Some(slot) => {
                *slot = device.clone();
                Ok(())
            }
            None => Err(RegistryError::NotFound(device.serial_num.clone())),
        }
    }

    pub(crate) fn all(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }
}
