//! Gateway configuration.
//!
//! Stored as JSON; every field has a default so a missing or partial file
//! still yields a usable configuration.

use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::delivery::{join_url, BATCH_CAP, DEFAULT_EVENTS_PATH};
use crate::discovery::protocol::{UrnFormat, DEFAULT_SEARCH_TARGET};
use crate::discovery::service::{ProbeOptions, DEFAULT_BIND_ADDR, MULTICAST_GROUP};
use crate::error::ConfigError;
use crate::intake::DuplicatePolicy;
use crate::storage::default_data_dir;
use crate::worker::Schedule;

/// Default aggregation server
pub const DEFAULT_SERVER_URL: &str = "https://pawpharos.com/";

/// Default config file name inside the data directory
pub const CONFIG_FILE: &str = "gateway.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the aggregation server
    pub server_url: String,
    /// Path of the event collection, relative to `server_url`
    pub events_path: String,
    /// Local address discovery probes are sent from
    pub bind_addr: SocketAddrV4,
    /// Multicast group probes are sent to
    pub multicast_group: SocketAddrV4,
    /// `ST` header announced in probes
    pub search_target: String,
    pub discovery_interval_ms: u64,
    /// Quiet period that closes a probe's listen window
    pub receive_timeout_ms: u64,
    /// Granularity of stop checks while workers idle
    pub tick_ms: u64,
    pub dispatch_interval_ms: u64,
    /// Requests sent per dispatch cycle at most
    pub batch_cap: usize,
    pub request_timeout_ms: u64,
    pub urn_format: UrnFormat,
    /// Repeat (sniffer, beacon) events inside this window are dropped; 0 disables
    pub duplicate_window_secs: u64,
    /// Registry and credentials location; platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            events_path: DEFAULT_EVENTS_PATH.to_string(),
            bind_addr: DEFAULT_BIND_ADDR,
            multicast_group: MULTICAST_GROUP,
            search_target: DEFAULT_SEARCH_TARGET.to_string(),
            discovery_interval_ms: 5_000,
            receive_timeout_ms: 3_000,
            tick_ms: 1_000,
            dispatch_interval_ms: 5_000,
            batch_cap: BATCH_CAP,
            request_timeout_ms: 30_000,
            urn_format: UrnFormat::Verbatim,
            duplicate_window_secs: 300,
            data_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Read the config at `path`, falling back to defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.server_url).map_err(|e| ConfigError::InvalidValue {
            field: "server_url",
            message: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "server_url",
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let positive = [
            ("discovery_interval_ms", self.discovery_interval_ms),
            ("receive_timeout_ms", self.receive_timeout_ms),
            ("tick_ms", self.tick_ms),
            ("dispatch_interval_ms", self.dispatch_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("batch_cap", self.batch_cap as u64),
        ];

        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Full URL events are posted to.
    pub fn events_url(&self) -> String {
        join_url(&self.server_url, &self.events_path)
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            bind_addr: self.bind_addr,
            group: self.multicast_group,
            search_target: self.search_target.clone(),
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
        }
    }

    pub fn discovery_schedule(&self) -> Schedule {
        Schedule::new(
            Duration::from_millis(self.discovery_interval_ms),
            Duration::from_millis(self.tick_ms),
        )
    }

    pub fn dispatch_schedule(&self) -> Schedule {
        Schedule::new(
            Duration::from_millis(self.dispatch_interval_ms),
            Duration::from_millis(self.tick_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::from_secs(self.duplicate_window_secs)
    }

    /// Configured data directory, or the platform default.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir().ok_or(ConfigError::NoDataDir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.bind_addr, SocketAddrV4::new(Ipv4Addr::new(192, 168, 4, 1), 1900));
        assert_eq!(
            config.multicast_group,
            SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900)
        );
        assert_eq!(config.events_url(), "https://pawpharos.com/api/events/");
        assert_eq!(config.batch_cap, 10);
        assert_eq!(
            config.discovery_schedule(),
            Schedule::new(Duration::from_secs(5), Duration::from_secs(1))
        );
        assert_eq!(
            config.duplicate_policy(),
            DuplicatePolicy::Window(Duration::from_secs(300))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GatewayConfig::load(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            concat!(
                r#"{"server_url": "http://10.0.0.1:8000", "#,
                r#""batch_cap": 3, "urn_format": "strip_prefix"}"#,
            ),
        )
        .unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.batch_cap, 3);
        assert_eq!(config.urn_format, UrnFormat::StripPrefix);
        assert_eq!(config.events_url(), "http://10.0.0.1:8000/api/events/");
        assert_eq!(config.dispatch_interval_ms, 5_000);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE);
        let config = GatewayConfig {
            duplicate_window_secs: 0,
            data_dir: Some(tmp.path().to_path_buf()),
            ..GatewayConfig::default()
        };

        config.save(&path).unwrap();
        let loaded = GatewayConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.duplicate_policy(), DuplicatePolicy::Disabled);
        assert_eq!(loaded.resolve_data_dir().unwrap(), tmp.path());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GatewayConfig {
            server_url: "not a url".to_string(),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "server_url", .. })
        ));

        let config = GatewayConfig {
            server_url: "ftp://example.com".to_string(),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GatewayConfig {
            tick_ms: 0,
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "tick_ms", .. })
        ));

        let config = GatewayConfig {
            batch_cap: 0,
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ nope").unwrap();

        assert!(matches!(
            GatewayConfig::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
