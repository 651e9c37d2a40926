//! JSON-formatted output for CLI.

use serde::Serialize;
use serde_json::json;

use sniffer_gateway_core::delivery::BatchReport;
use sniffer_gateway_core::{Acceptance, Credentials, Device};

use super::{acceptance_str, mask_token, OutputFormatter};
use crate::commands::discover::DiscoveredSniffer;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_devices(&self, devices: &[Device]) -> String {
        let output = json!({
            "devices": devices,
            "count": devices.len()
        });
        Self::to_json(&output)
    }

    fn format_device(&self, device: &Device, action: &str) -> String {
        Self::to_json(&json!({
            "action": action,
            "device": device
        }))
    }

    fn format_discovery(&self, sniffers: &[DiscoveredSniffer]) -> String {
        Self::to_json(&json!({
            "responses": sniffers,
            "count": sniffers.len()
        }))
    }

    fn format_credentials(&self, credentials: &Credentials, reveal: bool) -> String {
        let token = credentials
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| if reveal { t.to_string() } else { mask_token(t) });
        let configured = token.is_some();

        Self::to_json(&json!({
            "username": credentials.username,
            "access_token": token,
            "configured": configured
        }))
    }

    fn format_event(&self, acceptance: Acceptance, report: Option<&BatchReport>) -> String {
        Self::to_json(&json!({
            "outcome": acceptance_str(acceptance),
            "delivery": report.map(|r| json!({
                "sent": r.sent,
                "failed": r.failed
            }))
        }))
    }

    fn format_message(&self, message: &str) -> String {
        Self::to_json(&json!({ "message": message }))
    }
}
