//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use sniffer_gateway_core::delivery::BatchReport;
use sniffer_gateway_core::{Acceptance, Credentials, Device};

use crate::commands::discover::DiscoveredSniffer;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the registered device list
    fn format_devices(&self, devices: &[Device]) -> String;

    /// Format a single device after `action` was applied to it
    fn format_device(&self, device: &Device, action: &str) -> String;

    /// Format the replies of one discovery probe
    fn format_discovery(&self, sniffers: &[DiscoveredSniffer]) -> String;

    /// Format stored credentials
    fn format_credentials(&self, credentials: &Credentials, reveal: bool) -> String;

    /// Format the result of submitting one event
    fn format_event(&self, acceptance: Acceptance, report: Option<&BatchReport>) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}

pub(crate) fn acceptance_str(acceptance: Acceptance) -> &'static str {
    match acceptance {
        Acceptance::Queued => "queued",
        Acceptance::Duplicate => "duplicate",
        Acceptance::UnknownSniffer => "unknown_sniffer",
        Acceptance::InactiveSniffer => "inactive_sniffer",
    }
}

/// Keep the first and last four characters of a token.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abc"), "***");
        assert_eq!(mask_token("0123456789abcdef"), "0123...cdef");
    }
}
