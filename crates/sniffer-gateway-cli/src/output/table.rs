//! Table-formatted output for CLI.

use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use sniffer_gateway_core::delivery::BatchReport;
use sniffer_gateway_core::{Acceptance, Credentials, Device};

use super::{acceptance_str, mask_token, OutputFormatter};
use crate::commands::discover::DiscoveredSniffer;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn active_cell(active: bool) -> Cell {
        if active {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_devices(&self, devices: &[Device]) -> String {
        if devices.is_empty() {
            return "No sniffers registered.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Serial", "Address", "Location", "Active"]);

        for device in devices {
            table.add_row(vec![
                Cell::new(&device.serial_num),
                Cell::new(device.address.to_string()),
                Cell::new(&device.location),
                Self::active_cell(device.active),
            ]);
        }

        let active = devices.iter().filter(|d| d.active).count();
        format!(
            "{}\n\n{} sniffer(s), {} active",
            table,
            devices.len(),
            active
        )
    }

    fn format_device(&self, device: &Device, action: &str) -> String {
        let state = if device.active {
            "active".green()
        } else {
            "inactive".dimmed()
        };

        let mut lines = vec![format!("{} {}", action.bold(), device.serial_num)];
        lines.push(format!("  Address:   {}", device.address));
        if !device.location.is_empty() {
            lines.push(format!("  Location:  {}", device.location));
        }
        lines.push(format!("  State:     {}", state));

        lines.join("\n")
    }

    fn format_discovery(&self, sniffers: &[DiscoveredSniffer]) -> String {
        if sniffers.is_empty() {
            return "No sniffers answered.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Source", "Serial", "Location", "Headers", "Registry"]);

        for sniffer in sniffers {
            let serial = match &sniffer.serial {
                Some(serial) => Cell::new(serial),
                None => Cell::new("(no URN)").fg(Color::Yellow),
            };

            table.add_row(vec![
                Cell::new(sniffer.source.to_string()),
                serial,
                Cell::new(sniffer.location.as_deref().unwrap_or("")),
                Cell::new(sniffer.headers.len().to_string()),
                Cell::new(sniffer.registry.as_deref().unwrap_or("-")),
            ]);
        }

        format!("{}\n\n{} response(s)", table, sniffers.len())
    }

    fn format_credentials(&self, credentials: &Credentials, reveal: bool) -> String {
        let username = credentials.username.as_deref().unwrap_or("(none)");
        let token = match credentials.access_token.as_deref() {
            Some(t) if !t.is_empty() => {
                if reveal {
                    t.to_string()
                } else {
                    mask_token(t)
                }
            }
            _ => "(not set)".yellow().to_string(),
        };

        format!("Username:  {}\nToken:     {}", username, token)
    }

    fn format_event(&self, acceptance: Acceptance, report: Option<&BatchReport>) -> String {
        let outcome = match acceptance {
            Acceptance::Queued => acceptance_str(acceptance).green(),
            _ => acceptance_str(acceptance).yellow(),
        };

        let mut lines = vec![format!("Event {}", outcome)];
        if let Some(report) = report {
            let delivered = if report.failed == 0 {
                format!("{} sent", report.sent).green()
            } else {
                format!("{} sent, {} failed", report.sent, report.failed).red()
            };
            lines.push(format!("Delivery: {}", delivered));
        }

        lines.join("\n")
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}
