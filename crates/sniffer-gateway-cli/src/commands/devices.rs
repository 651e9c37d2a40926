//! Device registry commands.

use sniffer_gateway_core::registry::{set_active, set_location};
use sniffer_gateway_core::DeviceRegistry;

use super::Context;
use crate::cli::{DevicesArgs, DevicesCommands};
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the devices command
pub async fn run_devices(args: DevicesArgs, ctx: &Context, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let registry = ctx.open_registry().await?;

    let output = match args.command {
        DevicesCommands::List => {
            let devices = registry.list().await?;
            formatter.format_devices(&devices)
        }
        DevicesCommands::Activate(arg) => {
            let device = set_active(&registry, &arg.serial, true).await?;
            formatter.format_device(&device, "Activated")
        }
        DevicesCommands::Deactivate(arg) => {
            let device = set_active(&registry, &arg.serial, false).await?;
            formatter.format_device(&device, "Deactivated")
        }
        DevicesCommands::Locate(args) => {
            let device = set_location(&registry, &args.serial, &args.location).await?;
            formatter.format_device(&device, "Located")
        }
    };

    println!("{}", output);
    Ok(())
}
