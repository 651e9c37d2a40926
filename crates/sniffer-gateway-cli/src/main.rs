//! Sniffer gateway - discovers beacon sniffers on the local segment and
//! forwards their tracking events to the aggregation server.
//!
//! `run` is the long-lived daemon; the other subcommands manage the device
//! registry and credentials it uses.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};
use commands::Context;
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    initialize_logging(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn initialize_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::load(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Run(args) => commands::run_gateway(args, &ctx).await,
        Commands::Discover(args) => commands::run_discover(args, &ctx, cli.json).await,
        Commands::Devices(args) => commands::run_devices(args, &ctx, cli.json).await,
        Commands::Token(args) => commands::run_token(args, &ctx, cli.json),
        Commands::Event(args) => commands::run_event(args, &ctx, cli.json).await,
    }
}
