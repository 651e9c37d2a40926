//! Gateway daemon.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use sniffer_gateway_core::delivery::HttpTransport;
use sniffer_gateway_core::worker::{run_periodic, Schedule};
use sniffer_gateway_core::Gateway;

use super::Context;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Run the gateway until Ctrl+C
pub async fn run_gateway(args: RunArgs, ctx: &Context) -> Result<(), CliError> {
    let registry = Arc::new(ctx.open_registry().await?);
    let credentials = Arc::new(ctx.open_credentials()?);

    if credentials.token().is_none() {
        warn!("no access token configured, events will be sent unauthenticated");
    }

    info!(
        data_dir = %ctx.data_dir.display(),
        registry = %registry.path().display(),
        "starting gateway"
    );

    let handle = Gateway::start(
        &ctx.config,
        registry,
        HttpTransport::new(ctx.config.request_timeout()),
        credentials.clone(),
    );

    // Pick up `token set` from other processes while running.
    let reload = (args.reload_interval > 0).then(|| {
        let schedule = Schedule::new(
            Duration::from_secs(args.reload_interval),
            Duration::from_millis(ctx.config.tick_ms),
        );
        let credentials = credentials.clone();
        tokio::spawn(run_periodic(
            "credentials-reload",
            schedule,
            handle.cancellation_token(),
            move || {
                let credentials = credentials.clone();
                async move {
                    if let Err(e) = credentials.reload() {
                        warn!(error = %e, "failed to reload credentials");
                    }
                }
            },
        ))
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");

    let drain = (args.drain_timeout > 0).then(|| Duration::from_secs(args.drain_timeout));
    let drained = handle.shutdown(drain).await;

    if let Some(task) = reload {
        if let Err(e) = task.await {
            warn!(error = %e, "credentials reload task failed");
        }
    }

    if !drained {
        warn!("exiting with undelivered events");
    }

    Ok(())
}
