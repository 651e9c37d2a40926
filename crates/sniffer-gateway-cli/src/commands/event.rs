//! Event command implementation.
//!
//! Pushes one event through the same intake and dispatcher the daemon uses,
//! then drains a single batch so the result is visible immediately.

use std::sync::Arc;

use chrono::Utc;

use sniffer_gateway_core::delivery::{DeliveryQueue, Dispatcher, HttpTransport};
use sniffer_gateway_core::{Acceptance, EventIntake, TrackingEvent};

use super::Context;
use crate::cli::EventArgs;
use crate::error::CliError;
use crate::output::{acceptance_str, get_formatter};

/// Run the event command
pub async fn run_event(args: EventArgs, ctx: &Context, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    let registry = Arc::new(ctx.open_registry().await?);
    let credentials = Arc::new(ctx.open_credentials()?);
    let queue = Arc::new(DeliveryQueue::new());

    let intake = EventIntake::new(
        registry,
        queue.clone(),
        ctx.config.events_url(),
        ctx.config.duplicate_policy(),
    );

    let event = TrackingEvent {
        sniffer_serial: args.sniffer,
        beacon_addr: args.beacon,
        event_time: args.time.unwrap_or_else(Utc::now),
        rssi: args.rssi,
    };

    let acceptance = intake.accept(event).await?;
    if acceptance != Acceptance::Queued {
        println!("{}", formatter.format_event(acceptance, None));
        return Err(CliError::EventNotQueued(acceptance_str(acceptance).to_string()));
    }

    let dispatcher = Dispatcher::new(
        queue,
        HttpTransport::new(ctx.config.request_timeout()),
        credentials,
    )
    .with_batch_cap(ctx.config.batch_cap);

    let report = dispatcher.drain_batch().await?;
    println!("{}", formatter.format_event(acceptance, Some(&report)));

    if report.failed > 0 {
        return Err(CliError::DeliveryFailed(report.failed));
    }

    Ok(())
}
