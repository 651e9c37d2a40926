//! Discover command implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use sniffer_gateway_core::discovery::protocol::{LOCATION_HEADER, URN_HEADER};
use sniffer_gateway_core::discovery::{parse_headers, Prober, ResponseHandler, UpsertOutcome};
use sniffer_gateway_core::{DiscoveryResponse, ParsedHeaders};

use super::Context;
use crate::cli::DiscoverArgs;
use crate::error::CliError;
use crate::output::get_formatter;

/// One parsed probe reply, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredSniffer {
    pub source: SocketAddr,
    pub serial: Option<String>,
    pub location: Option<String>,
    pub headers: ParsedHeaders,
    /// What the registry did with the reply, with `--register`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

/// Run the discover command
pub async fn run_discover(args: DiscoverArgs, ctx: &Context, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    let mut options = ctx.config.probe_options();
    if let Some(bind) = args.bind {
        options.bind_addr = bind;
    }
    if let Some(ms) = args.timeout {
        if ms == 0 {
            return Err(CliError::InvalidArgument(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        options.receive_timeout = Duration::from_millis(ms);
    }

    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Probing {} from {}", options.group, options.bind_addr));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = Prober::probe_once(options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let responses = result?;

    let handler = if args.register {
        Some(ResponseHandler::new(
            Arc::new(ctx.open_registry().await?),
            ctx.config.urn_format,
        ))
    } else {
        None
    };

    let mut sniffers = Vec::with_capacity(responses.len());
    for response in responses {
        let mut sniffer = describe(&response, ctx);

        if let Some(handler) = &handler {
            let outcome = handler.handle_response(response).await?;
            sniffer.registry = Some(describe_outcome(outcome.as_ref()).to_string());
        }

        sniffers.push(sniffer);
    }

    println!("{}", formatter.format_discovery(&sniffers));

    if sniffers.is_empty() {
        return Err(CliError::NoDevicesFound);
    }

    Ok(())
}

fn describe(response: &DiscoveryResponse, ctx: &Context) -> DiscoveredSniffer {
    let headers = parse_headers(&String::from_utf8_lossy(&response.raw_bytes));

    DiscoveredSniffer {
        source: response.source_address,
        serial: headers
            .get(URN_HEADER)
            .and_then(|urn| ctx.config.urn_format.canonicalize(urn)),
        location: headers.get(LOCATION_HEADER).cloned(),
        headers,
        registry: None,
    }
}

fn describe_outcome(outcome: Option<&UpsertOutcome>) -> &'static str {
    match outcome {
        None => "dropped",
        Some(UpsertOutcome::Created(_)) => "created",
        Some(UpsertOutcome::AddressUpdated { .. }) => "address updated",
        Some(UpsertOutcome::Unchanged) => "unchanged",
        Some(UpsertOutcome::AddressClaimed { .. }) => "address claimed",
    }
}
