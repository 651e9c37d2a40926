//! CLI argument definitions using clap.

use std::net::SocketAddrV4;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

/// Sniffer gateway - discovers beacon sniffers and forwards their sightings
#[derive(Parser, Debug)]
#[command(name = "sniffer-gateway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gateway config file (default: <data-dir>/gateway.json)
    #[arg(long, global = true, env = "SNIFFER_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the device registry and credentials
    #[arg(long, global = true, env = "SNIFFER_GATEWAY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run discovery and delivery until interrupted
    Run(RunArgs),

    /// Probe for sniffers once and print the replies
    Discover(DiscoverArgs),

    /// Registered sniffer management
    Devices(DevicesArgs),

    /// Access token management
    Token(TokenArgs),

    /// Submit one tracking event and deliver it
    Event(EventArgs),
}

// ==================== Run ====================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds to wait for queued deliveries on shutdown (0 to skip)
    #[arg(long, default_value = "10")]
    pub drain_timeout: u64,

    /// Seconds between credential file reloads
    #[arg(long, default_value = "30")]
    pub reload_interval: u64,
}

// ==================== Discover ====================

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Local address to send the probe from
    #[arg(long)]
    pub bind: Option<SocketAddrV4>,

    /// Quiet period in milliseconds that ends the listen window
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also apply the replies to the device registry
    #[arg(long)]
    pub register: bool,
}

// ==================== Devices ====================

#[derive(Args, Debug)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommands,
}

#[derive(Subcommand, Debug)]
pub enum DevicesCommands {
    /// List registered sniffers
    List,

    /// Start forwarding events from a sniffer
    Activate(SerialArg),

    /// Stop forwarding events from a sniffer
    Deactivate(SerialArg),

    /// Set the location label of a sniffer
    Locate(LocateArgs),
}

#[derive(Args, Debug)]
pub struct SerialArg {
    /// Sniffer serial number
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Sniffer serial number
    pub serial: String,

    /// Free-text location
    pub location: String,
}

// ==================== Token ====================

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommands,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Show the configured account
    Show(TokenShowArgs),

    /// Store a new access token
    Set(TokenSetArgs),
}

#[derive(Args, Debug)]
pub struct TokenShowArgs {
    /// Print the token in full instead of masked
    #[arg(long)]
    pub reveal: bool,
}

#[derive(Args, Debug)]
pub struct TokenSetArgs {
    /// Access token issued by the aggregation server
    pub token: String,

    /// Account name the token belongs to
    #[arg(short, long)]
    pub username: Option<String>,
}

// ==================== Event ====================

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Serial of the reporting sniffer
    #[arg(long)]
    pub sniffer: String,

    /// Beacon address
    #[arg(long)]
    pub beacon: String,

    /// Signal strength in dBm
    #[arg(long, allow_hyphen_values = true)]
    pub rssi: i32,

    /// Sighting time as RFC 3339 (default: now)
    #[arg(long)]
    pub time: Option<DateTime<Utc>>,
}
