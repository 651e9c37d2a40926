//! Sniffer discovery engine.
//!
//! A prober multicasts search requests and queues raw replies; a single
//! handler drains that queue, parses each reply and upserts the device
//! registry. The two halves only share the unbounded response queue.

pub mod handler;
pub mod protocol;
pub mod service;

pub use handler::{upsert_device, ResponseHandler, UpsertOutcome};
pub use protocol::{build_search_probe, parse_headers, UrnFormat};
pub use service::{response_queue, ProbeOptions, Prober, ResponseReceiver, ResponseSender};
