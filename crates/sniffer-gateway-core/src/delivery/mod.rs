//! Outbound delivery engine.
//!
//! Event intake pushes [`DeliveryRequest`]s onto a shared [`DeliveryQueue`];
//! the [`Dispatcher`] drains it in capped batches over a [`DeliveryTransport`].

pub mod dispatcher;
pub mod queue;
pub mod request;
pub mod transport;

pub use dispatcher::{BatchReport, Dispatcher, BATCH_CAP, DISPATCH_INTERVAL};
pub use queue::DeliveryQueue;
pub use request::{join_url, DeliveryRequest, DEFAULT_EVENTS_PATH};
pub use transport::{DeliverySession, DeliveryTransport, HttpSession, HttpTransport};
