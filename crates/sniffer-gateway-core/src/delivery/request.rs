//! Outbound event-forwarding requests.

use reqwest::Method;

use crate::types::TrackingEvent;

/// Default path of the event collection on the aggregation server
pub const DEFAULT_EVENTS_PATH: &str = "api/events/";

/// One pending forward of a tracking event.
///
/// Authorization is not part of the request; the dispatcher adds the
/// current token when it sends, so queued requests survive a token
/// rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRequest {
    pub method: Method,
    pub target_url: String,
    pub payload: TrackingEvent,
    pub headers: Vec<(String, String)>,
}

impl DeliveryRequest {
    /// `POST` of `event` to the events collection of `server_url`.
    pub fn post_event(server_url: &str, events_path: &str, event: TrackingEvent) -> Self {
        Self {
            method: Method::POST,
            target_url: join_url(server_url, events_path),
            payload: event,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}
