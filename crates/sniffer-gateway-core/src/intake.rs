//! Tracking event intake.
//!
//! Decides whether an incoming sighting is forwarded: the sniffer must be
//! registered and active, and the duplicate policy must let it through.
//! Accepted events become delivery requests on the shared queue; the caller
//! never sees the outcome of the eventual send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::delivery::{DeliveryQueue, DeliveryRequest};
use crate::error::EventError;
use crate::registry::DeviceRegistry;
use crate::types::TrackingEvent;

/// Default duplicate suppression window
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// How repeat sightings of the same beacon by the same sniffer are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Drop an event within this long of the last forwarded one for the pair
    Window(Duration),
    /// Forward everything
    Disabled,
}

impl DuplicatePolicy {
    /// `0` disables suppression.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            DuplicatePolicy::Disabled
        } else {
            DuplicatePolicy::Window(Duration::from_secs(secs))
        }
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Window(DUPLICATE_WINDOW)
    }
}

/// What happened to a submitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Queued,
    Duplicate,
    UnknownSniffer,
    InactiveSniffer,
}

type PairKey = (String, String);

/// Last forwarded time per (sniffer, beacon) pair.
#[derive(Debug, Default)]
struct SeenPairs {
    last: HashMap<PairKey, DateTime<Utc>>,
    /// Newest event time forwarded so far; pruning is relative to this
    newest: Option<DateTime<Utc>>,
}

pub struct EventIntake<R> {
    registry: Arc<R>,
    queue: Arc<DeliveryQueue>,
    events_url: String,
    policy: DuplicatePolicy,
    seen: Mutex<SeenPairs>,
}

impl<R: DeviceRegistry> EventIntake<R> {
    pub fn new(
        registry: Arc<R>,
        queue: Arc<DeliveryQueue>,
        events_url: impl Into<String>,
        policy: DuplicatePolicy,
    ) -> Self {
        Self {
            registry,
            queue,
            events_url: events_url.into(),
            policy,
            seen: Mutex::new(SeenPairs::default()),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Validate `event` and queue it for delivery if it passes.
    pub async fn accept(&self, event: TrackingEvent) -> Result<Acceptance, EventError> {
        if event.sniffer_serial.trim().is_empty() {
            return Err(EventError::MissingField("sniffer_serial"));
        }
        if event.beacon_addr.trim().is_empty() {
            return Err(EventError::MissingField("beacon_addr"));
        }

        let Some(sniffer) = self.registry.find_by_serial(&event.sniffer_serial).await? else {
            debug!(sniffer = %event.sniffer_serial, "event from unknown sniffer ignored");
            return Ok(Acceptance::UnknownSniffer);
        };

        if !sniffer.active {
            debug!(sniffer = %event.sniffer_serial, "event from inactive sniffer ignored");
            return Ok(Acceptance::InactiveSniffer);
        }

        if !self.claim_pair(&event) {
            debug!(
                sniffer = %event.sniffer_serial,
                beacon = %event.beacon_addr,
                "duplicate event suppressed"
            );
            return Ok(Acceptance::Duplicate);
        }

        self.queue
            .push(DeliveryRequest::post_event(&self.events_url, "", event));

        Ok(Acceptance::Queued)
    }

    /// Record `event` as forwarded unless the policy says it's a repeat.
    fn claim_pair(&self, event: &TrackingEvent) -> bool {
        let DuplicatePolicy::Window(window) = self.policy else {
            return true;
        };

        let within = |a: DateTime<Utc>, b: DateTime<Utc>| {
            (a - b)
                .abs()
                .to_std()
                .map(|gap| gap < window)
                .unwrap_or(false)
        };

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        let key = (event.sniffer_serial.clone(), event.beacon_addr.clone());
        if let Some(previous) = seen.last.get(&key) {
            if within(event.event_time, *previous) {
                return false;
            }
        }

        let newest = seen
            .newest
            .map_or(event.event_time, |newest| newest.max(event.event_time));
        seen.newest = Some(newest);
        seen.last.retain(|_, at| within(newest, *at));
        seen.last.insert(key, event.event_time);
        true
    }
}
