//! Periodic background worker scaffolding.
//!
//! The prober and the dispatcher share the same shape: run one cycle, then
//! sleep for a fixed interval in short ticks so a stop request is observed
//! within one tick. In-flight cycles are never interrupted.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Interval between cycles and the granularity of stop checks while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub tick: Duration,
}

impl Schedule {
    pub fn new(interval: Duration, tick: Duration) -> Self {
        Self { interval, tick }
    }
}

/// Sleep for `schedule.interval`, split into `schedule.tick` steps.
///
/// Returns `false` as soon as `cancel` fires, `true` when the full interval
/// elapsed.
pub async fn sleep_in_ticks(schedule: Schedule, cancel: &CancellationToken) -> bool {
    let mut remaining = schedule.interval;

    while !remaining.is_zero() {
        let step = if schedule.tick.is_zero() {
            remaining
        } else {
            remaining.min(schedule.tick)
        };

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = sleep(step) => {}
        }

        remaining = remaining.saturating_sub(step);
    }

    !cancel.is_cancelled()
}

/// Run `cycle` until `cancel` fires, idling `schedule.interval` between runs.
///
/// A panicking cycle is logged and the loop moves on to the next one.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    schedule: Schedule,
    cancel: CancellationToken,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(worker = name, interval = ?schedule.interval, "worker started");

    while !cancel.is_cancelled() {
        if let Err(payload) = AssertUnwindSafe(cycle()).catch_unwind().await {
            error!(worker = name, "cycle panicked: {}", panic_message(payload.as_ref()));
        }

        if !sleep_in_ticks(schedule, &cancel).await {
            break;
        }
    }

    info!(worker = name, "worker stopped");
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
