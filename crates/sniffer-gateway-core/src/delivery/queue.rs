//! Pending delivery queue.
//!
//! Unbounded FIFO shared by every producer and the single dispatcher.
//! Producers never block. Each popped request must be acknowledged with
//! [`DeliveryQueue::task_done`] once its send attempt is over, which lets a
//! caller [`join`](DeliveryQueue::join) until everything queued so far has
//! been handled.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::warn;

use super::request::DeliveryRequest;

#[derive(Debug)]
pub struct DeliveryQueue {
    items: Mutex<VecDeque<DeliveryRequest>>,
    unfinished: watch::Sender<usize>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            unfinished,
        }
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<DeliveryRequest>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, request: DeliveryRequest) {
        let mut items = self.items();
        items.push_back(request);
        // Counted under the lock so a pop can never be acknowledged first.
        self.unfinished.send_modify(|n| *n += 1);
    }

    /// Oldest pending request, without waiting.
    pub fn try_pop(&self) -> Option<DeliveryRequest> {
        self.items().pop_front()
    }

    /// Mark one popped request as handled.
    pub fn task_done(&self) {
        let mut underflow = false;
        self.unfinished.send_modify(|n| match n.checked_sub(1) {
            Some(next) => *n = next,
            None => underflow = true,
        });

        if underflow {
            warn!("task_done called more times than requests were queued");
        }
    }

    /// Requests still waiting to be popped.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Requests queued but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Wait until every queued request has been acknowledged.
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The sender lives in `self`, so the channel can't close under us.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}
