// src/broadcast/fanout.rs
//! Fan-out manager
//!
//! Delivers feed events to an arbitrary number of subscribers. Each
//! publish serializes the event exactly once and hands the shared frame
//! to every subscriber channel independently. Delivery is best-effort:
//! a full or closed channel is logged and skipped, and never blocks the
//! remaining subscribers. Subscribers are only removed explicitly.

use dashmap::DashMap;
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Per-subscriber channel depth before deliveries start being dropped
const SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = u64;

/// A feed event, framed as `{"type": ..., "data": ...}` on the wire
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    NewMessage(serde_json::Value),
    NewLike(serde_json::Value),
}

/// Handle returned by `subscribe`; dropping the receiver does not
/// unregister the subscriber.
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

/// Registry of live subscribers with best-effort delivery
pub struct FanoutManager {
    subscribers: DashMap<SubscriberId, mpsc::Sender<Arc<str>>>,
    next_id: AtomicU64,
}

impl FanoutManager {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber. Ids are assigned monotonically and
    /// never reused within a process.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.insert(id, sender);

        debug!(subscriber = id, "subscriber registered");
        gauge!("broadcast_active_subscribers").set(self.subscribers.len() as f64);
        Subscription { id, receiver }
    }

    /// Remove a subscriber. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, "subscriber removed");
        }
        gauge!("broadcast_active_subscribers").set(self.subscribers.len() as f64);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Publish an event to every live subscriber. Returns the number of
    /// successful deliveries; zero subscribers is a silent no-op.
    pub fn publish(&self, event: &Event) -> usize {
        let frame: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(error = %e, "event serialization failed, dropping publish");
                return 0;
            }
        };
        counter!("broadcast_events_total").increment(1);

        // Snapshot first so a subscriber registered mid-publish does not
        // observe a partial event stream.
        let targets: Vec<(SubscriberId, mpsc::Sender<Arc<str>>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in targets {
            match sender.try_send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = id, "subscriber channel full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(subscriber = id, "subscriber channel closed, dropping event");
                }
            }
        }
        delivered
    }
}

impl Default for FanoutManager {
    fn default() -> Self {
        Self::new()
    }
}
