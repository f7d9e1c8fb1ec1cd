//! Broadcast hub for live viewer connections
//!
//! The hub owns the producer side of every subscriber's outbound queue.
//! Connections only ever see their own receiver and their id, and go
//! through [`Hub::unregister`] to leave.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Default outbound queue length per subscriber
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Identifies one registered subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Consumer side of a registration, handed to the connection task
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Bytes>,
}

/// Registry of live subscribers with non-blocking fan-out
#[derive(Debug)]
pub struct Hub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Bytes>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Hub {
    /// Create an empty hub. Each subscriber gets a queue of
    /// `queue_capacity` messages; a zero capacity is raised to one.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new subscriber and return its outbound queue
    pub fn register(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.insert(id, tx);
        info!("Subscriber {} registered", id);
        Subscription { id, rx }
    }

    /// Add a queue under `id`. A second insert for the same id keeps the
    /// existing queue.
    fn insert(&self, id: SubscriberId, tx: mpsc::Sender<Bytes>) -> bool {
        let mut subscribers = self.subscribers.write();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, tx);
        true
    }

    /// Remove a subscriber. No-op if it is not registered.
    ///
    /// Dropping the hub's sender closes the subscriber's queue once it is
    /// drained.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().remove(&id).is_some();
        if removed {
            info!("Subscriber {} unregistered", id);
        }
        removed
    }

    /// Deliver `payload` to every subscriber registered at call time.
    ///
    /// Never waits on a subscriber: a full queue drops the message for that
    /// subscriber and evicts it. Returns the number of queues the payload
    /// was placed on.
    pub fn broadcast(&self, payload: Bytes) -> usize {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<Bytes>)> = {
            let subscribers = self.subscribers.read();
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut stale = Vec::new();

        for (id, tx) in snapshot {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {} cannot keep up, evicting", id);
                    stale.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Subscriber {} queue closed, evicting", id);
                    stale.push(id);
                }
            }
        }

        for id in stale {
            self.unregister(id);
        }

        delivered
    }

    /// Number of live subscribers
    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }
}
