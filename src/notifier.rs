//! Receive notification: fan one packet out to every subscriber.
//!
//! Subscribers are either callbacks or channel receivers. Delivery happens on
//! the reader thread, so callbacks must do their own synchronization before
//! touching shared state. Nothing is buffered here: a packet that arrives
//! while nobody is subscribed is dropped.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::domain::ReceivedPacket;

/// Callback invoked once per received packet
pub type PacketCallback = Box<dyn FnMut(&ReceivedPacket) + Send + 'static>;

/// Token returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Callback(PacketCallback),
    Channel(Sender<ReceivedPacket>),
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl Registry {
    fn insert(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }
}

/// Shared subscriber registry. Clones refer to the same registry.
///
/// Callbacks run while the registry is locked: a callback must not subscribe
/// or unsubscribe through the same notifier.
#[derive(Clone, Default)]
pub struct ReceiveNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ReceiveNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ReceivedPacket) + Send + 'static,
    {
        self.lock().insert(Subscriber::Callback(Box::new(callback)))
    }

    /// Register an unbounded channel and return its receiving end.
    /// Dropping the receiver unsubscribes on the next delivery.
    pub fn subscribe_channel(&self) -> Receiver<ReceivedPacket> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock().insert(Subscriber::Channel(tx));
        rx
    }

    /// Returns false if the id was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(sid, _)| *sid != id);
        registry.subscribers.len() != before
    }

    pub fn clear(&self) {
        self.lock().subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver one packet to every subscriber, in registration order.
    /// Returns how many subscribers received it.
    ///
    /// A callback that panics is removed; the remaining subscribers still
    /// get the packet.
    pub fn notify(&self, packet: ReceivedPacket) -> usize {
        let mut registry = self.lock();
        let mut delivered = 0;
        registry.subscribers.retain_mut(|(id, subscriber)| match subscriber {
            Subscriber::Callback(callback) => {
                match panic::catch_unwind(AssertUnwindSafe(|| callback(&packet))) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(_) => {
                        log::error!("Packet callback {id:?} panicked, unsubscribing it");
                        false
                    }
                }
            }
            Subscriber::Channel(tx) => match tx.send(packet.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    log::debug!("Dropping channel subscriber with no receiver");
                    false
                }
            },
        });
        delivered
    }
}
