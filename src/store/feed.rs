use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::models::OwnerId;

use super::{FeedEvent, Subscription, SubscriptionId};

struct Subscriber {
    owner: OwnerId,
    sender: mpsc::UnboundedSender<FeedEvent>,
}

/// Fan-out of feed events to the subscribers of each owner.
#[derive(Default)]
pub(crate) struct FeedHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, owner: &OwnerId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, events) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscriber {
                    owner: owner.clone(),
                    sender,
                },
            );
        Subscription { id, events }
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn send_to(&self, id: SubscriptionId, event: FeedEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(subscriber) = subscribers.get(&id) {
            if subscriber.sender.send(event).is_err() {
                subscribers.remove(&id);
            }
        }
    }

    pub fn has_listeners(&self, owner: &OwnerId) -> bool {
        self.listener_count(owner) > 0
    }

    pub fn listener_count(&self, owner: &OwnerId) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|subscriber| &subscriber.owner == owner)
            .count()
    }

    /// Delivers to every subscriber of `owner`, dropping those whose
    /// receiver is gone.
    pub fn publish(&self, owner: &OwnerId, event: FeedEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|_, subscriber| {
            if &subscriber.owner != owner {
                return true;
            }
            subscriber.sender.send(event.clone()).is_ok()
        });
    }
}
