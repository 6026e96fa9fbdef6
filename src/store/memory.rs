use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{EntryId, HistoryEntry, HistoryEntryDraft, OwnerId};

use super::{FeedEvent, FeedHub, HistoryStore, Subscription, SubscriptionId};

/// In-process store. With deferred timestamps it behaves like a remote
/// document store whose server clock resolves after the write is visible:
/// entries appear with `created_at: None` until [`MemoryStore::resolve_pending`].
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    feeds: FeedHub,
    deferred_timestamps: bool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deferred_timestamps() -> Self {
        Self {
            deferred_timestamps: true,
            ..Self::default()
        }
    }

    /// While set, every append fails with a write error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn entries(&self, owner: &OwnerId) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| &entry.owner_id == owner)
            .cloned()
            .collect()
    }

    /// Inserts a fully formed entry, as if written by another client.
    pub fn insert(&self, entry: HistoryEntry) {
        let owner = entry.owner_id.clone();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        self.publish_snapshot(&owner);
    }

    /// Assigns `at` to every pending timestamp, notifies the affected owners and
    /// returns how many entries were resolved.
    pub fn resolve_pending(&self, at: DateTime<Utc>) -> usize {
        let mut owners = Vec::new();
        let mut resolved = 0;
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            for entry in entries.iter_mut().filter(|entry| entry.created_at.is_none()) {
                entry.created_at = Some(at);
                resolved += 1;
                if !owners.contains(&entry.owner_id) {
                    owners.push(entry.owner_id.clone());
                }
            }
        }
        for owner in &owners {
            self.publish_snapshot(owner);
        }
        resolved
    }

    /// Live subscriptions for `owner`.
    pub fn listener_count(&self, owner: &OwnerId) -> usize {
        self.feeds.listener_count(owner)
    }

    /// Pushes a feed failure to the owner's subscribers.
    pub fn fail_feed(&self, owner: &OwnerId, reason: impl Into<String>) {
        self.feeds.publish(
            owner,
            FeedEvent::Error(StoreError::Subscription(reason.into())),
        );
    }

    fn publish_snapshot(&self, owner: &OwnerId) {
        if self.feeds.has_listeners(owner) {
            self.feeds
                .publish(owner, FeedEvent::Snapshot(self.entries(owner)));
        }
    }
}

impl HistoryStore for MemoryStore {
    async fn append(&self, owner: &OwnerId, draft: HistoryEntryDraft) -> Result<EntryId, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("store rejected the write".into()));
        }

        let id = Uuid::new_v4().to_string();
        let created_at = (!self.deferred_timestamps).then(Utc::now);
        self.insert(HistoryEntry::from_draft(
            id.clone(),
            owner.clone(),
            draft,
            created_at,
        ));
        Ok(id)
    }

    async fn subscribe(&self, owner: &OwnerId) -> Result<Subscription, StoreError> {
        let subscription = self.feeds.register(owner);
        self.feeds
            .send_to(subscription.id, FeedEvent::Snapshot(self.entries(owner)));
        Ok(subscription)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.feeds.remove(id);
    }
}
