//! Persistence boundary: an append-only per-owner entry set with a live feed.

mod feed;
mod memory;
pub mod sqlite;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::{EntryId, HistoryEntry, HistoryEntryDraft, OwnerId};

pub(crate) use feed::FeedHub;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type SubscriptionId = u64;

/// Pushed to subscribers: the full current entry set, or a feed failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Snapshot(Vec<HistoryEntry>),
    Error(StoreError),
}

/// A live feed of one owner's entries. The first event is the initial
/// snapshot.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<FeedEvent>,
}

pub trait HistoryStore: Send + Sync + 'static {
    /// Stores a finalized session and returns the id the store assigned.
    fn append(
        &self,
        owner: &OwnerId,
        draft: HistoryEntryDraft,
    ) -> impl Future<Output = Result<EntryId, StoreError>> + Send;

    fn subscribe(
        &self,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;

    /// Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
