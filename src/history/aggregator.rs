use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::models::OwnerId;
use crate::store::{FeedEvent, HistoryStore, Subscription, SubscriptionId};

use crate::{log_debug, log_warn};

use super::view::HistoryView;

const ENABLE_LOGS: bool = true;

/// Keeps a sorted [`HistoryView`] of one owner's entries in step with the
/// store's live feed.
pub struct HistoryAggregator<P: HistoryStore> {
    store: Arc<P>,
    owner: OwnerId,
    subscription_id: SubscriptionId,
    view: watch::Receiver<HistoryView>,
    error: watch::Receiver<Option<StoreError>>,
    task: JoinHandle<()>,
}

impl<P: HistoryStore> HistoryAggregator<P> {
    pub async fn attach(store: Arc<P>, owner: OwnerId) -> Result<Self, StoreError> {
        let Subscription { id, events } = store.subscribe(&owner).await?;

        let (view_tx, view) = watch::channel(HistoryView::default());
        let (error_tx, error) = watch::channel(None);
        let task = tokio::spawn(feed_loop(owner.clone(), events, view_tx, error_tx));

        Ok(Self {
            store,
            owner,
            subscription_id: id,
            view,
            error,
            task,
        })
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn current(&self) -> HistoryView {
        self.view.borrow().clone()
    }

    /// Receiver that observes every rebuilt view.
    pub fn watch(&self) -> watch::Receiver<HistoryView> {
        self.view.clone()
    }

    /// Most recent feed failure, cleared by the next good snapshot.
    pub fn last_error(&self) -> Option<StoreError> {
        self.error.borrow().clone()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<StoreError>> {
        self.error.clone()
    }

    /// Stops following the feed. Dropping the aggregator does the same.
    pub fn detach(self) {
        drop(self);
    }
}

impl<P: HistoryStore> Drop for HistoryAggregator<P> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription_id);
        self.task.abort();
    }
}

async fn feed_loop(
    owner: OwnerId,
    mut events: mpsc::UnboundedReceiver<FeedEvent>,
    view_tx: watch::Sender<HistoryView>,
    error_tx: watch::Sender<Option<StoreError>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            FeedEvent::Snapshot(entries) => {
                let view = HistoryView::build(entries, Utc::now());
                log_debug!("history for {owner} rebuilt with {} entries", view.len());
                error_tx.send_if_modified(|current| current.take().is_some());
                view_tx.send_replace(view);
            }
            FeedEvent::Error(err) => {
                log_warn!("history feed for {owner} failed, keeping last view: {err}");
                error_tx.send_replace(Some(err));
            }
        }
    }
    log_debug!("history feed for {owner} closed");
}

/// One-shot read for callers without a live aggregator: subscribe, take the
/// initial snapshot, unsubscribe.
pub async fn fetch_snapshot<P: HistoryStore>(
    store: &P,
    owner: &OwnerId,
) -> Result<HistoryView, StoreError> {
    let Subscription { id, mut events } = store.subscribe(owner).await?;
    let first = events.recv().await;
    store.unsubscribe(id);

    match first {
        Some(FeedEvent::Snapshot(entries)) => Ok(HistoryView::build(entries, Utc::now())),
        Some(FeedEvent::Error(err)) => Err(err),
        None => Err(StoreError::Subscription(
            "feed closed before the first snapshot".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityKind, HistoryEntryDraft};
    use crate::store::MemoryStore;

    fn draft(kind: ActivityKind, score: f64) -> HistoryEntryDraft {
        HistoryEntryDraft::new(kind, score, 45, "entry")
    }

    #[tokio::test]
    async fn follows_appends() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::new("owner").unwrap();
        store
            .append(&owner, draft(ActivityKind::EyeStrain, 2.0))
            .await
            .unwrap();

        let aggregator = HistoryAggregator::attach(store.clone(), owner.clone())
            .await
            .unwrap();
        let mut view = aggregator.watch();
        view.wait_for(|view| view.len() == 1).await.unwrap();

        store
            .append(&owner, draft(ActivityKind::VoiceFatigue, 4.2))
            .await
            .unwrap();
        view.wait_for(|view| view.len() == 2).await.unwrap();
        assert_eq!(aggregator.current().len(), 2);
        aggregator.detach();
    }

    #[tokio::test]
    async fn feed_errors_keep_last_view() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::new("owner").unwrap();
        store
            .append(&owner, draft(ActivityKind::EyeStrain, 3.0))
            .await
            .unwrap();

        let aggregator = HistoryAggregator::attach(store.clone(), owner.clone())
            .await
            .unwrap();
        aggregator.watch().wait_for(|view| view.len() == 1).await.unwrap();

        store.fail_feed(&owner, "connection reset");
        aggregator
            .watch_errors()
            .wait_for(|error| error.is_some())
            .await
            .unwrap();
        assert_eq!(
            aggregator.last_error(),
            Some(StoreError::Subscription("connection reset".into()))
        );
        assert_eq!(aggregator.current().len(), 1);

        store
            .append(&owner, draft(ActivityKind::EyeStrain, 1.0))
            .await
            .unwrap();
        aggregator.watch().wait_for(|view| view.len() == 2).await.unwrap();
        assert!(aggregator.last_error().is_none());
    }

    #[tokio::test]
    async fn resorts_when_pending_timestamps_resolve() {
        let store = Arc::new(MemoryStore::with_deferred_timestamps());
        let owner = OwnerId::new("owner").unwrap();
        let aggregator = HistoryAggregator::attach(store.clone(), owner.clone())
            .await
            .unwrap();

        store
            .append(&owner, draft(ActivityKind::EyeStrain, 2.0))
            .await
            .unwrap();
        let mut view = aggregator.watch();
        view.wait_for(|view| view.len() == 1).await.unwrap();
        assert!(aggregator.current().rows()[0].pending);

        let resolved_at = Utc::now() - chrono::Duration::hours(1);
        store.resolve_pending(resolved_at);
        view.wait_for(|view| view.rows().first().is_some_and(|row| !row.pending))
            .await
            .unwrap();
        assert_eq!(aggregator.current().rows()[0].created_at, resolved_at);
    }

    #[tokio::test]
    async fn dropping_unsubscribes() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::new("owner").unwrap();

        for _ in 0..3 {
            let aggregator = HistoryAggregator::attach(store.clone(), owner.clone())
                .await
                .unwrap();
            aggregator.watch().wait_for(|view| view.is_empty()).await.unwrap();
            assert_eq!(store.listener_count(&owner), 1);
        }
        assert_eq!(store.listener_count(&owner), 0);

        let kept = HistoryAggregator::attach(store.clone(), owner.clone())
            .await
            .unwrap();
        kept.detach();
        assert_eq!(store.listener_count(&owner), 0);
    }

    #[tokio::test]
    async fn fetch_snapshot_reads_once() {
        let store = MemoryStore::new();
        let owner = OwnerId::new("owner").unwrap();
        store
            .append(&owner, draft(ActivityKind::VoiceFatigue, 1.5))
            .await
            .unwrap();

        let view = fetch_snapshot(&store, &owner).await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(store.listener_count(&owner), 0);
    }
}
