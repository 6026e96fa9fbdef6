//! SQLite-backed history store. All statements run on one dedicated worker
//! thread; async callers hand it closures and await the reply.

mod helpers;
mod migrations;

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, Row};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{EntryId, HistoryEntry, HistoryEntryDraft, OwnerId};

use super::{FeedEvent, FeedHub, HistoryStore, Subscription, SubscriptionId};

use helpers::{parse_activity, parse_datetime, to_i64, to_u64};
use migrations::run_migrations;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn row_to_entry(row: &Row) -> Result<HistoryEntry> {
    let owner_id: String = row.get("owner_id")?;
    let activity_kind: String = row.get("activity_kind")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let created_at: String = row.get("created_at")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        owner_id: OwnerId::new(owner_id)?,
        activity_kind: parse_activity(&activity_kind)?,
        score: row.get("score")?,
        duration_seconds: to_u64(duration_secs, "duration_secs")?,
        message: row.get("message")?,
        created_at: Some(parse_datetime(&created_at, "created_at")?),
    })
}

#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
    feeds: Arc<FeedHub>,
    /// Serialises writes with snapshot delivery so subscribers never see an
    /// older snapshot after a newer one.
    feed_lock: Arc<AsyncMutex<()>>,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let inner = spawn_worker(move || Connection::open(&path_for_thread))?;

        info!("History store initialized at {}", db_path.display());

        Ok(Self::from_inner(inner, db_path))
    }

    pub fn open_in_memory() -> Result<Self> {
        let inner = spawn_worker(Connection::open_in_memory)?;
        Ok(Self::from_inner(inner, PathBuf::from(":memory:")))
    }

    fn from_inner(inner: DatabaseInner, db_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(inner),
            db_path: Arc::new(db_path),
            feeds: Arc::new(FeedHub::new()),
            feed_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_entry(&self, entry: &HistoryEntry) -> Result<()> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO history_entries (id, owner_id, activity_kind, score, duration_secs, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.owner_id.as_str(),
                    record.activity_kind.as_str(),
                    record.score,
                    to_i64(record.duration_seconds)?,
                    record.message,
                    record.created_at.unwrap_or_else(Utc::now).to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert history entry")?;
            Ok(())
        })
        .await
    }

    pub async fn list_entries(&self, owner: &OwnerId) -> Result<Vec<HistoryEntry>> {
        let owner = owner.as_str().to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, activity_kind, score, duration_secs, message, created_at
                 FROM history_entries
                 WHERE owner_id = ?1
                 ORDER BY created_at DESC, id ASC",
            )?;

            let mut rows = stmt.query(params![owner])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }
            Ok(entries)
        })
        .await
    }

    async fn publish_snapshot(&self, owner: &OwnerId) {
        if !self.feeds.has_listeners(owner) {
            return;
        }
        match self.list_entries(owner).await {
            Ok(entries) => self.feeds.publish(owner, FeedEvent::Snapshot(entries)),
            Err(err) => {
                log_warn!("failed to load history snapshot for {owner}: {err:#}");
                self.feeds.publish(
                    owner,
                    FeedEvent::Error(StoreError::Subscription(format!("{err:#}"))),
                );
            }
        }
    }
}

fn spawn_worker<F>(open: F) -> Result<DatabaseInner>
where
    F: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
    let (ready_tx, ready_rx) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("strainwatch-db".into())
        .spawn(move || {
            let mut conn = match open() {
                Ok(connection) => connection,
                Err(err) => {
                    let _ = ready_tx
                        .send(Err(anyhow::Error::new(err).context("failed to open SQLite database")));
                    return;
                }
            };

            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }

            let init_result =
                run_migrations(&mut conn).context("failed to run database migrations");
            if ready_tx.send(init_result).is_err() {
                error!("DB initialization receiver dropped before ready signal");
                return;
            }

            while let Ok(command) = command_rx.recv() {
                match command {
                    DbCommand::Execute(task) => task(&mut conn),
                    DbCommand::Shutdown => break,
                }
            }

            info!("Database thread shutting down");
        })
        .with_context(|| "failed to spawn database worker thread")?;

    ready_rx
        .recv()
        .context("database worker exited before signaling readiness")??;

    Ok(DatabaseInner {
        sender: command_tx,
        worker: Mutex::new(Some(worker)),
    })
}

impl HistoryStore for SqliteStore {
    async fn append(&self, owner: &OwnerId, draft: HistoryEntryDraft) -> Result<EntryId, StoreError> {
        let entry = HistoryEntry::from_draft(
            Uuid::new_v4().to_string(),
            owner.clone(),
            draft,
            Some(Utc::now()),
        );

        let _feed = self.feed_lock.lock().await;
        self.insert_entry(&entry)
            .await
            .map_err(|err| StoreError::Write(format!("{err:#}")))?;
        self.publish_snapshot(owner).await;
        Ok(entry.id)
    }

    async fn subscribe(&self, owner: &OwnerId) -> Result<Subscription, StoreError> {
        let _feed = self.feed_lock.lock().await;
        let entries = self
            .list_entries(owner)
            .await
            .map_err(|err| StoreError::Subscription(format!("{err:#}")))?;
        let subscription = self.feeds.register(owner);
        self.feeds
            .send_to(subscription.id, FeedEvent::Snapshot(entries));
        Ok(subscription)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.feeds.remove(id);
    }
}
