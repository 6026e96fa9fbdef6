use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityKind, OwnerId};

pub type EntryId = String;

/// What a finalized session hands to the persistence boundary. The boundary
/// assigns the id and the authoritative timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryDraft {
    pub activity_kind: ActivityKind,
    pub score: f64,
    pub duration_seconds: u64,
    pub message: String,
}

impl HistoryEntryDraft {
    /// Scores are stored with two decimals.
    pub fn new(
        activity_kind: ActivityKind,
        score: f64,
        duration_seconds: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            activity_kind,
            score: (score * 100.0).round() / 100.0,
            duration_seconds,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EntryId,
    pub owner_id: OwnerId,
    pub activity_kind: ActivityKind,
    pub score: f64,
    pub duration_seconds: u64,
    pub message: String,
    /// `None` while a server-assigned timestamp is still pending.
    pub created_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn from_draft(
        id: EntryId,
        owner_id: OwnerId,
        draft: HistoryEntryDraft,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            owner_id,
            activity_kind: draft.activity_kind,
            score: draft.score,
            duration_seconds: draft.duration_seconds,
            message: draft.message,
            created_at,
        }
    }
}
