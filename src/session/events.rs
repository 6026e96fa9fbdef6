use serde::Serialize;

use crate::models::{ActivityKind, EntryId, OwnerId};
use crate::risk::RiskAssessment;

use super::SessionPhase;

/// Published by the sampler on every tick.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveReading {
    pub kind: ActivityKind,
    pub elapsed_seconds: f64,
    /// Only continuously tracked activities carry an assessment.
    pub assessment: Option<RiskAssessment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        owner: OwnerId,
        kind: ActivityKind,
        phase: SessionPhase,
    },
    #[serde(rename_all = "camelCase")]
    Reading { owner: OwnerId, reading: LiveReading },
    #[serde(rename_all = "camelCase")]
    AcquireFailed {
        owner: OwnerId,
        kind: ActivityKind,
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        owner: OwnerId,
        kind: ActivityKind,
        entry_id: EntryId,
        assessment: RiskAssessment,
    },
    /// The session stopped but its entry could not be saved.
    #[serde(rename_all = "camelCase")]
    PersistFailed {
        owner: OwnerId,
        kind: ActivityKind,
        error: String,
    },
}
