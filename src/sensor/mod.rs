//! Boundary to the device layer that grants camera and microphone streams.
//!
//! The engine never reads from a stream; it only needs a handle that can be
//! acquired when a session starts and released when it stops.

mod scripted;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SensorError;

pub use scripted::{ScriptedOutcome, ScriptedSensors};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SensorKind {
    Video,
    Audio,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Video => f.write_str("video"),
            SensorKind::Audio => f.write_str("audio"),
        }
    }
}

/// A live sensor stream. Deliberately not `Clone`: the session that acquired
/// it is its only owner and gives it back through [`SensorProvider::release`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SensorHandle {
    id: Uuid,
    kind: SensorKind,
}

impl SensorHandle {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }
}

pub trait SensorProvider: Send + Sync + 'static {
    /// May wait on a user-facing permission prompt; callers bound it with a timeout.
    fn acquire(
        &self,
        kind: SensorKind,
    ) -> impl Future<Output = Result<SensorHandle, SensorError>> + Send;

    /// Must tolerate handles it no longer tracks.
    fn release(&self, handle: SensorHandle);
}
