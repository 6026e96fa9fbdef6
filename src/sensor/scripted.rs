use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use crate::error::SensorError;

use super::{SensorHandle, SensorKind, SensorProvider};

/// What the next `acquire` call resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Grant,
    Deny,
    Unavailable(String),
    /// Never resolves, like a permission prompt the user ignores.
    Hang,
}

/// In-process sensor provider that grants handles without touching hardware.
///
/// Outcomes queued with [`ScriptedSensors::push`] are consumed in order; once
/// the queue is empty every request is granted.
#[derive(Debug, Default)]
pub struct ScriptedSensors {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    acquire_delay: Option<Duration>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    live: Mutex<HashSet<Uuid>>,
}

impl ScriptedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquisition waits `delay` before resolving.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            acquire_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, outcome: ScriptedOutcome) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Number of acquisition attempts, granted or not.
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles granted and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(ScriptedOutcome::Grant)
    }
}

impl SensorProvider for ScriptedSensors {
    async fn acquire(&self, kind: SensorKind) -> Result<SensorHandle, SensorError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome();

        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            ScriptedOutcome::Grant => {
                let handle = SensorHandle::new(kind);
                self.live
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(handle.id());
                Ok(handle)
            }
            ScriptedOutcome::Deny => Err(SensorError::PermissionDenied(kind)),
            ScriptedOutcome::Unavailable(reason) => {
                Err(SensorError::DeviceUnavailable { kind, reason })
            }
            ScriptedOutcome::Hang => std::future::pending().await,
        }
    }

    fn release(&self, handle: SensorHandle) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id());
        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
