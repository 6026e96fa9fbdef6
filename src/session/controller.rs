use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::error::{SensorError, SessionError, StoreError};
use crate::models::{ActivityKind, EntryId, HistoryEntryDraft, OwnerId};
use crate::risk::{finalize_message, RiskAssessment, Scoring};
use crate::sampler::{SamplerController, SamplerJob};
use crate::sensor::{SensorHandle, SensorProvider};
use crate::store::HistoryStore;

use super::{SessionEvent, SessionPhase, SessionState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Cadence and acquisition bound for one activity kind.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub period: Duration,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub kind: ActivityKind,
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    pub sample_count: usize,
    pub last_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(SessionSnapshot),
    /// A session of this kind was already live; nothing was acquired.
    AlreadyLive(SessionPhase),
}

/// Returned by a successful stop. The sampler is cancelled and the sensor
/// released by the time the caller holds this; persistence may still be
/// in flight.
#[derive(Debug)]
pub struct Finalization {
    pub kind: ActivityKind,
    pub duration_seconds: u64,
    pub assessment: RiskAssessment,
    pub draft: HistoryEntryDraft,
    handle: JoinHandle<Result<EntryId, StoreError>>,
}

impl Finalization {
    /// Waits for the append. A failure here is non-fatal: the session has
    /// already completed and the entry is lost.
    pub async fn persisted(self) -> Result<EntryId, StoreError> {
        self.handle
            .await
            .map_err(|err| StoreError::Write(format!("finalization task failed: {err}")))?
    }
}

/// State machine for one (owner, activity kind) pair.
pub struct SessionController<S: SensorProvider, P: HistoryStore> {
    owner: OwnerId,
    kind: ActivityKind,
    state: Arc<Mutex<SessionState>>,
    sampler: Arc<Mutex<SamplerController>>,
    sensor: Arc<StdMutex<Option<SensorHandle>>>,
    sensors: Arc<S>,
    store: Arc<P>,
    scoring: Scoring,
    timings: SessionTimings,
    events: broadcast::Sender<SessionEvent>,
}

impl<S: SensorProvider, P: HistoryStore> Clone for SessionController<S, P> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            kind: self.kind,
            state: Arc::clone(&self.state),
            sampler: Arc::clone(&self.sampler),
            sensor: Arc::clone(&self.sensor),
            sensors: Arc::clone(&self.sensors),
            store: Arc::clone(&self.store),
            scoring: self.scoring.clone(),
            timings: self.timings,
            events: self.events.clone(),
        }
    }
}

impl<S: SensorProvider, P: HistoryStore> SessionController<S, P> {
    pub fn new(
        owner: OwnerId,
        kind: ActivityKind,
        sensors: Arc<S>,
        store: Arc<P>,
        scoring: Scoring,
        timings: SessionTimings,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            owner,
            kind,
            state: Arc::new(Mutex::new(SessionState::new(kind))),
            sampler: Arc::new(Mutex::new(SamplerController::new())),
            sensor: Arc::new(StdMutex::new(None)),
            sensors,
            store,
            scoring,
            timings,
            events,
        }
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        snapshot_of(&state)
    }

    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        {
            let mut state = self.state.lock().await;
            if !state.begin_acquiring() {
                log_debug!(
                    "start ignored for {} ({}): session is {}",
                    self.kind,
                    self.owner,
                    state.phase.as_str()
                );
                return Ok(StartOutcome::AlreadyLive(state.phase));
            }
        }
        self.emit_phase(SessionPhase::Acquiring);

        // Dropping this future before the session is running undoes the start.
        let guard = StartGuard::arm(self.clone());

        let handle = match self.acquire().await {
            Ok(handle) => handle,
            Err(err) => {
                log_warn!("sensor acquisition failed for {} ({}): {err}", self.kind, self.owner);
                self.state.lock().await.fail();
                self.emit_phase(SessionPhase::Failed);
                self.emit(SessionEvent::AcquireFailed {
                    owner: self.owner.clone(),
                    kind: self.kind,
                    error: err.to_string(),
                });
                self.state.lock().await.reset();
                self.emit_phase(SessionPhase::Idle);
                guard.disarm();
                return Err(err.into());
            }
        };
        self.store_sensor(handle);

        let anchor = Instant::now();
        let snapshot = {
            let mut state = self.state.lock().await;
            state.activate(Utc::now(), anchor);
            snapshot_of(&state)
        };

        let job = SamplerJob {
            owner: self.owner.clone(),
            kind: self.kind,
            period: self.timings.period,
            anchor,
            session: Arc::clone(&self.state),
            scoring: self.scoring.clone(),
            events: self.events.clone(),
        };
        self.sampler.lock().await.start(job);
        guard.disarm();

        log_info!(
            "{} session {} started for {}",
            self.kind,
            snapshot.session_id.as_deref().unwrap_or("?"),
            self.owner
        );
        self.emit_phase(SessionPhase::Active);

        Ok(StartOutcome::Started(snapshot))
    }

    /// Stops an Active session. Returns `None` (and changes nothing) in any
    /// other phase.
    pub async fn stop(&self) -> Option<Finalization> {
        let stopped = {
            let mut state = self.state.lock().await;
            match state.begin_finalizing(Instant::now()) {
                Some(stopped) => stopped,
                None => {
                    log_debug!(
                        "stop ignored for {} ({}): session is {}",
                        self.kind,
                        self.owner,
                        state.phase.as_str()
                    );
                    return None;
                }
            }
        };
        self.emit_phase(SessionPhase::Finalizing);

        if let Err(err) = self.sampler.lock().await.stop().await {
            log_error!("sampler for {} ({}) ended abnormally: {err:#}", self.kind, self.owner);
        }
        self.release_sensor();

        let duration_seconds = stopped.elapsed.as_secs_f64().round() as u64;
        let score = self
            .scoring
            .analyzer
            .finalize(self.kind, duration_seconds, stopped.last_score);
        let assessment = self.scoring.classifier.assess(score);
        let message =
            finalize_message(self.kind, duration_seconds, &assessment, &self.scoring.config);
        let draft = HistoryEntryDraft::new(self.kind, score, duration_seconds, message);

        log_info!(
            "{} session {} stopped after {}s with {} samples, score {:.2} ({})",
            self.kind,
            stopped.session_id,
            duration_seconds,
            stopped.sample_count,
            score,
            assessment.tier
        );

        let controller = self.clone();
        let pending = draft.clone();
        let handle = tokio::spawn(async move { controller.persist(pending, assessment).await });

        Some(Finalization {
            kind: self.kind,
            duration_seconds,
            assessment,
            draft,
            handle,
        })
    }

    async fn acquire(&self) -> Result<SensorHandle, SensorError> {
        let kind = self.kind.sensor_kind();
        let after = self.timings.acquire_timeout;
        match time::timeout(after, self.sensors.acquire(kind)).await {
            Ok(result) => result,
            Err(_) => Err(SensorError::Timeout { kind, after }),
        }
    }

    fn store_sensor(&self, handle: SensorHandle) {
        *self.sensor.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn release_sensor(&self) {
        let handle = self
            .sensor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            self.sensors.release(handle);
        }
    }

    /// Rolls back a start whose caller went away before it finished. The
    /// phase stays non-Idle until cleanup is done so no new start can grab
    /// the sensor slot in between.
    async fn abandon_start(&self) {
        if !rollback_applies(self.state.lock().await.phase) {
            return;
        }
        if let Err(err) = self.sampler.lock().await.stop().await {
            log_error!("sampler for {} ({}) ended abnormally: {err:#}", self.kind, self.owner);
        }
        self.release_sensor();

        {
            let mut state = self.state.lock().await;
            // a concurrent stop owns the session now
            if !rollback_applies(state.phase) {
                return;
            }
            state.reset();
        }
        log_warn!("start for {} ({}) was cancelled", self.kind, self.owner);
        self.emit_phase(SessionPhase::Idle);
    }

    /// Finalizing → Completed → Idle, whatever the append outcome.
    async fn persist(
        &self,
        draft: HistoryEntryDraft,
        assessment: RiskAssessment,
    ) -> Result<EntryId, StoreError> {
        let result = self.store.append(&self.owner, draft).await;
        match &result {
            Ok(entry_id) => {
                log_info!("saved {} entry {} for {}", self.kind, entry_id, self.owner);
                self.emit(SessionEvent::Completed {
                    owner: self.owner.clone(),
                    kind: self.kind,
                    entry_id: entry_id.clone(),
                    assessment,
                });
            }
            Err(err) => {
                log_warn!("{} entry for {} was not saved: {err}", self.kind, self.owner);
                self.emit(SessionEvent::PersistFailed {
                    owner: self.owner.clone(),
                    kind: self.kind,
                    error: err.to_string(),
                });
            }
        }

        self.state.lock().await.complete();
        self.emit_phase(SessionPhase::Completed);
        self.state.lock().await.reset();
        self.emit_phase(SessionPhase::Idle);

        result
    }

    fn emit_phase(&self, phase: SessionPhase) {
        self.emit(SessionEvent::StateChanged {
            owner: self.owner.clone(),
            kind: self.kind,
            phase,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

struct StartGuard<S: SensorProvider, P: HistoryStore> {
    controller: Option<SessionController<S, P>>,
}

impl<S: SensorProvider, P: HistoryStore> StartGuard<S, P> {
    fn arm(controller: SessionController<S, P>) -> Self {
        Self {
            controller: Some(controller),
        }
    }

    fn disarm(mut self) {
        self.controller = None;
    }
}

impl<S: SensorProvider, P: HistoryStore> Drop for StartGuard<S, P> {
    fn drop(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { controller.abandon_start().await });
        }
    }
}

fn rollback_applies(phase: SessionPhase) -> bool {
    matches!(
        phase,
        SessionPhase::Acquiring | SessionPhase::Active | SessionPhase::Failed
    )
}

fn snapshot_of(state: &SessionState) -> SessionSnapshot {
    SessionSnapshot {
        kind: state.kind,
        phase: state.phase,
        session_id: state.session_id.clone(),
        started_at: state.started_at,
        elapsed_seconds: state.elapsed_at(Instant::now()).as_secs_f64(),
        sample_count: state.samples.len(),
        last_score: state.last_score,
    }
}
