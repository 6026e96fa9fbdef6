use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::error::SessionError;
use crate::models::{ActivityKind, OwnerId};
use crate::risk::Scoring;
use crate::sensor::SensorProvider;
use crate::settings::Settings;
use crate::store::HistoryStore;

use super::controller::{
    Finalization, SessionController, SessionSnapshot, SessionTimings, StartOutcome,
};
use super::{SessionEvent, SessionPhase};

/// Owns one [`SessionController`] per (owner, activity kind). Different
/// kinds are independent; the registry does not serialise them.
pub struct SessionRegistry<S: SensorProvider, P: HistoryStore> {
    sensors: Arc<S>,
    store: Arc<P>,
    scoring: Scoring,
    settings: Settings,
    sessions: Mutex<HashMap<(OwnerId, ActivityKind), SessionController<S, P>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<S: SensorProvider, P: HistoryStore> SessionRegistry<S, P> {
    pub fn new(sensors: Arc<S>, store: Arc<P>, scoring: Scoring, settings: Settings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            sensors,
            store,
            scoring,
            settings,
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Session events for every owner and kind.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    pub async fn controller(&self, owner: &OwnerId, kind: ActivityKind) -> SessionController<S, P> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry((owner.clone(), kind))
            .or_insert_with(|| {
                SessionController::new(
                    owner.clone(),
                    kind,
                    Arc::clone(&self.sensors),
                    Arc::clone(&self.store),
                    self.scoring.clone(),
                    SessionTimings {
                        period: self.settings.period_for(kind),
                        acquire_timeout: self.settings.acquire_timeout(),
                    },
                    self.events.clone(),
                )
            })
            .clone()
    }

    pub async fn start(
        &self,
        owner: &OwnerId,
        kind: ActivityKind,
    ) -> Result<StartOutcome, SessionError> {
        self.controller(owner, kind).await.start().await
    }

    pub async fn stop(&self, owner: &OwnerId, kind: ActivityKind) -> Option<Finalization> {
        let controller = self.sessions.lock().await.get(&(owner.clone(), kind)).cloned();
        match controller {
            Some(controller) => controller.stop().await,
            None => None,
        }
    }

    pub async fn phase(&self, owner: &OwnerId, kind: ActivityKind) -> SessionPhase {
        let controller = self.sessions.lock().await.get(&(owner.clone(), kind)).cloned();
        match controller {
            Some(controller) => controller.phase().await,
            None => SessionPhase::Idle,
        }
    }

    pub async fn snapshot(&self, owner: &OwnerId, kind: ActivityKind) -> SessionSnapshot {
        self.controller(owner, kind).await.snapshot().await
    }

    /// Stops every Active session and returns their finalizations.
    pub async fn shutdown(&self) -> Vec<Finalization> {
        let controllers: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        let mut finalizations = Vec::new();
        for controller in controllers {
            if let Some(finalization) = controller.stop().await {
                finalizations.push(finalization);
            }
        }
        finalizations
    }
}
