use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::{ActivityKind, OwnerId, Sample};
use crate::risk::Scoring;
use crate::session::{LiveReading, SessionEvent, SessionPhase, SessionState};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Everything the sampling task needs, moved into it on start.
pub struct SamplerJob {
    pub owner: OwnerId,
    pub kind: ActivityKind,
    pub period: Duration,
    /// Session start; the first tick fires one period later.
    pub anchor: Instant,
    pub session: Arc<Mutex<SessionState>>,
    pub scoring: Scoring,
    pub events: broadcast::Sender<SessionEvent>,
}

pub async fn sampling_loop(job: SamplerJob, cancel_token: CancellationToken) {
    let mut ticker = interval_at(job.anchor + job.period, job.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!(
        "sampler started for {} ({}), every {:?}",
        job.kind,
        job.owner,
        job.period
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampler for {} ({}) shutting down", job.kind, job.owner);
                break;
            }
            _ = ticker.tick() => {
                if !perform_tick(&job).await {
                    break;
                }
            }
        }
    }
}

/// Returns false once the session has left the Active phase.
async fn perform_tick(job: &SamplerJob) -> bool {
    let reading = {
        let mut session = job.session.lock().await;
        if session.phase != SessionPhase::Active {
            return false;
        }

        let elapsed = session.elapsed_at(Instant::now());
        let elapsed_seconds = elapsed.as_secs_f64();
        let assessment = match job.scoring.analyzer.observe(job.kind, elapsed) {
            Some(observation) => {
                session.record_sample(Sample {
                    elapsed_seconds,
                    raw_metric: observation.raw_metric,
                    score: observation.score,
                });
                Some(job.scoring.classifier.assess(observation.score))
            }
            None => None,
        };

        LiveReading {
            kind: job.kind,
            elapsed_seconds,
            assessment,
        }
    };

    let _ = job.events.send(SessionEvent::Reading {
        owner: job.owner.clone(),
        reading,
    });
    true
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::risk::FixedValue;
    use crate::sampler::SamplerController;

    fn active_session(kind: ActivityKind, anchor: Instant) -> Arc<Mutex<SessionState>> {
        let mut state = SessionState::new(kind);
        state.begin_acquiring();
        state.activate(Utc::now(), anchor);
        Arc::new(Mutex::new(state))
    }

    fn job(kind: ActivityKind, session: Arc<Mutex<SessionState>>, anchor: Instant) -> SamplerJob {
        let (events, _) = broadcast::channel(64);
        SamplerJob {
            owner: OwnerId::new("sampler-test").unwrap(),
            kind,
            period: Duration::from_secs(2),
            anchor,
            session,
            scoring: Scoring::simulated(Arc::new(FixedValue(0.0))),
            events,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_append_ordered_samples() {
        let anchor = Instant::now();
        let session = active_session(ActivityKind::EyeStrain, anchor);
        let mut sampler = SamplerController::new();
        sampler.start(job(ActivityKind::EyeStrain, session.clone(), anchor));

        tokio::time::sleep(Duration::from_secs(7)).await;
        sampler.stop().await.unwrap();

        let state = session.lock().await;
        let elapsed: Vec<f64> = state
            .samples
            .iter()
            .map(|s| s.elapsed_seconds.round())
            .collect();
        assert_eq!(elapsed, vec![2.0, 4.0, 6.0]);
        assert_eq!(state.last_score, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop_returns() {
        let anchor = Instant::now();
        let session = active_session(ActivityKind::EyeStrain, anchor);
        let mut sampler = SamplerController::new();
        sampler.start(job(ActivityKind::EyeStrain, session.clone(), anchor));

        tokio::time::sleep(Duration::from_secs(3)).await;
        sampler.stop().await.unwrap();
        sampler.stop().await.unwrap();
        assert!(!sampler.is_running());

        let count = session.lock().await.samples.len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(session.lock().await.samples.len(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn voice_ticks_publish_duration_only() {
        let anchor = Instant::now();
        let session = active_session(ActivityKind::VoiceFatigue, anchor);
        let job = job(ActivityKind::VoiceFatigue, session.clone(), anchor);
        let mut readings = job.events.subscribe();
        let mut sampler = SamplerController::new();
        sampler.start(job);

        match readings.recv().await.unwrap() {
            SessionEvent::Reading { reading, .. } => {
                assert_eq!(reading.elapsed_seconds.round(), 2.0);
                assert!(reading.assessment.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
        sampler.stop().await.unwrap();
        assert!(session.lock().await.samples.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_session_leaves_active() {
        let anchor = Instant::now();
        let session = active_session(ActivityKind::EyeStrain, anchor);
        let mut sampler = SamplerController::new();
        sampler.start(job(ActivityKind::EyeStrain, session.clone(), anchor));

        session.lock().await.begin_finalizing(Instant::now());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(session.lock().await.samples.is_empty());
        sampler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_running_task() {
        let anchor = Instant::now();
        let session = active_session(ActivityKind::EyeStrain, anchor);
        let mut sampler = SamplerController::new();
        sampler.start(job(ActivityKind::EyeStrain, session.clone(), anchor));
        sampler.start(job(ActivityKind::EyeStrain, session.clone(), anchor));
        assert!(sampler.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        sampler.stop().await.unwrap();

        let elapsed: Vec<f64> = session
            .lock()
            .await
            .samples
            .iter()
            .map(|s| s.elapsed_seconds.round())
            .collect();
        assert_eq!(elapsed, vec![2.0, 4.0]);
    }
}
