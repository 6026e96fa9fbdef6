use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{ActivityKind, Sample};

pub const DEFAULT_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Acquiring,
    Active,
    Finalizing,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Acquiring => "Acquiring",
            SessionPhase::Active => "Active",
            SessionPhase::Finalizing => "Finalizing",
            SessionPhase::Completed => "Completed",
            SessionPhase::Failed => "Failed",
        }
    }
}

/// Everything finalization needs, captured at the moment a stop is accepted.
#[derive(Debug, Clone)]
pub struct StopSnapshot {
    pub session_id: String,
    pub elapsed: Duration,
    pub last_score: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub kind: ActivityKind,
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub samples: Vec<Sample>,
    pub last_score: f64,
    /// Monotonic start point; elapsed time is always measured from here.
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl SessionState {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            kind,
            phase: SessionPhase::Idle,
            session_id: None,
            started_at: None,
            samples: Vec::new(),
            last_score: DEFAULT_SCORE,
            running_anchor: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    /// Idle → Acquiring. Returns false (and changes nothing) otherwise.
    pub fn begin_acquiring(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.phase = SessionPhase::Acquiring;
        true
    }

    /// Acquiring → Active.
    pub fn activate(&mut self, started_at: DateTime<Utc>, anchor: Instant) -> bool {
        if self.phase != SessionPhase::Acquiring {
            return false;
        }
        *self = Self {
            kind: self.kind,
            phase: SessionPhase::Active,
            session_id: Some(Uuid::new_v4().to_string()),
            started_at: Some(started_at),
            samples: Vec::new(),
            last_score: DEFAULT_SCORE,
            running_anchor: Some(anchor),
        };
        true
    }

    /// Acquiring → Failed.
    pub fn fail(&mut self) -> bool {
        if self.phase != SessionPhase::Acquiring {
            return false;
        }
        self.phase = SessionPhase::Failed;
        true
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.running_anchor
            .map(|anchor| now.saturating_duration_since(anchor))
            .unwrap_or_default()
    }

    /// Appends a sample while Active. Samples must arrive in elapsed order.
    pub fn record_sample(&mut self, sample: Sample) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        if let Some(last) = self.samples.last() {
            if sample.elapsed_seconds < last.elapsed_seconds {
                return false;
            }
        }
        self.last_score = sample.score;
        self.samples.push(sample);
        true
    }

    /// Active → Finalizing.
    pub fn begin_finalizing(&mut self, now: Instant) -> Option<StopSnapshot> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.phase = SessionPhase::Finalizing;
        Some(StopSnapshot {
            session_id: self.session_id.clone().unwrap_or_default(),
            elapsed: self.elapsed_at(now),
            last_score: self
                .samples
                .last()
                .map(|sample| sample.score)
                .unwrap_or(DEFAULT_SCORE),
            sample_count: self.samples.len(),
        })
    }

    /// Finalizing → Completed.
    pub fn complete(&mut self) -> bool {
        if self.phase != SessionPhase::Finalizing {
            return false;
        }
        self.phase = SessionPhase::Completed;
        true
    }

    /// Discards the session; the next start begins from scratch.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(elapsed_seconds: f64, score: f64) -> Sample {
        Sample {
            elapsed_seconds,
            raw_metric: score,
            score,
        }
    }

    #[test]
    fn walks_the_happy_path() {
        let mut state = SessionState::new(ActivityKind::EyeStrain);
        let anchor = Instant::now();

        assert!(state.begin_acquiring());
        assert!(!state.begin_acquiring());
        assert!(state.activate(Utc::now(), anchor));
        assert_eq!(state.phase, SessionPhase::Active);

        assert!(state.record_sample(sample(2.0, 1.1)));
        assert!(state.record_sample(sample(4.0, 1.3)));

        let snapshot = state
            .begin_finalizing(anchor + Duration::from_secs(5))
            .unwrap();
        assert_eq!(snapshot.elapsed, Duration::from_secs(5));
        assert_eq!(snapshot.last_score, 1.3);
        assert_eq!(snapshot.sample_count, 2);

        assert!(!state.record_sample(sample(6.0, 2.0)));
        assert!(state.complete());
        state.reset();
        assert!(state.is_idle());
        assert!(state.samples.is_empty());
        assert_eq!(state.last_score, DEFAULT_SCORE);
    }

    #[test]
    fn last_score_defaults_without_samples() {
        let mut state = SessionState::new(ActivityKind::EyeStrain);
        state.begin_acquiring();
        let anchor = Instant::now();
        state.activate(Utc::now(), anchor);
        let snapshot = state.begin_finalizing(anchor).unwrap();
        assert_eq!(snapshot.last_score, DEFAULT_SCORE);
    }

    #[test]
    fn rejects_out_of_order_samples() {
        let mut state = SessionState::new(ActivityKind::EyeStrain);
        state.begin_acquiring();
        state.activate(Utc::now(), Instant::now());
        assert!(state.record_sample(sample(4.0, 1.2)));
        assert!(!state.record_sample(sample(2.0, 1.1)));
        assert_eq!(state.samples.len(), 1);
    }

    #[test]
    fn illegal_transitions_are_refused() {
        let mut state = SessionState::new(ActivityKind::VoiceFatigue);
        assert!(state.begin_finalizing(Instant::now()).is_none());
        assert!(!state.activate(Utc::now(), Instant::now()));
        assert!(!state.complete());
        assert!(!state.fail());
        assert!(state.is_idle());

        state.begin_acquiring();
        assert!(state.fail());
        assert_eq!(state.phase, SessionPhase::Failed);
        assert!(state.begin_finalizing(Instant::now()).is_none());
    }
}
