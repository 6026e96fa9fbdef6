use std::sync::Arc;
use std::time::Duration;

use crate::models::ActivityKind;

use super::classifier::RiskAssessment;
use super::config::ScoringConfig;
use super::random::UniformSource;

/// One analyzer reading taken on a sampler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub raw_metric: f64,
    pub score: f64,
}

/// Seam for a real blink/voice analyzer. The bundled implementation only
/// simulates one from elapsed time.
pub trait RiskAnalyzer: Send + Sync {
    /// Scores a tick of a running session. `None` for activities that are
    /// not tracked continuously.
    fn observe(&self, kind: ActivityKind, elapsed: Duration) -> Option<Observation>;

    /// Final score persisted for a session. `last_score` is the most recent
    /// continuous score, 1.0 when no tick ever ran.
    fn finalize(&self, kind: ActivityKind, duration_secs: u64, last_score: f64) -> f64;
}

pub struct SimulatedAnalyzer {
    source: Arc<dyn UniformSource>,
    config: ScoringConfig,
}

impl SimulatedAnalyzer {
    pub fn new(source: Arc<dyn UniformSource>, config: ScoringConfig) -> Self {
        Self { source, config }
    }
}

impl RiskAnalyzer for SimulatedAnalyzer {
    fn observe(&self, kind: ActivityKind, elapsed: Duration) -> Option<Observation> {
        match kind {
            ActivityKind::EyeStrain => Some(eye_strain_observation(
                elapsed.as_secs_f64(),
                &self.config,
                self.source.as_ref(),
            )),
            ActivityKind::VoiceFatigue => None,
        }
    }

    fn finalize(&self, kind: ActivityKind, duration_secs: u64, last_score: f64) -> f64 {
        match kind {
            ActivityKind::EyeStrain => last_score,
            ActivityKind::VoiceFatigue => {
                voice_fatigue_score(duration_secs, &self.config, self.source.as_ref())
            }
        }
    }
}

/// `max(min_score, min(max_base, minutes * rate) + fluctuation)`
pub fn eye_strain_observation(
    elapsed_secs: f64,
    config: &ScoringConfig,
    source: &dyn UniformSource,
) -> Observation {
    let minutes = elapsed_secs.max(0.0) / 60.0;
    let base = (minutes * config.eye_rate_per_minute).min(config.eye_max_base);
    let fluctuation = source.uniform(-config.eye_fluctuation, config.eye_fluctuation);
    let raw_metric = base + fluctuation;

    Observation {
        raw_metric,
        score: raw_metric.max(config.min_score),
    }
}

pub fn voice_fatigue_score(
    duration_secs: u64,
    config: &ScoringConfig,
    source: &dyn UniformSource,
) -> f64 {
    if duration_secs > config.voice_long_secs {
        4.0 + source.uniform(0.0, 1.0)
    } else if duration_secs > config.voice_short_secs {
        2.0 + source.uniform(0.0, 2.0)
    } else {
        1.0 + source.uniform(0.0, 1.0)
    }
}

/// Message stored alongside a finalized entry.
pub fn finalize_message(
    kind: ActivityKind,
    duration_secs: u64,
    assessment: &RiskAssessment,
    config: &ScoringConfig,
) -> String {
    match kind {
        ActivityKind::EyeStrain => format!(
            "Blink analysis over {duration_secs}s. {}.",
            capitalize(assessment.suggestion)
        ),
        ActivityKind::VoiceFatigue => {
            let status = if duration_secs > config.voice_long_secs {
                "Prolonged recording suggests high vocal strain."
            } else if duration_secs > config.voice_short_secs {
                "Moderate recording length. Potential signs of early fatigue."
            } else {
                "Short recording, minimal vocal analysis possible."
            };
            format!("{status} ({})", assessment.suggestion)
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::risk::classifier::{assess, RiskTier};
    use crate::risk::random::FixedValue;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn eye_strain_grows_with_time_and_caps() {
        let config = ScoringConfig::default();
        let flat = FixedValue(0.0);

        assert!(close(eye_strain_observation(0.0, &config, &flat).score, 1.0));
        assert!(close(eye_strain_observation(120.0, &config, &flat).score, 1.4));
        assert!(close(eye_strain_observation(3_600.0, &config, &flat).score, 4.5));

        let observation = eye_strain_observation(30.0, &config, &FixedValue(-0.4));
        assert!(close(observation.raw_metric, 0.35 - 0.4));
        assert!(close(observation.score, 1.0));
    }

    #[test]
    fn voice_fatigue_bands() {
        let config = ScoringConfig::default();
        let half = FixedValue(0.5);

        assert!(close(voice_fatigue_score(100, &config, &half), 4.5));
        assert!(close(voice_fatigue_score(91, &config, &half), 4.5));
        assert!(close(voice_fatigue_score(90, &config, &half), 2.5));
        assert!(close(voice_fatigue_score(31, &config, &half), 2.5));
        assert!(close(voice_fatigue_score(30, &config, &half), 1.5));
        assert!(close(voice_fatigue_score(0, &config, &half), 1.5));
    }

    #[test]
    fn analyzer_finalizes_eye_strain_from_last_score() {
        let analyzer = SimulatedAnalyzer::new(Arc::new(FixedValue(0.9)), ScoringConfig::default());
        assert!(close(analyzer.finalize(ActivityKind::EyeStrain, 500, 1.0), 1.0));
        assert!(close(analyzer.finalize(ActivityKind::EyeStrain, 500, 3.2), 3.2));
        assert!(analyzer
            .observe(ActivityKind::VoiceFatigue, Duration::from_secs(10))
            .is_none());
    }

    #[test]
    fn messages_carry_duration_and_suggestion() {
        let config = ScoringConfig::default();
        let eye = finalize_message(ActivityKind::EyeStrain, 120, &assess(1.4), &config);
        assert_eq!(eye, "Blink analysis over 120s. Continue monitoring.");

        let voice = finalize_message(ActivityKind::VoiceFatigue, 100, &assess(4.5), &config);
        assert_eq!(
            voice,
            "Prolonged recording suggests high vocal strain. (take an immediate break)"
        );
        assert_eq!(assess(4.5).tier, RiskTier::High);
    }

    proptest! {
        #[test]
        fn eye_strain_matches_formula(t in 0.0f64..100_000.0, f in -0.4f64..=0.4) {
            let config = ScoringConfig::default();
            let score = eye_strain_observation(t, &config, &FixedValue(f)).score;
            let expected = (((t / 60.0) * 0.7).min(4.5) + f).max(1.0);
            prop_assert!((score - expected).abs() < 1e-12);
            prop_assert!((1.0..=4.9).contains(&score));
        }
    }
}
