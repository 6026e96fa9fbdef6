//! Risk scoring: analyzers turn elapsed time or duration into a continuous
//! score in `[1.0, 5.0]`, classifiers turn a score into a tier.

pub mod classifier;
pub mod config;
pub mod random;
pub mod scoring;

use std::sync::Arc;

pub use classifier::{
    assess, tier_for, CategoricalClassifier, RiskAssessment, RiskClassifier, RiskTier,
    TieredClassifier,
};
pub use config::ScoringConfig;
pub use random::{FixedValue, SeededRandom, ThreadRandom, UniformSource};
pub use scoring::{finalize_message, Observation, RiskAnalyzer, SimulatedAnalyzer};

use crate::settings::Settings;

/// Analyzer and classifier pair shared by every session.
#[derive(Clone)]
pub struct Scoring {
    pub analyzer: Arc<dyn RiskAnalyzer>,
    pub classifier: Arc<dyn RiskClassifier>,
    pub config: ScoringConfig,
}

impl Scoring {
    pub fn new(
        analyzer: Arc<dyn RiskAnalyzer>,
        classifier: Arc<dyn RiskClassifier>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            analyzer,
            classifier,
            config,
        }
    }

    /// Reference simulation with the fixed-threshold tiers.
    pub fn simulated(source: Arc<dyn UniformSource>) -> Self {
        let config = ScoringConfig::default();
        Self {
            analyzer: Arc::new(SimulatedAnalyzer::new(source, config.clone())),
            classifier: Arc::new(TieredClassifier),
            config,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let source: Arc<dyn UniformSource> = match settings.seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        Self::simulated(source)
    }
}
