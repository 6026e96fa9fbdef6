use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::random::UniformSource;

pub const HIGH_THRESHOLD: f64 = 4.0;
pub const MEDIUM_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            RiskTier::High => "take an immediate break",
            RiskTier::Medium => "take a short break soon",
            RiskTier::Low => "continue monitoring",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: f64,
    pub tier: RiskTier,
    pub suggestion: &'static str,
}

impl RiskAssessment {
    pub fn new(score: f64, tier: RiskTier) -> Self {
        Self {
            score,
            tier,
            suggestion: tier.suggestion(),
        }
    }
}

/// Closed lower bounds: 4.0 is HIGH, 2.0 is MEDIUM.
pub fn tier_for(score: f64) -> RiskTier {
    if score >= HIGH_THRESHOLD {
        RiskTier::High
    } else if score >= MEDIUM_THRESHOLD {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

pub fn assess(score: f64) -> RiskAssessment {
    RiskAssessment::new(score, tier_for(score))
}

/// Turns a continuous score into an assessment.
pub trait RiskClassifier: Send + Sync {
    fn assess(&self, score: f64) -> RiskAssessment;
}

/// The fixed-threshold tiers used for tracking, history and reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct TieredClassifier;

impl RiskClassifier for TieredClassifier {
    fn assess(&self, score: f64) -> RiskAssessment {
        assess(score)
    }
}

const CATEGORICAL_SCORE_WEIGHT: f64 = 0.7;
const CATEGORICAL_HIGH: f64 = 0.7;
const CATEGORICAL_MEDIUM: f64 = 0.4;

/// Categorical strain label: the normalised score is blended with a second
/// random factor before bucketing. Its thresholds are its own and are not
/// interchangeable with [`TieredClassifier`].
pub struct CategoricalClassifier {
    source: Arc<dyn UniformSource>,
}

impl CategoricalClassifier {
    pub fn new(source: Arc<dyn UniformSource>) -> Self {
        Self { source }
    }
}

impl RiskClassifier for CategoricalClassifier {
    fn assess(&self, score: f64) -> RiskAssessment {
        let normalised = (score / 5.0).clamp(0.0, 1.0);
        let factor = self.source.uniform(0.0, 1.0);
        let strain =
            normalised * CATEGORICAL_SCORE_WEIGHT + factor * (1.0 - CATEGORICAL_SCORE_WEIGHT);

        let tier = if strain >= CATEGORICAL_HIGH {
            RiskTier::High
        } else if strain >= CATEGORICAL_MEDIUM {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };
        RiskAssessment::new(score, tier)
    }
}
