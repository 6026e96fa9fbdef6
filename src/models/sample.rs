use serde::{Deserialize, Serialize};

/// One scored observation taken while a session is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub elapsed_seconds: f64,
    /// Analyzer output before clamping into the score range.
    pub raw_metric: f64,
    pub score: f64,
}
