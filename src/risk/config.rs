/// Tunable constants of the reference scoring rules.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Lowest score any analyzer may report.
    pub min_score: f64,

    /// Eye strain: risk gained per minute of continuous tracking
    pub eye_rate_per_minute: f64,
    /// Eye strain: cap on the time-driven part of the score
    pub eye_max_base: f64,
    /// Eye strain: half-width of the symmetric fluctuation band
    pub eye_fluctuation: f64,

    /// Voice fatigue: recordings longer than this land in the high band
    pub voice_long_secs: u64,
    /// Voice fatigue: recordings longer than this (and not long) land in the middle band
    pub voice_short_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: 1.0,
            eye_rate_per_minute: 0.7,
            eye_max_base: 4.5,
            eye_fluctuation: 0.4,
            voice_long_secs: 90,
            voice_short_secs: 30,
        }
    }
}
