use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sensor::SensorKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    EyeStrain,
    VoiceFatigue,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 2] = [ActivityKind::EyeStrain, ActivityKind::VoiceFatigue];

    /// Stable key used by the persistence layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::EyeStrain => "EyeStrain",
            ActivityKind::VoiceFatigue => "VoiceFatigue",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityKind::EyeStrain => "Eye Strain",
            ActivityKind::VoiceFatigue => "Voice Fatigue",
        }
    }

    pub fn sensor_kind(&self) -> SensorKind {
        match self {
            ActivityKind::EyeStrain => SensorKind::Video,
            ActivityKind::VoiceFatigue => SensorKind::Audio,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
