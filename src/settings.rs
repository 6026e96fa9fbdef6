use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ActivityKind;

const ENV_ACQUIRE_TIMEOUT: &str = "STRAINWATCH_ACQUIRE_TIMEOUT_SECS";
const ENV_SEED: &str = "STRAINWATCH_SEED";
const ENV_DEBUG: &str = "STRAINWATCH_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub eye_strain_period_ms: u64,
    pub voice_fatigue_period_ms: u64,
    /// Upper bound on waiting for a sensor permission grant.
    pub acquire_timeout_secs: u64,
    pub event_capacity: usize,
    /// Fixes the simulated analyzer's random draws.
    pub seed: Option<u64>,
    pub report_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            eye_strain_period_ms: 2_000,
            voice_fatigue_period_ms: 1_000,
            acquire_timeout_secs: 30,
            event_capacity: 256,
            seed: None,
            report_dir: None,
        }
    }
}

impl Settings {
    pub fn period_for(&self, kind: ActivityKind) -> Duration {
        let ms = match kind {
            ActivityKind::EyeStrain => self.eye_strain_period_ms,
            ActivityKind::VoiceFatigue => self.voice_fatigue_period_ms,
        };
        Duration::from_millis(ms.max(1))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        EnvOverrides::from_lookup(lookup).apply(self);
    }
}

/// Process-level overrides. Applied on read and never written back to the
/// settings file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub acquire_timeout_secs: Option<u64>,
    pub seed: Option<u64>,
    pub debug: bool,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            acquire_timeout_secs: lookup(ENV_ACQUIRE_TIMEOUT).and_then(|v| v.trim().parse().ok()),
            seed: lookup(ENV_SEED).and_then(|v| v.trim().parse().ok()),
            debug: lookup(ENV_DEBUG)
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    pub fn apply(&self, settings: &mut Settings) {
        if let Some(secs) = self.acquire_timeout_secs {
            settings.acquire_timeout_secs = secs;
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        if self.debug {
            settings.eye_strain_period_ms = 1_000;
            settings.voice_fatigue_period_ms = 1_000;
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    /// Exactly what is on disk.
    data: RwLock<Settings>,
    overrides: EnvOverrides,
}

impl SettingsStore {
    /// Reads `path` if it exists, falling back to defaults on a malformed
    /// file. Environment overrides are captured once here.
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::with_overrides(path, EnvOverrides::from_env())
    }

    pub fn with_overrides(path: PathBuf, overrides: EnvOverrides) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            overrides,
        })
    }

    /// Effective settings: the stored values with overrides applied.
    pub fn settings(&self) -> Settings {
        let mut settings = self.stored();
        self.overrides.apply(&mut settings);
        settings
    }

    /// The values persisted in the settings file.
    pub fn stored(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edits the stored values, persists them and returns the effective
    /// settings.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        edit(&mut next);
        self.persist(&next)?;
        *guard = next;
        drop(guard);
        Ok(self.settings())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
