//! Session lifecycle and risk-scoring engine for eye-strain and voice-fatigue
//! self-monitoring.
//!
//! A [`SessionRegistry`] runs one session per (owner, activity kind). Sessions
//! acquire a sensor, sample on a fixed cadence while active, and on stop hand a
//! finalized entry to a [`HistoryStore`]. A [`HistoryAggregator`] follows the
//! store's live feed and a [`Report`] summarises the resulting view.

pub mod error;
pub mod history;
pub mod models;
pub mod report;
pub mod risk;
pub mod sampler;
pub mod sensor;
pub mod session;
pub mod settings;
pub mod store;
pub mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;

pub use error::{ReportError, SensorError, SessionError, StoreError};
pub use history::{fetch_snapshot, HistoryAggregator, HistoryView};
pub use models::{ActivityKind, HistoryEntry, HistoryEntryDraft, OwnerId, Sample};
pub use report::{DirectorySink, Report, ReportArtifact, ReportFormat, ReportSink};
pub use risk::{RiskAssessment, RiskTier, Scoring, UniformSource};
pub use sensor::{SensorHandle, SensorKind, SensorProvider};
pub use session::{Finalization, SessionEvent, SessionPhase, SessionRegistry, StartOutcome};
pub use settings::{EnvOverrides, Settings, SettingsStore};
pub use store::{HistoryStore, MemoryStore, SqliteStore};
pub use utils::init_logging;

const ENABLE_LOGS: bool = true;

const DATABASE_FILE: &str = "strainwatch.sqlite3";
const SETTINGS_FILE: &str = "settings.json";
const REPORT_DIR: &str = "reports";

/// Everything a host needs for one data directory: persisted settings, the
/// SQLite history and a session registry wired to both.
pub struct Monitor<S: SensorProvider> {
    data_dir: PathBuf,
    settings: SettingsStore,
    registry: SessionRegistry<S, SqliteStore>,
}

impl<S: SensorProvider> Monitor<S> {
    pub fn open(data_dir: impl Into<PathBuf>, sensors: Arc<S>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create data directory {}", data_dir.display())
        })?;

        let store = SqliteStore::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let current = settings.settings();
        let scoring = Scoring::from_settings(&current);
        let registry = SessionRegistry::new(sensors, Arc::new(store), scoring, current);

        log_info!("monitor opened at {}", data_dir.display());
        Ok(Self {
            data_dir,
            settings,
            registry,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionRegistry<S, SqliteStore> {
        &self.registry
    }

    pub async fn history(&self, owner: OwnerId) -> Result<HistoryAggregator<SqliteStore>, StoreError> {
        HistoryAggregator::attach(Arc::clone(self.registry.store()), owner).await
    }

    /// Renders the owner's current history and writes it to the configured
    /// report directory (`<data dir>/reports` by default).
    pub async fn export_report(
        &self,
        owner: &OwnerId,
        format: ReportFormat,
    ) -> Result<(PathBuf, ReportArtifact), ReportError> {
        let report = Report::from_store(self.registry.store().as_ref(), owner, Local::now()).await?;
        let dir = self
            .settings
            .settings()
            .report_dir
            .unwrap_or_else(|| self.data_dir.join(REPORT_DIR));
        let sink = DirectorySink::new(dir);
        let artifact = report.export(format, &sink)?;
        let path = sink.path_for(&artifact);
        log_info!("report for {owner} written to {}", path.display());
        Ok((path, artifact))
    }

    /// Stops every live session and waits for their entries to be stored.
    pub async fn shutdown(&self) {
        for finalization in self.registry.shutdown().await {
            let kind = finalization.kind;
            if let Err(err) = finalization.persisted().await {
                log_warn!("{kind} session lost during shutdown: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ScriptedSensors;

    #[tokio::test]
    async fn open_creates_database_and_exports_reports() {
        let dir = std::env::temp_dir().join(format!("strainwatch-monitor-{}", uuid::Uuid::new_v4()));
        let monitor = Monitor::open(&dir, Arc::new(ScriptedSensors::new())).unwrap();
        assert!(dir.join(DATABASE_FILE).exists());

        let owner = OwnerId::new("owner").unwrap();
        let (path, artifact) = monitor
            .export_report(&owner, ReportFormat::Text)
            .await
            .unwrap();
        assert!(path.starts_with(dir.join(REPORT_DIR)));
        assert!(artifact.body.contains("No sessions recorded."));

        monitor.shutdown().await;
        drop(monitor);
        let _ = std::fs::remove_dir_all(dir);
    }
}
