//! Summary statistics and downloadable renderings of a user's history.

mod render;
mod sink;
mod summary;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::ReportError;
use crate::history::{fetch_snapshot, HistoryRow, HistoryView};
use crate::models::{ActivityKind, OwnerId};
use crate::risk::{tier_for, RiskTier};
use crate::store::HistoryStore;

pub use sink::{CollectingSink, DirectorySink, ReportSink};
pub use summary::{ActivitySummary, ReportSummary};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Csv,
}

impl ReportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text/plain",
            ReportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Csv => "csv",
        }
    }
}

/// A rendered report ready for a [`ReportSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Local time, human readable.
    pub timestamp: String,
    /// Display name of the activity kind.
    pub activity: String,
    pub score: f64,
    pub tier: RiskTier,
    pub duration_seconds: u64,
    pub detail: String,
    pub message: String,
}

impl ReportRow {
    fn from_history(row: &HistoryRow) -> Self {
        let entry = &row.entry;
        let detail = match entry.activity_kind {
            ActivityKind::EyeStrain => {
                format!("Blink analysis window: {}s", entry.duration_seconds)
            }
            ActivityKind::VoiceFatigue => {
                format!("Recording length: {}s", entry.duration_seconds)
            }
        };
        Self {
            timestamp: row
                .created_at
                .with_timezone(&Local)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            activity: entry.activity_kind.display_name().to_string(),
            score: entry.score,
            tier: tier_for(entry.score),
            duration_seconds: entry.duration_seconds,
            detail,
            message: entry.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub summary: ReportSummary,
    /// Newest first, in history order.
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn generate(view: &HistoryView, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            summary: ReportSummary::from_view(view),
            rows: view.rows().iter().map(ReportRow::from_history).collect(),
        }
    }

    /// Builds a report straight from the store when no live view is held.
    pub async fn from_store<P: HistoryStore>(
        store: &P,
        owner: &OwnerId,
        generated_at: DateTime<Local>,
    ) -> Result<Self, ReportError> {
        let view = fetch_snapshot(store, owner).await?;
        Ok(Self::generate(&view, generated_at))
    }

    pub fn file_name(&self, format: ReportFormat) -> String {
        format!(
            "health_report_{}.{}",
            self.generated_at.format("%Y-%m-%d_%H%M%S"),
            format.extension()
        )
    }

    pub fn render(&self, format: ReportFormat) -> ReportArtifact {
        let body = match format {
            ReportFormat::Text => render::text(self),
            ReportFormat::Csv => render::csv(self),
        };
        ReportArtifact {
            file_name: self.file_name(format),
            mime_type: format.mime_type().to_string(),
            body,
        }
    }

    pub fn export(
        &self,
        format: ReportFormat,
        sink: &dyn ReportSink,
    ) -> Result<ReportArtifact, ReportError> {
        let artifact = self.render(format);
        sink.deliver(&artifact)?;
        Ok(artifact)
    }
}
