use serde::Serialize;

use crate::history::HistoryView;
use crate::models::ActivityKind;
use crate::risk::{tier_for, RiskTier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub kind: ActivityKind,
    pub count: usize,
    /// Arithmetic mean of the entry scores; 0 when there are none.
    pub average_score: f64,
}

impl ActivitySummary {
    fn from_scores(kind: ActivityKind, scores: impl Iterator<Item = f64>) -> Self {
        let (count, total) = scores.fold((0usize, 0.0f64), |(count, total), score| {
            (count + 1, total + score)
        });
        let average_score = if count == 0 { 0.0 } else { total / count as f64 };
        Self {
            kind,
            count,
            average_score,
        }
    }

    pub fn tier(&self) -> Option<RiskTier> {
        (self.count > 0).then(|| tier_for(self.average_score))
    }
}

/// One summary per activity kind, in [`ActivityKind::ALL`] order, always
/// present even when the kind has no entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub activities: Vec<ActivitySummary>,
}

impl ReportSummary {
    pub fn from_view(view: &HistoryView) -> Self {
        let activities = ActivityKind::ALL
            .iter()
            .map(|&kind| {
                ActivitySummary::from_scores(kind, view.of_kind(kind).map(|row| row.entry.score))
            })
            .collect();
        Self { activities }
    }

    pub fn for_kind(&self, kind: ActivityKind) -> ActivitySummary {
        self.activities
            .iter()
            .find(|summary| summary.kind == kind)
            .copied()
            .unwrap_or(ActivitySummary {
                kind,
                count: 0,
                average_score: 0.0,
            })
    }

    pub fn total_entries(&self) -> usize {
        self.activities.iter().map(|summary| summary.count).sum()
    }
}
