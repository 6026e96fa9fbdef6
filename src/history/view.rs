use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ActivityKind, HistoryEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub entry: HistoryEntry,
    /// The entry's timestamp, or the time the snapshot arrived while the
    /// store has not resolved it yet.
    pub created_at: DateTime<Utc>,
    pub pending: bool,
}

/// Entries newest first; equal timestamps fall back to ascending id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryView {
    rows: Vec<HistoryRow>,
}

impl HistoryView {
    pub fn build(entries: Vec<HistoryEntry>, received_at: DateTime<Utc>) -> Self {
        let mut rows: Vec<HistoryRow> = entries
            .into_iter()
            .map(|entry| HistoryRow {
                created_at: entry.created_at.unwrap_or(received_at),
                pending: entry.created_at.is_none(),
                entry,
            })
            .collect();
        rows.sort_by(newest_first);
        Self { rows }
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.rows.iter().map(|row| &row.entry)
    }

    pub fn of_kind(&self, kind: ActivityKind) -> impl Iterator<Item = &HistoryRow> {
        self.rows
            .iter()
            .filter(move |row| row.entry.activity_kind == kind)
    }
}

fn newest_first(a: &HistoryRow, b: &HistoryRow) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::models::OwnerId;

    fn entry(id: &str, created_at: Option<DateTime<Utc>>) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            owner_id: OwnerId::new("owner").unwrap(),
            activity_kind: ActivityKind::EyeStrain,
            score: 2.0,
            duration_seconds: 60,
            message: String::new(),
            created_at,
        }
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn ids(view: &HistoryView) -> Vec<&str> {
        view.entries().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn newest_first_with_id_tiebreak() {
        let view = HistoryView::build(
            vec![
                entry("b", Some(at(5))),
                entry("c", Some(at(1))),
                entry("a", Some(at(5))),
                entry("d", Some(at(9))),
            ],
            at(60),
        );
        assert_eq!(ids(&view), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn pending_timestamps_sort_as_arrival_time() {
        let view = HistoryView::build(
            vec![entry("old", Some(at(1))), entry("fresh", None)],
            at(30),
        );
        assert_eq!(ids(&view), vec!["fresh", "old"]);
        assert!(view.rows()[0].pending);
        assert_eq!(view.rows()[0].created_at, at(30));

        // once resolved to an earlier time the entry moves down
        let resolved = HistoryView::build(
            vec![entry("old", Some(at(1))), entry("fresh", Some(at(0)))],
            at(31),
        );
        assert_eq!(ids(&resolved), vec!["old", "fresh"]);
        assert!(!resolved.rows()[1].pending);
    }

    proptest! {
        #[test]
        fn order_ignores_input_permutation(
            minutes in proptest::collection::vec(0i64..5, 1..12),
            seed in any::<u64>(),
        ) {
            let entries: Vec<HistoryEntry> = minutes
                .iter()
                .enumerate()
                .map(|(i, m)| entry(&format!("e{i:02}"), Some(at(*m))))
                .collect();

            let mut shuffled = entries.clone();
            let len = shuffled.len();
            // deterministic Fisher–Yates driven by the seed
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }

            let first = HistoryView::build(entries, at(99));
            let second = HistoryView::build(shuffled, at(99));
            prop_assert_eq!(ids(&first), ids(&second));
        }
    }
}
