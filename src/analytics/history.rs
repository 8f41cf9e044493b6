//! Day-by-day habit history combining time logs and recorded misses

use crate::domain::TimeLogEntry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Outcome classification for one history day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOutcome {
    Completed,
    Missed,
    NoRecord,
}

/// One row of a task's day-by-day history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub minutes: Option<u32>,
    pub summary: Option<String>,
    pub missed_reason: Option<String>,
}

impl HistoryEntry {
    /// Logged minutes win over a recorded miss for the same day
    pub fn outcome(&self) -> DayOutcome {
        if self.minutes.is_some() {
            DayOutcome::Completed
        } else if self.missed_reason.is_some() {
            DayOutcome::Missed
        } else {
            DayOutcome::NoRecord
        }
    }
}

/// Merge logged days and recorded misses into one list, newest first.
pub fn history_entries(
    entries: &[TimeLogEntry],
    missed: &HashMap<NaiveDate, String>,
) -> Vec<HistoryEntry> {
    let mut by_date: BTreeMap<NaiveDate, HistoryEntry> = BTreeMap::new();

    for entry in entries {
        by_date.insert(
            entry.date,
            HistoryEntry {
                date: entry.date,
                minutes: Some(entry.minutes),
                summary: (!entry.summary.is_empty()).then(|| entry.summary.clone()),
                missed_reason: None,
            },
        );
    }

    for (date, reason) in missed {
        by_date
            .entry(*date)
            .and_modify(|row| row.missed_reason = Some(reason.clone()))
            .or_insert_with(|| HistoryEntry {
                date: *date,
                minutes: None,
                summary: None,
                missed_reason: Some(reason.clone()),
            });
    }

    by_date.into_values().rev().collect()
}
