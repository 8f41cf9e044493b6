//! Streaks and trailing windows over per-day time logs

use crate::domain::TimeLogEntry;
use crate::error::{RemindrError, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One day inside a trailing analytics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDay {
    pub date: NaiveDate,
    pub minutes_logged: u32,
    pub goal_met: bool,
}

/// Consecutive goal-met days ending at `as_of`.
///
/// Walks backward one calendar day at a time; the streak is 0 when there
/// is no entry for `as_of` or that entry falls short of the goal. A
/// missing day breaks continuity the same as a short one.
pub fn streak_length(entries: &[TimeLogEntry], goal_minutes: u32, as_of: NaiveDate) -> Result<u32> {
    require_goal(goal_minutes)?;

    let by_date = minutes_by_date(entries);
    let mut streak = 0;
    let mut day = as_of;
    loop {
        match by_date.get(&day) {
            Some(&minutes) if minutes >= goal_minutes => streak += 1,
            _ => break,
        }
        day = match day.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }

    Ok(streak)
}

/// Minutes and goal status for each of the last `days` dates ending at
/// `as_of`, oldest first. Days without an entry count as zero minutes.
pub fn weekly_window(
    entries: &[TimeLogEntry],
    goal_minutes: u32,
    days: u32,
    as_of: NaiveDate,
) -> Result<Vec<HabitDay>> {
    require_goal(goal_minutes)?;

    let by_date = minutes_by_date(entries);
    let mut window = Vec::with_capacity(days as usize);
    for offset in (0..days).rev() {
        let Some(date) = as_of.checked_sub_days(Days::new(offset as u64)) else {
            continue;
        };
        let minutes = by_date.get(&date).copied().unwrap_or(0);
        window.push(HabitDay {
            date,
            minutes_logged: minutes,
            goal_met: minutes >= goal_minutes,
        });
    }

    Ok(window)
}

/// Longest run of consecutive goal-met days anywhere in the history.
pub fn longest_streak(entries: &[TimeLogEntry], goal_minutes: u32) -> Result<u32> {
    require_goal(goal_minutes)?;

    let mut dates: Vec<NaiveDate> = entries
        .iter()
        .filter(|entry| entry.minutes >= goal_minutes)
        .map(|entry| entry.date)
        .collect();
    dates.sort_unstable();
    dates.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }

    Ok(best)
}

/// Minutes logged on `date`, zero when absent.
pub fn minutes_on(entries: &[TimeLogEntry], date: NaiveDate) -> u32 {
    entries
        .iter()
        .find(|entry| entry.date == date)
        .map(|entry| entry.minutes)
        .unwrap_or(0)
}

/// Whether the goal was met on `date`.
pub fn goal_met_on(entries: &[TimeLogEntry], goal_minutes: u32, date: NaiveDate) -> Result<bool> {
    require_goal(goal_minutes)?;
    Ok(minutes_on(entries, date) >= goal_minutes)
}

fn require_goal(goal_minutes: u32) -> Result<()> {
    if goal_minutes == 0 {
        return Err(RemindrError::Precondition(
            "goal minutes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn minutes_by_date(entries: &[TimeLogEntry]) -> HashMap<NaiveDate, u32> {
    entries.iter().map(|entry| (entry.date, entry.minutes)).collect()
}
