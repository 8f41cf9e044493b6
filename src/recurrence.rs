//! Next-occurrence resolution for repeating reminders
//!
//! Pure date math: given a task's repeat rule, reminder time of day,
//! postponement and a reference instant, compute when the reminder should
//! fire next. No clocks are read here; callers inject `now`.

use crate::domain::{Repeat, RepeatDay, Task};
use crate::error::{RemindrError, Result};
use chrono::{Datelike, Duration, NaiveDateTime};

/// Upper bound on the weekly forward scan. Seven days cover every
/// weekday; one more absorbs the starting offset.
const MAX_WEEKLY_SCAN_DAYS: u32 = 8;

/// Resolve the next instant at which `task`'s reminder should fire.
///
/// Returns `Ok(None)` when the task has no upcoming occurrence: it is
/// completed, has no reminder time, is postponed beyond today's date, or
/// is a one-shot whose time already passed. A weekly rule with an empty
/// day set cannot advance, so it is an error once today's candidate has
/// passed; callers log it and leave the task unscheduled.
///
/// Today's candidate is today's date at the reminder time. A candidate
/// that has not passed yet fires today, the day set unconsulted; a
/// passed candidate advances according to the repeat rule, with the
/// weekly scan always starting tomorrow. A candidate equal to `now`
/// counts as passed.
pub fn next_fire_time(task: &Task, now: NaiveDateTime) -> Result<Option<NaiveDateTime>> {
    let Some(reminder_time) = task.reminder_time else {
        return Ok(None);
    };
    if task.completed {
        return Ok(None);
    }

    let today = now.date();
    if task.is_postponed_beyond(today) {
        return Ok(None);
    }

    let mut candidate = today.and_time(reminder_time);
    if candidate <= now {
        match &task.repeat {
            Repeat::None => return Ok(None),
            Repeat::Daily => candidate += Duration::days(1),
            Repeat::Weekly { days } => {
                if days.is_empty() {
                    return Err(RemindrError::InvalidRule(format!(
                        "task {} repeats weekly with no days selected",
                        task.id
                    )));
                }
                let mut tries = 0;
                loop {
                    candidate += Duration::days(1);
                    tries += 1;
                    let day = RepeatDay::from_weekday(candidate.weekday());
                    if days.contains(&day) || tries >= MAX_WEEKLY_SCAN_DAYS {
                        break;
                    }
                }
            }
        }
    }

    Ok(Some(candidate))
}
