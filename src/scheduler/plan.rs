//! Pure arming plan: which alerts a task gets and when they fire.
//!
//! The engine uses this to arm timers; `plan` in the CLI uses it to
//! preview the same decision without arming anything.

use crate::domain::{AlertStage, Task};
use crate::error::Result;
use crate::recurrence::next_fire_time;
use chrono::{Duration, NaiveDateTime};

/// How far ahead of the main reminder the early warning fires.
pub const PRE_ALERT_LEAD_MINUTES: i64 = 5;

/// One alert the scheduler would arm for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAlert {
    pub stage: AlertStage,
    pub fire_at: NaiveDateTime,
}

/// Compute the alerts to arm for a task as of `now`.
///
/// Returns an empty plan when the task has no upcoming occurrence
/// (completed, no reminder time, postponed past it, or a one-shot
/// whose time has gone by). High priority tasks get a pre alert
/// [`PRE_ALERT_LEAD_MINUTES`] before the main one, but only when that
/// lead time is still in the future.
pub fn arming_plan(task: &Task, now: NaiveDateTime) -> Result<Vec<PlannedAlert>> {
    let Some(fire_at) = next_fire_time(task, now)? else {
        return Ok(Vec::new());
    };

    let mut plan = Vec::with_capacity(2);

    if task.priority.has_pre_alert() {
        let pre_at = fire_at - Duration::minutes(PRE_ALERT_LEAD_MINUTES);
        if pre_at > now {
            plan.push(PlannedAlert {
                stage: AlertStage::Pre,
                fire_at: pre_at,
            });
        }
    }

    plan.push(PlannedAlert {
        stage: AlertStage::Main,
        fire_at,
    });

    Ok(plan)
}
