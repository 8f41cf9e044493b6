//! Pure analytics over habit time logs and daily goals
//!
//! Everything here is side-effect free: streak and window math over
//! `time_spent` entries, percentage-of-goal helpers shared by the
//! reporting surfaces, and day-by-day history classification.

pub mod goals;
pub mod habits;
pub mod history;

pub use goals::{HealthGoals, HealthRecord, health_score, percent_of_goal};
pub use habits::{
    HabitDay, goal_met_on, longest_streak, minutes_on, streak_length, weekly_window,
};
pub use history::{DayOutcome, HistoryEntry, history_entries};
