//! Reminder scheduling: arming plans, timers, and delivery.
//!
//! This module provides:
//! - **Arming plan**: the pure decision of which alerts a task gets by
//!   priority (a pre alert five minutes early for high priority, a main
//!   alert for everyone with an upcoming occurrence).
//! - **ReminderScheduler**: owns one timer per armed alert keyed by
//!   `(TaskId, AlertStage)`, resyncs from task snapshots, and rearms
//!   recurring tasks after each main fire.
//! - **NotificationSink**: the delivery seam, with a tracing-backed sink
//!   and a channel sink for embedding and tests.
//!
//! # Architecture
//!
//! The scheduler is snapshot-driven:
//! 1. `sync` receives the authoritative task set and reads the clock once
//! 2. Every armed alert is cancelled and the plan is recomputed per task
//! 3. Each planned alert becomes a spawned timer racing its cancel token
//! 4. A firing commits under the state lock and queues its event; a
//!    dispatch task drains the queue to the sink in commit order, and a
//!    main commit flushes a still-due pre alert ahead of its own event

mod engine;
mod plan;
mod sink;

pub use engine::ReminderScheduler;
pub use plan::{PRE_ALERT_LEAD_MINUTES, PlannedAlert, arming_plan};
pub use sink::{ChannelSink, LogSink, NotificationSink};
