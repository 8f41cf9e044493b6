//! Reminder scheduling engine.
//!
//! Holds the armed-alert table, spawns one timer task per alert, and
//! commits firings under a single lock so cancellation, resync, and
//! timer wakeups cannot double-fire an occurrence. Committed events go
//! onto a dispatch queue drained by one forwarder task, so the sink
//! sees them in commit order. Main alerts rearm their task's next
//! occurrence as part of the same commit.

use crate::clock::Clock;
use crate::domain::{AlertKey, AlertStage, ReminderEvent, Task, TaskId};
use crate::error::{RemindrError, Result};
use crate::scheduler::plan::arming_plan;
use crate::scheduler::sink::NotificationSink;
use crate::source::TaskSource;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// One armed timer. The seq stamp lets a firing prove it belongs to
/// the table entry it is about to consume; a timer from a superseded
/// arming carries a stale seq and backs off.
struct ArmedAlert {
    fire_at: NaiveDateTime,
    seq: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct SchedulerState {
    tasks: HashMap<TaskId, Task>,
    alerts: HashMap<AlertKey, ArmedAlert>,
    next_seq: u64,
    last_seen_now: Option<NaiveDateTime>,
}

struct Inner {
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<ReminderEvent>,
    state: Mutex<SchedulerState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The scheduler. Cheap to clone; all clones share one alert table.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    /// Create a scheduler delivering to `sink`. Spawns the dispatch
    /// task, so this must be called from within a tokio runtime.
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>) -> Self {
        let (events, queue) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_events(queue, sink));
        Self {
            inner: Arc::new(Inner {
                clock,
                events,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Replace the whole schedule with a fresh task snapshot.
    ///
    /// Every armed alert is cancelled, then each task with an upcoming
    /// occurrence is rearmed from scratch. Syncing the same snapshot
    /// twice at the same instant arms the same set, so callers can
    /// resync as often as they like.
    pub fn sync(&self, tasks: &[Task]) {
        let now = self.inner.clock.now();
        let mut state = self.inner.lock();

        if let Some(last) = state.last_seen_now {
            if now < last {
                tracing::warn!(
                    last = %last,
                    now = %now,
                    "clock moved backwards; rescheduling against the earlier instant"
                );
            }
        }
        state.last_seen_now = Some(now);

        for (_, alert) in state.alerts.drain() {
            alert.cancel.cancel();
        }
        state.tasks.clear();

        for task in tasks {
            state.tasks.insert(task.id.clone(), task.clone());
            arm_alerts(&self.inner, &mut state, task, now);
        }

        tracing::debug!(tasks = tasks.len(), armed = state.alerts.len(), "schedule synced");
    }

    /// Disarm one task (both stages) and forget it. Other tasks keep
    /// their timers.
    pub fn cancel_task(&self, task_id: &str) {
        let mut state = self.inner.lock();
        state.tasks.remove(task_id);
        for stage in [AlertStage::Pre, AlertStage::Main] {
            if let Some(alert) = state.alerts.remove(&AlertKey::new(task_id, stage)) {
                alert.cancel.cancel();
                tracing::debug!(task_id = %task_id, stage = %stage, "alert cancelled");
            }
        }
    }

    /// Disarm everything.
    pub fn cancel_all(&self) {
        let mut state = self.inner.lock();
        for (_, alert) in state.alerts.drain() {
            alert.cancel.cancel();
        }
        state.tasks.clear();
    }

    /// Number of alerts currently armed.
    pub fn armed_count(&self) -> usize {
        self.inner.lock().alerts.len()
    }

    /// Whether the given task has an armed alert at the given stage.
    pub fn is_armed(&self, task_id: &str, stage: AlertStage) -> bool {
        self.inner
            .lock()
            .alerts
            .contains_key(&AlertKey::new(task_id, stage))
    }

    /// When the given alert will fire, if it is armed.
    pub fn armed_fire_time(&self, task_id: &str, stage: AlertStage) -> Option<NaiveDateTime> {
        self.inner
            .lock()
            .alerts
            .get(&AlertKey::new(task_id, stage))
            .map(|alert| alert.fire_at)
    }

    /// Drive the scheduler from a task source until shutdown.
    ///
    /// Syncs once up front, then again on every heartbeat tick, which
    /// picks up edits made behind the scheduler's back. A failed
    /// snapshot keeps the current schedule in place.
    pub async fn run(
        &self,
        source: Arc<dyn TaskSource>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        if interval.is_zero() {
            return Err(RemindrError::Precondition(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }

        let mut heartbeat = tokio::time::interval(interval);
        heartbeat.tick().await; // first tick completes immediately

        self.resync(source.as_ref()).await;
        tracing::info!(interval_secs = interval.as_secs(), "scheduler running");

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.resync(source.as_ref()).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("scheduler shutting down");
                    break;
                }
            }
        }

        self.cancel_all();
        Ok(())
    }

    async fn resync(&self, source: &dyn TaskSource) {
        match source.snapshot().await {
            Ok(tasks) => self.sync(&tasks),
            Err(e) => {
                tracing::warn!(error = %e, "task snapshot failed; keeping current schedule");
            }
        }
    }
}

/// Arm every planned alert for `task`. A task with an invalid repeat
/// rule is logged and skipped so it cannot take the whole sync down.
fn arm_alerts(inner: &Arc<Inner>, state: &mut SchedulerState, task: &Task, now: NaiveDateTime) {
    let plan = match arming_plan(task, now) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::warn!(task_id = %task.id, error = %e, "skipping task");
            return;
        }
    };

    for planned in plan {
        let key = AlertKey::new(&task.id, planned.stage);
        let seq = state.next_seq;
        state.next_seq += 1;
        let cancel = CancellationToken::new();

        if let Some(old) = state.alerts.insert(
            key.clone(),
            ArmedAlert {
                fire_at: planned.fire_at,
                seq,
                cancel: cancel.clone(),
            },
        ) {
            old.cancel.cancel();
        }

        tracing::debug!(alert = %key, fire_at = %planned.fire_at, "alert armed");
        spawn_timer(Arc::clone(inner), key, seq, planned.fire_at, cancel);
    }
}

/// Spawn the timer task for one armed alert. The body re-reads the
/// clock after every wakeup and only fires once `fire_at` has truly
/// been reached, so a wakeup from a coarse or hand-driven clock cannot
/// fire early. Cancellation wins any race with the deadline.
fn spawn_timer(
    inner: Arc<Inner>,
    key: AlertKey,
    seq: u64,
    fire_at: NaiveDateTime,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let now = inner.clock.now();
            if now >= fire_at {
                break;
            }
            let remaining = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                () = cancel.cancelled() => return,
                () = inner.clock.sleep(remaining) => {}
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        fire(&inner, &key, seq);
    });
}

/// Commit one firing: consume the table entry under the lock, queue
/// the event, and rearm main alerts for the next occurrence. Pushing
/// onto the queue under the same lock makes commit order the delivery
/// order, so a pre alert can never reach the sink after its main one.
///
/// A main commit that finds the task's pre alert still armed and
/// already due flushes the pre event ahead of its own. Both timers
/// wake at once when a clock jump passes both instants, and whichever
/// wins the lock must not cost the loser its event; only a pre dated
/// in the future at this moment (the clock moved backwards) is
/// cancelled unfired.
fn fire(inner: &Arc<Inner>, key: &AlertKey, seq: u64) {
    let fired_at = inner.clock.now();
    let mut state = inner.lock();

    match state.alerts.get(key) {
        Some(armed) if armed.seq == seq && !armed.cancel.is_cancelled() => {}
        // superseded or cancelled while this timer raced for the lock
        _ => return,
    }
    state.alerts.remove(key);

    let Some(task) = state.tasks.get(&key.task_id).cloned() else {
        return;
    };

    match key.stage {
        AlertStage::Pre => queue_event(inner, ReminderEvent::pre_alert(&task, fired_at)),
        AlertStage::Main => {
            if let Some(pre) = state.alerts.remove(&AlertKey::pre(&key.task_id)) {
                pre.cancel.cancel();
                // the pre was due but lost the race for the lock; it
                // still owes its event, ahead of the main one
                if pre.fire_at <= fired_at {
                    queue_event(inner, ReminderEvent::pre_alert(&task, fired_at));
                }
            }
            queue_event(inner, ReminderEvent::main_alert(&task, fired_at));
            // one-shot tasks plan nothing here and simply fall away
            arm_alerts(inner, &mut state, &task, fired_at);
        }
    }

    tracing::info!(alert = %key, fired_at = %fired_at, "alert fired");
}

/// Push one committed event onto the dispatch queue.
fn queue_event(inner: &Inner, event: ReminderEvent) {
    let key = AlertKey::new(&event.task_id, event.stage);
    if inner.events.send(event).is_err() {
        tracing::warn!(alert = %key, "event queue closed, dropping fire");
    }
}

/// Forward committed events to the sink, one at a time and in commit
/// order. A rejected delivery is logged and dropped; the fire is not
/// retried, and the task's next occurrence is unaffected.
async fn dispatch_events(
    mut queue: mpsc::UnboundedReceiver<ReminderEvent>,
    sink: Arc<dyn NotificationSink>,
) {
    while let Some(event) = queue.recv().await {
        let key = AlertKey::new(&event.task_id, event.stage);
        if let Err(e) = sink.deliver(event).await {
            tracing::warn!(alert = %key, error = %e, "delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{Priority, Repeat};
    use crate::scheduler::sink::{ChannelSink, LogSink};
    use chrono::{NaiveDate, NaiveTime};
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn monday(hour: u32, min: u32) -> NaiveDateTime {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn daily_task(id: &str, priority: Priority) -> Task {
        Task::new(id, "Stretch")
            .with_priority(priority)
            .with_reminder(NaiveTime::from_hms_opt(18, 0, 0).unwrap())
            .with_repeat(Repeat::Daily)
    }

    fn scheduler_at(start: NaiveDateTime) -> (ReminderScheduler, ManualClock, mpsc::Receiver<ReminderEvent>) {
        let clock = ManualClock::new(start);
        let (sink, rx) = ChannelSink::new(16);
        let scheduler = ReminderScheduler::new(Arc::new(clock.clone()), Arc::new(sink));
        (scheduler, clock, rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<ReminderEvent>) -> ReminderEvent {
        timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for reminder event")
            .expect("event channel closed")
    }

    async fn assert_no_event(rx: &mut mpsc::Receiver<ReminderEvent>) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert!(rx.try_recv().is_err(), "unexpected reminder event");
    }

    #[tokio::test]
    async fn test_sync_arms_pre_and_main_for_high_priority() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        scheduler.sync(&[daily_task("t1", Priority::High)]);

        assert_eq!(scheduler.armed_count(), 2);
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Pre),
            Some(monday(17, 55))
        );
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Main),
            Some(monday(18, 0))
        );
    }

    #[tokio::test]
    async fn test_sync_arms_main_only_for_low_priority() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        scheduler.sync(&[daily_task("t1", Priority::Low)]);

        assert_eq!(scheduler.armed_count(), 1);
        assert!(!scheduler.is_armed("t1", AlertStage::Pre));
        assert!(scheduler.is_armed("t1", AlertStage::Main));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        let tasks = vec![daily_task("t1", Priority::High), daily_task("t2", Priority::Low)];

        scheduler.sync(&tasks);
        let first = (
            scheduler.armed_count(),
            scheduler.armed_fire_time("t1", AlertStage::Pre),
            scheduler.armed_fire_time("t1", AlertStage::Main),
            scheduler.armed_fire_time("t2", AlertStage::Main),
        );

        scheduler.sync(&tasks);
        let second = (
            scheduler.armed_count(),
            scheduler.armed_fire_time("t1", AlertStage::Pre),
            scheduler.armed_fire_time("t1", AlertStage::Main),
            scheduler.armed_fire_time("t2", AlertStage::Main),
        );

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sync_replaces_previous_schedule() {
        let (scheduler, _clock, mut rx) = scheduler_at(monday(9, 0));
        scheduler.sync(&[daily_task("t1", Priority::High)]);
        scheduler.sync(&[daily_task("t2", Priority::Low)]);

        assert!(!scheduler.is_armed("t1", AlertStage::Pre));
        assert!(!scheduler.is_armed("t1", AlertStage::Main));
        assert!(scheduler.is_armed("t2", AlertStage::Main));
        assert_no_event(&mut rx).await;
    }

    #[tokio::test]
    async fn test_completed_task_is_not_armed() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        scheduler.sync(&[daily_task("t1", Priority::High).with_completed(true)]);
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rule_skips_task_but_keeps_others() {
        // past the reminder time, so the empty weekly set must advance
        let (scheduler, _clock, _rx) = scheduler_at(monday(19, 0));
        let broken = Task::new("bad", "Broken")
            .with_reminder(NaiveTime::from_hms_opt(18, 0, 0).unwrap())
            .with_repeat(Repeat::weekly([]));

        scheduler.sync(&[broken, daily_task("good", Priority::Low)]);

        assert!(!scheduler.is_armed("bad", AlertStage::Main));
        assert!(scheduler.is_armed("good", AlertStage::Main));
    }

    #[tokio::test]
    async fn test_empty_weekly_set_fires_today_then_unschedules() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 59));
        let task = Task::new("t1", "Weekly chore")
            .with_reminder(NaiveTime::from_hms_opt(18, 0, 0).unwrap())
            .with_repeat(Repeat::weekly([]));
        scheduler.sync(&[task]);
        assert!(scheduler.is_armed("t1", AlertStage::Main));

        clock.advance(Duration::from_secs(60));
        let main = recv(&mut rx).await;
        assert_eq!(main.stage, AlertStage::Main);

        // the rule cannot advance, so the rearm leaves it unscheduled
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_then_main_fire_in_order() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 0));
        scheduler.sync(&[daily_task("t1", Priority::High)]);

        clock.advance(Duration::from_secs(55 * 60));
        let pre = recv(&mut rx).await;
        assert!(pre.is_pre());
        assert_eq!(pre.message, "Reminder in 5 minutes!");
        assert_eq!(pre.fired_at, monday(17, 55));

        clock.advance(Duration::from_secs(5 * 60));
        let main = recv(&mut rx).await;
        assert_eq!(main.stage, AlertStage::Main);
        assert_eq!(main.message, "Time to do it now!");
        assert_eq!(main.fired_at, monday(18, 0));

        // exactly two events for this occurrence
        assert_no_event(&mut rx).await;
    }

    #[tokio::test]
    async fn test_jump_past_both_alerts_delivers_pre_then_main() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 0));
        scheduler.sync(&[daily_task("t1", Priority::High)]);

        // both instants pass in one jump, so the two timers wake
        // together and race for the commit lock; the armed pair must
        // still arrive complete and in order
        clock.advance(Duration::from_secs(2 * 60 * 60));

        let first = recv(&mut rx).await;
        let second = recv(&mut rx).await;
        assert!(first.is_pre());
        assert_eq!(second.stage, AlertStage::Main);
        assert_no_event(&mut rx).await;

        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Main),
            Some(tuesday.and_hms_opt(18, 0, 0).unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_repeated_jumps_never_drop_the_pre_alert() {
        // with parallel workers either timer can win the commit race;
        // run the jump repeatedly so both winners occur
        for _ in 0..50 {
            let (scheduler, clock, mut rx) = scheduler_at(monday(17, 50));
            scheduler.sync(&[daily_task("t1", Priority::High)]);
            assert_eq!(scheduler.armed_count(), 2);

            clock.advance(Duration::from_secs(10 * 60 + 1));

            let first = recv(&mut rx).await;
            let second = recv(&mut rx).await;
            assert!(first.is_pre(), "pre alert lost or reordered");
            assert_eq!(second.stage, AlertStage::Main);
        }
    }

    #[tokio::test]
    async fn test_main_fire_rearms_next_day() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 57));
        scheduler.sync(&[daily_task("t1", Priority::High)]);
        // inside the lead window, so only the main alert is armed
        assert_eq!(scheduler.armed_count(), 1);

        clock.advance(Duration::from_secs(3 * 60));
        let main = recv(&mut rx).await;
        assert_eq!(main.stage, AlertStage::Main);

        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Pre),
            Some(tuesday.and_hms_opt(17, 55, 0).unwrap())
        );
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Main),
            Some(tuesday.and_hms_opt(18, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_one_shot_disarms_after_firing() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 59));
        let one_shot = Task::new("t1", "Call the dentist")
            .with_reminder(NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        scheduler.sync(&[one_shot]);

        clock.advance(Duration::from_secs(60));
        let main = recv(&mut rx).await;
        assert_eq!(main.stage, AlertStage::Main);
        assert_eq!(main.message, "Task reminder, priority Low");

        assert_eq!(scheduler.armed_count(), 0);
        assert_no_event(&mut rx).await;
    }

    #[tokio::test]
    async fn test_cancel_task_silences_its_alerts() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 0));
        scheduler.sync(&[daily_task("t1", Priority::High), daily_task("t2", Priority::Low)]);

        scheduler.cancel_task("t1");
        assert_eq!(scheduler.armed_count(), 1);

        clock.advance(Duration::from_secs(60 * 60));
        let main = recv(&mut rx).await;
        assert_eq!(main.task_id, "t2");
        assert_no_event(&mut rx).await;
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_is_a_noop() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        scheduler.cancel_task("ghost");
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_resync_after_cancel_arms_a_fresh_pair() {
        let (scheduler, _clock, _rx) = scheduler_at(monday(9, 0));
        let task = daily_task("t1", Priority::High);

        scheduler.sync(&[task.clone()]);
        scheduler.cancel_task("t1");
        assert_eq!(scheduler.armed_count(), 0);

        scheduler.sync(&[task]);
        assert_eq!(scheduler.armed_count(), 2);
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Pre),
            Some(monday(17, 55))
        );
        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Main),
            Some(monday(18, 0))
        );
    }

    #[tokio::test]
    async fn test_cancel_all_disarms_everything() {
        let (scheduler, clock, mut rx) = scheduler_at(monday(17, 0));
        scheduler.sync(&[daily_task("t1", Priority::High), daily_task("t2", Priority::Low)]);

        scheduler.cancel_all();
        assert_eq!(scheduler.armed_count(), 0);

        clock.advance(Duration::from_secs(2 * 60 * 60));
        assert_no_event(&mut rx).await;
    }

    #[tokio::test]
    async fn test_sync_after_clock_regression_still_arms() {
        let (scheduler, clock, _rx) = scheduler_at(monday(9, 0));
        scheduler.sync(&[daily_task("t1", Priority::Low)]);

        clock.set(monday(8, 0));
        scheduler.sync(&[daily_task("t1", Priority::Low)]);

        assert_eq!(
            scheduler.armed_fire_time("t1", AlertStage::Main),
            Some(monday(18, 0))
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_rearming() {
        // receiver dropped up front, so every delivery fails
        let clock = ManualClock::new(monday(17, 59));
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        let scheduler = ReminderScheduler::new(Arc::new(clock.clone()), Arc::new(sink));

        scheduler.sync(&[daily_task("t1", Priority::Low)]);
        clock.advance(Duration::from_secs(60));

        // wait for the rearm to land rather than for an event
        timeout(RECV_TIMEOUT, async {
            loop {
                if scheduler.armed_fire_time("t1", AlertStage::Main)
                    == Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(18, 0, 0).unwrap())
                {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("rearm after failed delivery never happened");
    }

    #[tokio::test]
    async fn test_run_rejects_zero_interval() {
        let clock = ManualClock::new(monday(9, 0));
        let scheduler = ReminderScheduler::new(Arc::new(clock), Arc::new(LogSink));
        let source = Arc::new(crate::source::MemoryTaskSource::new());
        let (_tx, shutdown) = broadcast::channel(1);

        let err = scheduler
            .run(source, Duration::ZERO, shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, RemindrError::Precondition(_)));
    }
}
