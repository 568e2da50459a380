//! Assignment lifecycle: SCHEDULED -> PENDING -> DONE, with snooze back to SCHEDULED
//!
//! Every transition is applied to a copy, persisted, and only then committed, so a
//! failed save leaves the assignment and its escalation timer as they were. The
//! escalation timer is cancelled before a new one is armed.

use chrono::{Duration, NaiveDateTime};
use roost_core::config::TimingConfig;
use roost_core::{Assignment, AssignmentStatus, Result, RoostError};
use tracing::info;

use crate::store::Store;
use crate::timers::{Timer, TimerKey, TimerTable};

#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    escalate_after: Duration,
    snooze_for: Duration,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            escalate_after: Duration::hours(1),
            snooze_for: Duration::hours(1),
        }
    }
}

impl Lifecycle {
    pub fn new(escalate_after: Duration, snooze_for: Duration) -> Self {
        Self {
            escalate_after,
            snooze_for,
        }
    }

    pub fn from_config(timing: &TimingConfig) -> Self {
        Self::new(
            Duration::minutes(timing.escalation_minutes),
            Duration::minutes(timing.snooze_minutes),
        )
    }

    pub fn escalate_after(&self) -> Duration {
        self.escalate_after
    }

    /// The prompt went out: PENDING, with an escalation armed
    pub async fn mark_pending(
        &self,
        assignment: &mut Assignment,
        store: &dyn Store,
        timers: &mut TimerTable,
        now: NaiveDateTime,
    ) -> Result<()> {
        if assignment.status != AssignmentStatus::Scheduled {
            return Err(RoostError::Other(format!(
                "Cannot prompt for {}: it is {}",
                assignment.id(),
                assignment.status
            )));
        }
        let mut next = assignment.clone();
        next.status = AssignmentStatus::Pending;
        store.save_assignment(&next).await?;
        *assignment = next;

        let id = assignment.id();
        timers.cancel(&TimerKey::Escalation(id.clone()));
        timers.arm(Timer::Escalation { assignment: id.clone() }, now + self.escalate_after);
        info!("{} is pending", id);
        Ok(())
    }

    /// DONE; returns whether an escalation timer was cancelled
    pub async fn mark_done(
        &self,
        assignment: &mut Assignment,
        store: &dyn Store,
        timers: &mut TimerTable,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let mut next = assignment.clone();
        next.status = AssignmentStatus::Done;
        next.completed_at = Some(now);
        store.save_assignment(&next).await?;
        *assignment = next;

        let id = assignment.id();
        let cancelled = timers.cancel(&TimerKey::Escalation(id.clone()));
        info!("{} is done by {}", id, assignment.person);
        Ok(cancelled)
    }

    /// Back to SCHEDULED, due again after the snooze delay; returns the new due time
    pub async fn snooze(
        &self,
        assignment: &mut Assignment,
        store: &dyn Store,
        timers: &mut TimerTable,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        if assignment.status.is_finished() {
            return Err(RoostError::Other(format!(
                "Cannot snooze {}: it is already done",
                assignment.id()
            )));
        }
        let mut next = assignment.clone();
        next.status = AssignmentStatus::Scheduled;
        next.due_at = now + self.snooze_for;
        store.save_assignment(&next).await?;
        *assignment = next;

        let id = assignment.id();
        timers.cancel(&TimerKey::Escalation(id.clone()));
        info!("{} snoozed until {}", id, assignment.due_at);
        Ok(assignment.due_at)
    }
}
