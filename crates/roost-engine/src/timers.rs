//! Single-shot timers as plain rows
//!
//! Rows are keyed so that arming a key that already exists replaces the old row.
//! A periodic tick drains the rows whose deadline has passed.

use chrono::NaiveDateTime;
use roost_core::{AssignmentId, Context};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Overdue notice for a pending assignment
    Escalation(AssignmentId),
    /// Inactivity timeout of a person's temporary context
    ContextExpiry(String),
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Escalation(id) => write!(f, "escalation[{}]", id),
            Self::ContextExpiry(name) => write!(f, "context-expiry[{}]", name),
        }
    }
}

/// What to do when a timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    Escalation { assignment: AssignmentId },
    /// Revert `person` to READY if they are still in `context`
    ContextExpiry { person: String, context: Context },
}

impl Timer {
    pub fn key(&self) -> TimerKey {
        match self {
            Self::Escalation { assignment } => TimerKey::Escalation(assignment.clone()),
            Self::ContextExpiry { person, .. } => TimerKey::ContextExpiry(person.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct TimerRow {
    deadline: NaiveDateTime,
    timer: Timer,
}

#[derive(Debug, Default)]
pub struct TimerTable {
    rows: HashMap<TimerKey, TimerRow>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `timer` at `deadline`, replacing any row with the same key
    pub fn arm(&mut self, timer: Timer, deadline: NaiveDateTime) {
        let key = timer.key();
        if self.rows.insert(key.clone(), TimerRow { deadline, timer }).is_some() {
            debug!("Re-armed {} for {}", key, deadline);
        } else {
            debug!("Armed {} for {}", key, deadline);
        }
    }

    /// Remove the row for `key`; returns whether one existed
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        let removed = self.rows.remove(key).is_some();
        if removed {
            debug!("Cancelled {}", key);
        }
        removed
    }

    pub fn deadline(&self, key: &TimerKey) -> Option<NaiveDateTime> {
        self.rows.get(key).map(|row| row.deadline)
    }

    pub fn contains(&self, key: &TimerKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: NaiveDateTime) -> Vec<Timer> {
        let due_keys: Vec<TimerKey> = self
            .rows
            .iter()
            .filter(|(_, row)| row.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut due: Vec<TimerRow> = due_keys
            .iter()
            .filter_map(|key| self.rows.remove(key))
            .collect();
        due.sort_by_key(|row| row.deadline);
        due.into_iter().map(|row| row.timer).collect()
    }
}
