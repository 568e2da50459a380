//! Rotation queue and person selection
//!
//! The queue is a shuffled list of active names plus a cursor. The cursor advances
//! every time a candidate is considered, accepted or not, so skipped people are
//! not favoured on the next pick.

use chrono::{NaiveDate, NaiveTime};
use rand::seq::SliceRandom;
use rand::Rng;
use roost_core::{Person, Result, RoostError, Task};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationQueue {
    names: Vec<String>,
    index: usize,
}

impl RotationQueue {
    /// Queue in the given order, cursor at the start
    pub fn new(names: Vec<String>) -> Self {
        Self { names, index: 0 }
    }

    /// Queue of `names` in random order
    pub fn shuffled<R: Rng + ?Sized>(mut names: Vec<String>, rng: &mut R) -> Self {
        names.shuffle(rng);
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Read the name under the cursor, then advance it (wrapping)
    pub fn next_candidate(&mut self) -> Option<String> {
        if self.names.is_empty() {
            return None;
        }
        let name = self.names[self.index % self.names.len()].clone();
        self.index = (self.index + 1) % self.names.len();
        Some(name)
    }
}

/// Pick who does `task` on `date` at `time`
///
/// Tries at most one candidate per active person. A candidate is skipped when
/// they did the task last, then when they are away. Once every active person has
/// been tried the backup takes it; with no backup the cycle cannot be scheduled.
pub fn select_person(
    queue: &mut RotationQueue,
    task: &Task,
    people: &[Person],
    date: NaiveDate,
    time: NaiveTime,
) -> Result<String> {
    let active: Vec<&Person> = people.iter().filter(|p| p.is_active()).collect();
    let attempts = active.len();

    for attempt in 0..=attempts {
        let candidate = queue.next_candidate();

        if attempt == attempts {
            return match active.iter().find(|p| p.is_backup()) {
                Some(backup) => {
                    warn!(
                        "Nobody eligible for {} on {}, falling back to backup {}",
                        task.name, date, backup.name
                    );
                    Ok(backup.name.clone())
                }
                None => Err(RoostError::SchedulingImpossible(format!(
                    "no eligible person and no backup for {} on {}",
                    task.name, date
                ))),
            };
        }

        let Some(name) = candidate else {
            continue;
        };
        let Some(person) = active.iter().find(|p| p.name == name) else {
            debug!("Skipping {}: no longer active", name);
            continue;
        };
        if task.last_person.as_deref() == Some(name.as_str()) {
            debug!("Skipping {} for {}: did it last", name, task.name);
            continue;
        }
        if person.is_unavailable(date, time) {
            debug!("Skipping {} for {}: away on {}", name, task.name, date);
            continue;
        }
        return Ok(name);
    }

    // The loop always returns on its final attempt
    Err(RoostError::SchedulingImpossible(format!(
        "no candidates for {}",
        task.name
    )))
}
