//! Task-date bookkeeping and schedule planning
//!
//! Planning never mutates the household directly: [`Calendar::plan_week`] works on
//! copies of the tasks and rotation queue and returns them in a [`WeekPlan`], so a
//! cycle that fails part-way leaves everything as it was.

use chrono::{Duration, NaiveDate};
use roost_core::{Assignment, Person, Result, Task};
use tracing::{debug, info, instrument};

use crate::rotation::{select_person, RotationQueue};
use crate::sunset::TaskClock;

/// Days scheduled per weekly cycle, starting tomorrow
pub const DAYS_PER_CYCLE: i64 = 7;

/// Re-derive `last_run`/`next_run` from known assignments, then roll every task
/// forward to today or later
pub fn mark_task_dates<'a>(
    tasks: &mut [Task],
    assignments: impl IntoIterator<Item = &'a Assignment>,
    today: NaiveDate,
) {
    for assignment in assignments {
        if let Some(task) = tasks.iter_mut().find(|t| t.name == assignment.task) {
            task.record_run(assignment.date, &assignment.person);
        }
    }
    for task in tasks.iter_mut() {
        task.roll_forward(today);
    }
}

/// Result of a weekly planning run
#[derive(Debug, Clone)]
pub struct WeekPlan {
    pub assignments: Vec<Assignment>,
    /// Tasks with their run dates advanced
    pub tasks: Vec<Task>,
    /// Queue with its cursor where the week left it
    pub queue: RotationQueue,
}

#[derive(Debug, Clone)]
pub struct Calendar {
    clock: TaskClock,
}

impl Calendar {
    pub fn new(clock: TaskClock) -> Self {
        Self { clock }
    }

    pub fn task_clock(&self) -> &TaskClock {
        &self.clock
    }

    /// Assign every task due on `date`, advancing task dates as it goes
    pub fn schedule_for_date(
        &self,
        tasks: &mut [Task],
        queue: &mut RotationQueue,
        people: &[Person],
        date: NaiveDate,
    ) -> Result<Vec<Assignment>> {
        let mut scheduled = Vec::new();
        for task in tasks.iter_mut().filter(|t| t.is_due(date)) {
            let time = self.clock.time_for(task.time, date);
            let person = select_person(queue, task, people, date, time)?;
            debug!("{} {}: {} at {}", date, task.name, person, time);
            scheduled.push(Assignment::new(&task.name, &person, date, time));
            task.record_run(date, &person);
        }
        Ok(scheduled)
    }

    /// Plan the seven days after `today` with one shared queue
    #[instrument(skip(self, tasks, queue, people))]
    pub fn plan_week(
        &self,
        tasks: &[Task],
        queue: &RotationQueue,
        people: &[Person],
        today: NaiveDate,
    ) -> Result<WeekPlan> {
        let mut tasks = tasks.to_vec();
        let mut queue = queue.clone();
        let mut assignments = Vec::new();

        for offset in 1..=DAYS_PER_CYCLE {
            let date = today + Duration::days(offset);
            assignments.extend(self.schedule_for_date(&mut tasks, &mut queue, people, date)?);
        }

        info!(
            "Planned {} assignments from {} to {}",
            assignments.len(),
            today + Duration::days(1),
            today + Duration::days(DAYS_PER_CYCLE)
        );
        Ok(WeekPlan {
            assignments,
            tasks,
            queue,
        })
    }
}
