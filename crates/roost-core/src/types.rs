//! Core type definitions for Roost

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::away::{self, AwayDay, HalfDay};

/// Assignment identifier: "<date> <task>", unique per (task, date)
pub type AssignmentId = String;

/// Voice call identifier issued by the voice transport
pub type CallId = String;

/// Person status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonStatus {
    #[default]
    Active,
    Backup,
    Inactive,
    Vacation,
}

impl std::fmt::Display for PersonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Backup => write!(f, "backup"),
            Self::Inactive => write!(f, "inactive"),
            Self::Vacation => write!(f, "vacation"),
        }
    }
}

impl std::str::FromStr for PersonStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "backup" => Ok(Self::Backup),
            "inactive" => Ok(Self::Inactive),
            "vacation" => Ok(Self::Vacation),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Conversational state of a person
///
/// Determines how the next inbound message from that person is interpreted.
/// The away-day dialogue carries the days collected in the current round so
/// later steps can qualify or roll them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Context {
    #[default]
    Ready,
    /// Waiting on a reply to a task prompt
    Assignment,
    /// Backup only: free text is broadcast
    Announce,
    /// Backup only: free text is forwarded to `with`
    Chat { with: String },
    ScheduleStart,
    ScheduleAwayDays,
    ScheduleAwayFull { days: Vec<NaiveDate> },
    ScheduleAwayTime { days: Vec<NaiveDate>, index: usize },
    ScheduleAwayConfirm { days: Vec<NaiveDate> },
}

impl Context {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Assignment => "assignment",
            Self::Announce => "announce",
            Self::Chat { .. } => "chat",
            Self::ScheduleStart => "schedule-start",
            Self::ScheduleAwayDays => "schedule-away-days",
            Self::ScheduleAwayFull { .. } => "schedule-away-full",
            Self::ScheduleAwayTime { .. } => "schedule-away-time",
            Self::ScheduleAwayConfirm { .. } => "schedule-away-confirm",
        }
    }

    /// Time-boxed side conversations that revert on inactivity
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Announce | Self::Chat { .. })
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat { with } => write!(f, "chat({})", with),
            Self::ScheduleAwayTime { index, days } => {
                write!(f, "schedule-away-time({}/{})", index + 1, days.len())
            }
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A member of the household
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    /// Normalized contact address (+1XXXXXXXXXX)
    pub phone: String,
    /// Prefers a voice call over a text for task prompts
    #[serde(default)]
    pub call: bool,
    #[serde(default)]
    pub status: PersonStatus,
    #[serde(default)]
    pub away: Vec<AwayDay>,
    /// Runtime conversation state, never persisted
    #[serde(skip)]
    pub context: Context,
    /// Assignment currently awaiting a reply
    #[serde(skip)]
    pub assignment: Option<AssignmentId>,
}

impl Person {
    pub fn new(name: impl Into<String>, phone: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            phone: normalize_phone(phone.as_ref()),
            call: false,
            status: PersonStatus::Active,
            away: Vec::new(),
            context: Context::Ready,
            assignment: None,
        }
    }

    pub fn with_status(mut self, status: PersonStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_call(mut self, call: bool) -> Self {
        self.call = call;
        self
    }

    pub fn with_away(mut self, away: Vec<AwayDay>) -> Self {
        self.away = away;
        self
    }

    /// Takes part in the rotation (everyone except inactive people)
    pub fn is_active(&self) -> bool {
        self.status != PersonStatus::Inactive
    }

    pub fn is_backup(&self) -> bool {
        self.status == PersonStatus::Backup
    }

    pub fn is_ready(&self) -> bool {
        self.context == Context::Ready
    }

    pub fn is_unavailable(&self, date: NaiveDate, time: NaiveTime) -> bool {
        away::is_unavailable(&self.away, date, time)
    }

    /// Add whole-day entries for `dates`, replacing entries on the same dates
    /// and dropping entries before `today`
    pub fn add_away_days(&mut self, dates: &[NaiveDate], today: NaiveDate) {
        self.away
            .retain(|day| day.date >= today && !dates.contains(&day.date));
        self.away.extend(dates.iter().copied().map(AwayDay::full));
        self.away.sort_by_key(|day| day.date);
    }

    pub fn set_away_part(&mut self, dates: &[NaiveDate], part: HalfDay) {
        for day in self.away.iter_mut().filter(|d| dates.contains(&d.date)) {
            day.part = Some(part);
        }
    }

    pub fn remove_away_days(&mut self, dates: &[NaiveDate]) {
        self.away.retain(|day| !dates.contains(&day.date));
    }
}

/// Normalize a phone number to +1XXXXXXXXXX form
pub fn normalize_phone(phone: &str) -> String {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.starts_with('1') {
        digits.insert(0, '1');
    }
    format!("+{}", digits)
}

/// Preferred time of day for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaskTime {
    At(NaiveTime),
    Sunset,
}

impl std::fmt::Display for TaskTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::At(time) => write!(f, "{}", format_clock(*time)),
            Self::Sunset => write!(f, "sunset"),
        }
    }
}

impl std::str::FromStr for TaskTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        if lower == "sunset" || lower == "at sunset" {
            return Ok(Self::Sunset);
        }
        let upper = trimmed.to_uppercase();
        ["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
            .map(Self::At)
            .ok_or_else(|| format!("Invalid task time: {}", s))
    }
}

impl TryFrom<String> for TaskTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskTime> for String {
    fn from(value: TaskTime) -> Self {
        value.to_string()
    }
}

/// Format a time the way people read it in messages ("7:30 PM")
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// A recurring chore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Recurrence in days
    pub frequency_days: u32,
    pub time: TaskTime,
    /// Prompt sent to the assignee
    pub question: String,
    #[serde(default)]
    pub last_run: Option<NaiveDate>,
    #[serde(default)]
    pub last_person: Option<String>,
    #[serde(default)]
    pub next_run: Option<NaiveDate>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        frequency_days: u32,
        time: TaskTime,
        question: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            frequency_days,
            time,
            question: question.into(),
            last_run: None,
            last_person: None,
            next_run: None,
        }
    }

    fn frequency(&self) -> Duration {
        Duration::days(i64::from(self.frequency_days.max(1)))
    }

    /// Record an occurrence on `date` by `person`, unless a later one is known
    pub fn record_run(&mut self, date: NaiveDate, person: &str) {
        if self.last_run.is_some_and(|last| last >= date) {
            return;
        }
        self.last_run = Some(date);
        self.last_person = Some(person.to_string());
        self.next_run = Some(date + self.frequency());
    }

    /// Advance `next_run` by whole periods until it is today or later
    pub fn roll_forward(&mut self, today: NaiveDate) {
        let last_run = *self.last_run.get_or_insert(today);
        let step = self.frequency();
        let mut next = self.next_run.unwrap_or(last_run + step);
        while next < today {
            next += step;
        }
        self.next_run = Some(next);
    }

    /// Due for scheduling on `date`
    pub fn is_due(&self, date: NaiveDate) -> bool {
        self.next_run.is_some_and(|next| next <= date)
    }
}

/// Lifecycle status of an assignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Scheduled,
    Pending,
    Done,
}

impl AssignmentStatus {
    pub fn is_finished(&self) -> bool {
        *self == Self::Done
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Pending => write!(f, "pending"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// One occurrence of a task for one person on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: String,
    pub person: String,
    /// Occurrence date (part of the identity, never moved by a snooze)
    pub date: NaiveDate,
    /// When the prompt is due; snoozing pushes this forward
    pub due_at: NaiveDateTime,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

impl Assignment {
    pub fn new(
        task: impl Into<String>,
        person: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            task: task.into(),
            person: person.into(),
            date,
            due_at: date.and_time(time),
            status: AssignmentStatus::Scheduled,
            completed_at: None,
        }
    }

    pub fn id(&self) -> AssignmentId {
        assignment_id(self.date, &self.task)
    }

    pub fn scheduled_time(&self) -> NaiveTime {
        self.due_at.time()
    }

    /// SCHEDULED and due at or before `now` on the same calendar day
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.status == AssignmentStatus::Scheduled
            && self.due_at.date() == now.date()
            && self.due_at <= now
    }
}

pub fn assignment_id(date: NaiveDate, task: &str) -> AssignmentId {
    format!("{} {}", date.format("%Y-%m-%d"), task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone("+1 555 123 4567"), "+15551234567");
        assert_eq!(normalize_phone("15551234567"), "+15551234567");
    }

    #[test]
    fn test_task_time_parse() {
        assert_eq!(
            "7:30 PM".parse::<TaskTime>().unwrap(),
            TaskTime::At(NaiveTime::from_hms_opt(19, 30, 0).unwrap())
        );
        assert_eq!(
            "08:15".parse::<TaskTime>().unwrap(),
            TaskTime::At(NaiveTime::from_hms_opt(8, 15, 0).unwrap())
        );
        assert_eq!("Sunset".parse::<TaskTime>().unwrap(), TaskTime::Sunset);
        assert_eq!("at sunset".parse::<TaskTime>().unwrap(), TaskTime::Sunset);
        assert!("whenever".parse::<TaskTime>().is_err());
    }

    #[test]
    fn test_task_time_serde() {
        let json = serde_json::to_string(&TaskTime::At(NaiveTime::from_hms_opt(7, 0, 0).unwrap()))
            .unwrap();
        assert_eq!(json, "\"7:00 AM\"");
        let back: TaskTime = serde_json::from_str("\"sunset\"").unwrap();
        assert_eq!(back, TaskTime::Sunset);
    }

    #[test]
    fn test_roll_forward_keeps_period() {
        let mut task = Task::new("Clean coop", 3, TaskTime::Sunset, "Did you clean the coop?");
        task.record_run(date(6, 1), "Alex");
        task.roll_forward(date(6, 12));
        let next = task.next_run.unwrap();
        let last = task.last_run.unwrap();
        assert!(next >= date(6, 12));
        assert_eq!((next - last).num_days() % 3, 0);
        assert_eq!(next, date(6, 13));
    }

    #[test]
    fn test_roll_forward_initializes_new_task() {
        let mut task = Task::new("Feed", 1, TaskTime::Sunset, "Did you feed them?");
        task.roll_forward(date(6, 12));
        assert_eq!(task.last_run, Some(date(6, 12)));
        assert_eq!(task.next_run, Some(date(6, 13)));
    }

    #[test]
    fn test_record_run_ignores_older_occurrences() {
        let mut task = Task::new("Feed", 2, TaskTime::Sunset, "Fed?");
        task.record_run(date(6, 10), "Blair");
        task.record_run(date(6, 8), "Alex");
        assert_eq!(task.last_person.as_deref(), Some("Blair"));
        assert_eq!(task.next_run, Some(date(6, 12)));
    }

    #[test]
    fn test_assignment_due() {
        let a = Assignment::new("Feed", "Alex", date(6, 10), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(a.id(), "2026-06-10 Feed");
        assert!(!a.is_due(date(6, 10).and_hms_opt(8, 59, 0).unwrap()));
        assert!(a.is_due(date(6, 10).and_hms_opt(9, 0, 0).unwrap()));
        assert!(!a.is_due(date(6, 11).and_hms_opt(9, 30, 0).unwrap()));
    }

    #[test]
    fn test_away_days_replace_and_prune() {
        let mut p = Person::new("Alex", "5550000001").with_away(vec![
            AwayDay::full(date(6, 1)),
            AwayDay::full(date(6, 20)).with_part(HalfDay::Morning),
        ]);
        p.add_away_days(&[date(6, 20), date(6, 18)], date(6, 10));
        assert_eq!(
            p.away,
            vec![AwayDay::full(date(6, 18)), AwayDay::full(date(6, 20))]
        );

        p.set_away_part(&[date(6, 20)], HalfDay::Evening);
        assert!(!p.is_unavailable(date(6, 20), NaiveTime::from_hms_opt(9, 0, 0).unwrap()));

        p.remove_away_days(&[date(6, 18)]);
        assert_eq!(p.away.len(), 1);
    }

    #[test]
    fn test_active_includes_vacation_and_backup() {
        assert!(Person::new("A", "5550000001").is_active());
        assert!(Person::new("B", "5550000002").with_status(PersonStatus::Backup).is_active());
        assert!(Person::new("C", "5550000003").with_status(PersonStatus::Vacation).is_active());
        assert!(!Person::new("D", "5550000004").with_status(PersonStatus::Inactive).is_active());
    }
}
